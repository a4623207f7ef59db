use crate::DEFAULT_EXCLUDED_COLUMNS;
use crate::decode::decode;
use crate::error::{Result, RevisionError};
use crate::merge::{DedupPolicy, Table, merge};
use crate::normalize::{NormalizeOptions, normalize};
use crate::source::RevisionSource;
use crate::tag::tag;
use crate::types::{Revision, Row, TimeZoneMode};
use tracing::{debug, info, warn};

/// Everything that shapes the output table, independent of where the history lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructOptions {
    pub normalize: NormalizeOptions,
    /// Columns dropped from the output table.
    pub excluded_columns: Vec<String>,
    pub time_zone: TimeZoneMode,
    pub dedup: DedupPolicy,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        ReconstructOptions {
            normalize: NormalizeOptions::default(),
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            time_zone: TimeZoneMode::default(),
            dedup: DedupPolicy::default(),
        }
    }
}

/// A revision that contributed no rows because it could not be loaded or decoded.
#[derive(Debug)]
pub struct SkippedRevision {
    pub revision: Revision,
    pub reason: RevisionError,
}

/// Outcome of [`reconstruct`].
#[derive(Debug)]
pub struct ReconstructReport {
    pub table: Table,
    /// Revisions that were loaded and decoded, including those that yielded no rows.
    pub processed: usize,
    pub skipped: Vec<SkippedRevision>,
}

/// Rebuild the history table of the path tracked by `source`.
///
/// Revisions are processed one at a time, oldest first. A revision whose
/// content is missing or undecodable is skipped and recorded in the report;
/// only a failure to list the revisions is returned as an error.
pub fn reconstruct<S: RevisionSource + ?Sized>(
    source: &S,
    options: &ReconstructOptions,
) -> Result<ReconstructReport> {
    let revisions = source.list_revisions()?;
    debug!(count = revisions.len(), "listed revisions");

    let mut rows = Vec::new();
    let mut processed = 0;
    let mut skipped = Vec::new();

    for revision in revisions {
        match revision_rows(source, &revision, options) {
            Ok(mut revision_rows) => {
                debug!(revision = %revision.id, rows = revision_rows.len(), "normalized revision");
                processed += 1;
                rows.append(&mut revision_rows);
            }
            Err(reason) => {
                if reason.is_not_found() {
                    info!(revision = %revision.id, "skipping revision: {}", reason);
                } else {
                    warn!(revision = %revision.id, "skipping revision: {}", reason);
                }
                skipped.push(SkippedRevision { revision, reason });
            }
        }
    }

    let table = merge(rows, &options.excluded_columns, &options.dedup);
    if table.is_empty() {
        warn!(processed, skipped = skipped.len(), "no revision produced any rows");
    } else {
        info!(
            rows = table.len(),
            columns = table.columns.len(),
            processed,
            skipped = skipped.len(),
            "reconstructed history"
        );
    }

    Ok(ReconstructReport {
        table,
        processed,
        skipped,
    })
}

fn revision_rows<S: RevisionSource + ?Sized>(
    source: &S,
    revision: &Revision,
    options: &ReconstructOptions,
) -> std::result::Result<Vec<Row>, RevisionError> {
    let bytes = source.content_at(revision)?;
    let document = decode(&bytes)?;
    let fields = normalize(&document, &options.normalize);
    Ok(tag(fields, revision, options.time_zone)?)
}
