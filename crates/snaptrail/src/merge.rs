use crate::types::Row;
use crate::{COMMIT_TIME_COLUMN, REVISION_COLUMN};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// How rows describing the same observation in several revisions are handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Keep every row from every revision.
    #[default]
    KeepAll,
    /// For each distinct tuple of `key` column values keep only the row from
    /// the latest revision. Rows lacking every key column are always kept.
    LatestRevisionWins { key: Vec<String> },
}

/// The reconstructed history: rows in commit-time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Data columns in first-seen order, then the revision and commit time columns.
    /// Empty when the table has no rows.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Merge tagged rows (oldest revision first) into a [`Table`].
///
/// Rows are stably sorted by commit instant, so rows of one revision stay
/// together and revisions with equal times keep their input order. The column
/// union covers the rows that survive deduplication, in input order. Excluded
/// columns are dropped; naming a column that never occurs is not an error.
pub fn merge(rows: Vec<Row>, excluded: &[String], dedup: &DedupPolicy) -> Table {
    if rows.is_empty() {
        return Table::default();
    }

    let excluded: HashSet<&str> = excluded.iter().map(|c| c.as_str()).collect();

    let mut rows: Vec<(usize, Row)> = rows.into_iter().enumerate().collect();
    rows.sort_by(|(_, a), (_, b)| a.commit_time.cmp(&b.commit_time));

    let rows = match dedup {
        DedupPolicy::KeepAll => rows,
        DedupPolicy::LatestRevisionWins { key } => latest_per_key(rows, key),
    };

    let columns = column_union(&rows, &excluded);
    let rows = rows
        .into_iter()
        .map(|(_, mut row)| {
            row.fields.retain(|name, _| !excluded.contains(name.as_str()));
            row
        })
        .collect();

    Table { columns, rows }
}

fn column_union(rows: &[(usize, Row)], excluded: &HashSet<&str>) -> Vec<String> {
    let mut in_input_order: Vec<&(usize, Row)> = rows.iter().collect();
    in_input_order.sort_by_key(|(idx, _)| *idx);

    let mut columns = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for (_, row) in in_input_order {
        for name in row.fields.keys() {
            if !excluded.contains(name.as_str()) && seen.insert(name.as_str()) {
                columns.push(name.clone());
            }
        }
    }
    columns.push(REVISION_COLUMN.to_string());
    columns.push(COMMIT_TIME_COLUMN.to_string());
    columns
}

fn latest_per_key(rows: Vec<(usize, Row)>, key: &[String]) -> Vec<(usize, Row)> {
    let keys: Vec<Option<String>> = rows.iter().map(|(_, row)| dedup_key(row, key)).collect();

    let mut last: HashMap<&str, usize> = HashMap::new();
    for (pos, k) in keys.iter().enumerate() {
        if let Some(k) = k {
            last.insert(k.as_str(), pos);
        }
    }

    rows.into_iter()
        .zip(keys.iter())
        .enumerate()
        .filter(|(pos, (_, k))| match k {
            Some(k) => last.get(k.as_str()) == Some(pos),
            None => true,
        })
        .map(|(_, (row, _))| row)
        .collect()
}

fn dedup_key(row: &Row, key: &[String]) -> Option<String> {
    let values: Vec<&Value> = key
        .iter()
        .map(|column| row.get(column).unwrap_or(&Value::Null))
        .collect();
    if values.iter().all(|v| v.is_null()) {
        return None;
    }
    serde_json::to_string(&values).ok()
}
