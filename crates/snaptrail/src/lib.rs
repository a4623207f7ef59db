#![doc = include_str!("../README.md")]

mod decode;
mod error;
mod merge;
mod normalize;
mod output;
mod reconstruct;
mod source;
mod tag;
mod types;

pub use decode::decode;
pub use error::{BoxError, ContentError, DecodeError, Error, Result, RevisionError, TimeError};
pub use merge::{DedupPolicy, Table, merge};
pub use normalize::{NormalizeOptions, normalize};
pub use output::{render_cell, to_json, to_json_value, write_csv};
pub use reconstruct::{ReconstructOptions, ReconstructReport, SkippedRevision, reconstruct};
pub use source::RevisionSource;
pub use tag::tag;
pub use types::{CommitTime, Document, Fields, Revision, Row, TimeZoneMode};

/// Observation-sequence field exploded when none is configured.
pub const DEFAULT_SEQUENCE_FIELD: &str = "timeserie";

/// Columns dropped from the output table when none are configured.
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 3] = ["aggData", "sixHourSymbols", "twelveHourSymbols"];

/// Reserved column holding the revision identity.
pub const REVISION_COLUMN: &str = "commit_hash";

/// Reserved column holding the revision commit time.
pub const COMMIT_TIME_COLUMN: &str = "commit_time";

/// Rendering of [`COMMIT_TIME_COLUMN`] in written tables.
pub const COMMIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
