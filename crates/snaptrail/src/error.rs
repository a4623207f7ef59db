use thiserror::Error;

/// Boxed cause carried by errors that wrap a collaborator's failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a reconstruction or a table write.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot list revisions of '{path}' on '{reference}' in {location}: {source}")]
    RevisionEnumeration {
        location: String,
        path: String,
        reference: String,
        #[source]
        source: BoxError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::RevisionEnumeration`] naming the location, path and ref that failed.
    pub fn enumeration(
        location: impl Into<String>,
        path: impl Into<String>,
        reference: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::RevisionEnumeration {
            location: location.into(),
            path: path.into(),
            reference: reference.into(),
            source: source.into(),
        }
    }
}

/// Failure to load the tracked file at one revision.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("'{path}' does not exist at revision {revision}")]
    NotFound { revision: String, path: String },

    #[error("cannot read '{path}' at revision {revision}: {source}")]
    Read {
        revision: String,
        path: String,
        #[source]
        source: BoxError,
    },
}

/// Failure to turn snapshot bytes into a document.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),
}

/// A commit time chrono cannot represent.
#[derive(Debug, Error)]
#[error("commit time {seconds}s (offset {offset_minutes}min) is out of range")]
pub struct TimeError {
    pub seconds: i64,
    pub offset_minutes: i32,
}

/// Why a single revision contributed no rows.
///
/// None of these abort a reconstruction; the revision is skipped and the
/// remaining history is still processed.
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Time(#[from] TimeError),
}

impl RevisionError {
    /// Whether the tracked file simply did not exist at the revision.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RevisionError::Content(ContentError::NotFound { .. }))
    }
}
