use crate::error::{ContentError, Result};
use crate::types::Revision;

/// The history of one tracked path.
///
/// Implement this on your backend's handle (e.g. `snaptrail_git::GitSource`).
pub trait RevisionSource {
    /// Revisions that modified the tracked path, oldest first.
    ///
    /// Failing here aborts a reconstruction, so errors should be
    /// [`Error::RevisionEnumeration`](crate::Error::RevisionEnumeration)s
    /// naming the location, path and ref.
    fn list_revisions(&self) -> Result<Vec<Revision>>;

    /// Bytes of the tracked path as of `revision`.
    ///
    /// Returns [`ContentError::NotFound`] when the path does not exist there
    /// (e.g. at the revision that deleted it).
    fn content_at(&self, revision: &Revision) -> std::result::Result<Vec<u8>, ContentError>;
}
