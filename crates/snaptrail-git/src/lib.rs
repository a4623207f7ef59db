#![doc = include_str!("../README.md")]

use chrono::{DateTime, Utc};
use git2::{Commit, ErrorCode, ObjectType, Oid, Repository};
use snaptrail::{
    CommitTime, ContentError, Error, ReconstructOptions, ReconstructReport, Result, Revision,
    RevisionSource,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Public configuration and types
// ============================================================================

/// Where the history lives and how to turn it into a table.
#[derive(Debug, Clone)]
pub struct ReconstructConfig {
    /// Path to the repository (working copy or bare).
    pub repository_location: PathBuf,
    /// Tracked file, relative to the repository root.
    pub tracked_path: String,
    /// Branch name or any revision expression (`main`, `v1.2`, `HEAD~5`, ...).
    pub reference: String,
    pub options: ReconstructOptions,
}

impl ReconstructConfig {
    /// Configuration with the default sequence field, exclusions and time zone.
    pub fn new(
        repository_location: impl Into<PathBuf>,
        tracked_path: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        ReconstructConfig {
            repository_location: repository_location.into(),
            tracked_path: tracked_path.into(),
            reference: reference.into(),
            options: ReconstructOptions::default(),
        }
    }
}

/// Summary of one revision of the tracked file.
#[derive(Debug, Clone)]
pub struct RevisionInfo {
    pub revision: Revision,
    /// Short (8-char) hex of the commit.
    pub short: String,
    /// First line of the commit message.
    pub subject: String,
    /// Author name.
    pub author: String,
    /// ISO 8601 commit timestamp (UTC).
    pub timestamp: String,
    /// Whether the tracked file exists at this revision.
    pub present: bool,
}

/// The history of one file on one ref of a git repository.
pub struct GitSource {
    repo: Repository,
    location: String,
    path: String,
    reference: String,
    tip: Oid,
}

// ============================================================================
// Public API
// ============================================================================

/// Reconstruct the history table described by `config`.
pub fn reconstruct(config: &ReconstructConfig) -> Result<ReconstructReport> {
    let source = GitSource::open(
        &config.repository_location,
        &config.tracked_path,
        &config.reference,
    )?;
    snaptrail::reconstruct(&source, &config.options)
}

impl GitSource {
    /// Open the repository at `location` and resolve `reference`.
    ///
    /// Both failures are reported as [`Error::RevisionEnumeration`].
    pub fn open(location: impl AsRef<Path>, path: &str, reference: &str) -> Result<Self> {
        let location = location.as_ref();
        let repo = Repository::open(location).map_err(|e| {
            Error::enumeration(location.display().to_string(), path, reference, e)
        })?;
        Self::from_repository(repo, path, reference)
    }

    /// Track `path` on `reference` of an already opened repository.
    pub fn from_repository(repo: Repository, path: &str, reference: &str) -> Result<Self> {
        let location = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .display()
            .to_string();
        let path = normalize_tracked_path(path);
        if path.is_empty() {
            return Err(Error::enumeration(
                location,
                path,
                reference,
                "tracked path is empty",
            ));
        }

        let tip = resolve_reference(&repo, reference)
            .map_err(|e| Error::enumeration(&location, &path, reference, e))?;
        debug!(%location, %path, reference, tip = %tip, "resolved reference");

        Ok(GitSource {
            repo,
            location,
            path,
            reference: reference.to_string(),
            tip,
        })
    }

    /// Tracked path, relative to the repository root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Revisions that changed the tracked file, oldest first, with commit details.
    pub fn list_revision_info(&self) -> Result<Vec<RevisionInfo>> {
        let commits = self
            .touching_commits()
            .map_err(|e| self.enumeration_error(e))?;

        commits
            .iter()
            .map(|commit| -> Result<RevisionInfo> {
                let present = file_present(commit, Path::new(&self.path))
                    .map_err(|e| self.enumeration_error(e))?;
                Ok(commit_info(commit, present))
            })
            .collect()
    }

    fn touching_commits(&self) -> std::result::Result<Vec<Commit<'_>>, git2::Error> {
        let path = Path::new(&self.path);
        let touching = self.simplified_history(path)?;

        let mut walker = self.repo.revwalk()?;
        walker.push(self.tip)?;
        walker.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME | git2::Sort::REVERSE)?;

        let mut commits = Vec::new();
        for oid_result in walker {
            let oid = oid_result?;
            if touching.contains(&oid) {
                commits.push(self.repo.find_commit(oid)?);
            }
        }

        debug!(path = %self.path, count = commits.len(), "collected revisions");
        Ok(commits)
    }

    /// Commits that changed `path` on the history `git rev-list <tip> -- <path>` walks.
    ///
    /// A merge that matches a parent at `path` is followed through the first
    /// such parent only; the other sides are pruned.
    fn simplified_history(&self, path: &Path) -> std::result::Result<HashSet<Oid>, git2::Error> {
        let mut visited = HashSet::new();
        let mut touching = HashSet::new();
        let mut pending = vec![self.tip];

        while let Some(oid) = pending.pop() {
            if !visited.insert(oid) {
                continue;
            }
            let commit = self.repo.find_commit(oid)?;
            let current = entry_at(&commit, path)?;

            let mut same_parent = None;
            for parent in commit.parents() {
                if entry_at(&parent, path)? == current {
                    same_parent = Some(parent.id());
                    break;
                }
            }

            match same_parent {
                Some(parent) if commit.parent_count() > 1 => pending.push(parent),
                Some(_) => pending.extend(commit.parent_ids()),
                None => {
                    if commit.parent_count() > 0 || current.is_some() {
                        touching.insert(oid);
                    }
                    pending.extend(commit.parent_ids());
                }
            }
        }

        Ok(touching)
    }

    fn enumeration_error(&self, source: git2::Error) -> Error {
        Error::enumeration(&self.location, &self.path, &self.reference, source)
    }

    fn read_error(&self, revision: &Revision, source: git2::Error) -> ContentError {
        ContentError::Read {
            revision: revision.id.clone(),
            path: self.path.clone(),
            source: source.into(),
        }
    }
}

impl RevisionSource for GitSource {
    fn list_revisions(&self) -> Result<Vec<Revision>> {
        let commits = self
            .touching_commits()
            .map_err(|e| self.enumeration_error(e))?;
        Ok(commits.iter().map(commit_revision).collect())
    }

    fn content_at(&self, revision: &Revision) -> std::result::Result<Vec<u8>, ContentError> {
        let not_found = || ContentError::NotFound {
            revision: revision.id.clone(),
            path: self.path.clone(),
        };

        let oid = Oid::from_str(&revision.id).map_err(|e| self.read_error(revision, e))?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| self.read_error(revision, e))?;
        let tree = commit.tree().map_err(|e| self.read_error(revision, e))?;

        let entry = match tree.get_path(Path::new(&self.path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Err(not_found()),
            Err(e) => return Err(self.read_error(revision, e)),
        };
        let object = entry
            .to_object(&self.repo)
            .map_err(|e| self.read_error(revision, e))?;

        // A directory at the tracked path has no content to decode.
        match object.into_blob() {
            Ok(blob) => Ok(blob.content().to_vec()),
            Err(_) => Err(not_found()),
        }
    }
}

// ============================================================================
// Public utility functions
// ============================================================================

/// Strip the leading `./` or `/` users tend to type in front of a repository path.
///
/// # Examples
///
/// ```
/// use snaptrail_git::normalize_tracked_path;
///
/// assert_eq!(normalize_tracked_path("./data/forecast.json"), "data/forecast.json");
/// assert_eq!(normalize_tracked_path("/forecast.json"), "forecast.json");
/// assert_eq!(normalize_tracked_path("forecast.json"), "forecast.json");
/// ```
pub fn normalize_tracked_path(path: &str) -> String {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.trim_start_matches('/').to_string()
}

// ============================================================================
// Private helpers
// ============================================================================

fn resolve_reference(repo: &Repository, reference: &str) -> std::result::Result<Oid, git2::Error> {
    if let Ok(branch) = repo.find_branch(reference, git2::BranchType::Local) {
        return Ok(branch.get().peel_to_commit()?.id());
    }
    Ok(repo.revparse_single(reference)?.peel_to_commit()?.id())
}

/// Object id at `path` in the commit's tree, `None` when the path is absent.
fn entry_at(commit: &Commit, path: &Path) -> std::result::Result<Option<Oid>, git2::Error> {
    let tree = commit.tree()?;
    match tree.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether `path` is a file (not a directory or submodule) in the commit's tree.
fn file_present(commit: &Commit, path: &Path) -> std::result::Result<bool, git2::Error> {
    let tree = commit.tree()?;
    match tree.get_path(path) {
        Ok(entry) => Ok(entry.kind() == Some(ObjectType::Blob)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn commit_revision(commit: &Commit) -> Revision {
    let time = commit.time();
    Revision::new(
        commit.id().to_string(),
        CommitTime::new(time.seconds(), time.offset_minutes()),
    )
}

fn commit_info(commit: &Commit, present: bool) -> RevisionInfo {
    let revision = commit_revision(commit);
    let author = commit.author().name().unwrap_or("unknown").to_string();
    let timestamp = DateTime::<Utc>::from_timestamp(revision.time.seconds, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());
    let subject = commit
        .message()
        .unwrap_or("")
        .lines()
        .next()
        .unwrap_or("")
        .to_string();

    RevisionInfo {
        short: short_oid(commit.id()),
        revision,
        subject,
        author,
        timestamp,
        present,
    }
}

fn short_oid(oid: Oid) -> String {
    oid.to_string().chars().take(8).collect()
}
