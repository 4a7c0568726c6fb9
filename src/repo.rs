use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use crate::error::RepoError;

/// Identifier of a commit as reported by the backend.
pub type CommitId = String;

/// The operations the driver needs from a version-control system.
///
/// Implementors enforce linear history: [`VersionControl::commit`] must
/// fail unless the current head is exactly `parent`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use chrono::{FixedOffset, TimeZone};
/// use git_rockstar::repo::{MemoryRepository, VersionControl};
///
/// let at = FixedOffset::east_opt(0)
///     .and_then(|o| o.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single())
///     .unwrap();
/// let mut repo = MemoryRepository::new();
/// repo.init().unwrap();
/// repo.write_file(Path::new("a.txt"), "one\n").unwrap();
/// repo.stage(Path::new("a.txt")).unwrap();
/// let id = repo.commit(Path::new("a.txt"), None, &at, "first").unwrap();
/// assert_eq!(repo.head().unwrap(), Some(id));
/// ```
pub trait VersionControl {
    /// Creates the repository if it does not exist yet.
    fn init(&mut self) -> Result<(), RepoError>;

    /// Current head commit, or `None` for a repository without commits.
    fn head(&mut self) -> Result<Option<CommitId>, RepoError>;

    /// Replaces the content of `path` in the work tree.
    fn write_file(&mut self, path: &Path, content: &str) -> Result<(), RepoError>;

    /// Stages `path` for the next commit.
    fn stage(&mut self, path: &Path) -> Result<(), RepoError>;

    /// Commits the staged content of `path`, and nothing else, on top of
    /// `parent`, authored and committed at `timestamp`.
    ///
    /// Other paths staged in the index stay staged and out of the commit.
    ///
    /// # Parameters
    /// - `path`: The file to commit, relative to the repository root.
    /// - `parent`: The commit head must point at, `None` for an unborn branch.
    /// - `timestamp`: Author and committer date of the new commit.
    /// - `message`: The commit message.
    ///
    /// # Returns
    /// The id of the new commit, or [`RepoError::EmptyDelta`] when `path`
    /// is unchanged from head.
    fn commit(
        &mut self,
        path: &Path,
        parent: Option<&str>,
        timestamp: &DateTime<FixedOffset>,
        message: &str,
    ) -> Result<CommitId, RepoError>;

    /// Restores `path` in the work tree and index to its state at head,
    /// removing it if head does not track it.
    fn rollback(&mut self, path: &Path) -> Result<(), RepoError>;
}

/// A commit recorded by [`MemoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCommit {
    pub id: CommitId,
    pub parent: Option<CommitId>,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
    pub files: BTreeMap<PathBuf, String>,
}

/// In-memory [`VersionControl`] backend.
///
/// Follows the same contracts as the git backend and can be told to fail a
/// given commit attempt.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    initialized: bool,
    worktree: BTreeMap<PathBuf, String>,
    index: BTreeMap<PathBuf, String>,
    commits: Vec<MemoryCommit>,
    attempts: usize,
    fail_on_attempt: Option<usize>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `attempt`-th call to `commit` (1-based) fail.
    pub fn failing_on_commit(attempt: usize) -> Self {
        MemoryRepository {
            fail_on_attempt: Some(attempt),
            ..Self::default()
        }
    }

    pub fn commits(&self) -> &[MemoryCommit] {
        &self.commits
    }

    /// Work-tree content of `path`.
    pub fn file(&self, path: &Path) -> Option<&str> {
        self.worktree.get(path).map(|s| s.as_str())
    }

    /// Index content of `path`.
    pub fn staged(&self, path: &Path) -> Option<&str> {
        self.index.get(path).map(|s| s.as_str())
    }

    fn head_files(&self) -> BTreeMap<PathBuf, String> {
        self.commits
            .last()
            .map(|c| c.files.clone())
            .unwrap_or_default()
    }

    fn ensure_initialized(&self) -> Result<(), RepoError> {
        if self.initialized {
            Ok(())
        } else {
            Err(RepoError::Command(String::from("repository not initialized")))
        }
    }
}

impl VersionControl for MemoryRepository {
    fn init(&mut self) -> Result<(), RepoError> {
        self.initialized = true;
        Ok(())
    }

    fn head(&mut self) -> Result<Option<CommitId>, RepoError> {
        self.ensure_initialized()?;
        Ok(self.commits.last().map(|c| c.id.clone()))
    }

    fn write_file(&mut self, path: &Path, content: &str) -> Result<(), RepoError> {
        self.ensure_initialized()?;
        self.worktree.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn stage(&mut self, path: &Path) -> Result<(), RepoError> {
        self.ensure_initialized()?;
        match self.worktree.get(path) {
            Some(content) => {
                self.index.insert(path.to_path_buf(), content.clone());
                Ok(())
            }
            None => Err(RepoError::Command(format!(
                "pathspec '{}' did not match any files",
                path.display()
            ))),
        }
    }

    fn commit(
        &mut self,
        path: &Path,
        parent: Option<&str>,
        timestamp: &DateTime<FixedOffset>,
        message: &str,
    ) -> Result<CommitId, RepoError> {
        self.ensure_initialized()?;
        self.attempts += 1;
        if self.fail_on_attempt == Some(self.attempts) {
            return Err(RepoError::Command(String::from("injected commit failure")));
        }

        let head = self.commits.last().map(|c| c.id.as_str());
        if head != parent {
            return Err(RepoError::Command(format!(
                "head moved: expected {:?}, found {:?}",
                parent, head
            )));
        }

        let mut files = self.head_files();
        match self.index.get(path) {
            Some(content) if files.get(path) != Some(content) => {
                files.insert(path.to_path_buf(), content.clone());
            }
            _ => return Err(RepoError::EmptyDelta),
        }

        let id = format!("{:07x}", self.commits.len() + 1);
        self.commits.push(MemoryCommit {
            id: id.clone(),
            parent: parent.map(|p| p.to_string()),
            timestamp: *timestamp,
            message: message.to_string(),
            files,
        });
        self.index.remove(path);
        Ok(id)
    }

    fn rollback(&mut self, path: &Path) -> Result<(), RepoError> {
        self.ensure_initialized()?;
        self.index.remove(path);
        match self.head_files().remove(path) {
            Some(content) => {
                self.worktree.insert(path.to_path_buf(), content);
            }
            None => {
                self.worktree.remove(path);
            }
        }
        Ok(())
    }
}
