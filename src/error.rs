use thiserror::Error;

/// Errors surfaced by [`RockStar`](crate::rockstar::RockStar) and its parts.
///
/// `Configuration` and `DegenerateInput` are always raised before the
/// repository is touched. `Repository` means the run stopped part way; the
/// `committed` commits made before the fault are kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FabricationError {
    /// Invalid request parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The content cannot sustain any history.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A version-control mutation failed at `step` (0-based).
    #[error("repository error at step {step} after {committed} commit(s): {message}")]
    Repository {
        step: usize,
        committed: usize,
        message: String,
    },
}

impl FabricationError {
    /// Number of commits that were created before the error, if any.
    pub fn committed(&self) -> usize {
        match self {
            FabricationError::Repository { committed, .. } => *committed,
            _ => 0,
        }
    }
}

/// Errors returned by a [`VersionControl`](crate::repo::VersionControl) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// The index matches HEAD; committing would create an empty commit.
    #[error("no staged changes")]
    EmptyDelta,

    /// Any other failure, carrying the backend's message.
    #[error("{0}")]
    Command(String),
}

impl From<String> for RepoError {
    fn from(message: String) -> Self {
        RepoError::Command(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_error_reports_committed_count() {
        let e = FabricationError::Repository {
            step: 3,
            committed: 3,
            message: "boom".to_string(),
        };
        assert_eq!(e.committed(), 3);
        assert_eq!(
            e.to_string(),
            "repository error at step 3 after 3 commit(s): boom"
        );
    }

    #[test]
    fn configuration_error_has_no_commits() {
        let e = FabricationError::Configuration("days must be positive".to_string());
        assert_eq!(e.committed(), 0);
    }
}
