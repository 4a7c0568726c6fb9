use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use crate::error::{FabricationError, RepoError};
use crate::repo::{CommitId, VersionControl};
use crate::schedule::ScheduleEntry;
use crate::segment::Snapshot;

/// A snapshot with its commit time and message.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommit {
    pub snapshot: Snapshot,
    pub entry: ScheduleEntry,
    pub message: String,
}

/// What a completed drive produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriveReport {
    /// Commit ids in application order.
    pub commits: Vec<CommitId>,
    /// Snapshots folded into an earlier commit because they changed nothing.
    pub merged: usize,
    pub first: Option<DateTime<FixedOffset>>,
    pub last: Option<DateTime<FixedOffset>>,
}

/// Applies planned commits to one file of a repository, in order.
pub struct Driver<'v, V: VersionControl> {
    vcs: &'v mut V,
    path: PathBuf,
}

impl<'v, V: VersionControl> Driver<'v, V> {
    pub fn new(vcs: &'v mut V, path: &Path) -> Self {
        Driver {
            vcs,
            path: path.to_path_buf(),
        }
    }

    /// Writes, stages and commits each step on top of the previous one.
    ///
    /// A step whose content equals the previous step's, or that leaves the
    /// target unchanged from head, is merged instead of producing an empty
    /// commit.
    ///
    /// # Parameters
    /// - `steps`: Planned commits in timestamp order.
    ///
    /// # Returns
    /// A [`DriveReport`] with the new commit ids, the merged count and the
    /// first and last commit times.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut repo = MemoryRepository::new();
    /// repo.init()?;
    /// let report = Driver::new(&mut repo, Path::new("main.py")).apply(&plan.commits)?;
    /// assert_eq!(report.commits.len() + report.merged, plan.commits.len());
    /// ```
    ///
    /// # Errors
    ///
    /// Stops at the first failing step with [`FabricationError::Repository`],
    /// after restoring the target file to its last committed state. Commits
    /// made before the failure are kept.
    pub fn apply(&mut self, steps: &[PlannedCommit]) -> Result<DriveReport, FabricationError> {
        let mut parent = self
            .vcs
            .head()
            .map_err(|e| repository_error(0, 0, e))?;
        let mut report = DriveReport::default();
        let mut previous: Option<&str> = None;

        for (step, planned) in steps.iter().enumerate() {
            let content = planned.snapshot.content.as_str();
            if previous == Some(content) {
                log::debug!("step {}: unchanged snapshot merged into previous commit", step);
                report.merged += 1;
                continue;
            }

            match self.commit_step(parent.as_deref(), planned) {
                Ok(id) => {
                    log::debug!(
                        "step {}: committed {} at {}",
                        step,
                        id,
                        planned.entry.timestamp
                    );
                    report.first.get_or_insert(planned.entry.timestamp);
                    report.last = Some(planned.entry.timestamp);
                    report.commits.push(id.clone());
                    parent = Some(id);
                }
                Err(RepoError::EmptyDelta) => {
                    log::debug!("step {}: nothing staged, merged into previous commit", step);
                    report.merged += 1;
                }
                Err(e) => {
                    if let Err(rb) = self.vcs.rollback(&self.path) {
                        log::warn!(
                            "could not restore {} after failed step {}: {}",
                            self.path.display(),
                            step,
                            rb
                        );
                    }
                    return Err(repository_error(step, report.commits.len(), e));
                }
            }
            previous = Some(content);
        }

        Ok(report)
    }

    fn commit_step(
        &mut self,
        parent: Option<&str>,
        planned: &PlannedCommit,
    ) -> Result<CommitId, RepoError> {
        self.vcs.write_file(&self.path, &planned.snapshot.content)?;
        self.vcs.stage(&self.path)?;
        self.vcs
            .commit(&self.path, parent, &planned.entry.timestamp, &planned.message)
    }
}

fn repository_error(step: usize, committed: usize, e: RepoError) -> FabricationError {
    FabricationError::Repository {
        step,
        committed,
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemoryRepository;
    use crate::segment::segment;
    use chrono::{Duration, TimeZone};

    const CONTENT: &str = "a\nb\nc\nd\n";

    fn planned(content: &str, n: usize) -> Vec<PlannedCommit> {
        let base = FixedOffset::east_opt(0)
            .and_then(|o| o.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single())
            .expect("timestamp");
        segment(content, n)
            .expect("segment")
            .into_iter()
            .map(|snapshot| PlannedCommit {
                entry: ScheduleEntry {
                    index: snapshot.index,
                    timestamp: base + Duration::hours(snapshot.index as i64 * 25),
                },
                message: format!("step {}", snapshot.index + 1),
                snapshot,
            })
            .collect()
    }

    #[test]
    fn applies_every_snapshot_as_a_linear_history() {
        let mut repo = MemoryRepository::new();
        repo.init().expect("init");
        let steps = planned(CONTENT, 4);
        let report = Driver::new(&mut repo, Path::new("f.txt"))
            .apply(&steps)
            .expect("apply");

        assert_eq!(report.commits.len(), 4);
        assert_eq!(report.merged, 0);
        let commits = repo.commits();
        assert_eq!(commits[0].parent, None);
        for w in commits.windows(2) {
            assert_eq!(w[1].parent.as_ref(), Some(&w[0].id));
            assert!(w[0].timestamp < w[1].timestamp);
        }
        let last = commits.last().expect("last commit");
        assert_eq!(last.files.get(Path::new("f.txt")).map(|s| s.as_str()), Some(CONTENT));
        assert_eq!(commits[2].message, "step 3");
    }

    #[test]
    fn identical_snapshots_are_merged() {
        let mut repo = MemoryRepository::new();
        repo.init().expect("init");
        let mut steps = planned(CONTENT, 2);
        let mut dup = steps[0].clone();
        dup.entry.timestamp = dup.entry.timestamp + Duration::minutes(5);
        steps.insert(1, dup);

        let report = Driver::new(&mut repo, Path::new("f.txt"))
            .apply(&steps)
            .expect("apply");
        assert_eq!(report.commits.len(), 2);
        assert_eq!(report.merged, 1);
    }

    #[test]
    fn snapshot_already_at_head_is_merged() {
        let mut repo = MemoryRepository::new();
        repo.init().expect("init");
        let path = Path::new("f.txt");
        let steps = planned(CONTENT, 2);
        repo.write_file(path, &steps[0].snapshot.content).expect("write");
        repo.stage(path).expect("stage");
        let head = repo
            .commit(path, None, &steps[0].entry.timestamp, "existing")
            .expect("commit");

        let report = Driver::new(&mut repo, path).apply(&steps).expect("apply");
        assert_eq!(report.merged, 1);
        assert_eq!(report.commits.len(), 1);
        assert_eq!(report.first, Some(steps[1].entry.timestamp));
        let commits = repo.commits();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].parent.as_ref(), Some(&head));
        assert_eq!(commits[1].files.get(path).map(|s| s.as_str()), Some(CONTENT));
    }

    #[test]
    fn failure_keeps_prefix_and_restores_file() {
        let mut repo = MemoryRepository::failing_on_commit(3);
        repo.init().expect("init");
        let steps = planned(CONTENT, 4);
        let err = Driver::new(&mut repo, Path::new("f.txt"))
            .apply(&steps)
            .expect_err("third commit fails");

        assert_eq!(
            err,
            FabricationError::Repository {
                step: 2,
                committed: 2,
                message: String::from("injected commit failure"),
            }
        );
        assert_eq!(repo.commits().len(), 2);
        assert_eq!(repo.file(Path::new("f.txt")), Some("a\nb\n"));
        assert_eq!(repo.staged(Path::new("f.txt")), None);
    }

    #[test]
    fn first_failure_removes_uncommitted_file() {
        let mut repo = MemoryRepository::failing_on_commit(1);
        repo.init().expect("init");
        let steps = planned(CONTENT, 2);
        let err = Driver::new(&mut repo, Path::new("f.txt"))
            .apply(&steps)
            .expect_err("first commit fails");
        assert_eq!(err.committed(), 0);
        assert_eq!(repo.file(Path::new("f.txt")), None);
    }

    #[test]
    fn uninitialized_repository_is_a_repository_error() {
        let mut repo = MemoryRepository::new();
        let steps = planned(CONTENT, 2);
        let err = Driver::new(&mut repo, Path::new("f.txt"))
            .apply(&steps)
            .expect_err("not initialized");
        assert!(matches!(err, FabricationError::Repository { committed: 0, .. }));
    }

    #[test]
    fn continues_from_existing_head() {
        let mut repo = MemoryRepository::new();
        repo.init().expect("init");
        Driver::new(&mut repo, Path::new("old.txt"))
            .apply(&planned("x\n", 1))
            .expect("seed history");
        let head = repo.commits()[0].id.clone();

        Driver::new(&mut repo, Path::new("f.txt"))
            .apply(&planned(CONTENT, 2))
            .expect("apply");
        assert_eq!(repo.commits()[1].parent.as_ref(), Some(&head));
        assert_eq!(repo.commits().len(), 3);
    }
}
