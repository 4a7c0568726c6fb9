use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Weekday};

use crate::driver::{Driver, PlannedCommit};
use crate::error::FabricationError;
use crate::git::GitCli;
use crate::repo::{CommitId, VersionControl};
use crate::request::{
    DEFAULT_MAX_COMMITS_PER_DAY, DEFAULT_WORK_HOURS, FabricationRequest, Identity, RequestParts,
};
use crate::schedule::{self, Schedule};
use crate::segment;

/// Message templates used when none are configured.
///
/// `{file}` is replaced with the target's file name and `{n}` with the
/// 1-based commit number.
pub const DEFAULT_MESSAGES: &[&str] = &[
    "Update {file}",
    "Work on {file}",
    "Refactor {file}",
    "Extend {file}",
    "Tidy up {file}",
    "Small fixes",
    "WIP",
    "Progress on {file} (#{n})",
];

/// Builds and runs one fabricated history.
///
/// ```no_run
/// use git_rockstar::rockstar::RockStar;
///
/// let code = "fn main() {\n    println!(\"hi\");\n}\n";
/// RockStar::new(365, "main.rs", code, 0.2)
///     .with_seed(42)
///     .make_me_a_rockstar()
///     .expect("history written");
/// ```
#[derive(Debug, Clone)]
pub struct RockStar {
    parts: RequestParts,
}

/// A complete, not yet applied, history.
#[derive(Debug, Clone)]
pub struct FabricationPlan {
    pub request: FabricationRequest,
    /// Seed that reproduces this plan.
    pub seed: u64,
    /// Commit count offered to the segmenter before clamping to lines.
    pub requested_commits: usize,
    pub schedule: Schedule,
    pub commits: Vec<PlannedCommit>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricationSummary {
    pub days_spanned: u32,
    pub commits_made: usize,
    /// Days deliberately left without commits.
    pub days_skipped: usize,
    /// Days that received at least one commit.
    pub commit_days: usize,
    pub merged: usize,
    pub seed: u64,
    pub first: Option<DateTime<FixedOffset>>,
    pub last: Option<DateTime<FixedOffset>>,
    pub head: Option<CommitId>,
}

impl RockStar {
    /// A run over the `days` days ending today, in the local UTC offset.
    pub fn new(days: u32, file_name: &str, code: &str, off_fraction: f64) -> Self {
        let now = Local::now();
        RockStar {
            parts: RequestParts {
                total_days: days,
                target_path: file_name.to_string(),
                final_content: code.to_string(),
                off_fraction,
                end_date: now.date_naive(),
                days_off: Vec::new(),
                max_commits_per_day: DEFAULT_MAX_COMMITS_PER_DAY,
                work_hours: DEFAULT_WORK_HOURS,
                messages: Vec::new(),
                author: None,
                utc_offset: *now.offset(),
                seed: None,
            },
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.parts.seed = Some(seed);
        self
    }

    /// Last day of the span (inclusive).
    pub fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.parts.end_date = end;
        self
    }

    /// Weekdays that never get commits.
    pub fn with_days_off(mut self, days: &[Weekday]) -> Self {
        self.parts.days_off = days.to_vec();
        self
    }

    pub fn with_max_commits_per_day(mut self, max: u32) -> Self {
        self.parts.max_commits_per_day = max;
        self
    }

    /// Commit times fall in `[start, end)` hours.
    pub fn with_work_hours(mut self, start: u32, end: u32) -> Self {
        self.parts.work_hours = (start, end);
        self
    }

    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.parts.messages = messages;
        self
    }

    pub fn with_author(mut self, author: Identity) -> Self {
        self.parts.author = Some(author);
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.parts.utc_offset = offset;
        self
    }

    /// Validates the inputs without planning anything.
    pub fn request(&self) -> Result<FabricationRequest, FabricationError> {
        FabricationRequest::new(self.parts.clone())
    }

    /// Computes the full history without touching any repository.
    ///
    /// # Errors
    ///
    /// Configuration and degenerate-input errors only.
    pub fn plan(&self) -> Result<FabricationPlan, FabricationError> {
        let request = self.request()?;
        let seed = request.seed().unwrap_or_else(|| fastrand::u64(..));
        let mut rng = fastrand::Rng::with_seed(seed);

        let days = schedule::plan_days(&request, &mut rng)?;
        let requested_commits = days.desired_commits(&mut rng);
        let snapshots = segment::segment(request.final_content(), requested_commits)?;
        let schedule = days.schedule(snapshots.len(), &mut rng)?;

        let file = file_label(request.target_path());
        let templates: Vec<&str> = if request.messages().is_empty() {
            DEFAULT_MESSAGES.to_vec()
        } else {
            request.messages().iter().map(|m| m.as_str()).collect()
        };

        let commits = snapshots
            .into_iter()
            .zip(schedule.entries.iter().cloned())
            .map(|(snapshot, entry)| {
                let template = templates[rng.usize(0..templates.len())];
                PlannedCommit {
                    message: render_message(template, &file, snapshot.index + 1),
                    snapshot,
                    entry,
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "planned {} commit(s) over {} day(s), {} off, seed {}",
            commits.len(),
            request.total_days(),
            schedule.days.off_days.len(),
            seed
        );

        Ok(FabricationPlan {
            request,
            seed,
            requested_commits,
            schedule,
            commits,
        })
    }

    /// Fabricates the history in the git repository of the current directory,
    /// creating it if needed.
    pub fn make_me_a_rockstar(&self) -> Result<FabricationSummary, FabricationError> {
        if which::which("git").is_err() {
            return Err(FabricationError::Configuration(String::from(
                "`git` not found in PATH",
            )));
        }
        let plan = self.plan()?;
        let mut git = GitCli::new(".", plan.request.author().cloned());
        plan.execute(&mut git)
    }

    /// Same as [`RockStar::make_me_a_rockstar`] against any backend.
    pub fn make_me_a_rockstar_in<V: VersionControl>(
        &self,
        vcs: &mut V,
    ) -> Result<FabricationSummary, FabricationError> {
        self.plan()?.execute(vcs)
    }
}

impl FabricationPlan {
    /// Applies every planned commit, in order, to `vcs`.
    ///
    /// # Errors
    ///
    /// [`FabricationError::Repository`] with the number of commits that
    /// were made before the failure.
    pub fn execute<V: VersionControl>(
        &self,
        vcs: &mut V,
    ) -> Result<FabricationSummary, FabricationError> {
        vcs.init().map_err(|e| FabricationError::Repository {
            step: 0,
            committed: 0,
            message: e.to_string(),
        })?;

        let report = Driver::new(vcs, self.request.target_path()).apply(&self.commits)?;

        let summary = FabricationSummary {
            days_spanned: self.request.total_days(),
            commits_made: report.commits.len(),
            days_skipped: self.schedule.days.off_days.len(),
            commit_days: self.schedule.commit_days(),
            merged: report.merged,
            seed: self.seed,
            first: report.first,
            last: report.last,
            head: report.commits.last().cloned(),
        };
        log::info!(
            "made {} commit(s) on {} day(s), {} merged",
            summary.commits_made,
            summary.commit_days,
            summary.merged
        );
        Ok(summary)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn render_message(template: &str, file: &str, n: usize) -> String {
    template
        .replace("{file}", file)
        .replace("{n}", &n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemoryRepository;
    use crate::schedule::off_count;
    use chrono::Datelike;
    use std::collections::BTreeSet;

    fn lines(n: usize) -> String {
        (1..=n).map(|i| format!("print({i})\n")).collect()
    }

    fn star(days: u32, code: &str, off: f64) -> RockStar {
        RockStar::new(days, "newai.py", code, off)
            .with_seed(2024)
            .with_end_date(NaiveDate::from_ymd_opt(2024, 6, 30).expect("date"))
            .with_utc_offset(FixedOffset::east_opt(0).expect("offset"))
    }

    #[test]
    fn ten_days_ten_lines_scenario() {
        let code = lines(10);
        let mut repo = MemoryRepository::new();
        let summary = star(10, &code, 0.2)
            .make_me_a_rockstar_in(&mut repo)
            .expect("run");

        assert_eq!(summary.days_skipped, 2);
        assert!(summary.commits_made <= 10);
        assert!(summary.commit_days <= 8);
        let last = repo.commits().last().expect("commit");
        assert_eq!(
            last.files.get(Path::new("newai.py")).map(|s| s.as_str()),
            Some(code.as_str())
        );
    }

    #[test]
    fn off_days_never_receive_commits() {
        let code = lines(400);
        let plan = star(90, &code, 0.25).plan().expect("plan");
        let off: BTreeSet<NaiveDate> = plan.schedule.days.off_days.iter().copied().collect();
        assert_eq!(off.len(), off_count(90, 0.25));
        for c in &plan.commits {
            assert!(!off.contains(&c.entry.timestamp.date_naive()));
        }
        // Enough lines for every active day: the idle ratio is exactly the off fraction.
        assert_eq!(plan.schedule.zero_commit_days(), off.len());
    }

    #[test]
    fn short_file_clamps_commit_count() {
        let plan = star(30, "only\ntwo\n", 0.0).plan().expect("plan");
        assert!(plan.requested_commits >= 30);
        assert_eq!(plan.commits.len(), 2);
        assert_eq!(plan.commits[1].snapshot.content, "only\ntwo\n");
    }

    #[test]
    fn single_day_single_line() {
        let mut repo = MemoryRepository::new();
        let summary = star(1, "hello", 0.0)
            .make_me_a_rockstar_in(&mut repo)
            .expect("run");
        assert_eq!(summary.commits_made, 1);
        let commit = &repo.commits()[0];
        assert_eq!(
            commit.timestamp.date_naive(),
            NaiveDate::from_ymd_opt(2024, 6, 30).expect("date")
        );
        assert_eq!(
            commit.files.get(Path::new("newai.py")).map(|s| s.as_str()),
            Some("hello")
        );
    }

    #[test]
    fn empty_content_creates_no_commits() {
        let mut repo = MemoryRepository::new();
        let err = star(10, "", 0.2)
            .make_me_a_rockstar_in(&mut repo)
            .expect_err("rejected");
        assert!(matches!(err, FabricationError::Configuration(_)));
        assert!(repo.commits().is_empty());
    }

    #[test]
    fn invalid_off_fraction_is_rejected_before_mutation() {
        let mut repo = MemoryRepository::new();
        let err = star(10, "x\n", 1.0)
            .make_me_a_rockstar_in(&mut repo)
            .expect_err("rejected");
        assert!(matches!(err, FabricationError::Configuration(_)));
        assert!(repo.head().is_err(), "init must not have run");
    }

    #[test]
    fn span_past_the_calendar_is_a_configuration_error() {
        let err = RockStar::new(200_000_000, "a.txt", "x\n", 0.2)
            .with_seed(1)
            .plan()
            .expect_err("span too long");
        assert!(matches!(err, FabricationError::Configuration(_)));
    }

    #[test]
    fn repository_failure_reports_progress() {
        let mut repo = MemoryRepository::failing_on_commit(4);
        let err = star(20, &lines(40), 0.1)
            .make_me_a_rockstar_in(&mut repo)
            .expect_err("fault");
        assert_eq!(err.committed(), 3);
        assert_eq!(repo.commits().len(), 3);
    }

    #[test]
    fn same_seed_same_plan() {
        let code = lines(50);
        let a = star(30, &code, 0.2).plan().expect("plan");
        let b = star(30, &code, 0.2).plan().expect("plan");
        assert_eq!(a.commits, b.commits);
        assert_eq!(a.seed, 2024);
    }

    #[test]
    fn history_is_linear_and_ordered() {
        let mut repo = MemoryRepository::new();
        star(45, &lines(120), 0.2)
            .with_days_off(&[Weekday::Sun])
            .make_me_a_rockstar_in(&mut repo)
            .expect("run");
        for w in repo.commits().windows(2) {
            assert_eq!(w[1].parent.as_ref(), Some(&w[0].id));
            assert!(w[0].timestamp < w[1].timestamp);
            assert_ne!(w[1].timestamp.weekday(), Weekday::Sun);
        }
    }

    #[test]
    fn custom_messages_are_rendered() {
        let plan = star(3, &lines(3), 0.0)
            .with_messages(vec![String::from("{file} step {n}")])
            .plan()
            .expect("plan");
        let messages: Vec<&str> = plan.commits.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["newai.py step 1", "newai.py step 2", "newai.py step 3"]);
    }
}
