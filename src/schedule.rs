use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone};

use crate::error::FabricationError;
use crate::request::FabricationRequest;

/// One commit slot, paired by `index` with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub index: usize,
    pub timestamp: DateTime<FixedOffset>,
}

/// The span split into off days and active days.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPlan {
    pub start: NaiveDate,
    pub total_days: u32,
    /// Days that never receive a commit, ascending.
    pub off_days: Vec<NaiveDate>,
    /// Days that may receive commits, ascending.
    pub active_days: Vec<NaiveDate>,
    max_commits_per_day: u32,
    work_hours: (u32, u32),
    utc_offset: FixedOffset,
}

/// A [`DayPlan`] with concrete commit times.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub days: DayPlan,
    /// Strictly increasing in both index and time.
    pub entries: Vec<ScheduleEntry>,
}

/// Number of off days for a span: `round(off_fraction * total_days)`,
/// leaving at least one active day.
pub fn off_count(total_days: u32, off_fraction: f64) -> usize {
    let wanted = (off_fraction * f64::from(total_days)).round() as usize;
    wanted.min(total_days.saturating_sub(1) as usize)
}

/// Chooses which days of the span are off.
///
/// Days whose weekday is listed in the request's days off are always off
/// and count toward the off budget. The rest of the budget is drawn
/// uniformly from the remaining days.
///
/// # Parameters
/// - `request`: The validated request; supplies the span, off fraction and
///   weekday filter.
/// - `rng`: Random source. The same seed gives the same plan.
///
/// # Returns
/// A [`DayPlan`] with every day of the span listed as off or active.
///
/// # Examples
///
/// ```ignore
/// let mut rng = fastrand::Rng::with_seed(7);
/// let days = plan_days(&request, &mut rng)?; // 10 days, off fraction 0.2
/// assert_eq!(days.off_days.len(), 2);
/// assert_eq!(days.active_days.len(), 8);
/// ```
///
/// # Errors
///
/// [`FabricationError::Configuration`] if the weekday filter leaves no
/// active day.
pub fn plan_days(
    request: &FabricationRequest,
    rng: &mut fastrand::Rng,
) -> Result<DayPlan, FabricationError> {
    let start = request.start_date();
    let total = request.total_days();
    let all: Vec<NaiveDate> = start.iter_days().take(total as usize).collect();

    let (forced, mut free): (Vec<usize>, Vec<usize>) =
        (0..all.len()).partition(|&i| request.days_off().contains(&all[i].weekday()));
    if free.is_empty() {
        return Err(FabricationError::Configuration(String::from(
            "days off leave no active day in the span",
        )));
    }

    let budget = off_count(total, request.off_fraction());
    let mut off = vec![false; all.len()];
    for &i in &forced {
        off[i] = true;
    }
    let random_off = budget.saturating_sub(forced.len());
    rng.shuffle(&mut free);
    for &i in free.iter().take(random_off) {
        off[i] = true;
    }

    let (off_days, active_days): (Vec<NaiveDate>, Vec<NaiveDate>) =
        all.iter().copied().partition(|d| off[(*d - start).num_days() as usize]);

    log::debug!(
        "planned {} off day(s) ({} forced by weekday), {} active",
        off_days.len(),
        forced.len(),
        active_days.len()
    );

    Ok(DayPlan {
        start,
        total_days: total,
        off_days,
        active_days,
        max_commits_per_day: request.max_commits_per_day(),
        work_hours: request.work_hours(),
        utc_offset: request.utc_offset(),
    })
}

impl DayPlan {
    /// Most commits this plan can hold.
    pub fn capacity(&self) -> usize {
        self.active_days.len() * self.max_commits_per_day as usize
    }

    /// Draws a commit count for every active day and sums them.
    pub fn desired_commits(&self, rng: &mut fastrand::Rng) -> usize {
        self.active_days
            .iter()
            .map(|_| rng.u32(1..=self.max_commits_per_day) as usize)
            .sum()
    }

    /// Places `n` commits on the active days and draws their times.
    ///
    /// With `n` at most the number of active days, a random subset of days
    /// gets one commit each. Otherwise every active day gets one and the
    /// rest land in random bursts, capped per day.
    ///
    /// # Errors
    ///
    /// [`FabricationError::DegenerateInput`] if `n` is zero or exceeds
    /// [`DayPlan::capacity`].
    pub fn schedule(&self, n: usize, rng: &mut fastrand::Rng) -> Result<Schedule, FabricationError> {
        if n == 0 || n > self.capacity() {
            return Err(FabricationError::DegenerateInput(format!(
                "cannot schedule {n} commit(s) on {} active day(s)",
                self.active_days.len()
            )));
        }

        let counts = self.distribute(n, rng);
        let (first_hour, last_hour) = self.work_hours;
        let window = (last_hour - first_hour) * 3600;

        let mut entries = Vec::with_capacity(n);
        for (day, &count) in self.active_days.iter().zip(&counts) {
            if count == 0 {
                continue;
            }
            let mut seconds = BTreeSet::new();
            while seconds.len() < count {
                seconds.insert(rng.u32(0..window));
            }
            let opening = day.and_hms_opt(first_hour, 0, 0).ok_or_else(|| {
                FabricationError::Configuration(format!("invalid start hour {first_hour}"))
            })?;
            for s in seconds {
                let local = opening + Duration::seconds(i64::from(s));
                let timestamp = self
                    .utc_offset
                    .from_local_datetime(&local)
                    .single()
                    .ok_or_else(|| {
                        FabricationError::Configuration(format!("unrepresentable time {local}"))
                    })?;
                entries.push(ScheduleEntry {
                    index: entries.len(),
                    timestamp,
                });
            }
        }

        Ok(Schedule {
            days: self.clone(),
            entries,
        })
    }

    /// Per-active-day commit counts summing to `n`.
    fn distribute(&self, n: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
        let days = self.active_days.len();
        let cap = self.max_commits_per_day as usize;
        let mut counts = vec![0usize; days];

        if n <= days {
            let mut order: Vec<usize> = (0..days).collect();
            rng.shuffle(&mut order);
            for &i in order.iter().take(n) {
                counts[i] = 1;
            }
            return counts;
        }

        counts.iter_mut().for_each(|c| *c = 1);
        let mut extra = n - days;
        while extra > 0 {
            let open: Vec<usize> = (0..days).filter(|&i| counts[i] < cap).collect();
            let i = open[rng.usize(0..open.len())];
            let burst = rng.usize(1..=extra.min(cap - counts[i]));
            counts[i] += burst;
            extra -= burst;
        }
        counts
    }
}

impl Schedule {
    /// Days in the span with at least one commit.
    pub fn commit_days(&self) -> usize {
        let days: BTreeSet<NaiveDate> = self
            .entries
            .iter()
            .map(|e| e.timestamp.date_naive())
            .collect();
        days.len()
    }

    /// Days in the span with no commit at all.
    pub fn zero_commit_days(&self) -> usize {
        self.days.total_days as usize - self.commit_days()
    }
}
