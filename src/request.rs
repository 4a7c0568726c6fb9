use std::path::{Component, Path, PathBuf};

use chrono::{Days, FixedOffset, NaiveDate, Weekday};

use crate::error::FabricationError;

/// Default per-day commit cap.
pub const DEFAULT_MAX_COMMITS_PER_DAY: u32 = 4;

/// Default commit window, in local hours `[start, end)`.
pub const DEFAULT_WORK_HOURS: (u32, u32) = (9, 23);

/// Commit author and committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: &str, email: &str) -> Self {
        Identity {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
        }
    }

    /// Parses `"Name <email>"`.
    pub fn parse(s: &str) -> Option<Self> {
        let open = s.find('<')?;
        let close = s.rfind('>')?;
        if close < open {
            return None;
        }
        let name = s[..open].trim();
        let email = s[open + 1..close].trim();
        if name.is_empty() || email.is_empty() {
            return None;
        }
        Some(Identity::new(name, email))
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Everything a single fabrication run needs, validated.
///
/// Built with [`FabricationRequest::new`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FabricationRequest {
    total_days: u32,
    target_path: PathBuf,
    final_content: String,
    off_fraction: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days_off: Vec<Weekday>,
    max_commits_per_day: u32,
    work_hours: (u32, u32),
    messages: Vec<String>,
    author: Option<Identity>,
    utc_offset: FixedOffset,
    seed: Option<u64>,
}

/// Unvalidated inputs for a [`FabricationRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParts {
    pub total_days: u32,
    pub target_path: String,
    pub final_content: String,
    pub off_fraction: f64,
    pub end_date: NaiveDate,
    pub days_off: Vec<Weekday>,
    pub max_commits_per_day: u32,
    pub work_hours: (u32, u32),
    pub messages: Vec<String>,
    pub author: Option<Identity>,
    pub utc_offset: FixedOffset,
    pub seed: Option<u64>,
}

impl FabricationRequest {
    /// Validates `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`FabricationError::Configuration`] when days is zero, the
    /// off fraction is outside `[0, 1)`, the content or path is empty, the
    /// path escapes the repository, the hour window is invalid, or the span
    /// would start before the earliest representable date.
    pub fn new(parts: RequestParts) -> Result<Self, FabricationError> {
        let bad = |m: String| Err(FabricationError::Configuration(m));

        if parts.total_days == 0 {
            return bad(String::from("days must be positive"));
        }
        let Some(start_date) = parts
            .end_date
            .checked_sub_days(Days::new(u64::from(parts.total_days - 1)))
        else {
            return bad(format!(
                "a span of {} days ending {} starts before the earliest representable date",
                parts.total_days, parts.end_date
            ));
        };
        if !parts.off_fraction.is_finite() || !(0.0..1.0).contains(&parts.off_fraction) {
            return bad(format!(
                "off fraction must be in [0, 1), got {}",
                parts.off_fraction
            ));
        }
        if parts.final_content.is_empty() {
            return bad(String::from("file content is empty"));
        }
        let target_path = validate_target_path(&parts.target_path)?;
        if parts.max_commits_per_day == 0 {
            return bad(String::from("max commits per day must be at least 1"));
        }
        let (start, end) = parts.work_hours;
        if start >= end || end > 24 {
            return bad(format!("invalid work hours {start}-{end}"));
        }
        if parts.max_commits_per_day > (end - start) * 3600 {
            return bad(format!(
                "max commits per day {} does not fit in {start}-{end}",
                parts.max_commits_per_day
            ));
        }

        let mut days_off = parts.days_off;
        days_off.sort_by_key(|d| d.num_days_from_monday());
        days_off.dedup();

        Ok(FabricationRequest {
            total_days: parts.total_days,
            target_path,
            final_content: parts.final_content,
            off_fraction: parts.off_fraction,
            start_date,
            end_date: parts.end_date,
            days_off,
            max_commits_per_day: parts.max_commits_per_day,
            work_hours: parts.work_hours,
            messages: parts.messages,
            author: parts.author,
            utc_offset: parts.utc_offset,
            seed: parts.seed,
        })
    }

    pub fn total_days(&self) -> u32 {
        self.total_days
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn final_content(&self) -> &str {
        &self.final_content
    }

    pub fn off_fraction(&self) -> f64 {
        self.off_fraction
    }

    /// First day of the span.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the span, inclusive.
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn days_off(&self) -> &[Weekday] {
        &self.days_off
    }

    pub fn max_commits_per_day(&self) -> u32 {
        self.max_commits_per_day
    }

    pub fn work_hours(&self) -> (u32, u32) {
        self.work_hours
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn author(&self) -> Option<&Identity> {
        self.author.as_ref()
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// The target must be a plain relative path inside the work tree.
fn validate_target_path(raw: &str) -> Result<PathBuf, FabricationError> {
    if raw.trim().is_empty() {
        return Err(FabricationError::Configuration(String::from(
            "target file name is empty",
        )));
    }
    let path = PathBuf::from(raw);
    for c in path.components() {
        match c {
            Component::Normal(part) if part == ".git" => {
                return Err(FabricationError::Configuration(format!(
                    "target path {raw} points into .git"
                )));
            }
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(FabricationError::Configuration(format!(
                    "target path {raw} must be relative to the repository"
                )));
            }
        }
    }
    Ok(path)
}

/// Parses a weekday name or three-letter abbreviation, case-insensitive.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    s.trim().parse::<Weekday>().ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn parts(days: u32, content: &str, off: f64) -> RequestParts {
        RequestParts {
            total_days: days,
            target_path: String::from("main.py"),
            final_content: content.to_string(),
            off_fraction: off,
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).expect("date"),
            days_off: Vec::new(),
            max_commits_per_day: DEFAULT_MAX_COMMITS_PER_DAY,
            work_hours: DEFAULT_WORK_HOURS,
            messages: Vec::new(),
            author: None,
            utc_offset: FixedOffset::east_opt(0).expect("offset"),
            seed: Some(7),
        }
    }

    #[test]
    fn valid_request_spans_the_right_dates() {
        let r = FabricationRequest::new(parts(10, "x\n", 0.2)).expect("valid");
        assert_eq!(r.start_date(), NaiveDate::from_ymd_opt(2024, 3, 22).expect("date"));
        assert_eq!(r.end_date(), NaiveDate::from_ymd_opt(2024, 3, 31).expect("date"));
    }

    #[test]
    fn rejects_zero_days() {
        let r = FabricationRequest::new(parts(0, "x\n", 0.2));
        assert!(matches!(r, Err(FabricationError::Configuration(_))));
    }

    #[test]
    fn rejects_span_before_earliest_date() {
        let r = FabricationRequest::new(parts(200_000_000, "x\n", 0.2));
        assert!(matches!(r, Err(FabricationError::Configuration(_))));

        let mut input = parts(1, "x\n", 0.2);
        input.end_date = NaiveDate::MIN;
        let r = FabricationRequest::new(input).expect("single day at the minimum");
        assert_eq!(r.start_date(), NaiveDate::MIN);
    }

    #[test]
    fn rejects_off_fraction_outside_range() {
        for off in [1.0, 1.5, -0.1, f64::NAN] {
            let r = FabricationRequest::new(parts(10, "x\n", off));
            assert!(matches!(r, Err(FabricationError::Configuration(_))), "{off}");
        }
    }

    #[test]
    fn rejects_empty_content() {
        let r = FabricationRequest::new(parts(10, "", 0.2));
        assert!(matches!(r, Err(FabricationError::Configuration(_))));
    }

    #[test]
    fn rejects_paths_outside_the_work_tree() {
        for p in ["", "  ", "/etc/passwd", "../up.py", ".git/config"] {
            let mut input = parts(10, "x\n", 0.2);
            input.target_path = p.to_string();
            assert!(FabricationRequest::new(input).is_err(), "{p}");
        }
    }

    #[test]
    fn accepts_nested_relative_path() {
        let mut input = parts(10, "x\n", 0.2);
        input.target_path = String::from("src/app/main.py");
        let r = FabricationRequest::new(input).expect("valid");
        assert_eq!(r.target_path(), Path::new("src/app/main.py"));
    }

    #[test]
    fn rejects_inverted_work_hours() {
        let mut input = parts(10, "x\n", 0.2);
        input.work_hours = (18, 9);
        assert!(FabricationRequest::new(input).is_err());
    }

    #[test]
    fn identity_parses_name_and_email() {
        let id = Identity::parse("Jane Doe <jane@example.com>").expect("identity");
        assert_eq!(id.name, "Jane Doe");
        assert_eq!(id.email, "jane@example.com");
        assert_eq!(id.to_string(), "Jane Doe <jane@example.com>");
        assert!(Identity::parse("no email").is_none());
        assert!(Identity::parse("<only@email>").is_none());
    }

    #[test]
    fn weekday_names_parse() {
        assert_eq!(parse_weekday("sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("Saturday"), Some(Weekday::Sat));
        assert_eq!(parse_weekday("funday"), None);
    }
}
