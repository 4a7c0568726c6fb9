use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};

use crate::request::{DEFAULT_MAX_COMMITS_PER_DAY, DEFAULT_WORK_HOURS, Identity, parse_weekday};

pub const DEFAULT_DAYS: u32 = 365;
pub const DEFAULT_OFF_FRACTION: f64 = 0.2;

/// Everything the CLI was asked to do.
///
/// Flags win over `GIT_ROCKSTAR_*` environment variables, which win over
/// the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Path of the final content, `-` for stdin.
    pub code: Option<String>,
    pub file_name: Option<String>,
    pub days: u32,
    pub off_fraction: f64,
    pub seed: Option<u64>,
    pub end: Option<NaiveDate>,
    pub days_off: Vec<Weekday>,
    pub max_per_day: u32,
    pub hours: (u32, u32),
    pub messages: Vec<String>,
    pub author: Option<Identity>,
    pub repo: PathBuf,
    pub dry_run: bool,
    pub assume_yes: bool,
    pub help: bool,
    pub version: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            code: None,
            file_name: None,
            days: DEFAULT_DAYS,
            off_fraction: DEFAULT_OFF_FRACTION,
            seed: None,
            end: None,
            days_off: Vec::new(),
            max_per_day: DEFAULT_MAX_COMMITS_PER_DAY,
            hours: DEFAULT_WORK_HOURS,
            messages: Vec::new(),
            author: None,
            repo: PathBuf::from("."),
            dry_run: false,
            assume_yes: false,
            help: false,
            version: false,
        }
    }
}

impl Settings {
    /// Reads the process arguments and environment.
    pub fn load() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::parse(&args, |k| std::env::var(k).ok())
    }

    /// Builds settings from `args` (without the program name) and an
    /// environment lookup.
    pub fn parse<E>(args: &[String], env: E) -> Result<Self, String>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        s.apply_env(&env)?;

        let mut it = args.iter();
        while let Some(arg) = it.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f, Some(v.to_string())),
                _ => (arg.as_str(), None),
            };
            let mut value = |name: &str| -> Result<String, String> {
                match inline.clone() {
                    Some(v) => Ok(v),
                    None => it
                        .next()
                        .cloned()
                        .ok_or_else(|| format!("{} requires a value", name)),
                }
            };

            match flag {
                "-h" | "--help" => s.help = true,
                "-V" | "--version" => s.version = true,
                "--dry-run" => s.dry_run = true,
                "-y" | "--yes" => s.assume_yes = true,
                "--code" => s.code = Some(value(flag)?),
                "--file-name" => s.file_name = Some(value(flag)?),
                "--days" => s.days = parse_days(&value(flag)?, flag)?,
                "--off-fraction" => s.off_fraction = parse_number(&value(flag)?, flag)?,
                "--seed" => s.seed = Some(parse_number(&value(flag)?, flag)?),
                "--end" => s.end = Some(parse_date(&value(flag)?)?),
                "--days-off" => s.days_off = parse_days_off(&value(flag)?)?,
                "--max-per-day" => s.max_per_day = parse_number(&value(flag)?, flag)?,
                "--hours" => s.hours = parse_hours(&value(flag)?)?,
                "--message" => s.messages.push(value(flag)?),
                "--author" => {
                    let raw = value(flag)?;
                    s.author = Some(
                        Identity::parse(&raw)
                            .ok_or_else(|| format!("--author expects \"Name <email>\", got {}", raw))?,
                    );
                }
                "--repo" => s.repo = PathBuf::from(value(flag)?),
                other => return Err(format!("unknown argument: {}", other)),
            }
        }

        Ok(s)
    }

    fn apply_env<E>(&mut self, env: &E) -> Result<(), String>
    where
        E: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("GIT_ROCKSTAR_DAYS") {
            self.days = parse_days(&v, "GIT_ROCKSTAR_DAYS")?;
        }
        if let Some(v) = env("GIT_ROCKSTAR_OFF_FRACTION") {
            self.off_fraction = parse_number(&v, "GIT_ROCKSTAR_OFF_FRACTION")?;
        }
        if let Some(v) = env("GIT_ROCKSTAR_SEED") {
            self.seed = Some(parse_number(&v, "GIT_ROCKSTAR_SEED")?);
        }
        if let Some(v) = env("GIT_ROCKSTAR_MAX_PER_DAY") {
            self.max_per_day = parse_number(&v, "GIT_ROCKSTAR_MAX_PER_DAY")?;
        }
        if let Some(v) = env("GIT_ROCKSTAR_HOURS") {
            self.hours = parse_hours(&v)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, String> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("{} expects a number, got {}", name, raw))
}

fn parse_days(raw: &str, name: &str) -> Result<u32, String> {
    let days: u32 = parse_number(raw, name)?;
    if days == 0 {
        return Err(format!("{} must be positive", name));
    }
    Ok(days)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("--end expects YYYY-MM-DD, got {} ({})", raw, e))
}

/// Parses a comma-separated weekday list such as `sat,sun`.
fn parse_days_off(raw: &str) -> Result<Vec<Weekday>, String> {
    raw.split(',')
        .filter(|d| !d.trim().is_empty())
        .map(|d| parse_weekday(d).ok_or_else(|| format!("unknown weekday: {}", d.trim())))
        .collect()
}

/// Parses an hour window such as `9-23`.
fn parse_hours(raw: &str) -> Result<(u32, u32), String> {
    let (a, b) = raw
        .split_once('-')
        .ok_or_else(|| format!("hours expect START-END, got {}", raw))?;
    let start: u32 = parse_number(a, "hours")?;
    let end: u32 = parse_number(b, "hours")?;
    if start >= end || end > 24 {
        return Err(format!("invalid hour window {}", raw));
    }
    Ok((start, end))
}
