use console::{measure_text_width, style};
use std::iter;

use crate::rockstar::FabricationPlan;

/// Prints a framed, colorized summary of a planned history.
///
/// The box is sized to the widest **visible** line, using
/// [`console::measure_text_width`] so ANSI codes inside the content do not
/// skew the padding. Borders are styled separately from the content.
///
/// # Parameters
///
/// * `plan` – The history about to be written.
/// * `repo_name` – Name of the target repository, for display.
/// * `author` – Identity the commits will carry, as `Name <email>`.
/// * `dry_run` – When `true`, a highlighted notice says nothing is written.
pub fn print_banner(plan: &FabricationPlan, repo_name: &str, author: &str, dry_run: bool) {
    let lines = banner_lines(plan, repo_name, author, dry_run);

    let max_width = lines
        .iter()
        .map(|l| measure_text_width(l)) // ignore ANSI in content
        .max()
        .unwrap_or(0)
        + 2;

    let border = "═".repeat(max_width);
    let top = style(format!("╔{}╗", border)).blue().bold();
    let bottom = style(format!("╚{}╝", border)).blue().bold();
    let left = style("║ ").blue().bold().to_string();
    let right = style("║").blue().bold().to_string();

    println!();
    println!("{top}");
    for line in lines {
        let visible = measure_text_width(&line);
        let pad = max_width - visible; // includes the one space after left border
        println!("{}{}{}{}", left, line, " ".repeat(pad - 1), right);
    }
    println!("{bottom}");
    println!();
}

/// Builds the banner text: title, mode notice, then the plan figures.
///
/// Mode lines may carry ANSI styling; measure visible width, not `len()`.
fn banner_lines(plan: &FabricationPlan, repo_name: &str, author: &str, dry_run: bool) -> Vec<String> {
    let request = &plan.request;
    let days = &plan.schedule.days;

    let top = ["Fabricate commit history", ""]
        .into_iter()
        .map(|s| s.to_string());

    let mode = if dry_run {
        vec![
            style("Dry run: nothing will be written.")
                .yellow()
                .bold()
                .to_string(),
        ]
    } else {
        vec![
            style(format!("Commits will be written to {}.", repo_name))
                .cyan()
                .bold()
                .to_string(),
            style("(Use --dry-run to preview without writing.)")
                .cyan()
                .to_string(),
        ]
    }
    .into_iter();

    let off_percent = (request.off_fraction() * 100.0).round();
    let bottom = iter::once(String::new()).chain([
        format!("Target file: {}", request.target_path().display()),
        format!(
            "Span: {} .. {} ({} day(s))",
            request.start_date(),
            request.end_date(),
            request.total_days()
        ),
        format!(
            "Off days: {} ({}% requested), active days: {}",
            days.off_days.len(),
            off_percent,
            days.active_days.len()
        ),
        format!(
            "Commits: {} on {} day(s)",
            plan.commits.len(),
            plan.schedule.commit_days()
        ),
        format!("Author: {}", author),
        format!("Seed: {}", plan.seed),
    ]);

    top.chain(mode).chain(bottom).collect()
}

#[cfg(test)]
mod tests {
    use super::banner_lines;
    use crate::rockstar::RockStar;
    use chrono::{FixedOffset, NaiveDate};

    fn plan() -> crate::rockstar::FabricationPlan {
        let code: String = (1..=20).map(|i| format!("line {i}\n")).collect();
        RockStar::new(10, "newai.py", &code, 0.2)
            .with_seed(1)
            .with_end_date(NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"))
            .with_utc_offset(FixedOffset::east_opt(0).expect("offset"))
            .plan()
            .expect("plan")
    }

    #[test]
    fn banner_write_mode_lines() {
        let lines = banner_lines(&plan(), "demo", "Jane <jane@example.com>", false);
        let s = lines.join("\n");

        assert!(s.contains("Fabricate commit history"));
        assert!(s.contains("Commits will be written to demo."));
        assert!(s.contains("Target file: newai.py"));
        assert!(s.contains("Span: 2024-01-01 .. 2024-01-10 (10 day(s))"));
        assert!(s.contains("Off days: 2 (20% requested), active days: 8"));
        assert!(s.contains("Author: Jane <jane@example.com>"));
        assert!(s.contains("Seed: 1"));
    }

    #[test]
    fn banner_dry_run_lines() {
        let lines = banner_lines(&plan(), "demo", "Jane <jane@example.com>", true);
        let s = lines.join("\n");

        assert!(s.contains("Dry run: nothing will be written."));
        assert!(!s.contains("Commits will be written"));
    }
}
