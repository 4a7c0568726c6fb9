use crate::{
    banner::print_banner,
    config::Settings,
    git::{self, GitCli},
    prompt,
    request::Identity,
    rockstar::{FabricationPlan, FabricationSummary, RockStar},
};

use console::style;
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

/// Prints usage information to stdout.
fn print_help() {
    println!(
        "\
git-rockstar {}

Fabricate a plausible commit history for one file.

USAGE:
    git-rockstar --code <PATH|-> [OPTIONS]

OPTIONS:
    --code <PATH|->          Final file content (`-` reads stdin)
    --file-name <NAME>       Path written inside the repository (default: basename of --code)
    --days <N>               Length of the span in days (default: 365)
    --off-fraction <F>       Fraction of days without commits, in [0, 1) (default: 0.2)
    --seed <S>               Seed for reproducible plans
    --end <YYYY-MM-DD>       Last day of the span (default: today)
    --days-off <LIST>        Weekdays that never get commits, e.g. sat,sun
    --max-per-day <N>        Most commits on a single day (default: 4)
    --hours <START-END>      Commit time window in hours (default: 9-23)
    --message <TEMPLATE>     Commit message template; repeatable; {{file}} and {{n}} expand
    --author <\"NAME <EMAIL>\"> Commit identity (default: git config)
    --repo <DIR>             Repository top level, created if missing (default: .)
    --dry-run                Show the plan without writing anything
    -y, --yes                Do not ask for confirmation
    -h, --help               Print help information
    -V, --version            Print version information

ENVIRONMENT:
    GIT_ROCKSTAR_DAYS, GIT_ROCKSTAR_OFF_FRACTION, GIT_ROCKSTAR_SEED,
    GIT_ROCKSTAR_MAX_PER_DAY, GIT_ROCKSTAR_HOURS provide defaults for the
    matching flags. RUST_LOG controls log output (default: warn).",
        env!("CARGO_PKG_VERSION")
    );
}

/// Reads the final content from a file, or stdin for `-`.
fn read_code(source: &str) -> Result<String, String> {
    if source == "-" {
        let mut s = String::new();
        return match std::io::stdin().read_to_string(&mut s) {
            Ok(_) => Ok(s),
            Err(e) => Err(format!("cannot read stdin: {}", e)),
        };
    }
    fs::read_to_string(source).map_err(|e| format!("cannot read {}: {}", source, e))
}

/// Name of the target file: `--file-name`, or the basename of `--code`.
fn target_name(settings: &Settings, code: &str) -> Result<String, String> {
    if let Some(name) = &settings.file_name {
        return Ok(name.clone());
    }
    if code == "-" {
        return Err(String::from("--file-name is required when reading stdin"));
    }
    Path::new(code)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("cannot derive a file name from {}", code))
}

/// Display name of the repository directory.
fn repo_name(repo: &Path) -> String {
    let resolved = fs::canonicalize(repo).unwrap_or_else(|_| PathBuf::from(repo));
    resolved
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("current repository")
        .to_string()
}

/// Resolves the commit identity: `--author`, then git config, then prompts.
fn resolve_identity(settings: &Settings, repo_name: &str) -> Result<Identity, String> {
    if let Some(id) = &settings.author {
        return Ok(id.clone());
    }

    // Outside a repository, `git config` still answers from the global file.
    let dir = if settings.repo.is_dir() {
        settings.repo.clone()
    } else {
        PathBuf::from(".")
    };
    let default_name = git::config_get(&dir, "user.name");
    let default_email = git::config_get(&dir, "user.email");
    if !default_name.is_empty() && !default_email.is_empty() {
        return Ok(Identity::new(&default_name, &default_email));
    }
    if settings.assume_yes {
        return Err(String::from(
            "no git identity configured; pass --author \"Name <email>\"",
        ));
    }

    let mut prompter = prompt::DialoguerStringPrompter;
    let name = prompt::ask(&mut prompter, "Author name", repo_name, &default_name)?;
    let email = prompt::ask(&mut prompter, "Author email", repo_name, &default_email)?;
    Ok(Identity::new(&name, &email))
}

fn build_rockstar(settings: &Settings, file_name: &str, code: &str, author: Identity) -> RockStar {
    let mut star = RockStar::new(settings.days, file_name, code, settings.off_fraction)
        .with_days_off(&settings.days_off)
        .with_max_commits_per_day(settings.max_per_day)
        .with_work_hours(settings.hours.0, settings.hours.1)
        .with_messages(settings.messages.clone())
        .with_author(author);
    if let Some(seed) = settings.seed {
        star = star.with_seed(seed);
    }
    if let Some(end) = settings.end {
        star = star.with_end_date(end);
    }
    star
}

/// Lists every planned commit, one per line.
fn print_plan(plan: &FabricationPlan) {
    for c in &plan.commits {
        println!(
            "{}  {}  +{} line(s)  {}",
            style(format!("{:>4}", c.entry.index + 1)).dim(),
            c.entry.timestamp.format("%Y-%m-%d %H:%M:%S %z"),
            crate::segment::unit_count(c.snapshot.delta()),
            c.message
        );
    }
}

fn print_summary(summary: &FabricationSummary) {
    println!(
        "{}",
        style(format!(
            "✅ Made {} commit(s) on {} of {} day(s) ({} day(s) off).",
            summary.commits_made, summary.commit_days, summary.days_spanned, summary.days_skipped
        ))
        .green()
        .bold()
    );
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        println!("   First: {}  Last: {}", first, last);
    }
    if summary.merged > 0 {
        println!("   {} unchanged snapshot(s) merged.", summary.merged);
    }
    println!("   Seed: {} (pass --seed to reproduce)", summary.seed);
}

/// Main CLI entry point for `git-rockstar`.
///
/// This function:
/// 1. Parses flags and `GIT_ROCKSTAR_*` environment variables.
/// 2. Verifies that `git` is installed.
/// 3. Reads the final content and resolves the commit identity.
/// 4. Plans the history and displays it in a banner.
/// 5. Stops after printing the plan for `--dry-run`.
/// 6. Asks for confirmation unless `--yes` is given.
/// 7. Writes the commits and prints a summary.
///
/// # Exit Codes
///
/// * `0` – Success, including dry runs and a declined confirmation.
/// * Non-zero – Any failure along the way.
pub fn entry() -> Result<i32, ()> {
    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", style(format!("Error: {}", e)).red().bold());
            eprintln!("Run with --help for usage.");
            return Err(());
        }
    };

    if settings.help {
        print_help();
        return Ok(0);
    }
    if settings.version {
        println!("git-rockstar {}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }

    if which::which("git").is_err() {
        eprintln!("{}", style("Error: `git` not found in PATH.").red().bold());
        return Err(());
    }

    let fail = |msg: String| -> Result<i32, ()> {
        eprintln!("{}", style(format!("Error: {}", msg)).red().bold());
        Err(())
    };

    let source = match &settings.code {
        Some(s) => s.clone(),
        None => return fail(String::from("--code is required")),
    };
    let code = match read_code(&source) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let file_name = match target_name(&settings, &source) {
        Ok(n) => n,
        Err(e) => return fail(e),
    };

    let name = repo_name(&settings.repo);
    let author = match resolve_identity(&settings, &name) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let plan = match build_rockstar(&settings, &file_name, &code, author.clone()).plan() {
        Ok(p) => p,
        Err(e) => return fail(e.to_string()),
    };

    print_banner(&plan, &name, &author.to_string(), settings.dry_run);

    if settings.dry_run {
        print_plan(&plan);
        return Ok(0);
    }

    if !settings.assume_yes {
        let mut confirm_prompter = prompt::DialoguerConfirmPrompter;
        match prompt::confirm_start(&mut confirm_prompter, plan.commits.len(), &name) {
            Ok(true) => {}
            Ok(false) => {
                println!(
                    "{}",
                    style("Canceled by user. No changes made.").yellow().bold()
                );
                return Ok(0);
            }
            Err(e) => return fail(format!("prompt error: {}", e)),
        }
    }

    let mut git = GitCli::new(settings.repo.clone(), Some(author));
    match plan.execute(&mut git) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(0)
        }
        Err(e) => {
            eprintln!("{}", style(format!("❌ {}", e)).red().bold());
            if e.committed() > 0 {
                eprintln!(
                    "{}",
                    style(format!(
                        "{} commit(s) were written before the failure and are kept.",
                        e.committed()
                    ))
                    .yellow()
                );
            }
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_rockstar, target_name};
    use crate::config::Settings;
    use crate::request::Identity;

    #[test]
    fn file_name_defaults_to_code_basename() {
        let s = Settings::default();
        assert_eq!(target_name(&s, "some/dir/newai.py").unwrap(), "newai.py");
    }

    #[test]
    fn explicit_file_name_wins() {
        let s = Settings {
            file_name: Some(String::from("src/app.py")),
            ..Settings::default()
        };
        assert_eq!(target_name(&s, "-").unwrap(), "src/app.py");
    }

    #[test]
    fn stdin_requires_file_name() {
        let s = Settings::default();
        assert!(target_name(&s, "-").is_err());
    }

    #[test]
    fn settings_flow_into_the_request() {
        let s = Settings {
            days: 12,
            off_fraction: 0.25,
            seed: Some(3),
            max_per_day: 2,
            hours: (10, 18),
            ..Settings::default()
        };
        let star = build_rockstar(&s, "a.txt", "x\n", Identity::new("A", "a@b.c"));
        let request = star.request().unwrap();
        assert_eq!(request.total_days(), 12);
        assert_eq!(request.off_fraction(), 0.25);
        assert_eq!(request.seed(), Some(3));
        assert_eq!(request.max_commits_per_day(), 2);
        assert_eq!(request.work_hours(), (10, 18));
        assert_eq!(request.author(), Some(&Identity::new("A", "a@b.c")));
    }
}
