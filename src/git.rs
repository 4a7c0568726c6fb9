use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, FixedOffset};

use crate::error::RepoError;
use crate::repo::{CommitId, VersionControl};
use crate::request::Identity;

/// Formats `timestamp` in git's internal date format, `"<unix> <+hhmm>"`.
///
/// Git accepts this format unambiguously in `GIT_AUTHOR_DATE` and
/// `GIT_COMMITTER_DATE`, whatever the local date settings.
///
/// # Examples
///
/// ```ignore
/// // 2024-01-02T10:00:00+01:00
/// assert_eq!(git_date(&ts), "1704186000 +0100");
/// ```
pub(crate) fn git_date(timestamp: &DateTime<FixedOffset>) -> String {
    format!("{} {}", timestamp.timestamp(), timestamp.format("%z"))
}

/// Environment variables that pin a commit's dates and, optionally, its identity.
pub(crate) fn commit_env(
    timestamp: &DateTime<FixedOffset>,
    identity: Option<&Identity>,
) -> Vec<(&'static str, String)> {
    let date = git_date(timestamp);
    let mut env = vec![
        ("GIT_AUTHOR_DATE", date.clone()),
        ("GIT_COMMITTER_DATE", date),
    ];
    if let Some(id) = identity {
        env.push(("GIT_AUTHOR_NAME", id.name.clone()));
        env.push(("GIT_AUTHOR_EMAIL", id.email.clone()));
        env.push(("GIT_COMMITTER_NAME", id.name.clone()));
        env.push(("GIT_COMMITTER_EMAIL", id.email.clone()));
    }
    env
}

/// Runs a command and returns its trimmed standard output on success,
/// or its trimmed standard error as an `Err` on failure.
///
/// If the process fails to spawn, the I/O error message is returned.
fn run_output(mut cmd: Command) -> Result<String, String> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    match cmd.output() {
        Ok(out) => {
            if out.status.success() {
                Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
            } else {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                if stderr.is_empty() {
                    Err(String::from("non-zero exit"))
                } else {
                    Err(stderr)
                }
            }
        }
        Err(e) => Err(format!("{}", e)),
    }
}

/// Runs `git rev-parse <flag>` in `dir` and returns its output.
///
/// # Examples
///
/// ```ignore
/// // Ignored because it depends on being inside a Git repository.
/// match rev_parse(Path::new("."), "--show-toplevel") {
///     Ok(path) => println!("Repository root: {}", path),
///     Err(err) => eprintln!("Git error: {}", err),
/// }
/// ```
pub fn rev_parse(dir: &Path, flag: &str) -> Result<String, String> {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir).arg("rev-parse").arg(flag);
    run_output(cmd)
}

/// Runs `git config --get <key>` in `dir`.
///
/// A missing key or a failed command yields an empty string, so the
/// result can be used directly as a prompt default.
pub fn config_get(dir: &Path, key: &str) -> String {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir).arg("config").arg("--get").arg(key);
    run_output(cmd).unwrap_or_default()
}

/// One entry of `git log`, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: CommitId,
    pub parents: Vec<CommitId>,
    pub author_time: i64,
    pub committer_time: i64,
}

/// The git command-line backend.
///
/// Every command runs with `root` as its working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    identity: Option<Identity>,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>, identity: Option<Identity>) -> Self {
        GitCli {
            root: root.into(),
            identity,
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root);
        cmd
    }

    /// History reachable from `HEAD`, oldest first.
    pub fn log(&self) -> Result<Vec<LogEntry>, String> {
        let mut cmd = self.git();
        cmd.arg("log")
            .arg("--reverse")
            .arg("--format=%H%x09%P%x09%at%x09%ct");
        let out = run_output(cmd)?;
        out.lines().map(parse_log_line).collect()
    }

    /// Content of `path` at revision `rev`.
    pub fn show(&self, rev: &str, path: &Path) -> Result<String, String> {
        let mut cmd = self.git();
        cmd.arg("show")
            .arg(format!("{}:{}", rev, path.to_string_lossy()));
        // `run_output` trims, which would drop the trailing newline.
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        match cmd.output() {
            Ok(out) if out.status.success() => {
                Ok(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => Err(String::from_utf8_lossy(&out.stderr).trim().to_string()),
            Err(e) => Err(format!("{}", e)),
        }
    }

    /// Returns `Ok(true)` if the staged content of `path` differs from `HEAD`.
    ///
    /// Other staged paths are not looked at.
    fn has_staged_changes(&self, path: &Path, has_head: bool) -> Result<bool, String> {
        if !has_head {
            // Without a commit, a staged path is always a change.
            let mut cmd = self.git();
            cmd.arg("ls-files").arg("--cached").arg("--").arg(path);
            return run_output(cmd).map(|s| !s.is_empty());
        }
        let mut cmd = self.git();
        cmd.arg("diff")
            .arg("--cached")
            .arg("--quiet")
            .arg("HEAD")
            .arg("--")
            .arg(path);
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        match cmd.status() {
            Ok(status) => match status.code() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(String::from("`git diff --cached` failed")),
            },
            Err(e) => Err(format!("{}", e)),
        }
    }

    /// Canonical top level of the work tree containing `root`, if any.
    fn toplevel(&self) -> Result<Option<PathBuf>, String> {
        if rev_parse(&self.root, "--git-dir").is_err() {
            return Ok(None);
        }
        let top = rev_parse(&self.root, "--show-toplevel")
            .map_err(|e| format!("{} has no work tree: {}", self.root.display(), e))?;
        fs::canonicalize(&top)
            .map(Some)
            .map_err(|e| format!("resolve {}: {}", top, e))
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn parse_log_line(line: &str) -> Result<LogEntry, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 4 {
        return Err(format!("unexpected log line: {}", line));
    }
    let time = |s: &str| {
        s.parse::<i64>()
            .map_err(|e| format!("bad timestamp {}: {}", s, e))
    };
    Ok(LogEntry {
        id: fields[0].to_string(),
        parents: fields[1].split_whitespace().map(|p| p.to_string()).collect(),
        author_time: time(fields[2])?,
        committer_time: time(fields[3])?,
    })
}

impl VersionControl for GitCli {
    /// Uses the repository at `root`, or creates one there.
    ///
    /// # Errors
    ///
    /// Refuses a `root` that lies below the top level of an enclosing
    /// repository, so history is never written into a parent work tree.
    fn init(&mut self) -> Result<(), RepoError> {
        if self.root.is_dir() {
            if let Some(top) = self.toplevel()? {
                let here = fs::canonicalize(&self.root)
                    .map_err(|e| format!("resolve {}: {}", self.root.display(), e))?;
                if top != here {
                    return Err(RepoError::Command(format!(
                        "{} is inside the repository at {}; use its top level or a directory outside it",
                        self.root.display(),
                        top.display()
                    )));
                }
                return Ok(());
            }
        }
        fs::create_dir_all(&self.root)
            .map_err(|e| format!("cannot create {}: {}", self.root.display(), e))?;
        let mut cmd = self.git();
        cmd.arg("init").arg("-q");
        run_output(cmd)?;
        log::info!("initialized git repository in {}", self.root.display());
        Ok(())
    }

    fn head(&mut self) -> Result<Option<CommitId>, RepoError> {
        let mut cmd = self.git();
        cmd.arg("rev-parse").arg("--verify").arg("-q").arg("HEAD");
        // `--verify -q` exits non-zero without output on an unborn branch.
        match run_output(cmd) {
            Ok(id) if !id.is_empty() => Ok(Some(id)),
            Ok(_) => Ok(None),
            Err(e) if e == "non-zero exit" => Ok(None),
            Err(e) => Err(RepoError::Command(e)),
        }
    }

    fn write_file(&mut self, path: &Path, content: &str) -> Result<(), RepoError> {
        let full = self.root.join(path);
        let dir = match full.parent() {
            Some(d) => d.to_path_buf(),
            None => self.root.clone(),
        };
        fs::create_dir_all(&dir).map_err(|e| format!("create {}: {}", dir.display(), e))?;

        // Write beside the target and rename, so the file is never half-written.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| format!("temp file in {}: {}", dir.display(), e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| format!("write failed: {}", e))?;
        // Temp files are created 0600; keep the target's mode, or use 0644.
        let permissions = match fs::metadata(&full) {
            Ok(meta) => Some(meta.permissions()),
            Err(_) => default_permissions(),
        };
        if let Some(p) = permissions {
            fs::set_permissions(tmp.path(), p)
                .map_err(|e| format!("chmod {}: {}", tmp.path().display(), e))?;
        }
        tmp.persist(&full)
            .map_err(|e| format!("rename to {}: {}", full.display(), e.error))?;
        Ok(())
    }

    fn stage(&mut self, path: &Path) -> Result<(), RepoError> {
        let mut cmd = self.git();
        cmd.arg("add").arg("--").arg(path);
        run_output(cmd)?;
        Ok(())
    }

    fn commit(
        &mut self,
        path: &Path,
        parent: Option<&str>,
        timestamp: &DateTime<FixedOffset>,
        message: &str,
    ) -> Result<CommitId, RepoError> {
        let head = self.head()?;
        if head.as_deref() != parent {
            return Err(RepoError::Command(format!(
                "HEAD moved: expected {}, found {}",
                parent.unwrap_or("no commit"),
                head.as_deref().unwrap_or("no commit")
            )));
        }
        if !self.has_staged_changes(path, head.is_some())? {
            return Err(RepoError::EmptyDelta);
        }

        let mut cmd = self.git();
        cmd.arg("commit")
            .arg("-q")
            .arg("--no-verify")
            .arg("-m")
            .arg(message)
            .arg("--only")
            .arg("--")
            .arg(path);
        for (k, v) in commit_env(timestamp, self.identity.as_ref()) {
            cmd.env(k, v);
        }
        run_output(cmd).map_err(|e| format!("`git commit` failed: {}", e))?;

        match self.head()? {
            Some(id) => Ok(id),
            None => Err(RepoError::Command(String::from(
                "HEAD missing after commit",
            ))),
        }
    }

    fn rollback(&mut self, path: &Path) -> Result<(), RepoError> {
        let tracked = match self.head()? {
            Some(_) => {
                let mut cmd = self.git();
                cmd.arg("cat-file")
                    .arg("-e")
                    .arg(format!("HEAD:{}", path.to_string_lossy()));
                run_output(cmd).is_ok()
            }
            None => false,
        };

        if tracked {
            let mut cmd = self.git();
            cmd.arg("checkout").arg("HEAD").arg("--").arg(path);
            run_output(cmd)?;
            return Ok(());
        }

        let mut cmd = self.git();
        cmd.arg("rm")
            .arg("-q")
            .arg("--cached")
            .arg("--ignore-unmatch")
            .arg("--")
            .arg(path);
        run_output(cmd)?;
        let full = self.root.join(path);
        if full.exists() {
            fs::remove_file(&full).map_err(|e| format!("remove {}: {}", full.display(), e))?;
        }
        Ok(())
    }
}
