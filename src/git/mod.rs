//! Thin driver over the `git` binary.
//!
//! All git invocations in this crate go through [`run`] / [`run_checked`] so
//! that logging and error formatting stay in one place, mirroring the
//! teacher crate's rule that `shell_exec::run` is "the only way to run
//! external commands."  Unlike the teacher, we invoke `git` directly rather
//! than through a user shell: every argument here is either a literal or a
//! value we already control, so there is no quoting to get right and no
//! shell to escape through.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

use anyhow::{Context, Result};

use crate::error::WtError;

/// Git env vars that must never leak in from the parent process. A `wt`
/// invocation running inside e.g. a pre-commit hook can inherit `GIT_DIR`/
/// `GIT_INDEX_FILE` pointed at an unrelated repository; every subprocess we
/// spawn strips them so `cwd` is always the sole source of truth.
const SCRUBBED_ENV_VARS: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_COMMON_DIR",
];

/// Run `git` with the given args in `cwd`, returning the raw [`Output`].
///
/// Logs `$ git <args> [cwd]` at debug level and a timing trace line after
/// completion, the same shape the teacher's `shell_exec::run` emits.
pub fn run(cwd: &Path, args: &[&str]) -> Result<Output> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(cwd);
    for var in SCRUBBED_ENV_VARS {
        cmd.env_remove(var);
    }

    log::debug!("$ git {} [{}]", args.join(" "), cwd.display());
    let t0 = Instant::now();
    let output = cmd
        .output()
        .with_context(|| format!("failed to spawn git {}", args.join(" ")))?;
    log::debug!(
        "[wt-trace] cwd={} cmd=\"git {}\" dur={:.1}ms ok={}",
        cwd.display(),
        args.join(" "),
        t0.elapsed().as_secs_f64() * 1000.0,
        output.status.success()
    );
    Ok(output)
}

/// Run `git` and fail with [`WtError::GitOperation`] if it exits non-zero.
pub fn run_checked(cwd: &Path, args: &[&str]) -> Result<Output> {
    let output = run(cwd, args)?;
    if !output.status.success() {
        return Err(WtError::GitOperation {
            op: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(output)
}

/// Run `git` and return trimmed stdout as a `String`, failing on non-zero exit.
fn stdout_checked(cwd: &Path, args: &[&str]) -> Result<String> {
    let output = run_checked(cwd, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A single worktree line out of `git worktree list --porcelain`.
#[derive(Debug, Clone)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub detached: bool,
}

/// Resolve the repository's common git dir (shared across all worktrees).
///
/// Grounded on the teacher's `Repository::resolve_git_common_dir`, which
/// canonicalizes via `dunce::canonicalize` to sidestep `\\?\`-prefixed
/// paths on Windows.
pub fn git_common_dir(cwd: &Path) -> Result<PathBuf> {
    let raw = stdout_checked(cwd, &["rev-parse", "--git-common-dir"])?;
    let path = if Path::new(&raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        cwd.join(raw)
    };
    dunce::canonicalize(&path).with_context(|| format!("failed to canonicalize {}", path.display()))
}

/// The top-level working directory of the *main* repository (not the
/// worktree `cwd` is inside). Falls back to the common dir's parent when
/// `git rev-parse --show-toplevel` can't be used (e.g. bare repos).
pub fn main_repo_root(cwd: &Path) -> Result<PathBuf> {
    let common_dir = git_common_dir(cwd)?;
    // `.git` for a normal repo; for worktrees `--git-common-dir` already
    // points at the main repo's `.git`, so its parent is the root we want.
    if common_dir.file_name().and_then(|n| n.to_str()) == Some(".git") {
        if let Some(parent) = common_dir.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    Err(WtError::NotGitRepository.into())
}

/// The working-tree root that `cwd` belongs to (may be a linked worktree,
/// unlike [`main_repo_root`]). Used to resolve a `wt merge` invocation from
/// a subdirectory of the feature worktree back to its `.wt/worktree.json`.
pub fn show_toplevel(cwd: &Path) -> Result<PathBuf> {
    let raw = stdout_checked(cwd, &["rev-parse", "--show-toplevel"])?;
    dunce::canonicalize(&raw).with_context(|| format!("failed to canonicalize {raw}"))
}

/// Verify `cwd` is inside a git repository at all.
pub fn is_inside_repo(cwd: &Path) -> bool {
    run(cwd, &["rev-parse", "--is-inside-work-tree"])
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Current branch name, or `None` if HEAD is detached.
pub fn current_branch(cwd: &Path) -> Result<Option<String>> {
    let name = stdout_checked(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if name == "HEAD" {
        Ok(None)
    } else {
        Ok(Some(name))
    }
}

/// True if the working tree has any uncommitted changes (tracked or untracked).
pub fn is_dirty(cwd: &Path) -> Result<bool> {
    let out = stdout_checked(cwd, &["status", "--porcelain"])?;
    Ok(!out.is_empty())
}

/// True if the working tree has uncommitted changes to *tracked* files,
/// ignoring untracked files. Used by the merge pre-flight check, which
/// cares about committed-vs-working-tree drift rather than scratch files.
pub fn has_uncommitted_tracked_changes(cwd: &Path) -> Result<bool> {
    let out = stdout_checked(cwd, &["status", "--porcelain", "--untracked-files=no"])?;
    Ok(!out.is_empty())
}

/// Files touched relative to `HEAD`: the union of unstaged changes, staged
/// changes, and untracked files that `.gitignore` does not exclude.
/// De-duplicated; order is whatever `git status` returns in (callers that
/// need a stable order should sort).
///
/// Used by `create --with-changes` to migrate in-progress work into a fresh
/// worktree, so untracked scratch files are deliberately included.
pub fn changed_files(cwd: &Path) -> Result<Vec<String>> {
    let out = stdout_checked(cwd, &["status", "--porcelain"])?;
    let mut files: Vec<String> = out
        .lines()
        .filter_map(|line| line.get(3..).map(|s| s.trim().to_string()))
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

/// Parse `git worktree list --porcelain` output.
pub fn worktree_list(cwd: &Path) -> Result<Vec<WorktreeEntry>> {
    let out = stdout_checked(cwd, &["worktree", "list", "--porcelain"])?;
    let mut entries = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;
    let mut detached = false;

    for line in out.lines() {
        if let Some(rest) = line.strip_prefix("worktree ") {
            if let Some(p) = path.take() {
                entries.push(WorktreeEntry { path: p, branch: branch.take(), detached });
            }
            path = Some(PathBuf::from(rest));
            detached = false;
        } else if let Some(rest) = line.strip_prefix("branch ") {
            branch = Some(rest.trim_start_matches("refs/heads/").to_string());
        } else if line == "detached" {
            detached = true;
        }
    }
    if let Some(p) = path.take() {
        entries.push(WorktreeEntry { path: p, branch, detached });
    }
    Ok(entries)
}

/// Find the worktree already checked out on `branch`, if any.
pub fn find_worktree_for_branch(cwd: &Path, branch: &str) -> Result<Option<WorktreeEntry>> {
    Ok(worktree_list(cwd)?
        .into_iter()
        .find(|w| w.branch.as_deref() == Some(branch)))
}

pub fn branch_exists(cwd: &Path, branch: &str) -> Result<bool> {
    let out = run(cwd, &["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])?;
    Ok(out.status.success())
}

pub fn create_branch(cwd: &Path, branch: &str, base: &str) -> Result<()> {
    run_checked(cwd, &["branch", branch, base])?;
    Ok(())
}

pub fn delete_branch(cwd: &Path, branch: &str, force: bool) -> Result<()> {
    let flag = if force { "-D" } else { "-d" };
    run_checked(cwd, &["branch", flag, branch])?;
    Ok(())
}

/// `git worktree add <path> -b <branch> <base>` (new branch) or
/// `git worktree add <path> <branch>` (existing branch), run from the
/// main repo root so relative worktree paths resolve predictably.
pub fn worktree_add(repo_root: &Path, worktree_path: &Path, branch: &str, base: Option<&str>) -> Result<()> {
    let path_str = worktree_path.to_string_lossy().into_owned();
    let args: Vec<&str> = match base {
        Some(base) => vec!["worktree", "add", &path_str, "-b", branch, base],
        None => vec!["worktree", "add", &path_str, branch],
    };
    run_checked(repo_root, &args)?;
    Ok(())
}

pub fn worktree_remove(repo_root: &Path, worktree_path: &Path, force: bool) -> Result<()> {
    let path_str = worktree_path.to_string_lossy().into_owned();
    let mut args = vec!["worktree", "remove"];
    if force {
        args.push("--force");
    }
    args.push(&path_str);
    run_checked(repo_root, &args)?;
    Ok(())
}

pub fn worktree_prune(repo_root: &Path) -> Result<()> {
    run_checked(repo_root, &["worktree", "prune"])?;
    Ok(())
}

/// Rebase the worktree at `cwd` onto `onto`. On conflict, returns
/// `Ok(Some(conflicting_files))` without aborting, leaving the rebase
/// in-progress for the caller to report; the caller decides whether to
/// `rebase_abort` or let the user resolve manually.
pub fn rebase_onto(cwd: &Path, onto: &str) -> Result<Option<Vec<String>>> {
    let output = run(cwd, &["rebase", onto])?;
    if output.status.success() {
        return Ok(None);
    }
    let conflicts = conflicting_files(cwd)?;
    if conflicts.is_empty() {
        // Non-conflict failure (e.g. missing ref); surface as a normal git error.
        return Err(WtError::GitOperation {
            op: format!("rebase {onto}"),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(Some(conflicts))
}

pub fn rebase_abort(cwd: &Path) -> Result<()> {
    run_checked(cwd, &["rebase", "--abort"])?;
    Ok(())
}

pub fn conflicting_files(cwd: &Path) -> Result<Vec<String>> {
    let out = stdout_checked(cwd, &["diff", "--name-only", "--diff-filter=U"])?;
    Ok(out.lines().map(str::to_string).collect())
}

/// Fast-forward `target_branch` in `repo_root`'s working tree (typically
/// the main worktree) to `source_branch`, via `merge --ff-only`.
pub fn fast_forward_merge(repo_root: &Path, source_branch: &str) -> Result<()> {
    run_checked(repo_root, &["merge", "--ff-only", source_branch])?;
    Ok(())
}

/// Fast-forward `dst` to `src` without checking either branch out, via
/// `git push . src:dst` run inside `cwd` (the feature worktree). Git refuses
/// this non-atomically only when `dst` is checked out somewhere else, so
/// callers must route through [`fast_forward_merge`] in that case instead.
/// Fails (non-zero exit) if `dst` is not a fast-forward of `src`, which the
/// merge engine treats as "the target moved, retry."
pub fn push_local(cwd: &Path, src: &str, dst: &str) -> Result<()> {
    run_checked(cwd, &["push", ".", &format!("{src}:{dst}")])?;
    Ok(())
}

/// True when `source_branch` is a descendant of `target_branch` (already merged).
pub fn is_ancestor(cwd: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
    let out = run(cwd, &["merge-base", "--is-ancestor", ancestor, descendant])?;
    Ok(out.status.success())
}

/// Number of commits reachable from `head` but not `base`.
pub fn commits_ahead(cwd: &Path, base: &str, head: &str) -> Result<usize> {
    let out = stdout_checked(cwd, &["rev-list", "--count", &format!("{base}..{head}")])?;
    out.parse().context("git rev-list did not return a number")
}

/// Which branch `cwd`'s worktree currently has checked out, resolved to a
/// `main_repo_root`-relative check: true if HEAD is on `branch`.
pub fn checked_out_branch_is(cwd: &Path, branch: &str) -> Result<bool> {
    Ok(current_branch(cwd)?.as_deref() == Some(branch))
}
