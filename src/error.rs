//! Structured error types for the worktree engine.
//!
//! A plain enum with a hand-written `Display` impl (no `thiserror`), wrapped
//! in `anyhow::Error` at the call site so engines can still use `?` freely
//! while callers can downcast to recover structured detail (e.g. the CLI
//! maps `WtError::Interrupted` to exit code 130).

use std::fmt;
use std::path::PathBuf;

/// Errors surfaced by the worktree lifecycle engine.
#[derive(Debug)]
pub enum WtError {
    /// The resolved directory is not inside a git repository.
    NotGitRepository,
    /// The config file at the given path could not be parsed.
    ConfigInvalid { path: PathBuf, message: String },
    /// No worktree matches the given name or agent_id.
    WorktreeNotFound { name: String },
    /// The requested name collides with an existing name or agent_id.
    NameInUse { name: String },
    /// The name generator could not find a free name after 10 tries.
    NameGenerationExhausted,
    /// The worktree has uncommitted changes and `--force` was not given.
    WorktreeHasUncommittedChanges { name: String },
    /// The merge target's worktree has uncommitted tracked changes.
    TargetWorktreeHasUncommittedChanges { branch: String },
    /// A hook file exists but is not executable.
    HookNotExecutable { path: PathBuf },
    /// A hook exited with a non-zero status.
    HookFailed { name: String, code: i32 },
    /// A hook ran longer than the hard timeout.
    HookTimeout { name: String },
    /// A rebase produced conflicts.
    MergeConflict {
        conflicting_files: Vec<String>,
        target: String,
    },
    /// A merge was cancelled while waiting on the merge lock.
    MergeCancelled,
    /// The invoking directory is not a worktree managed by this tool.
    NotInWtWorktree,
    /// Lock acquisition did not complete within the allotted timeout.
    LockTimedOut { path: PathBuf },
    /// A git subprocess exited non-zero; `stderr` is already trimmed.
    GitOperation { op: String, stderr: String },
    /// The process-level signal coordinator cancelled the running operation.
    Interrupted,
    /// Two related failures occurred together (e.g. a primary failure and a
    /// rollback failure). Both are preserved and rendered, never collapsed.
    Joined {
        primary: Box<WtError>,
        secondary: Box<WtError>,
    },
    /// A validation failure that doesn't warrant its own variant (e.g. "merge
    /// target equals feature branch"). Kept distinct from the git-wrapping
    /// `GitOperation` so callers can tell "we refused" from "git refused."
    Other(String),
}

impl WtError {
    /// Combine a primary error with a rollback/secondary error, preserving both.
    pub fn join(primary: WtError, secondary: WtError) -> WtError {
        WtError::Joined {
            primary: Box::new(primary),
            secondary: Box::new(secondary),
        }
    }

    /// Downcast an arbitrary `anyhow::Error` back to a `WtError` where
    /// possible, otherwise wrap its message as [`WtError::Other`]. Used when
    /// joining a primary failure with a rollback failure that may have come
    /// from a plain `io::Error` (e.g. a failed file copy).
    pub fn from_anyhow(err: anyhow::Error) -> WtError {
        match err.downcast::<WtError>() {
            Ok(wt) => wt,
            Err(err) => WtError::Other(err.to_string()),
        }
    }
}

impl fmt::Display for WtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WtError::NotGitRepository => {
                write!(f, "not a git repository (or any parent up to the filesystem root)")
            }
            WtError::ConfigInvalid { path, message } => {
                write!(f, "invalid config at {}: {message}", path.display())
            }
            WtError::WorktreeNotFound { name } => {
                write!(f, "no worktree found for '{name}'")
            }
            WtError::NameInUse { name } => {
                write!(f, "name '{name}' is already in use by another worktree")
            }
            WtError::NameGenerationExhausted => {
                write!(f, "could not generate a unique agent id after 10 attempts")
            }
            WtError::WorktreeHasUncommittedChanges { name } => {
                write!(
                    f,
                    "worktree '{name}' has uncommitted changes; commit, stash, or rerun with --force"
                )
            }
            WtError::TargetWorktreeHasUncommittedChanges { branch } => {
                write!(
                    f,
                    "the worktree checked out on '{branch}' has uncommitted tracked changes"
                )
            }
            WtError::HookNotExecutable { path } => {
                write!(f, "hook at {} is not executable", path.display())
            }
            WtError::HookFailed { name, code } => {
                write!(f, "hook '{name}' exited with status {code}")
            }
            WtError::HookTimeout { name } => {
                write!(f, "hook '{name}' timed out after 5 minutes")
            }
            WtError::MergeConflict {
                conflicting_files,
                target,
            } => {
                write!(
                    f,
                    "rebase onto '{target}' conflicted in: {}\n\n\
                     Resolve the conflicts, then one of:\n  \
                     git add <file> && git rebase --continue && wt merge\n  \
                     git rebase --abort",
                    conflicting_files.join(", ")
                )
            }
            WtError::MergeCancelled => write!(f, "merge cancelled while waiting for the lock"),
            WtError::NotInWtWorktree => {
                write!(f, "current directory is not a wt-managed worktree")
            }
            WtError::LockTimedOut { path } => {
                write!(f, "timed out waiting for lock at {}", path.display())
            }
            WtError::GitOperation { op, stderr } => {
                if stderr.is_empty() {
                    write!(f, "git {op} failed")
                } else {
                    write!(f, "git {op} failed: {stderr}")
                }
            }
            WtError::Interrupted => write!(f, "interrupted"),
            WtError::Joined { primary, secondary } => {
                write!(f, "{primary}\n\nadditionally, cleanup failed: {secondary}")
            }
            WtError::Other(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for WtError {}

/// Exit code to use for a top-level error: 0 success, 1 any error, 130 interrupted.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<WtError>() {
        Some(WtError::Interrupted) | Some(WtError::MergeCancelled) => 130,
        Some(WtError::Joined { primary, secondary }) => {
            if is_cancellation(primary) || is_cancellation(secondary) {
                130
            } else {
                1
            }
        }
        _ => 1,
    }
}

fn is_cancellation(err: &WtError) -> bool {
    matches!(err, WtError::Interrupted | WtError::MergeCancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_and_merge_cancelled_both_exit_130() {
        assert_eq!(exit_code(&WtError::Interrupted.into()), 130);
        assert_eq!(exit_code(&WtError::MergeCancelled.into()), 130);
    }

    #[test]
    fn joined_exits_130_if_either_side_is_a_cancellation() {
        let joined = WtError::join(WtError::MergeCancelled, WtError::Other("rollback failed".into()));
        assert_eq!(exit_code(&joined.into()), 130);

        let joined = WtError::join(WtError::Other("primary failed".into()), WtError::Interrupted);
        assert_eq!(exit_code(&joined.into()), 130);
    }

    #[test]
    fn ordinary_errors_exit_1() {
        assert_eq!(exit_code(&WtError::NotGitRepository.into()), 1);
        let joined = WtError::join(WtError::NameInUse { name: "x".into() }, WtError::Other("e".into()));
        assert_eq!(exit_code(&joined.into()), 1);
    }
}
