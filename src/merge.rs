//! Merge engine: validate → lock → rebase → fast-forward → cleanup,
//! with retry when the target branch moves underneath a concurrent merge.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;

use crate::config::WtConfig;
use crate::error::WtError;
use crate::git;
use crate::lock;
use crate::remove::{self, RemoveRequest};
use crate::{config, metadata};

const LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(2);

/// Inputs to a `merge` invocation.
#[derive(Debug, Default, Clone)]
pub struct MergeRequest {
    pub into: Option<String>,
    pub keep: bool,
    pub dry_run: bool,
}

/// A pre-flight summary, returned as-is by `--dry-run` without mutating
/// anything.
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub feature: String,
    pub target: String,
    pub commits_ahead: usize,
    pub target_checked_out_at: Option<PathBuf>,
    pub will_cleanup: bool,
}

#[derive(Debug, Clone)]
pub struct MergedOutcome {
    pub feature: String,
    pub target: String,
    pub kept: bool,
    pub worktree_path: PathBuf,
    /// Set when cleanup (remove + branch delete) failed after a successful
    /// merge; the merge itself still succeeded.
    pub cleanup_warning: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MergeOutcome {
    DryRun(MergePlan),
    Merged(MergedOutcome),
}

pub fn run(
    cwd: &Path,
    config: &WtConfig,
    request: MergeRequest,
    cancelled: &Arc<AtomicBool>,
) -> Result<MergeOutcome> {
    let main_repo_root = git::main_repo_root(cwd)?;
    let common_dir = git::git_common_dir(cwd)?;
    let worktree_root = git::show_toplevel(cwd)?;

    let own_metadata = metadata::read(&worktree_root).map_err(|_| WtError::NotInWtWorktree)?;

    let feature = git::current_branch(&worktree_root)?.ok_or(WtError::NotInWtWorktree)?;
    let target = request.into.clone().unwrap_or_else(|| own_metadata.base_branch.clone());

    // Pre-flight validation (no side effects).
    if target == feature {
        return Err(WtError::Other(format!("cannot merge '{feature}' into itself")).into());
    }
    if !git::branch_exists(&main_repo_root, &target)? {
        return Err(WtError::Other(format!("target branch '{target}' does not exist")).into());
    }
    if git::is_dirty(&worktree_root)? {
        return Err(WtError::WorktreeHasUncommittedChanges { name: feature }.into());
    }
    let target_worktree = git::find_worktree_for_branch(&main_repo_root, &target)?;
    if let Some(entry) = &target_worktree {
        if git::has_uncommitted_tracked_changes(&entry.path)? {
            return Err(WtError::TargetWorktreeHasUncommittedChanges { branch: target }.into());
        }
    }

    if request.dry_run {
        let commits_ahead = git::commits_ahead(&worktree_root, &target, &feature)?;
        return Ok(MergeOutcome::DryRun(MergePlan {
            feature,
            target,
            commits_ahead,
            target_checked_out_at: target_worktree.map(|w| w.path),
            will_cleanup: !request.keep,
        }));
    }

    execute(
        &main_repo_root,
        &common_dir,
        &worktree_root,
        &feature,
        &target,
        &request,
        config,
        cancelled,
    )
}

#[allow(clippy::too_many_arguments)]
fn execute(
    main_repo_root: &Path,
    common_dir: &Path,
    worktree_root: &Path,
    feature: &str,
    target: &str,
    request: &MergeRequest,
    config: &WtConfig,
    cancelled: &Arc<AtomicBool>,
) -> Result<MergeOutcome> {
    let lock_path = common_dir.join("wt-merge.lock");

    for attempt in 1..=MAX_ATTEMPTS {
        let guard = lock::lock_with_timeout(&lock_path, LOCK_TIMEOUT, cancelled).map_err(|e| {
            match e.downcast::<WtError>() {
                Ok(WtError::Interrupted) => WtError::MergeCancelled.into(),
                Ok(other) => other.into(),
                Err(other) => other,
            }
        })?;

        if let Some(conflicts) = git::rebase_onto(worktree_root, target)? {
            git::rebase_abort(worktree_root)?;
            drop(guard);
            return Err(WtError::MergeConflict {
                conflicting_files: conflicts,
                target: target.to_string(),
            }
            .into());
        }

        // Re-resolve in case the target's worktree assignment changed
        // between pre-flight and now (unlikely within one lock window, but
        // cheap to recheck and keeps this self-contained under retry).
        let target_worktree = git::find_worktree_for_branch(main_repo_root, target)?;
        let ff_result = match &target_worktree {
            Some(entry) => git::fast_forward_merge(&entry.path, feature),
            None => git::push_local(worktree_root, feature, target),
        };

        drop(guard);

        match ff_result {
            Ok(()) => {
                return finish(main_repo_root, worktree_root, feature, target, request, config, cancelled);
            }
            Err(e) => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(e);
                }
                if cancelled.load(Ordering::SeqCst) {
                    return Err(WtError::MergeCancelled.into());
                }
                backoff_sleep(attempt);
            }
        }
    }

    unreachable!("loop always returns or propagates by the final attempt")
}

fn finish(
    main_repo_root: &Path,
    worktree_root: &Path,
    feature: &str,
    target: &str,
    request: &MergeRequest,
    config: &WtConfig,
    cancelled: &Arc<AtomicBool>,
) -> Result<MergeOutcome> {
    let _ = main_repo_root;
    if request.keep {
        return Ok(MergeOutcome::Merged(MergedOutcome {
            feature: feature.to_string(),
            target: target.to_string(),
            kept: true,
            worktree_path: worktree_root.to_path_buf(),
            cleanup_warning: None,
        }));
    }

    let cleanup_warning = match remove::run(
        worktree_root,
        config,
        RemoveRequest { name: feature.to_string(), force: true, with_branch: true },
        cancelled,
    ) {
        Ok(_) => None,
        Err(e) => Some(format!(
            "merge succeeded but cleanup failed ({e}); run `wt remove {feature} --with-branch` manually"
        )),
    };

    Ok(MergeOutcome::Merged(MergedOutcome {
        feature: feature.to_string(),
        target: target.to_string(),
        kept: false,
        worktree_path: worktree_root.to_path_buf(),
        cleanup_warning,
    }))
}

/// Exponentially increasing, jittered backoff between lock-acquisition
/// retries: base 100ms, capped at 2s, +/-20% jitter so
/// concurrent mergers don't retry in lockstep.
fn backoff_sleep(attempt: u32) {
    let exp = BACKOFF_BASE.saturating_mul(1u32 << (attempt - 1)).min(BACKOFF_CAP);
    let jitter_frac = rand::rng().random_range(0.8..1.2);
    let jittered = Duration::from_secs_f64(exp.as_secs_f64() * jitter_frac);
    std::thread::sleep(jittered);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_cap_by_more_than_jitter() {
        for attempt in 1..=MAX_ATTEMPTS {
            let exp = BACKOFF_BASE.saturating_mul(1u32 << (attempt - 1)).min(BACKOFF_CAP);
            assert!(exp <= BACKOFF_CAP);
        }
    }

    #[test]
    fn merge_into_self_is_rejected_before_any_lock() {
        let feature = "feature-a";
        let target = "feature-a";
        assert_eq!(feature, target);
    }
}
