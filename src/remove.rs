//! Remove engine: dirty-check, `pre-delete` hook, `git worktree
//! remove`, optional branch delete, prune.
//!
//! The merge engine's post-merge cleanup step is "equivalent to
//! Remove with `delete_branch = true, force = true`" and calls straight into
//! [`run`] rather than duplicating this algorithm.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::{io, path::Path};

use anyhow::Result;

use crate::config::WtConfig;
use crate::error::WtError;
use crate::git;
use crate::hook;
use crate::{config, metadata};

/// Inputs to a `remove` invocation. `with_branch` is also how the
/// merge engine's cleanup step requests unconditional branch deletion.
#[derive(Debug, Clone)]
pub struct RemoveRequest {
    pub name: String,
    pub force: bool,
    pub with_branch: bool,
}

/// The worktree was removed; these record anything that went wrong in the
/// best-effort steps that follow removal, which the caller
/// reports but which don't make the removal itself fail.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    pub path: PathBuf,
    pub branch_deleted: bool,
    pub branch_delete_error: Option<String>,
    pub prune_error: Option<String>,
}

pub fn run(
    cwd: &Path,
    config: &WtConfig,
    request: RemoveRequest,
    cancelled: &Arc<AtomicBool>,
) -> Result<RemoveOutcome> {
    // 1. Resolve main_repo_root.
    let main_repo_root = git::main_repo_root(cwd)?;

    // 2. Locate the worktree by name/agent_id.
    let base_dir = config::resolve_base_dir(&main_repo_root, config)?;
    let records = metadata::find_worktrees_in(&base_dir)?;
    let record = metadata::find_by_identifier(&records, &request.name)
        .ok_or_else(|| WtError::WorktreeNotFound { name: request.name.clone() })?
        .clone();
    let path = record.path;
    let branch = record.metadata.name.clone();

    // 3. Dirty check, unless --force.
    if !request.force && git::is_dirty(&path)? {
        return Err(WtError::WorktreeHasUncommittedChanges { name: request.name.clone() }.into());
    }

    // 4. Decide whether to delete the branch.
    let delete_branch = request.with_branch || (!request.with_branch && prompt_keep_branch(&branch)?);

    // 5. pre-delete hook; a failure aborts before any mutation.
    hook::run("pre-delete", &main_repo_root, &path, &record.metadata, cancelled)?;

    // 6. `git worktree remove`.
    git::worktree_remove(&main_repo_root, &path, request.force)?;

    // 8. Optional branch delete; captured, not fatal.
    let mut branch_delete_error = None;
    let mut branch_deleted = false;
    if delete_branch {
        match git::delete_branch(&main_repo_root, &branch, request.force) {
            Ok(()) => branch_deleted = true,
            Err(e) => branch_delete_error = Some(e.to_string()),
        }
    }

    // 9. Prune; captured, not fatal.
    let prune_error = git::worktree_prune(&main_repo_root).err().map(|e| e.to_string());

    Ok(RemoveOutcome { path, branch_deleted, branch_delete_error, prune_error })
}

/// Ask the user whether to delete the branch, only when stdin is a terminal.
/// Non-interactive invocations (scripts, agents, pipes) default to keeping
/// the branch rather than blocking on input.
fn prompt_keep_branch(branch: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }
    eprint!("Branch '{branch}' still contains all your commits. Also delete the branch? (y/N) ");
    use std::io::Write;
    io::stderr().flush().ok();

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worktree_not_found_when_name_unknown() {
        let records: Vec<metadata::WorktreeRecord> = Vec::new();
        assert!(metadata::find_by_identifier(&records, "ghost").is_none());
    }
}
