//! Read-only `list` view: enumerate every worktree this repository
//! knows about, sorted by `id`.

use std::path::Path;

use anyhow::Result;

use crate::config::{self, WtConfig};
use crate::git;
use crate::metadata::{self, WorktreeRecord};

/// Every live worktree of the repository `cwd` belongs to, sorted by `id`
/// ascending (`find_worktrees_in`, which already skips directories that
/// aren't wt-managed).
pub fn run(cwd: &Path, config: &WtConfig) -> Result<Vec<WorktreeRecord>> {
    let main_repo_root = git::main_repo_root(cwd)?;
    let base_dir = config::resolve_base_dir(&main_repo_root, config)?;
    let mut records = metadata::find_worktrees_in(&base_dir)?;
    records.sort_by_key(|r| r.metadata.id);
    Ok(records)
}
