//! Read-only `info` view: resolve a single worktree by `name` or
//! `agent_id`.

use std::path::Path;

use anyhow::Result;

use crate::config::{self, WtConfig};
use crate::error::WtError;
use crate::git;
use crate::metadata::{self, WorktreeRecord};

/// Resolve `identifier` against `name` first, then `agent_id`, among the
/// repository's live worktrees.
pub fn find(cwd: &Path, config: &WtConfig, identifier: &str) -> Result<WorktreeRecord> {
    let main_repo_root = git::main_repo_root(cwd)?;
    let base_dir = config::resolve_base_dir(&main_repo_root, config)?;
    let records = metadata::find_worktrees_in(&base_dir)?;
    metadata::find_by_identifier(&records, identifier)
        .cloned()
        .ok_or_else(|| WtError::WorktreeNotFound { name: identifier.to_string() }.into())
}

/// Pull a single named field out of a record as a raw string, for `wt info
/// --field <field>` ("emits exactly one line on stdout: the raw value
/// of the field").
pub fn field(record: &WorktreeRecord, field: &str) -> Option<String> {
    match field {
        "name" => Some(record.metadata.name.clone()),
        "agent_id" => Some(record.metadata.agent_id.clone()),
        "id" => Some(record.metadata.id.to_string()),
        "base_branch" => Some(record.metadata.base_branch.clone()),
        "created" => Some(record.metadata.created.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        "path" => Some(record.path.display().to_string()),
        _ => None,
    }
}
