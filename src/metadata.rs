//! Read/write for per-worktree `.wt/worktree.json`.
//!
//! Loads `serde`-derived structs via `serde_json` and distinguishes "file
//! absent" from "file present but unparsable." Unlike the config loader,
//! this store never rewrites a file after its first write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WtError;
use crate::fs;

/// Relative path, from a worktree's root, to its metadata file.
pub const METADATA_REL_PATH: &str = ".wt/worktree.json";

/// The persisted per-worktree record. Written once at creation and never
/// mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorktreeMetadata {
    pub name: String,
    pub agent_id: String,
    pub id: u64,
    pub base_branch: String,
    #[serde(with = "created_format")]
    pub created: DateTime<Utc>,
}

/// `created` is pinned to `%Y-%m-%dT%H:%M:%SZ` rather than chrono's default
/// RFC 3339 serialization, which would keep sub-second precision when
/// present and so wouldn't match byte-for-byte across runs.
mod created_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// A metadata record paired with the worktree directory it was read from.
#[derive(Debug, Clone)]
pub struct WorktreeRecord {
    pub path: PathBuf,
    pub metadata: WorktreeMetadata,
}

impl WorktreeMetadata {
    /// Serialize as indented JSON with snake_case field names and an
    /// RFC 3339 `created` timestamp ending in `Z` (via `chrono`'s `Utc`
    /// serialization, which already emits the trailing `Z`).
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize worktree metadata")
    }
}

/// Path to the metadata file inside a worktree directory.
pub fn metadata_path(worktree_path: &Path) -> PathBuf {
    worktree_path.join(METADATA_REL_PATH)
}

/// Write `metadata` to `<worktree_path>/.wt/worktree.json`, atomically.
pub fn write(worktree_path: &Path, metadata: &WorktreeMetadata) -> Result<()> {
    let path = metadata_path(worktree_path);
    let bytes = metadata.to_json_pretty()?;
    fs::write_atomic(&path, bytes.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Read a worktree's metadata. Distinguishes "no such file"
/// (`WtError::WorktreeNotFound`, callers translate further as needed) from a
/// parse failure (plain I/O/serde error).
pub fn read(worktree_path: &Path) -> Result<WorktreeMetadata> {
    let path = metadata_path(worktree_path);
    match fs::read(&path)? {
        None => Err(WtError::WorktreeNotFound {
            name: worktree_path.display().to_string(),
        }
        .into()),
        Some(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse {}", path.display())),
    }
}

/// Scan every immediate child of `base_dir`, attempting to read its
/// metadata. Children with no metadata file, or an unparsable one, are
/// silently skipped: `base_dir` may contain directories this tool
/// doesn't own.
pub fn find_worktrees_in(base_dir: &Path) -> Result<Vec<WorktreeRecord>> {
    let mut records = Vec::new();
    for entry in fs::readdir(base_dir)? {
        if !entry.is_dir() {
            continue;
        }
        match read(&entry) {
            Ok(metadata) => records.push(WorktreeRecord { path: entry, metadata }),
            Err(e) => {
                log::debug!("skipping non-wt directory {}: {e}", entry.display());
            }
        }
    }
    Ok(records)
}

/// The next `id` to assign: `max(existing ids ∪ {0}) + 1`.
pub fn next_id(records: &[WorktreeRecord]) -> u64 {
    records.iter().map(|r| r.metadata.id).max().unwrap_or(0) + 1
}

/// The union of `name` and `agent_id` across every record, used to check
/// disjointness before assigning a new name or agent_id.
pub fn taken_names(records: &[WorktreeRecord]) -> std::collections::HashSet<String> {
    let mut taken = std::collections::HashSet::new();
    for r in records {
        taken.insert(r.metadata.name.clone());
        taken.insert(r.metadata.agent_id.clone());
    }
    taken
}

/// Resolve `identifier` against `name` first, then `agent_id`, among
/// `records`. Used by `wt info`/`wt switch`/`wt remove`.
pub fn find_by_identifier<'a>(
    records: &'a [WorktreeRecord],
    identifier: &str,
) -> Option<&'a WorktreeRecord> {
    records
        .iter()
        .find(|r| r.metadata.name == identifier)
        .or_else(|| records.iter().find(|r| r.metadata.agent_id == identifier))
}
