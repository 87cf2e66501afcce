//! Configuration discovery, precedence, and worktree path resolution.
//!
//! Uses `etcetera::base_strategy::choose_base_strategy` to find the XDG
//! config directory cross-platform. Config is a single small JSON document
//! (`serde_json`): just one field, `base`, with a shallow project-over-user
//! merge.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::{Deserialize, Serialize};

use crate::error::WtError;
use crate::fs;

/// Default base directory, before `~` expansion.
const DEFAULT_BASE: &str = "~/code/worktrees";

/// Relative path, from the main repository root, to the project config file.
const PROJECT_CONFIG_REL_PATH: &str = ".wt/config.json";

/// The one configurable field the engine reads. Kept as a struct rather
/// than a bare `Option<String>` so future fields have somewhere to land
/// without changing the load/merge signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WtConfig {
    pub base: Option<String>,
}

impl WtConfig {
    /// Shallow-merge `self` over `fallback`: each `None` field in `self`
    /// takes `fallback`'s value. Used to layer project over user config.
    fn merged_over(self, fallback: WtConfig) -> WtConfig {
        WtConfig {
            base: self.base.or(fallback.base),
        }
    }

    fn with_defaults(self) -> WtConfig {
        WtConfig {
            base: self.base.or_else(|| Some(DEFAULT_BASE.to_string())),
        }
    }
}

/// Read and parse a config file at `path`. `Ok(None)` if the file does not
/// exist; `ConfigInvalid` if it exists but doesn't parse.
fn read_config_file(path: &Path) -> Result<Option<WtConfig>> {
    match fs::read(path)? {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| {
                WtError::ConfigInvalid {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
    }
}

fn project_config_path(main_repo_root: &Path) -> PathBuf {
    main_repo_root.join(PROJECT_CONFIG_REL_PATH)
}

/// `$XDG_CONFIG_HOME/wt/config.json`, or `~/.config/wt/config.json` on
/// platforms without an `XDG_CONFIG_HOME` override.
fn user_config_path() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("wt").join("config.json"))
}

/// Load configuration an explicit `--config` path, used
/// alone (still defaulted field-by-field, just never merged with
/// project/user); otherwise project config shallow-merged over user config,
/// project winning, both falling back to built-in defaults.
pub fn load(explicit_path: Option<&Path>, main_repo_root: &Path) -> Result<WtConfig> {
    if let Some(path) = explicit_path {
        let config = read_config_file(path)?.ok_or_else(|| WtError::ConfigInvalid {
            path: path.to_path_buf(),
            message: "file not found".to_string(),
        })?;
        return Ok(config.with_defaults());
    }

    let project = read_config_file(&project_config_path(main_repo_root))?.unwrap_or_default();
    let user = match user_config_path() {
        Some(path) => read_config_file(&path)?.unwrap_or_default(),
        None => WtConfig::default(),
    };
    Ok(project.merged_over(user).with_defaults())
}

/// Expand a leading `~` or `~/...` against the current user's home
/// directory, via the `home` crate (already part of the teacher's
/// dependency set, used for the same purpose in its user-config lookup).
fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return home::home_dir().context("could not determine home directory");
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = home::home_dir().context("could not determine home directory")?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the directory under which this repository's worktrees are
/// created
///
/// - absolute (or `~`-prefixed) `base` → `<base>/<repo_name>`
/// - relative `base` → `<main_repo_root>/<base>` (no `repo_name` inserted)
///
/// The `repo_name` branch keeps one shared base directory usable across many
/// repositories without collisions; the relative branch keeps everything
/// self-contained under the repo regardless of which worktree `wt` was
/// invoked from, since `main_repo_root` is already worktree-invariant.
pub fn resolve_base_dir(main_repo_root: &Path, config: &WtConfig) -> Result<PathBuf> {
    let raw = config.base.as_deref().unwrap_or(DEFAULT_BASE);
    let expanded = expand_tilde(raw)?;

    if expanded.is_absolute() {
        let repo_name = main_repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repo".to_string());
        Ok(expanded.join(repo_name))
    } else {
        Ok(main_repo_root.join(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_base_inserts_repo_name() {
        let config = WtConfig { base: Some("/srv/worktrees".to_string()) };
        let repo_root = PathBuf::from("/home/user/code/myrepo");
        let resolved = resolve_base_dir(&repo_root, &config).unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/worktrees/myrepo"));
    }

    #[test]
    fn relative_base_skips_repo_name() {
        let config = WtConfig { base: Some(".worktrees".to_string()) };
        let repo_root = PathBuf::from("/home/user/code/myrepo");
        let resolved = resolve_base_dir(&repo_root, &config).unwrap();
        assert_eq!(resolved, PathBuf::from("/home/user/code/myrepo/.worktrees"));
    }

    #[test]
    fn missing_project_and_user_config_falls_back_to_default() {
        let dir = tempdir().unwrap();
        // No project config present; user_config_path() may or may not exist
        // on the test machine, but an absent file merges to the default.
        let project = read_config_file(&project_config_path(dir.path())).unwrap();
        assert!(project.is_none());
    }

    #[test]
    fn explicit_config_missing_file_is_config_invalid() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WtError>(),
            Some(WtError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn explicit_config_partial_fields_still_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wt.json");
        std::fs::write(&path, "{}").unwrap();
        let config = load(Some(&path), dir.path()).unwrap();
        assert_eq!(config.base.as_deref(), Some(DEFAULT_BASE));
    }

    #[test]
    fn project_config_wins_over_user_fields() {
        let project = WtConfig { base: Some("project-base".to_string()) };
        let user = WtConfig { base: Some("user-base".to_string()) };
        let merged = project.merged_over(user);
        assert_eq!(merged.base.as_deref(), Some("project-base"));
    }

    #[test]
    fn invalid_json_is_config_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WtError>(),
            Some(WtError::ConfigInvalid { .. })
        ));
    }
}
