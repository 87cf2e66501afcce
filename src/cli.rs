//! `clap`-derived argument parsing: a `Cli` struct carries global flags,
//! a `Commands` enum carries per-subcommand flags.

use std::path::PathBuf;

use clap::{Command, CommandFactory, Parser, Subcommand};

use wt::shell_init::Shell;

/// Build the underlying `clap::Command`, with `-v` short-flagged for
/// `--version` (clap's default is `-V`).
pub fn build_command() -> Command {
    Cli::command().mut_arg("version", |arg| arg.short('v'))
}

#[derive(Parser)]
#[command(name = "wt", version, about = "Manage isolated git worktrees for parallel agent workflows")]
pub struct Cli {
    /// Run as if wt was started in this directory instead of the current one
    #[arg(short = 'C', long = "cwd", global = true, value_name = "path")]
    pub cwd: Option<PathBuf>,

    /// Load configuration from this file instead of the usual discovery
    #[arg(short = 'c', long = "config", global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new worktree
    Create {
        /// Name for the new worktree and its branch (defaults to the generated agent id)
        #[arg(long)]
        name: Option<String>,
        /// Branch to create the worktree's branch from (defaults to the current branch)
        #[arg(long = "from-branch", value_name = "branch")]
        from_branch: Option<String>,
        /// Copy the invoking directory's uncommitted changes into the new worktree
        #[arg(long)]
        with_changes: bool,
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Emit only the new worktree's absolute path (for shell integration)
        #[arg(long, short = 's')]
        switch: bool,
    },
    /// List all worktrees of this repository
    List {
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show details for a single worktree
    Info {
        /// Worktree name or agent id
        identifier: String,
        /// Print only this field's raw value
        #[arg(long)]
        field: Option<String>,
        /// Emit machine-readable JSON instead of a `key: value` block
        #[arg(long)]
        json: bool,
    },
    /// Remove a worktree
    #[command(alias = "rm")]
    Remove {
        /// Worktree name or agent id
        identifier: String,
        /// Remove even if the worktree has uncommitted changes
        #[arg(long)]
        force: bool,
        /// Also delete the branch, without prompting
        #[arg(long)]
        with_branch: bool,
    },
    /// Rebase the current worktree's branch onto a target and fast-forward it in
    Merge {
        /// Target branch (defaults to the worktree's recorded base branch)
        #[arg(long)]
        into: Option<String>,
        /// Keep the worktree and branch after a successful merge
        #[arg(long)]
        keep: bool,
        /// Show the merge plan without making any changes
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Print shell integration code for the given shell
    Init {
        /// Shell to generate integration code for
        shell: Shell,
    },
}
