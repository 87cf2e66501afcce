//! `wt`: a worktree lifecycle engine for multi-agent coding workflows.
//!
//! The crate is organized leaves-first, the way the teacher crate separates
//! its `git`/`shell_exec` drivers from the `commands/` layer that
//! orchestrates them: [`fs`] and [`git`] are the only modules that touch the
//! outside world directly, [`lock`], [`hook`], [`names`], and [`metadata`]
//! are small pure-ish building blocks on top of them, and [`create`],
//! [`remove`], and [`merge`] are the three engines that compose everything
//! else into the lifecycle described in the spec.

pub mod config;
pub mod create;
pub mod error;
pub mod fs;
pub mod git;
pub mod hook;
pub mod info;
pub mod list;
pub mod lock;
pub mod merge;
pub mod metadata;
pub mod names;
pub mod remove;
pub mod shell_init;
pub mod signal;
