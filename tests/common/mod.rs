//! Shared test harness for the integration tests: an isolated temp-dir git
//! repository with a deterministic commit, plus a thin wrapper that spawns
//! the real `wt` binary the way the teacher crate's `TestRepo` spawns the
//! real `wt` via `insta_cmd::get_cargo_bin` — here via Cargo's own
//! `CARGO_BIN_EXE_wt` environment variable, which needs no extra
//! dependency.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Env vars stripped/fixed for every git invocation a test issues directly,
/// so commits are deterministic and no ambient git config leaks in.
fn git_env(cmd: &mut Command) {
    cmd.env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "2024-01-01T00:00:00Z")
        .env("GIT_COMMITTER_DATE", "2024-01-01T00:00:00Z")
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .env_remove("GIT_CONFIG_GLOBAL")
        .env("HOME", "/nonexistent")
        .env("XDG_CONFIG_HOME", "/nonexistent");
}

pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Initialize a fresh repo at `<tempdir>/repo` on branch `master`, with
    /// one commit containing `README`. The base directory for worktrees
    /// (`.wt/config.json`'s `base`) is set to a sibling `worktrees/`
    /// directory inside the same tempdir, so every test is fully isolated.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let repo = Self { dir };
        std::fs::create_dir_all(repo.path()).unwrap();

        repo.git(&["init", "--quiet", "--initial-branch=master"]);
        repo.git(&["config", "user.name", "Test"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        std::fs::write(repo.path().join("README"), "hello\n").unwrap();
        repo.git(&["add", "README"]);
        repo.git(&["commit", "--quiet", "-m", "initial commit"]);

        repo.write_config(&format!(
            "{{\"base\": {:?}}}",
            repo.worktrees_base().display().to_string()
        ));

        repo
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    pub fn worktrees_base(&self) -> PathBuf {
        self.dir.path().join("worktrees")
    }

    fn write_config(&self, json: &str) {
        let dir = self.path().join(".wt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), json).unwrap();
    }

    /// Run `git <args>` inside the repo root, asserting success.
    pub fn git(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(self.path());
        git_env(&mut cmd);
        let output = cmd.output().expect("spawn git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    /// Run `git <args>` inside `cwd` (e.g. a worktree directory).
    pub fn git_in(&self, cwd: &Path, args: &[&str]) -> Output {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(cwd);
        git_env(&mut cmd);
        cmd.output().expect("spawn git")
    }

    pub fn commit_file(&self, cwd: &Path, rel_path: &str, contents: &str) {
        std::fs::write(cwd.join(rel_path), contents).unwrap();
        let out = self.git_in(cwd, &["add", rel_path]);
        assert!(out.status.success());
        let out = self.git_in(cwd, &["commit", "--quiet", "-m", &format!("add {rel_path}")]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }

    /// Run the compiled `wt` binary with `args`, cwd set to `cwd`.
    pub fn wt(&self, cwd: &Path, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_wt"));
        cmd.args(args).current_dir(cwd);
        git_env(&mut cmd);
        cmd.env_remove("WT_LOG").env_remove("RUST_LOG");
        cmd.output().expect("spawn wt")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
