mod common;

use common::{TestRepo, stdout};

#[test]
fn init_bash_emits_a_shell_function() {
    let repo = TestRepo::new();
    let repo_path = repo.path();

    let out = repo.wt(&repo_path, &["init", "bash"]);
    assert!(out.status.success(), "{}", common::stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("wt() {"));
    assert!(text.contains("command wt"));
}

#[test]
fn init_fish_emits_fish_syntax() {
    let repo = TestRepo::new();
    let repo_path = repo.path();

    let out = repo.wt(&repo_path, &["init", "fish"]);
    assert!(out.status.success(), "{}", common::stderr(&out));
    assert!(stdout(&out).starts_with("function wt"));
}

/// `init` needs neither a git repository nor a config file.
#[test]
fn init_works_outside_a_git_repository() {
    let repo = TestRepo::new();
    let outside = repo.worktrees_base();
    std::fs::create_dir_all(&outside).unwrap();

    let out = repo.wt(&outside, &["init", "zsh"]);
    assert!(out.status.success(), "{}", common::stderr(&out));
}
