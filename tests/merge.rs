mod common;

use common::{TestRepo, stdout};

/// scenario 4: a clean merge rebases, fast-forwards `master`, and removes
/// the worktree and branch afterward.
#[test]
fn clean_merge_fast_forwards_and_cleans_up() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");
    repo.commit_file(&worktree_path, "feature.txt", "work\n");

    let out = repo.wt(&worktree_path, &["merge"]);
    assert!(out.status.success(), "{}", common::stderr(&out));
    assert!(stdout(&out).contains("Merged feature-a into master"));

    assert!(!worktree_path.exists());
    let branches = repo.git(&["branch", "--list", "feature-a"]);
    assert!(stdout(&branches).is_empty());

    let log = repo.git(&["log", "master", "--oneline"]);
    assert!(stdout(&log).contains("add feature.txt"));
}

/// / `--keep` merges but leaves the worktree and branch in place.
#[test]
fn merge_with_keep_preserves_worktree() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");
    repo.commit_file(&worktree_path, "feature.txt", "work\n");

    let out = repo.wt(&worktree_path, &["merge", "--keep"]);
    assert!(out.status.success(), "{}", common::stderr(&out));
    assert!(stdout(&out).contains("Worktree kept"));
    assert!(worktree_path.exists());

    let branches = repo.git(&["branch", "--list", "feature-a"]);
    assert!(!stdout(&branches).is_empty());
}

/// scenario 5: a rebase conflict leaves the worktree untouched and
/// reports the conflicting files.
#[test]
fn merge_conflict_aborts_and_reports_conflicting_files() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");

    repo.commit_file(&worktree_path, "README", "from feature\n");
    repo.commit_file(&repo_path, "README", "from master\n");

    let out = repo.wt(&worktree_path, &["merge"]);
    assert!(!out.status.success());
    let err = common::stderr(&out);
    assert!(err.contains("conflicted"));
    assert!(err.contains("README"));

    // The worktree survives, its branch is untouched, and it's not mid-rebase.
    assert!(worktree_path.exists());
    let status = repo.git_in(&worktree_path, &["status", "--porcelain"]);
    assert!(stdout(&status).is_empty());
}

/// invariant 4: `--dry-run` never touches disk, even on a clean merge.
#[test]
fn merge_dry_run_reports_plan_without_mutating() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");
    repo.commit_file(&worktree_path, "feature.txt", "work\n");

    let before = repo.git(&["rev-parse", "master"]);

    let out = repo.wt(&worktree_path, &["merge", "--dry-run"]);
    assert!(out.status.success(), "{}", common::stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("feature:      feature-a"));
    assert!(text.contains("target:       master"));
    assert!(text.contains("commits:      1"));

    assert!(worktree_path.exists());
    let after = repo.git(&["rev-parse", "master"]);
    assert_eq!(stdout(&before), stdout(&after));
}

/// pre-flight: merging a branch into itself is rejected before any lock
/// or git mutation.
#[test]
fn merge_into_self_is_rejected() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");

    let out = repo.wt(&worktree_path, &["merge", "--into", "feature-a"]);
    assert!(!out.status.success());
    assert!(common::stderr(&out).contains("itself"));
}

/// pre-flight: a nonexistent target branch is rejected up front.
#[test]
fn merge_into_missing_branch_fails() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");

    let out = repo.wt(&worktree_path, &["merge", "--into", "does-not-exist"]);
    assert!(!out.status.success());
    assert!(common::stderr(&out).contains("does not exist"));
}

/// pre-flight: an uncommitted change in the feature worktree blocks
/// the merge.
#[test]
fn merge_with_dirty_feature_worktree_fails() {
    let repo = TestRepo::new();
    let repo_path = repo.path();
    repo.wt(&repo_path, &["create", "--name", "feature-a"]);
    let worktree_path = repo.worktrees_base().join("repo").join("feature-a");
    std::fs::write(worktree_path.join("dirty.txt"), "uncommitted\n").unwrap();

    let out = repo.wt(&worktree_path, &["merge"]);
    assert!(!out.status.success());
    assert!(common::stderr(&out).contains("uncommitted"));
}
