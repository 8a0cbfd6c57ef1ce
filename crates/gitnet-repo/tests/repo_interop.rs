//! Interoperability tests against repositories built with C git.
//!
//! Author/committer identity and dates are pinned through the environment
//! for deterministic output.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use gitnet_repo::{RepoError, Repository};

const EPOCH_1: &str = "1234567890 +0000";
const EPOCH_2: &str = "1234654290 +0000";

fn git_as(dir: &Path, args: &[&str], name: &str, email: &str, date: &str) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", name)
        .env("GIT_AUTHOR_EMAIL", email)
        .env("GIT_COMMITTER_NAME", name)
        .env("GIT_COMMITTER_EMAIL", email)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("LC_ALL", "C")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {args:?} failed");
}

fn git(dir: &Path, args: &[&str]) {
    git_as(dir, args, "Alice", "alice@example.com", EPOCH_1);
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-b", "main"]);
}

fn write_and_commit(dir: &Path, file: &str, content: &str, message: &str) {
    if let Some(parent) = Path::new(file).parent() {
        fs::create_dir_all(dir.join(parent)).unwrap();
    }
    fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", message]);
}

#[test]
fn open_rejects_non_repository() {
    let dir = tempfile::tempdir().unwrap();
    match Repository::open(dir.path()) {
        Err(RepoError::NotARepository { .. }) => {}
        other => panic!("expected NotARepository, got {other:?}"),
    }
}

#[test]
fn commits_enumerate_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "a.txt", "one\n", "first");
    write_and_commit(dir.path(), "a.txt", "one\ntwo\n", "second");
    write_and_commit(dir.path(), "a.txt", "one\ntwo\nthree\n", "third");

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    assert_eq!(hashes.len(), 3);

    let first = repo.get_commit(&hashes[0]).unwrap();
    let third = repo.get_commit(&hashes[2]).unwrap();
    assert_eq!(first.message, "first");
    assert_eq!(third.message, "third");
    assert_eq!(third.parents, vec![hashes[1].clone()]);
}

#[test]
fn commit_metadata_fields() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "a.txt", "one\n", "initial commit");

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    let commit = repo.get_commit(&hashes[0]).unwrap();

    assert_eq!(commit.hash, hashes[0]);
    assert_eq!(commit.author.name, "Alice");
    assert_eq!(commit.author.email, "alice@example.com");
    assert_eq!(commit.committer.email, "alice@example.com");
    assert_eq!(
        commit.committer_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2009-02-13 23:31:30"
    );
    assert_eq!(commit.committer_timezone(), 0);
    assert!(commit.parents.is_empty());
    assert!(!commit.is_merge());
    assert!(commit.in_main_branch);
    assert!(commit.branches.contains(&"main".to_string()));
}

#[test]
fn root_commit_diffs_against_empty_tree() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "a.txt", "one\ntwo\n", "first");

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    let commit = repo.get_commit(&hashes[0]).unwrap();

    assert_eq!(commit.modifications.len(), 1);
    let m = &commit.modifications[0];
    assert_eq!(m.filename, "a.txt");
    assert_eq!(m.old_path, None);
    assert_eq!(m.new_path.as_deref(), Some("a.txt"));
    assert_eq!(m.added, 2);
    assert_eq!(m.removed, 0);
    assert_eq!(m.added_lines[&1], "one");
    assert_eq!(m.added_lines[&2], "two");
}

#[test]
fn modification_line_maps() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "a.txt", "one\ntwo\nthree\n", "first");
    write_and_commit(dir.path(), "a.txt", "one\n2\nthree\n", "second");

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    let commit = repo.get_commit(&hashes[1]).unwrap();

    assert_eq!(commit.modifications.len(), 1);
    let m = &commit.modifications[0];
    assert_eq!(m.deleted_lines.len(), 1);
    assert_eq!(m.deleted_lines[&2], "two");
    assert_eq!(m.added_lines.len(), 1);
    assert_eq!(m.added_lines[&2], "2");
    assert_eq!(m.loc, Some(3));
    assert!(m.token_count.is_some());
    assert_eq!(m.cyclomatic_complexity, None);
}

#[test]
fn rename_keeps_both_paths() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "old.txt", "alpha\nbeta\ngamma\ndelta\n", "first");
    git(dir.path(), &["mv", "old.txt", "new.txt"]);
    git(dir.path(), &["commit", "-m", "rename"]);

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    let commit = repo.get_commit(&hashes[1]).unwrap();

    assert_eq!(commit.modifications.len(), 1);
    let m = &commit.modifications[0];
    assert_eq!(m.old_path.as_deref(), Some("old.txt"));
    assert_eq!(m.new_path.as_deref(), Some("new.txt"));
    assert_eq!(m.filename, "new.txt");
}

#[test]
fn blame_attributes_lines_to_authoring_commits() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "a.txt", "one\ntwo\n", "first");
    git_as(
        dir.path(),
        &["commit", "--allow-empty", "-m", "placeholder"],
        "Bob",
        "bob@example.com",
        EPOCH_2,
    );
    fs::write(dir.path().join("a.txt"), "one\nTWO\n").unwrap();
    git_as(dir.path(), &["add", "."], "Bob", "bob@example.com", EPOCH_2);
    git_as(
        dir.path(),
        &["commit", "-m", "third"],
        "Bob",
        "bob@example.com",
        EPOCH_2,
    );

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    let third = &hashes[2];

    let blame = repo.blame(&format!("{third}^"), "a.txt").unwrap();
    assert_eq!(blame.len(), 2);
    let annotated = blame.commit_for_line(2).unwrap();
    assert!(
        hashes[0].starts_with(&annotated),
        "line 2 should be blamed on the root commit"
    );
}

#[test]
fn blame_of_unknown_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    write_and_commit(dir.path(), "a.txt", "one\n", "first");

    let repo = Repository::open(dir.path()).unwrap();
    let hashes = repo.commit_hashes().unwrap();
    let err = repo.blame(&hashes[0], "missing.txt").unwrap_err();
    assert!(matches!(err, RepoError::Command { .. }));
}

#[test]
fn project_name_is_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let repo_dir = dir.path().join("myproject");
    fs::create_dir(&repo_dir).unwrap();
    init_repo(&repo_dir);
    write_and_commit(&repo_dir, "a.txt", "one\n", "first");

    let repo = Repository::open(&repo_dir).unwrap();
    assert_eq!(repo.project_name(), "myproject");
}
