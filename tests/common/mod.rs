//! Shared helpers for bugtrail integration tests.
//!
//! In-memory tests run against [`MemoryRepo`]; end-to-end tests get a fresh
//! `git init` repository in a temp directory via [`setup_git_repo`].

#![allow(dead_code)]

use std::process::Command;

use bugtrail::{Bug, LamportClock, Operation, Person};
use bugtrail_git::{GitRepo, GixRepo};
use tempfile::TempDir;

pub fn ada() -> Person {
    Person::new("Ada", "ada@example.com")
}

pub fn grace() -> Person {
    Person::new("Grace", "grace@example.com")
}

/// A bug holding one committed creation operation.
pub fn created_bug(repo: &dyn GitRepo, clock: &LamportClock, title: &str) -> Bug {
    let mut bug = Bug::new(clock);
    bug.append(Operation::create(ada(), 1_700_000_000, title, "first report"));
    bug.commit(repo).expect("commit creation");
    bug
}

/// Append a comment and commit it.
pub fn commit_comment(repo: &dyn GitRepo, bug: &mut Bug, author: Person, t: i64, message: &str) {
    bug.append(Operation::add_comment(author, t, message));
    bug.commit(repo).expect("commit comment");
}

/// Every comment message of the compiled bug, in order.
pub fn comment_messages(bug: &Bug) -> Vec<String> {
    bug.compile()
        .comments
        .into_iter()
        .map(|c| c.message)
        .collect()
}

fn git(dir: &std::path::Path, args: &[&str]) {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
}

/// Create a fresh git repository with a committer identity.
pub fn setup_git_repo() -> (TempDir, GixRepo) {
    let dir = TempDir::new().expect("failed to create temp dir");
    git(dir.path(), &["init", "--quiet"]);
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test User"]);
    let repo = GixRepo::open(dir.path()).expect("open repo");
    (dir, repo)
}

/// Run git in `dir` and return trimmed stdout.
pub fn git_output(dir: &std::path::Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(out.status.success(), "git {} failed", args.join(" "));
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}
