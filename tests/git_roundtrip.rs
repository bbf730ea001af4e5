//! End-to-end checks against a real git repository through `GixRepo`.

mod common;

use bugtrail::refs;
use bugtrail::{Bug, BugtrailConfig, LamportClock, MergeResult, Operation, Status, merge_all};
use bugtrail_git::GitRepo;
use common::{ada, comment_messages, commit_comment, created_bug, git_output, grace, setup_git_repo};

#[test]
fn committed_bug_is_visible_to_git() {
    let (dir, repo) = setup_git_repo();
    let mut bug = created_bug(&repo, &LamportClock::new(), "crash on start");
    commit_comment(&repo, &mut bug, grace(), 1_700_000_100, "seen it too");

    let name = refs::local_ref(bug.id());
    assert_eq!(
        git_output(dir.path(), &["rev-parse", name.as_str()]),
        bug.last_commit().unwrap().to_string()
    );
    assert_eq!(
        git_output(dir.path(), &["rev-list", "--count", name.as_str()]),
        "2"
    );
    assert_eq!(
        git_output(dir.path(), &["rev-list", "--max-parents=0", name.as_str()]),
        bug.id().to_string()
    );
    assert_eq!(
        git_output(dir.path(), &["ls-tree", "--name-only", name.as_str()]),
        "ops\nroot"
    );
    let pack = git_output(dir.path(), &["cat-file", "-p", &format!("{name}:ops")]);
    assert!(pack.starts_with("{\"version\":1,"), "{pack}");
}

#[test]
fn bug_reads_back_from_git() {
    let (_dir, repo) = setup_git_repo();
    let mut bug = created_bug(&repo, &LamportClock::new(), "reads back");
    bug.append(Operation::set_status(ada(), 1_700_000_100, Status::Closed));
    bug.commit(&repo).unwrap();

    let found = Bug::find_by_prefix(&repo, &bug.human_id()).unwrap();
    assert_eq!(found.id(), bug.id());
    assert_eq!(found.packs(), bug.packs());
    assert_eq!(found.root_pack(), bug.root_pack());
    assert!(found.is_valid());

    let snap = found.compile();
    assert_eq!(snap.title, "reads back");
    assert_eq!(snap.status, Status::Closed);
}

#[test]
fn diverged_copies_merge_in_git() {
    let (_dir, repo) = setup_git_repo();
    let b0 = created_bug(&repo, &LamportClock::new(), "shared");
    let mut b1 = b0.clone();
    let mut b2 = b0.clone();
    commit_comment(&repo, &mut b1, ada(), 1_700_000_100, "local");
    commit_comment(&repo, &mut b2, grace(), 1_700_000_200, "remote");

    assert!(b1.merge(&repo, &b2).unwrap());
    assert!(!b1.merge(&repo, &b2).unwrap());

    let reread = Bug::read_local(&repo, b1.id()).unwrap();
    assert_eq!(comment_messages(&reread), vec!["first report", "remote", "local"]);
    assert_eq!(reread.last_commit(), b1.last_commit());
}

#[test]
fn merge_all_against_git_refs() {
    let (_dir, repo) = setup_git_repo();
    let local = created_bug(&repo, &LamportClock::new(), "tracked");
    let mut upstream = local.clone();
    commit_comment(&repo, &mut upstream, grace(), 1_700_000_300, "upstream note");

    repo.write_ref(
        &refs::remote_ref("origin", local.id()),
        upstream.last_commit().unwrap(),
        "fetch",
    )
    .unwrap();
    repo.write_ref(
        &refs::local_ref(local.id()),
        local.last_commit().unwrap(),
        "reset",
    )
    .unwrap();

    assert_eq!(
        merge_all(&repo, "origin").unwrap(),
        vec![MergeResult::Updated(local.id())]
    );
    assert_eq!(
        repo.read_ref(&refs::local_ref(local.id())).unwrap(),
        upstream.last_commit()
    );
}

#[test]
fn author_comes_from_git_config() {
    let (dir, repo) = setup_git_repo();
    let config = BugtrailConfig::load(dir.path()).unwrap();
    let author = config.author(&repo).unwrap();
    assert_eq!(author.name, "Test User");
    assert_eq!(author.email, "test@test.com");
}
