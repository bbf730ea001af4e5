//! The bug record: identity, committed pack chain and staging area.
//!
//! A [`Bug`] is laid out the way it is persisted. Each committed
//! [`OperationPack`] is backed by one commit on `refs/bugs/<id>`; new
//! operations pile up in the staging pack until [`Bug::commit`] writes them.
//!
//! # Lifecycle
//!
//! ```text
//! Bug::new ─append─▶ staging ─commit─▶ packs[0] (id = first commit)
//!                               ─commit─▶ packs[1] …
//! Bug::read_from_ref ◀── refs/bugs/<id> history
//! Bug::merge(other)  ──▶ packs rewritten on top of other's history
//! ```
//!
//! A `Bug` is not meant for concurrent mutation: `append`, `commit` and
//! `merge` on one instance must be serialized by the caller. After a store
//! failure in `commit` the instance must be discarded and re-read.

use bugtrail_git::{GitOid, GitRepo, RefName, TreeEntry};
use tracing::instrument;

use crate::clock::{LamportClock, LamportTime};
use crate::error::BugError;
use crate::iter::OperationIter;
use crate::operation::{Operation, OperationType};
use crate::pack::OperationPack;
use crate::refs::{self, BUGS_REF_PREFIX, HUMAN_ID_LENGTH, OPS_ENTRY_NAME, ROOT_ENTRY_NAME};
use crate::snapshot::Snapshot;

/// Message of every commit that persists an operation pack.
pub const COMMIT_MESSAGE: &str = "bugtrail: operation pack";

/// A bug thread, organized the way it is stored.
#[derive(Clone, Debug)]
pub struct Bug {
    pub(crate) clock: LamportTime,
    pub(crate) id: Option<GitOid>,
    pub(crate) last_commit: Option<GitOid>,
    pub(crate) root_pack: Option<GitOid>,
    pub(crate) packs: Vec<OperationPack>,
    pub(crate) staging: OperationPack,
}

impl Bug {
    /// A new, never-committed bug stamped with the clock's current time.
    ///
    /// The clock advances past the stamped value, so the next bug gets a
    /// strictly later one.
    #[must_use]
    pub fn new(clock: &LamportClock) -> Self {
        let stamped = clock.increment().value() - 1;
        Self {
            clock: LamportTime::new(stamped),
            id: None,
            last_commit: None,
            root_pack: None,
            packs: Vec::new(),
            staging: OperationPack::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Find the local bug whose id starts with `prefix`.
    ///
    /// # Errors
    /// [`BugError::NotFound`] if nothing matches, [`BugError::Ambiguous`] if
    /// several bugs match, or any error from [`Bug::read_from_ref`].
    #[instrument(skip_all, fields(prefix = %prefix))]
    pub fn find_by_prefix(repo: &dyn GitRepo, prefix: &str) -> Result<Self, BugError> {
        let mut matching: Vec<RefName> = repo
            .list_refs(BUGS_REF_PREFIX)?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| name.last_segment().starts_with(prefix))
            .collect();

        match matching.len() {
            0 => Err(BugError::NotFound {
                prefix: prefix.to_owned(),
            }),
            1 => {
                let name = matching.remove(0);
                Self::read_from_ref(repo, &name)
            }
            _ => Err(BugError::Ambiguous {
                prefix: prefix.to_owned(),
                matches: matching
                    .iter()
                    .map(|name| name.last_segment().to_owned())
                    .collect(),
            }),
        }
    }

    /// Read the local bug `id`.
    ///
    /// # Errors
    /// See [`Bug::read_from_ref`].
    pub fn read_local(repo: &dyn GitRepo, id: GitOid) -> Result<Self, BugError> {
        Self::read_from_ref(repo, &refs::local_ref(id))
    }

    /// Read bug `id` as mirrored from `remote`.
    ///
    /// # Errors
    /// See [`Bug::read_from_ref`].
    pub fn read_remote(repo: &dyn GitRepo, remote: &str, id: GitOid) -> Result<Self, BugError> {
        Self::read_from_ref(repo, &refs::remote_ref(remote, id))
    }

    /// Rebuild a bug from the full commit history of `name`.
    ///
    /// # Errors
    /// [`BugError::Malformed`] if the ref does not end with a full id, a
    /// commit tree lacks its `ops`/`root` entries, or a pack fails to
    /// decode. Store failures are returned as [`BugError::Store`].
    #[instrument(skip_all, fields(refname = %name))]
    pub fn read_from_ref(repo: &dyn GitRepo, name: &RefName) -> Result<Self, BugError> {
        let id = refs::id_from_ref(name)?;
        let commits = repo.list_commits(name)?;

        let mut bug = Self {
            clock: LamportTime::default(),
            id: Some(id),
            last_commit: None,
            root_pack: None,
            packs: Vec::with_capacity(commits.len()),
            staging: OperationPack::new(),
        };

        for commit in commits {
            bug.last_commit = Some(commit);

            let tree = repo.read_commit(commit)?.tree_oid;
            let (ops_blob, root_blob) = pack_entries(&repo.read_tree(tree)?, commit)?;

            if bug.root_pack.is_none() {
                bug.root_pack = Some(root_blob);
            }

            let pack = OperationPack::parse(&repo.read_blob(ops_blob)?)?;
            bug.packs.push(pack.with_commit(commit));
        }

        tracing::debug!(%id, packs = bug.packs.len(), "read bug");
        Ok(bug)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Whether the bug's data is consistent.
    ///
    /// Holds iff the bug has at least one operation, every pack (and the
    /// staging pack, if non-empty) is valid, and the very first operation is
    /// the only creation operation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.packs.is_empty() && self.staging.is_empty() {
            return false;
        }

        if !self.packs.iter().all(OperationPack::is_valid) {
            return false;
        }

        if !self.staging.is_empty() && !self.staging.is_valid() {
            return false;
        }

        if self.first_op().map(Operation::op_type) != Some(OperationType::Create) {
            return false;
        }

        self.operations()
            .filter(|op| op.op_type() == OperationType::Create)
            .count()
            == 1
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Stage an operation for the next commit.
    pub fn append(&mut self, op: Operation) {
        self.staging.append(op);
    }

    /// Persist the staging pack as a new commit and publish the bug ref.
    ///
    /// The first commit fixes the bug's id and root pack.
    ///
    /// # Errors
    /// [`BugError::InvalidState`] if nothing is staged. Store failures are
    /// returned as [`BugError::Store`]; the bug must then be discarded.
    #[instrument(skip_all, fields(bug = ?self.id))]
    pub fn commit(&mut self, repo: &dyn GitRepo) -> Result<(), BugError> {
        if self.staging.is_empty() {
            return Err(BugError::invalid_state("can't commit an empty bug"));
        }

        let pack_blob = self.staging.write(repo)?;
        let root_blob = *self.root_pack.get_or_insert(pack_blob);

        let tree = repo.write_tree(&[
            TreeEntry::blob(OPS_ENTRY_NAME, pack_blob),
            TreeEntry::blob(ROOT_ENTRY_NAME, root_blob),
        ])?;

        let parents: Vec<GitOid> = self.last_commit.into_iter().collect();
        let commit = repo.create_commit(tree, &parents, COMMIT_MESSAGE, None)?;
        self.last_commit = Some(commit);

        let id = *self.id.get_or_insert(commit);
        repo.write_ref(&refs::local_ref(id), commit, COMMIT_MESSAGE)?;

        let staged = std::mem::take(&mut self.staging);
        self.packs.push(staged.with_commit(commit));

        tracing::debug!(%id, %commit, packs = self.packs.len(), "committed operation pack");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The bug identifier.
    ///
    /// # Panics
    /// Panics if the bug was never committed: asking for the id of an
    /// unstored bug is a programming error.
    #[must_use]
    pub fn id(&self) -> GitOid {
        match self.id {
            Some(id) => id,
            None => panic!("no id yet: the bug was never committed"),
        }
    }

    /// The first [`HUMAN_ID_LENGTH`] characters of [`Bug::id`].
    ///
    /// # Panics
    /// Same as [`Bug::id`].
    #[must_use]
    pub fn human_id(&self) -> String {
        self.id().to_string()[..HUMAN_ID_LENGTH].to_owned()
    }

    /// The logical time stamped at creation.
    #[must_use]
    pub const fn lamport_time(&self) -> LamportTime {
        self.clock
    }

    /// The most recently persisted commit.
    #[must_use]
    pub const fn last_commit(&self) -> Option<GitOid> {
        self.last_commit
    }

    /// The blob of the bug's first persisted pack.
    #[must_use]
    pub const fn root_pack(&self) -> Option<GitOid> {
        self.root_pack
    }

    /// Committed packs, oldest first.
    #[must_use]
    pub fn packs(&self) -> &[OperationPack] {
        &self.packs
    }

    /// Operations staged for the next commit.
    #[must_use]
    pub const fn staging(&self) -> &OperationPack {
        &self.staging
    }

    /// Every operation in causal order: committed packs, then staging.
    #[must_use]
    pub const fn operations(&self) -> OperationIter<'_> {
        OperationIter::new(self)
    }

    /// The very first operation, which for a valid bug is the creation.
    #[must_use]
    pub fn first_op(&self) -> Option<&Operation> {
        self.operations().next()
    }

    // -----------------------------------------------------------------------
    // Compilation
    // -----------------------------------------------------------------------

    /// Replay every operation into a [`Snapshot`].
    #[must_use]
    pub fn compile(&self) -> Snapshot {
        let mut snapshot = Snapshot::new(self.id);
        for op in self.operations() {
            op.apply(&mut snapshot);
            snapshot.operations.push(op.clone());
        }
        snapshot
    }
}

/// Locate the `ops` and `root` blobs of a bug commit's tree.
fn pack_entries(entries: &[TreeEntry], commit: GitOid) -> Result<(GitOid, GitOid), BugError> {
    let find = |name: &str| entries.iter().find(|e| e.name == name).map(|e| e.oid);

    let ops = find(OPS_ENTRY_NAME).ok_or_else(|| {
        BugError::malformed(format!("invalid tree in commit {commit}: missing the ops entry"))
    })?;
    let root = find(ROOT_ENTRY_NAME).ok_or_else(|| {
        BugError::malformed(format!("invalid tree in commit {commit}: missing the root entry"))
    })?;
    if entries.len() != 2 {
        return Err(BugError::malformed(format!(
            "invalid tree in commit {commit}: expected exactly 2 entries, found {}",
            entries.len()
        )));
    }
    Ok((ops, root))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bugtrail_git::{MemoryRepo, StoreOp};

    use super::*;
    use crate::operation::Person;
    use crate::snapshot::Status;

    fn ada() -> Person {
        Person::new("Ada", "ada@example.com")
    }

    fn created(clock: &LamportClock) -> Bug {
        let mut bug = Bug::new(clock);
        bug.append(Operation::create(ada(), 100, "crash", "it crashes"));
        bug
    }

    #[test]
    fn new_bug_is_unset() {
        let bug = Bug::new(&LamportClock::new());
        assert_eq!(bug.last_commit(), None);
        assert_eq!(bug.root_pack(), None);
        assert!(bug.packs().is_empty());
        assert!(bug.staging().is_empty());
        assert!(bug.first_op().is_none());
        assert!(!bug.is_valid());
    }

    #[test]
    fn new_stamps_the_pre_increment_time() {
        let clock = LamportClock::new();
        let before = clock.time();
        let a = Bug::new(&clock);
        let b = Bug::new(&clock);
        assert_eq!(a.lamport_time(), before);
        assert!(b.lamport_time() > a.lamport_time());
        assert!(clock.time() > b.lamport_time());
    }

    #[test]
    #[should_panic(expected = "no id yet")]
    fn id_before_commit_panics() {
        let bug = created(&LamportClock::new());
        let _ = bug.id();
    }

    #[test]
    fn commit_empty_staging_is_refused() {
        let repo = MemoryRepo::new();
        let mut bug = Bug::new(&LamportClock::new());
        let err = bug.commit(&repo).unwrap_err();
        assert!(matches!(err, BugError::InvalidState { .. }));
        assert_eq!(err.to_string(), "can't commit an empty bug");
    }

    #[test]
    fn first_commit_sets_identity() {
        let repo = MemoryRepo::new();
        let mut bug = created(&LamportClock::new());
        bug.commit(&repo).unwrap();

        let commit = bug.last_commit().unwrap();
        assert_eq!(bug.id(), commit);
        assert_eq!(bug.human_id(), commit.to_string()[..7]);
        assert_eq!(bug.packs().len(), 1);
        assert_eq!(bug.packs()[0].commit(), Some(commit));
        assert!(bug.staging().is_empty());
        assert_eq!(
            repo.read_ref(&refs::local_ref(bug.id())).unwrap(),
            Some(commit)
        );
    }

    #[test]
    fn later_commits_keep_id_and_root() {
        let repo = MemoryRepo::new();
        let mut bug = created(&LamportClock::new());
        bug.commit(&repo).unwrap();
        let id = bug.id();
        let root = bug.root_pack();

        bug.append(Operation::add_comment(ada(), 101, "more"));
        bug.commit(&repo).unwrap();

        assert_eq!(bug.id(), id);
        assert_eq!(bug.root_pack(), root);
        let tip = bug.last_commit().unwrap();
        let info = repo.read_commit(tip).unwrap();
        assert_eq!(info.parents, vec![id]);
        let entries = repo.read_tree(info.tree_oid).unwrap();
        let root_entry = entries.iter().find(|e| e.name == "root").unwrap();
        assert_eq!(Some(root_entry.oid), root);
    }

    #[test]
    fn commit_propagates_store_failure() {
        let repo = MemoryRepo::new();
        repo.fail_on(StoreOp::CreateCommit, "read-only");
        let mut bug = created(&LamportClock::new());
        let err = bug.commit(&repo).unwrap_err();
        assert!(matches!(err, BugError::Store(_)), "got {err:?}");
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn validity_requires_a_single_leading_create() {
        let clock = LamportClock::new();

        let mut no_create = Bug::new(&clock);
        no_create.append(Operation::add_comment(ada(), 1, "hi"));
        assert!(!no_create.is_valid());

        let mut late_create = Bug::new(&clock);
        late_create.append(Operation::add_comment(ada(), 1, "hi"));
        late_create.append(Operation::create(ada(), 2, "t", ""));
        assert!(!late_create.is_valid());

        let mut two_creates = created(&clock);
        two_creates.append(Operation::create(ada(), 2, "again", ""));
        assert!(!two_creates.is_valid());

        let mut ok = created(&clock);
        ok.append(Operation::set_status(ada(), 2, Status::Closed));
        assert!(ok.is_valid());
    }

    #[test]
    fn validity_spans_committed_packs() {
        let repo = MemoryRepo::new();
        let mut bug = created(&LamportClock::new());
        bug.commit(&repo).unwrap();
        assert!(bug.is_valid());

        bug.append(Operation::create(ada(), 200, "second create", ""));
        assert!(!bug.is_valid());
    }

    #[test]
    fn invalid_staged_operation_invalidates() {
        let mut bug = created(&LamportClock::new());
        bug.append(Operation::add_comment(ada(), 2, ""));
        assert!(!bug.is_valid());
    }

    #[test]
    fn compile_replays_in_order() {
        let repo = MemoryRepo::new();
        let mut bug = created(&LamportClock::new());
        bug.commit(&repo).unwrap();
        bug.append(Operation::add_comment(ada(), 101, "me too"));
        bug.append(Operation::set_status(ada(), 102, Status::Closed));

        let snap = bug.compile();
        assert_eq!(snap.id(), Some(bug.id()));
        assert_eq!(snap.title, "crash");
        assert_eq!(snap.status, Status::Closed);
        assert_eq!(snap.comments.len(), 2);
        assert_eq!(snap.operations.len(), 3);
        assert_eq!(snap.last_edit_time(), Some(102));
    }

    #[test]
    fn compile_uncommitted_bug_has_no_id() {
        let snap = created(&LamportClock::new()).compile();
        assert_eq!(snap.id(), None);
        assert_eq!(snap.status, Status::Open);
    }

    #[test]
    fn pack_entries_reports_missing_names() {
        let oid = GitOid::from_bytes([1; 20]);
        let only_ops = [TreeEntry::blob("ops", oid)];
        let err = pack_entries(&only_ops, oid).unwrap_err();
        assert!(err.to_string().contains("missing the root entry"), "{err}");

        let only_root = [TreeEntry::blob("root", oid)];
        let err = pack_entries(&only_root, oid).unwrap_err();
        assert!(err.to_string().contains("missing the ops entry"), "{err}");

        let extra = [
            TreeEntry::blob("ops", oid),
            TreeEntry::blob("root", oid),
            TreeEntry::blob("notes", oid),
        ];
        assert!(pack_entries(&extra, oid).is_err());
    }
}
