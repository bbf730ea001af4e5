//! In-memory [`GitRepo`] implementation.
//!
//! [`MemoryRepo`] keeps blobs, trees, commits, refs and config in process
//! memory. Objects are content-addressed: each one is encoded with a kind
//! header (`blob`, `tree`, `commit`) and addressed by the first 20 bytes of
//! its SHA-256 digest, so writing equal content twice yields the same OID.
//!
//! Faults can be injected per store operation with [`MemoryRepo::fail_on`],
//! which makes every later call of that operation fail until
//! [`MemoryRepo::clear_faults`].

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{CommitInfo, EntryMode, GitOid, RefName, TreeEntry};

/// A store operation that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ReadRef,
    WriteRef,
    ListRefs,
    ListCommits,
    ReadBlob,
    ReadTree,
    ReadCommit,
    WriteBlob,
    WriteTree,
    CreateCommit,
    ReadConfig,
    MergeBase,
}

#[derive(Clone, Debug)]
enum Object {
    Blob(Vec<u8>),
    Tree(Vec<TreeEntry>),
    Commit(CommitInfo),
}

#[derive(Default)]
struct State {
    objects: HashMap<GitOid, Object>,
    refs: BTreeMap<RefName, GitOid>,
    config: HashMap<String, String>,
    faults: HashMap<StoreOp, String>,
}

/// A thread-safe, in-memory object store.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<State>,
}

impl MemoryRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `op` fail with `message`.
    pub fn fail_on(&self, op: StoreOp, message: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.insert(op, message.to_owned());
        }
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.clear();
        }
    }

    /// Set a config value returned by [`GitRepo::read_config`].
    pub fn set_config(&self, key: &str, value: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.config.insert(key.to_owned(), value.to_owned());
        }
    }

    /// Number of commit objects stored so far.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.state.lock().map_or(0, |state| {
            state
                .objects
                .values()
                .filter(|o| matches!(o, Object::Commit(_)))
                .count()
        })
    }

    fn lock(&self, op: StoreOp) -> Result<MutexGuard<'_, State>, GitError> {
        let state = self.state.lock().map_err(|_| GitError::BackendError {
            message: "memory store lock poisoned".to_owned(),
        })?;
        if let Some(message) = state.faults.get(&op) {
            return Err(GitError::BackendError {
                message: format!("injected fault on {op:?}: {message}"),
            });
        }
        Ok(state)
    }

    fn put(state: &mut State, kind: &str, payload: &[u8], object: Object) -> GitOid {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(payload.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(payload);
        let digest = hasher.finalize();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        let oid = GitOid::from_bytes(bytes);
        state.objects.entry(oid).or_insert(object);
        oid
    }

    fn commit_in(state: &State, oid: GitOid) -> Result<&CommitInfo, GitError> {
        match state.objects.get(&oid) {
            Some(Object::Commit(info)) => Ok(info),
            _ => Err(GitError::NotFound {
                message: format!("commit {oid}"),
            }),
        }
    }
}

const fn mode_code(mode: EntryMode) -> &'static str {
    match mode {
        EntryMode::Blob => "100644",
        EntryMode::BlobExecutable => "100755",
        EntryMode::Tree => "40000",
        EntryMode::Link => "120000",
        EntryMode::Commit => "160000",
    }
}

impl GitRepo for MemoryRepo {
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError> {
        let state = self.lock(StoreOp::ReadRef)?;
        Ok(state.refs.get(name).copied())
    }

    fn write_ref(&self, name: &RefName, oid: GitOid, _log_message: &str) -> Result<(), GitError> {
        let mut state = self.lock(StoreOp::WriteRef)?;
        state.refs.insert(name.clone(), oid);
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
        let state = self.lock(StoreOp::ListRefs)?;
        Ok(state
            .refs
            .iter()
            .filter(|(name, _)| name.as_str().starts_with(prefix))
            .map(|(name, oid)| (name.clone(), *oid))
            .collect())
    }

    fn list_commits(&self, name: &RefName) -> Result<Vec<GitOid>, GitError> {
        let state = self.lock(StoreOp::ListCommits)?;
        let mut next = Some(*state.refs.get(name).ok_or_else(|| GitError::NotFound {
            message: format!("ref {name}"),
        })?);

        let mut commits = Vec::new();
        while let Some(oid) = next {
            let info = Self::commit_in(&state, oid)?;
            commits.push(oid);
            next = info.parents.first().copied();
        }
        commits.reverse();
        Ok(commits)
    }

    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
        let state = self.lock(StoreOp::ReadBlob)?;
        match state.objects.get(&oid) {
            Some(Object::Blob(data)) => Ok(data.clone()),
            _ => Err(GitError::NotFound {
                message: format!("blob {oid}"),
            }),
        }
    }

    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
        let state = self.lock(StoreOp::ReadTree)?;
        match state.objects.get(&oid) {
            Some(Object::Tree(entries)) => Ok(entries.clone()),
            _ => Err(GitError::NotFound {
                message: format!("tree {oid}"),
            }),
        }
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        let state = self.lock(StoreOp::ReadCommit)?;
        Self::commit_in(&state, oid).cloned()
    }

    fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError> {
        let mut state = self.lock(StoreOp::WriteBlob)?;
        Ok(Self::put(&mut state, "blob", data, Object::Blob(data.to_vec())))
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError> {
        let mut state = self.lock(StoreOp::WriteTree)?;
        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut payload = Vec::new();
        for entry in &sorted {
            payload.extend_from_slice(mode_code(entry.mode).as_bytes());
            payload.push(b' ');
            payload.extend_from_slice(entry.name.as_bytes());
            payload.push(0);
            payload.extend_from_slice(entry.oid.as_bytes());
        }
        Ok(Self::put(&mut state, "tree", &payload, Object::Tree(sorted)))
    }

    fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        update_ref: Option<&RefName>,
    ) -> Result<GitOid, GitError> {
        let mut state = self.lock(StoreOp::CreateCommit)?;
        if !matches!(state.objects.get(&tree), Some(Object::Tree(_))) {
            return Err(GitError::NotFound {
                message: format!("tree {tree}"),
            });
        }
        for parent in parents {
            Self::commit_in(&state, *parent)?;
        }

        let mut payload = format!("tree {tree}\n");
        for parent in parents {
            payload.push_str(&format!("parent {parent}\n"));
        }
        payload.push('\n');
        payload.push_str(message);

        let info = CommitInfo {
            tree_oid: tree,
            parents: parents.to_vec(),
            message: message.to_owned(),
        };
        let oid = Self::put(&mut state, "commit", payload.as_bytes(), Object::Commit(info));
        if let Some(name) = update_ref {
            state.refs.insert(name.clone(), oid);
        }
        Ok(oid)
    }

    fn read_config(&self, key: &str) -> Result<Option<String>, GitError> {
        let state = self.lock(StoreOp::ReadConfig)?;
        Ok(state.config.get(key).cloned())
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
        let state = self.lock(StoreOp::MergeBase)?;

        let mut reachable_from_a = HashSet::new();
        let mut queue = VecDeque::from([a]);
        while let Some(oid) = queue.pop_front() {
            if reachable_from_a.insert(oid) {
                queue.extend(Self::commit_in(&state, oid)?.parents.iter().copied());
            }
        }

        // Breadth-first from `b`: the first hit is the nearest common ancestor.
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(oid) = queue.pop_front() {
            if reachable_from_a.contains(&oid) {
                return Ok(Some(oid));
            }
            if seen.insert(oid) {
                queue.extend(Self::commit_in(&state, oid)?.parents.iter().copied());
            }
        }
        Ok(None)
    }
}
