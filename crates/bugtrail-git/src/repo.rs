//! The [`GitRepo`] trait — the boundary between the bug core and its store.
//!
//! The bug core only needs a small slice of git: content-addressed blobs,
//! flat trees, single-parent commits, named refs and a merge-base query.
//! The trait is object-safe so callers can use `&dyn GitRepo`.
//!
//! | Group        | Methods                                        |
//! |--------------|------------------------------------------------|
//! | Refs         | `read_ref`, `write_ref`, `list_refs`           |
//! | History      | `list_commits`                                 |
//! | Object read  | `read_blob`, `read_tree`, `read_commit`        |
//! | Object write | `write_blob`, `write_tree`, `create_commit`    |
//! | Config       | `read_config`                                  |
//! | Ancestry     | `merge_base`                                   |

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, RefName, TreeEntry};

/// The object-store trait used by the bug core.
///
/// Implementations may be backed by gix ([`GixRepo`](crate::GixRepo)) or
/// held entirely in memory ([`MemoryRepo`](crate::MemoryRepo)).
///
/// All calls are synchronous and may block. None of them retry internally;
/// a failure is reported to the caller as-is.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Refs
    // -----------------------------------------------------------------------

    /// Resolve a ref to its OID, returning `None` if the ref does not exist.
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError>;

    /// Create or overwrite a ref unconditionally.
    ///
    /// `log_message` is written to the reflog entry where the backend keeps one.
    fn write_ref(&self, name: &RefName, oid: GitOid, log_message: &str) -> Result<(), GitError>;

    /// List refs matching a prefix (e.g., `"refs/bugs/"`).
    ///
    /// Returns `(ref_name, oid)` pairs sorted by ref name. The prefix is
    /// matched literally.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError>;

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// List every commit reachable from `name` by first-parent links,
    /// oldest first.
    ///
    /// Returns [`GitError::NotFound`] if the ref does not exist.
    fn list_commits(&self, name: &RefName) -> Result<Vec<GitOid>, GitError>;

    // -----------------------------------------------------------------------
    // Object read
    // -----------------------------------------------------------------------

    /// Read the contents of a blob object.
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError>;

    /// Read the entries of a tree object (one level deep).
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// Read a commit object's metadata.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    // -----------------------------------------------------------------------
    // Object write
    // -----------------------------------------------------------------------

    /// Write a blob to the object store and return its OID.
    fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError>;

    /// Write a tree object from a list of entries and return its OID.
    fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError>;

    /// Create a commit object and optionally update a ref to point to it.
    ///
    /// If `update_ref` is `Some`, the given ref is updated to the new commit
    /// OID after the commit is written.
    fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        update_ref: Option<&RefName>,
    ) -> Result<GitOid, GitError>;

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    /// Read a git config value. Returns `None` if the key is not set.
    fn read_config(&self, key: &str) -> Result<Option<String>, GitError>;

    // -----------------------------------------------------------------------
    // Ancestry
    // -----------------------------------------------------------------------

    /// Find the best common ancestor (merge base) of two commits.
    ///
    /// Returns `None` if the commits have no common ancestor.
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError>;
}
