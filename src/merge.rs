//! Merging two divergent histories of the same bug.
//!
//! Both sides share every pack up to their common ancestor commit. The merge
//! keeps that shared prefix, appends the other side's packs that follow the
//! ancestor (their commits are reused as they are), then rebases this side's
//! own packs that followed the ancestor on top:
//!
//! ```text
//!   self:   A ── B ── C            other:  A ── B ── D ── E
//!   merged: A ── B ── D ── E ── C'  (C' = C's tree, parent E)
//! ```
//!
//! The result is built as a fresh pack sequence and only swapped in once
//! the bug ref has been published, so a failed merge leaves the receiver's
//! packs untouched and never alters `other`.

use bugtrail_git::{GitOid, GitRepo};
use tracing::instrument;

use crate::bug::{Bug, COMMIT_MESSAGE};
use crate::error::BugError;
use crate::pack::OperationPack;
use crate::refs;

impl Bug {
    /// Incorporate `other`'s history into this bug.
    ///
    /// Returns `true` if this bug changed (and its ref was republished),
    /// `false` if `other` brought nothing new.
    ///
    /// # Errors
    /// - [`BugError::InvalidState`] if the ids differ, `other` has staged
    ///   operations, or either side was never committed.
    /// - [`BugError::Malformed`] if the histories have no common ancestor
    ///   or do not share an identical prefix up to it.
    /// - [`BugError::Store`] if any store call fails.
    #[instrument(skip_all, fields(bug = ?self.id))]
    pub fn merge(&mut self, repo: &dyn GitRepo, other: &Self) -> Result<bool, BugError> {
        if self.id != other.id {
            return Err(BugError::invalid_state("merging unrelated bugs is not supported"));
        }
        if !other.staging.is_empty() {
            return Err(BugError::invalid_state(
                "merging a bug with a non-empty staging is not supported",
            ));
        }
        let (Some(ours), Some(theirs), Some(id)) = (self.last_commit, other.last_commit, self.id)
        else {
            return Err(BugError::invalid_state(
                "can't merge a bug that has never been stored",
            ));
        };

        let ancestor = repo.merge_base(ours, theirs)?.ok_or_else(|| {
            BugError::malformed(format!("no common ancestor between {ours} and {theirs}"))
        })?;

        let split = shared_prefix_len(&self.packs, &other.packs, ancestor)?;
        let incoming = &other.packs[split..];
        if incoming.is_empty() {
            tracing::debug!(%id, %ancestor, "nothing to merge");
            return Ok(false);
        }

        let mut merged: Vec<OperationPack> = self.packs[..split].to_vec();
        merged.extend(incoming.iter().cloned());
        let mut last_commit = theirs;

        for pack in &self.packs[split..] {
            let original = pack.commit().ok_or_else(|| {
                BugError::malformed("committed pack is missing its commit")
            })?;
            let tree = repo.read_commit(original)?.tree_oid;
            let rebased = repo.create_commit(tree, &[last_commit], COMMIT_MESSAGE, None)?;
            tracing::debug!(%original, %rebased, "rebased operation pack");
            merged.push(pack.with_commit(rebased));
            last_commit = rebased;
        }

        repo.write_ref(&refs::local_ref(id), last_commit, "bugtrail: merge")?;

        tracing::info!(
            %id,
            incoming = incoming.len(),
            rebased = self.packs.len() - split,
            tip = %last_commit,
            "merged bug"
        );

        self.packs = merged;
        self.last_commit = Some(last_commit);
        Ok(true)
    }
}

/// Number of leading packs both histories share, ending at `ancestor`.
///
/// Both sequences must hold the same commits, in the same positions, up to
/// and including the ancestor.
fn shared_prefix_len(
    ours: &[OperationPack],
    theirs: &[OperationPack],
    ancestor: GitOid,
) -> Result<usize, BugError> {
    let position = ours
        .iter()
        .position(|pack| pack.commit() == Some(ancestor))
        .ok_or_else(|| {
            BugError::malformed(format!("common ancestor {ancestor} is not part of this bug"))
        })?;

    let aligned = theirs.len() > position
        && ours[..=position]
            .iter()
            .zip(&theirs[..=position])
            .all(|(a, b)| a.commit() == b.commit());
    if !aligned {
        return Err(BugError::malformed(format!(
            "histories diverge before their common ancestor {ancestor}"
        )));
    }
    Ok(position + 1)
}
