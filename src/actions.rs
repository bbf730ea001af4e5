//! Repository-wide bug actions: listing local bugs and folding in the bugs
//! mirrored from a remote.

use std::fmt;

use bugtrail_git::{GitOid, GitRepo, RefName};
use tracing::instrument;

use crate::bug::Bug;
use crate::error::BugError;
use crate::refs::{self, BUGS_REF_PREFIX};

/// Ids of every local bug, in ref order.
///
/// # Errors
/// Returns [`BugError::Malformed`] if a ref under `refs/bugs/` does not end
/// with a full id, or [`BugError::Store`] if the refs cannot be listed.
pub fn list_local_ids(repo: &dyn GitRepo) -> Result<Vec<GitOid>, BugError> {
    repo.list_refs(BUGS_REF_PREFIX)?
        .iter()
        .map(|(name, _)| refs::id_from_ref(name))
        .collect()
}

/// Outcome of merging one remote bug into the local repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeResult {
    /// The bug did not exist locally and was imported as is.
    New(GitOid),
    /// The local bug gained operations from the remote.
    Updated(GitOid),
    /// The local bug already contained everything the remote had.
    NothingToDo(GitOid),
    /// The remote bug could not be merged and was skipped.
    Invalid { id: String, reason: String },
}

impl fmt::Display for MergeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New(id) => write!(f, "{id}: new"),
            Self::Updated(id) => write!(f, "{id}: updated"),
            Self::NothingToDo(id) => write!(f, "{id}: nothing to do"),
            Self::Invalid { id, reason } => write!(f, "{id}: invalid: {reason}"),
        }
    }
}

/// Merge every bug mirrored under `refs/remote/<remote>/bugs/` into the
/// local bugs.
///
/// Bugs that are malformed or fail validation are reported as
/// [`MergeResult::Invalid`] and skipped; store failures abort the call.
///
/// # Errors
/// Returns [`BugError::Store`] on the first store failure.
#[instrument(skip_all, fields(remote = %remote))]
pub fn merge_all(repo: &dyn GitRepo, remote: &str) -> Result<Vec<MergeResult>, BugError> {
    let remote_refs = repo.list_refs(&refs::remote_prefix(remote))?;
    let mut results = Vec::with_capacity(remote_refs.len());

    for (name, tip) in remote_refs {
        let result = match merge_one(repo, &name, tip) {
            Ok(result) => result,
            Err(BugError::Store(e)) => return Err(BugError::Store(e)),
            Err(e) => MergeResult::Invalid {
                id: name.last_segment().to_owned(),
                reason: e.to_string(),
            },
        };
        match &result {
            MergeResult::Invalid { id, reason } => {
                tracing::warn!(%id, %reason, "skipping invalid remote bug");
            }
            other => tracing::info!(result = %other, "merged remote bug"),
        }
        results.push(result);
    }

    Ok(results)
}

fn merge_one(
    repo: &dyn GitRepo,
    name: &RefName,
    tip: GitOid,
) -> Result<MergeResult, BugError> {
    let remote_bug = Bug::read_from_ref(repo, name)?;
    let id = remote_bug.id();
    if !remote_bug.is_valid() {
        return Err(BugError::malformed("invalid bug data"));
    }

    let local = refs::local_ref(id);
    if repo.read_ref(&local)?.is_none() {
        repo.write_ref(&local, tip, &format!("bugtrail: import from {name}"))?;
        return Ok(MergeResult::New(id));
    }

    let mut local_bug = Bug::read_from_ref(repo, &local)?;
    if local_bug.merge(repo, &remote_bug)? {
        Ok(MergeResult::Updated(id))
    } else {
        Ok(MergeResult::NothingToDo(id))
    }
}
