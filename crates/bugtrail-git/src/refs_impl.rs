//! gix-backed ref, history and ancestry operations.

use gix::refs::transaction::PreviousValue;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::objects_impl::{from_gix_oid, to_gix_oid};
use crate::types::{GitOid, RefName};

pub fn read_ref(repo: &GixRepo, name: &RefName) -> Result<Option<GitOid>, GitError> {
    match repo.repo.try_find_reference(name.as_str()) {
        Ok(Some(mut r)) => {
            let id = r
                .peel_to_id_in_place()
                .map_err(|e| GitError::BackendError {
                    message: e.to_string(),
                })?;
            Ok(Some(from_gix_oid(id.as_ref())))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: e.to_string(),
        }),
    }
}

pub fn write_ref(
    repo: &GixRepo,
    name: &RefName,
    oid: GitOid,
    log_message: &str,
) -> Result<(), GitError> {
    repo.repo
        .reference(name.as_str(), to_gix_oid(oid), PreviousValue::Any, log_message)
        .map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;
    Ok(())
}

pub fn list_refs(repo: &GixRepo, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
    let platform = repo
        .repo
        .references()
        .map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;
    let refs_iter = platform
        .prefixed(prefix)
        .map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;

    let mut result = Vec::new();
    for r in refs_iter {
        let mut r = r.map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;
        let name_str = r.name().as_bstr().to_string();
        let id = r
            .peel_to_id_in_place()
            .map_err(|e| GitError::BackendError {
                message: e.to_string(),
            })?;
        let oid = from_gix_oid(id.as_ref());
        if let Ok(ref_name) = RefName::new(&name_str) {
            result.push((ref_name, oid));
        }
    }
    result.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(result)
}

pub fn list_commits(repo: &GixRepo, name: &RefName) -> Result<Vec<GitOid>, GitError> {
    let tip = read_ref(repo, name)?.ok_or_else(|| GitError::NotFound {
        message: format!("ref {name}"),
    })?;

    let walk = repo
        .repo
        .rev_walk([to_gix_oid(tip)])
        .first_parent_only()
        .all()
        .map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;

    let mut commits = Vec::new();
    for info in walk {
        let info = info.map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;
        commits.push(from_gix_oid(info.id.as_ref()));
    }
    // The walk runs tip-first; callers want history order.
    commits.reverse();
    Ok(commits)
}

pub fn merge_base(repo: &GixRepo, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
    match repo.repo.merge_base(to_gix_oid(a), to_gix_oid(b)) {
        Ok(id) => Ok(Some(from_gix_oid(id.as_ref()))),
        Err(gix::repository::merge_base::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: e.to_string(),
        }),
    }
}
