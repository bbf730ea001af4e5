//! Ref naming for bug records.
//!
//! # Ref hierarchy
//!
//! ```text
//! refs/bugs/<id>                     ← local bugs
//! refs/remote/<remote>/bugs/<id>     ← bugs mirrored from a remote
//! ```
//!
//! Every commit of a bug points at a tree with exactly two blobs:
//!
//! ```text
//! ops   ← the operation pack persisted by this commit
//! root  ← the bug's first operation pack, identical in every commit
//! ```

use bugtrail_git::{GitOid, RefName};

use crate::error::BugError;

/// Prefix of every local bug ref.
pub const BUGS_REF_PREFIX: &str = "refs/bugs/";

/// Tree entry holding the commit's own operation pack.
pub const OPS_ENTRY_NAME: &str = "ops";

/// Tree entry holding the bug's genesis pack.
pub const ROOT_ENTRY_NAME: &str = "root";

/// Length of a full bug identifier.
pub const ID_LENGTH: usize = GitOid::HEX_LEN;

/// Length of the display prefix of a bug identifier.
pub const HUMAN_ID_LENGTH: usize = 7;

/// Build the local ref of bug `id`.
///
/// # Example
/// ```
/// let id: bugtrail_git::GitOid = "ab".repeat(20).parse().unwrap();
/// assert_eq!(bugtrail::refs::local_ref(id).as_str(),
///            format!("refs/bugs/{}", "ab".repeat(20)));
/// ```
#[must_use]
pub fn local_ref(id: GitOid) -> RefName {
    ref_name(format!("{BUGS_REF_PREFIX}{id}"))
}

/// The prefix under which bugs mirrored from `remote` live.
///
/// # Example
/// ```
/// assert_eq!(bugtrail::refs::remote_prefix("origin"),
///            "refs/remote/origin/bugs/");
/// ```
#[must_use]
pub fn remote_prefix(remote: &str) -> String {
    format!("refs/remote/{remote}/bugs/")
}

/// Build the ref of bug `id` as mirrored from `remote`.
#[must_use]
pub fn remote_ref(remote: &str, id: GitOid) -> RefName {
    ref_name(format!("{}{id}", remote_prefix(remote)))
}

/// Extract the bug identifier from the trailing segment of a bug ref.
///
/// # Errors
/// Returns [`BugError::Malformed`] if the segment is not exactly
/// [`ID_LENGTH`] hex characters.
pub fn id_from_ref(name: &RefName) -> Result<GitOid, BugError> {
    let segment = name.last_segment();
    if segment.len() != ID_LENGTH {
        return Err(BugError::malformed(format!(
            "invalid ref length: `{name}` does not end with a {ID_LENGTH}-character id"
        )));
    }
    segment
        .parse()
        .map_err(|e| BugError::malformed(format!("invalid bug id in `{name}`: {e}")))
}

fn ref_name(name: String) -> RefName {
    // Every name built here starts with "refs/", which is all RefName checks.
    RefName::new(&name).unwrap_or_else(|_| unreachable!("bug refs always start with refs/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> GitOid {
        "0123456789abcdef0123456789abcdef01234567".parse().unwrap()
    }

    #[test]
    fn local_and_remote_refs() {
        assert_eq!(
            local_ref(id()).as_str(),
            "refs/bugs/0123456789abcdef0123456789abcdef01234567"
        );
        assert_eq!(
            remote_ref("origin", id()).as_str(),
            "refs/remote/origin/bugs/0123456789abcdef0123456789abcdef01234567"
        );
    }

    #[test]
    fn id_roundtrips_through_ref() {
        assert_eq!(id_from_ref(&local_ref(id())).unwrap(), id());
        assert_eq!(id_from_ref(&remote_ref("up", id())).unwrap(), id());
    }

    #[test]
    fn short_id_is_malformed() {
        let name = RefName::new("refs/bugs/abc").unwrap();
        assert!(matches!(
            id_from_ref(&name),
            Err(BugError::Malformed { .. })
        ));
    }

    #[test]
    fn non_hex_id_is_malformed() {
        let name = RefName::new(&format!("refs/bugs/{}", "z".repeat(40))).unwrap();
        assert!(matches!(
            id_from_ref(&name),
            Err(BugError::Malformed { .. })
        ));
    }
}
