//! Operation packs: the unit of persistence.
//!
//! An [`OperationPack`] is the batch of operations written by one commit.
//! It is stored as a single JSON blob:
//!
//! ```text
//! {"version":1,"ops":[{"author":…,"unix_time":…,"payload":{"type":"create",…}}, …]}
//! ```
//!
//! The commit that persisted a pack is tracked alongside it in memory but is
//! not part of the encoding: the same blob can back several commits (a
//! rebased pack keeps its blob and tree, only the commit changes).

use bugtrail_git::{GitOid, GitRepo};
use serde::{Deserialize, Serialize};

use crate::error::BugError;
use crate::operation::Operation;

/// Current pack encoding version.
pub const PACK_FORMAT_VERSION: u32 = 1;

/// An ordered batch of operations, optionally tagged with the commit that
/// persisted it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationPack {
    pub(crate) operations: Vec<Operation>,
    pub(crate) commit: Option<GitOid>,
}

#[derive(Serialize)]
struct PackEncoding<'a> {
    version: u32,
    ops: &'a [Operation],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PackDecoding {
    version: u32,
    ops: Vec<Operation>,
}

impl OperationPack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// The commit that persisted this pack, if it was persisted.
    #[must_use]
    pub const fn commit(&self) -> Option<GitOid> {
        self.commit
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// True iff every operation is structurally valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.operations.iter().all(Operation::is_valid)
    }

    /// Append an operation, keeping issue order.
    pub fn append(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// A copy of this pack tagged with `commit`.
    #[must_use]
    pub(crate) fn with_commit(&self, commit: GitOid) -> Self {
        Self {
            operations: self.operations.clone(),
            commit: Some(commit),
        }
    }

    /// Encode the operations to their blob form.
    ///
    /// # Errors
    /// Returns [`BugError::Malformed`] if an operation cannot be serialized.
    pub fn encode(&self) -> Result<Vec<u8>, BugError> {
        serde_json::to_vec(&PackEncoding {
            version: PACK_FORMAT_VERSION,
            ops: &self.operations,
        })
        .map_err(|e| BugError::malformed(format!("failed to encode operation pack: {e}")))
    }

    /// Decode a pack from its blob form. The result carries no commit.
    ///
    /// # Errors
    /// Returns [`BugError::Malformed`] if `data` is not a valid encoding.
    pub fn parse(data: &[u8]) -> Result<Self, BugError> {
        let decoded: PackDecoding = serde_json::from_slice(data)
            .map_err(|e| BugError::malformed(format!("invalid operation pack: {e}")))?;
        if decoded.version != PACK_FORMAT_VERSION {
            return Err(BugError::malformed(format!(
                "unsupported operation pack version {} (expected {PACK_FORMAT_VERSION})",
                decoded.version
            )));
        }
        Ok(Self {
            operations: decoded.ops,
            commit: None,
        })
    }

    /// Store the encoded pack as a blob and return its address.
    ///
    /// # Errors
    /// Returns an error if encoding fails or the store rejects the blob.
    pub fn write(&self, repo: &dyn GitRepo) -> Result<GitOid, BugError> {
        let data = self.encode()?;
        let oid = repo.write_blob(&data)?;
        tracing::debug!(%oid, ops = self.operations.len(), "wrote operation pack");
        Ok(oid)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bugtrail_git::MemoryRepo;

    use super::*;
    use crate::operation::Person;
    use crate::snapshot::Status;

    fn ada() -> Person {
        Person::new("Ada", "ada@example.com")
    }

    fn sample_pack() -> OperationPack {
        let mut pack = OperationPack::new();
        pack.append(Operation::create(ada(), 10, "title", "body"));
        pack.append(Operation::add_comment(ada(), 11, "first"));
        pack.append(Operation::set_status(ada(), 12, Status::Closed));
        pack
    }

    #[test]
    fn empty_pack() {
        let pack = OperationPack::new();
        assert!(pack.is_empty());
        assert!(pack.is_valid());
        assert_eq!(pack.commit(), None);
    }

    #[test]
    fn append_keeps_order() {
        let pack = sample_pack();
        let times: Vec<i64> = pack.operations().iter().map(|op| op.unix_time).collect();
        assert_eq!(times, vec![10, 11, 12]);
    }

    #[test]
    fn invalid_operation_invalidates_pack() {
        let mut pack = sample_pack();
        assert!(pack.is_valid());
        pack.append(Operation::add_comment(ada(), 13, ""));
        assert!(!pack.is_valid());
    }

    #[test]
    fn encoding_is_deterministic_and_versioned() {
        let pack = sample_pack();
        let a = pack.encode().unwrap();
        let b = pack.encode().unwrap();
        assert_eq!(a, b);
        let text = String::from_utf8(a).unwrap();
        assert!(text.starts_with("{\"version\":1,\"ops\":["), "{text}");
    }

    #[test]
    fn parse_drops_commit_tag() {
        let pack = sample_pack().with_commit(GitOid::from_bytes([3; 20]));
        let parsed = OperationPack::parse(&pack.encode().unwrap()).unwrap();
        assert_eq!(parsed.operations(), pack.operations());
        assert_eq!(parsed.commit(), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        let cases: [&[u8]; 4] = [b"not json", b"[]", b"{\"version\":1}", b"{\"ops\":[]}"];
        for bad in cases {
            assert!(
                matches!(OperationPack::parse(bad), Err(BugError::Malformed { .. })),
                "accepted {:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn parse_rejects_unknown_version() {
        let err = OperationPack::parse(br#"{"version":2,"ops":[]}"#).unwrap_err();
        assert!(err.to_string().contains("version 2"), "{err}");
    }

    #[test]
    fn parse_rejects_unknown_operation_type() {
        let data = br#"{"version":1,"ops":[{"author":{"name":"a","email":""},"unix_time":1,"payload":{"type":"teleport"}}]}"#;
        assert!(matches!(
            OperationPack::parse(data),
            Err(BugError::Malformed { .. })
        ));
    }

    #[test]
    fn clone_is_independent() {
        let original = sample_pack();
        let mut copy = original.clone();
        copy.append(Operation::add_comment(ada(), 20, "only in the copy"));
        assert_eq!(original.operations().len(), 3);
        assert_eq!(copy.operations().len(), 4);
    }

    #[test]
    fn write_stores_the_encoding() {
        let repo = MemoryRepo::new();
        let pack = sample_pack();
        let oid = pack.write(&repo).unwrap();
        assert_eq!(repo.read_blob(oid).unwrap(), pack.encode().unwrap());
    }

    mod proptests {
        use proptest::prelude::*;

        use super::super::*;
        use crate::operation::Person;
        use crate::snapshot::Status;

        fn arb_person() -> impl Strategy<Value = Person> {
            ("[a-zA-Z ]{1,12}", "[a-z]{1,8}@[a-z]{1,8}\\.org")
                .prop_map(|(name, email)| Person { name, email })
        }

        fn arb_operation() -> impl Strategy<Value = Operation> {
            let text = "\\PC{0,40}";
            prop_oneof![
                (arb_person(), any::<i64>(), text, text)
                    .prop_map(|(p, t, title, msg)| Operation::create(p, t, &title, &msg)),
                (arb_person(), any::<i64>(), text, text)
                    .prop_map(|(p, t, title, was)| Operation::set_title(p, t, &title, &was)),
                (arb_person(), any::<i64>(), text)
                    .prop_map(|(p, t, msg)| Operation::add_comment(p, t, &msg)),
                (arb_person(), any::<i64>(), any::<bool>()).prop_map(|(p, t, closed)| {
                    let status = if closed { Status::Closed } else { Status::Open };
                    Operation::set_status(p, t, status)
                }),
                (
                    arb_person(),
                    any::<i64>(),
                    prop::collection::vec(text, 0..3),
                    prop::collection::vec(text, 0..3)
                )
                    .prop_map(|(p, t, added, removed)| Operation::label_change(
                        p, t, added, removed
                    )),
            ]
        }

        proptest! {
            #[test]
            fn prop_decode_inverts_encode(ops in prop::collection::vec(arb_operation(), 0..12)) {
                let mut pack = OperationPack::new();
                for op in ops {
                    pack.append(op);
                }
                let parsed = OperationPack::parse(&pack.encode().unwrap()).unwrap();
                prop_assert_eq!(parsed.operations(), pack.operations());
            }
        }
    }
}
