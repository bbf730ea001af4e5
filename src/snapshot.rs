//! Materialized bug state.
//!
//! A [`Snapshot`] is what you get by replaying every operation of a bug in
//! causal order. It is rebuilt on demand by
//! [`Bug::compile`](crate::bug::Bug::compile) and never persisted.

use std::collections::BTreeSet;
use std::fmt;

use bugtrail_git::GitOid;
use serde::{Deserialize, Serialize};

use crate::operation::{Operation, Person};
use crate::refs::HUMAN_ID_LENGTH;

/// Open/closed state of a bug.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A comment in a bug's discussion thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub author: Person,
    pub message: String,
    pub unix_time: i64,
}

/// The compiled state of a bug.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub(crate) id: Option<GitOid>,
    pub status: Status,
    pub title: String,
    pub author: Option<Person>,
    pub created_at: Option<i64>,
    pub comments: Vec<Comment>,
    pub labels: BTreeSet<String>,
    /// Every operation applied to build this snapshot, in order.
    pub operations: Vec<Operation>,
}

impl Snapshot {
    /// An empty, open snapshot for the bug `id`.
    #[must_use]
    pub fn new(id: Option<GitOid>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// The bug identifier, or `None` if the bug was never committed.
    #[must_use]
    pub const fn id(&self) -> Option<GitOid> {
        self.id
    }

    #[must_use]
    pub fn human_id(&self) -> Option<String> {
        self.id
            .map(|id| id.to_string()[..HUMAN_ID_LENGTH].to_owned())
    }

    /// The most recent `unix_time` among the applied operations.
    #[must_use]
    pub fn last_edit_time(&self) -> Option<i64> {
        self.operations.iter().map(|op| op.unix_time).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_snapshot_is_open_and_empty() {
        let snap = Snapshot::new(None);
        assert_eq!(snap.status, Status::Open);
        assert!(snap.operations.is_empty());
        assert_eq!(snap.human_id(), None);
        assert_eq!(snap.last_edit_time(), None);
    }

    #[test]
    fn human_id_is_a_seven_char_prefix() {
        let id: GitOid = "0123456789abcdef0123456789abcdef01234567".parse().unwrap();
        let snap = Snapshot::new(Some(id));
        assert_eq!(snap.human_id().as_deref(), Some("0123456"));
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Open.to_string(), "open");
        assert_eq!(Status::Closed.to_string(), "closed");
    }
}
