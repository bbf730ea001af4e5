//! bugtrail — bug threads stored as mergeable histories inside a git
//! repository.
//!
//! A bug is a chain of commits on `refs/bugs/<id>`. Each commit carries one
//! [`OperationPack`] of edits; replaying every operation in order yields the
//! bug's current [`Snapshot`]. Two copies of a bug that diverged (for
//! instance a local one and one fetched from a remote) are reconciled with
//! [`Bug::merge`].
//!
//! The store is reached only through [`bugtrail_git::GitRepo`], so the core
//! runs the same against a real repository and against
//! [`bugtrail_git::MemoryRepo`].

pub mod actions;
pub mod bug;
pub mod clock;
pub mod config;
pub mod error;
pub mod iter;
pub mod merge;
pub mod operation;
pub mod pack;
pub mod refs;
pub mod snapshot;

pub use actions::{MergeResult, list_local_ids, merge_all};
pub use bug::Bug;
pub use clock::{LamportClock, LamportTime};
pub use config::{BugtrailConfig, ConfigError};
pub use error::BugError;
pub use iter::OperationIter;
pub use operation::{OpPayload, Operation, OperationType, Person};
pub use pack::OperationPack;
pub use snapshot::{Comment, Snapshot, Status};
