//! Object-store abstraction layer for bugtrail.
//!
//! This crate defines the [`GitRepo`] trait — the single interface through
//! which the bug core reads and writes blobs, trees, commits and refs. The
//! core never imports gix directly; it programs against the trait.
//!
//! # Crate layout
//!
//! - [`repo`] — the [`GitRepo`] trait definition.
//! - [`types`] — value types used in trait signatures ([`GitOid`], [`RefName`],
//!   [`TreeEntry`], [`CommitInfo`]).
//! - [`error`] — the [`GitError`] enum returned by all trait methods.
//! - [`memory`] — [`MemoryRepo`], an in-process store with fault injection.

pub mod error;
pub mod memory;
pub mod repo;
pub mod types;

// gix-backed implementation modules
mod gix_repo;
mod objects_impl;
mod refs_impl;

pub use gix_repo::GixRepo;

pub use error::GitError;
pub use memory::{MemoryRepo, StoreOp};
pub use repo::GitRepo;
pub use types::{CommitInfo, EntryMode, GitOid, OidParseError, RefName, RefNameError, TreeEntry};
