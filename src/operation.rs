//! Edit operations, the entries of a bug's operation log.
//!
//! Each [`Operation`] records one atomic edit: who made it, when, and what
//! changed ([`OpPayload`]). Operations serialize to JSON with a `"type"`
//! tag, which is how they are dispatched when a pack is decoded:
//! `{"author":{…},"unix_time":…,"payload":{"type":"set_title",…}}`.
//!
//! Exactly one operation of a valid bug is a [`OpPayload::Create`], and it
//! is the first one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::{Comment, Snapshot, Status};

// ---------------------------------------------------------------------------
// Person
// ---------------------------------------------------------------------------

/// The author of an operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

impl Person {
    #[must_use]
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_owned(),
            email: email.to_owned(),
        }
    }

    fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && is_single_line(&self.name) && is_single_line(&self.email)
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single edit to a bug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub author: Person,
    /// Wall-clock time of the edit, seconds since the Unix epoch.
    pub unix_time: i64,
    pub payload: OpPayload,
}

/// The kind of edit recorded by an [`Operation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpPayload {
    /// The bug was opened. Always the first operation.
    Create { title: String, message: String },

    SetTitle {
        title: String,
        /// The title being replaced, kept for display of the change.
        was: String,
    },

    AddComment { message: String },

    SetStatus { status: Status },

    LabelChange {
        added: Vec<String>,
        removed: Vec<String>,
    },
}

/// Stable tag of an [`OpPayload`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationType {
    Create,
    SetTitle,
    AddComment,
    SetStatus,
    LabelChange,
}

impl Operation {
    #[must_use]
    pub fn create(author: Person, unix_time: i64, title: &str, message: &str) -> Self {
        Self {
            author,
            unix_time,
            payload: OpPayload::Create {
                title: title.to_owned(),
                message: message.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn set_title(author: Person, unix_time: i64, title: &str, was: &str) -> Self {
        Self {
            author,
            unix_time,
            payload: OpPayload::SetTitle {
                title: title.to_owned(),
                was: was.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn add_comment(author: Person, unix_time: i64, message: &str) -> Self {
        Self {
            author,
            unix_time,
            payload: OpPayload::AddComment {
                message: message.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn set_status(author: Person, unix_time: i64, status: Status) -> Self {
        Self {
            author,
            unix_time,
            payload: OpPayload::SetStatus { status },
        }
    }

    #[must_use]
    pub fn label_change(
        author: Person,
        unix_time: i64,
        added: Vec<String>,
        removed: Vec<String>,
    ) -> Self {
        Self {
            author,
            unix_time,
            payload: OpPayload::LabelChange { added, removed },
        }
    }

    #[must_use]
    pub const fn op_type(&self) -> OperationType {
        match self.payload {
            OpPayload::Create { .. } => OperationType::Create,
            OpPayload::SetTitle { .. } => OperationType::SetTitle,
            OpPayload::AddComment { .. } => OperationType::AddComment,
            OpPayload::SetStatus { .. } => OperationType::SetStatus,
            OpPayload::LabelChange { .. } => OperationType::LabelChange,
        }
    }

    /// Whether the operation is structurally well-formed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if !self.author.is_valid() || self.unix_time <= 0 {
            return false;
        }
        match &self.payload {
            OpPayload::Create { title, .. } => is_valid_title(title),
            OpPayload::SetTitle { title, .. } => is_valid_title(title),
            OpPayload::AddComment { message } => !message.trim().is_empty(),
            OpPayload::SetStatus { .. } => true,
            OpPayload::LabelChange { added, removed } => {
                !(added.is_empty() && removed.is_empty())
                    && added.iter().chain(removed).all(|l| is_valid_label(l))
            }
        }
    }

    /// Fold this operation into `snapshot`.
    pub fn apply(&self, snapshot: &mut Snapshot) {
        match &self.payload {
            OpPayload::Create { title, message } => {
                snapshot.title.clone_from(title);
                snapshot.author = Some(self.author.clone());
                snapshot.created_at = Some(self.unix_time);
                snapshot.comments.push(self.comment(message));
            }
            OpPayload::SetTitle { title, .. } => snapshot.title.clone_from(title),
            OpPayload::AddComment { message } => snapshot.comments.push(self.comment(message)),
            OpPayload::SetStatus { status } => snapshot.status = *status,
            OpPayload::LabelChange { added, removed } => {
                for label in added {
                    snapshot.labels.insert(label.clone());
                }
                for label in removed {
                    snapshot.labels.remove(label);
                }
            }
        }
    }

    fn comment(&self, message: &str) -> Comment {
        Comment {
            author: self.author.clone(),
            message: message.to_owned(),
            unix_time: self.unix_time,
        }
    }
}

fn is_single_line(s: &str) -> bool {
    !s.contains(['\n', '\r'])
}

fn is_valid_title(title: &str) -> bool {
    !title.trim().is_empty() && is_single_line(title)
}

fn is_valid_label(label: &str) -> bool {
    !label.trim().is_empty() && is_single_line(label)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
