//! List entries and list kinds.
//!
//! Every user owns three ordered lists of [`Reference`]s. A reference points
//! at one of the user's own [`Task`](crate::task::Task) records and may be
//! cross-linked to the counterpart's copy of the same task.

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// One of the three per-user lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Tasks the user works on: added directly or accepted.
    Owned,
    /// Tasks the user handed to someone else.
    Sent,
    /// Tasks someone else handed to the user, not yet accepted.
    Received,
}

impl ListKind {
    /// Order in which lists are searched when only a task id is known.
    pub const SEARCH_ORDER: [Self; 3] = [Self::Owned, Self::Sent, Self::Received];

    /// Suffix appended to the user's list key in storage.
    #[must_use]
    pub const fn key_suffix(self) -> &'static str {
        match self {
            Self::Owned => "",
            Self::Sent => "_out",
            Self::Received => "_in",
        }
    }

    /// Lowercase name, as used in logs and serialized views.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owned => "owned",
            Self::Sent => "sent",
            Self::Received => "received",
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The counterpart side of a shared task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignLink {
    /// User holding the other copy.
    pub user_id: String,
    /// Id of the other copy's task record.
    pub task_id: TaskId,
}

/// A single list slot.
///
/// The foreign user and foreign task are either both present or both absent;
/// the type enforces this through [`ForeignLink`], and decoding rejects a
/// record that sets only one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReferenceRecord", into = "ReferenceRecord")]
pub struct Reference {
    /// The owning user's task record.
    pub task_id: TaskId,
    /// Counterpart copy, if the task is shared.
    pub link: Option<ForeignLink>,
}

impl Reference {
    /// A reference to a purely local task.
    #[must_use]
    pub const fn local(task_id: TaskId) -> Self {
        Self {
            task_id,
            link: None,
        }
    }

    /// A reference cross-linked to `foreign_user_id`'s copy.
    #[must_use]
    pub fn linked(task_id: TaskId, foreign_user_id: &str, foreign_task_id: TaskId) -> Self {
        Self {
            task_id,
            link: Some(ForeignLink {
                user_id: foreign_user_id.to_string(),
                task_id: foreign_task_id,
            }),
        }
    }

    /// The counterpart user, if any.
    #[must_use]
    pub fn foreign_user_id(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.user_id.as_str())
    }
}

/// Error produced when a stored record sets only half of a foreign link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reference {task_id} has a partial foreign link")]
pub struct PartialLinkError {
    /// The offending entry's local task id.
    pub task_id: String,
}

/// Flat storage form of a [`Reference`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferenceRecord {
    task_id: TaskId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    foreign_user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    foreign_task_id: String,
}

impl TryFrom<ReferenceRecord> for Reference {
    type Error = PartialLinkError;

    fn try_from(record: ReferenceRecord) -> Result<Self, Self::Error> {
        match (
            record.foreign_user_id.is_empty(),
            record.foreign_task_id.is_empty(),
        ) {
            (true, true) => Ok(Self::local(record.task_id)),
            (false, false) => Ok(Self {
                task_id: record.task_id,
                link: Some(ForeignLink {
                    user_id: record.foreign_user_id,
                    task_id: TaskId::from(record.foreign_task_id),
                }),
            }),
            _ => Err(PartialLinkError {
                task_id: record.task_id.to_string(),
            }),
        }
    }
}

impl From<Reference> for ReferenceRecord {
    fn from(reference: Reference) -> Self {
        let (foreign_user_id, foreign_task_id) = reference
            .link
            .map(|link| (link.user_id, link.task_id.to_string()))
            .unwrap_or_default();
        Self {
            task_id: reference.task_id,
            foreign_user_id,
            foreign_task_id,
        }
    }
}
