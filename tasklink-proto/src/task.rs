//! Task content records.
//!
//! A [`Task`] is the immutable-identity payload a list entry points to. A
//! task shared between two users always exists as two independent records,
//! one per user, so a `Task` is never owned by more than one tenant.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a task record.
///
/// Newly created ids are UUID v7 strings (time-ordered). Ids read back from
/// storage are kept verbatim, since older records use a different id format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh, time-ordered task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// The content of a single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, fixed at creation.
    pub id: TaskId,
    /// Primary text. Mutable through edits.
    pub message: String,
    /// Optional secondary text. Mutable through edits.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// When this record was created.
    #[serde(alias = "create_at")]
    pub created_at: Timestamp,
    /// External anchor (e.g. the post the task was created from).
    #[serde(
        default,
        alias = "post_id",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_post_id: Option<String>,
}

/// Older records always carry `post_id`, empty when there is no anchor.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.is_empty()))
}

impl Task {
    /// Creates a new task record with a fresh id and the current time.
    ///
    /// An empty `origin_post_id` is treated as "no anchor".
    #[must_use]
    pub fn new(message: &str, description: &str, origin_post_id: Option<&str>) -> Self {
        Self {
            id: TaskId::new(),
            message: message.to_string(),
            description: description.to_string(),
            created_at: Timestamp::now(),
            origin_post_id: origin_post_id
                .filter(|id| !id.is_empty())
                .map(ToString::to_string),
        }
    }

    /// Creates an independent copy of this task's content under a new id.
    ///
    /// Used when a task is handed to another user: each side owns its own
    /// record.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::new(
            &self.message,
            &self.description,
            self.origin_post_id.as_deref(),
        )
    }

    /// Replaces the editable content, returning the previous message.
    pub fn set_content(&mut self, message: &str, description: &str) -> String {
        self.description = description.to_string();
        std::mem::replace(&mut self.message, message.to_string())
    }
}
