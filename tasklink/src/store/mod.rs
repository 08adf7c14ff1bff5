//! Ownership-neutral persistence for tasks and reference lists.
//!
//! [`ItemStore`] maps task ids to task records; [`ReferenceStore`] maps
//! `(user, list kind)` pairs to ordered reference lists and serializes every
//! mutation through a compare-and-set retry loop. Neither carries workflow
//! logic: that lives in [`crate::lists`].

pub mod items;
pub mod references;

pub use items::ItemStore;
pub use references::{LocatedReference, ReferenceStore};

use tasklink_proto::codec::CodecError;
use tasklink_proto::reference::ListKind;
use tasklink_proto::task::TaskId;

use crate::kv::KvError;

/// Number of read-modify-write attempts before a list mutation gives up.
pub const DEFAULT_CAS_ATTEMPTS: u32 = 3;

const ITEM_KEY_PREFIX: &str = "item";
const LIST_KEY_PREFIX: &str = "order";
const REMINDER_KEY_PREFIX: &str = "reminder";

/// Errors returned by the item and reference stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The task record or list entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The task id is already present in the target list.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),
    /// Every compare-and-set attempt lost a race.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backend failed, or returned bytes that could not be decoded.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl From<KvError> for StoreError {
    fn from(err: KvError) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

/// Storage key of a task record.
#[must_use]
pub fn item_key(task_id: &TaskId) -> String {
    format!("{ITEM_KEY_PREFIX}_{task_id}")
}

/// Storage key of one of a user's lists.
#[must_use]
pub fn list_key(user_id: &str, kind: ListKind) -> String {
    format!("{LIST_KEY_PREFIX}_{user_id}{}", kind.key_suffix())
}

/// Storage key of a user's last-reminder time.
#[must_use]
pub fn reminder_key(user_id: &str) -> String {
    format!("{REMINDER_KEY_PREFIX}_{user_id}")
}
