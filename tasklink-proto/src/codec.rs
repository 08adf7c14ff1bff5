//! Storage encoding for tasks and reference lists.
//!
//! Values are JSON. Reference lists have two shapes on disk:
//!
//! - current: `[{"task_id": "...", "foreign_user_id": "...", "foreign_task_id": "..."}]`
//! - legacy: `["task-id", "task-id"]`, written before tasks could be shared
//!
//! [`decode_list`] tries the current shape first and falls back to the legacy
//! one; [`encode_list`] only ever writes the current shape, so a legacy value
//! is upgraded by the first successful write to its key.

use crate::reference::Reference;
use crate::task::{Task, TaskId};

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Bytes match neither the current nor the legacy list shape.
    #[error("unrecognized list encoding: {0}")]
    UnknownListShape(String),
}

/// Which on-disk shape a list was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// Current shape (or an absent key).
    Current,
    /// Bare id array, upgraded in memory.
    Legacy,
}

/// A decoded reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedList {
    /// Entries in stored order.
    pub references: Vec<Reference>,
    /// Shape the bytes were in.
    pub shape: ListShape,
}

/// Encodes a task record.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the task cannot be serialized.
pub fn encode_task(task: &Task) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(task).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a task record.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes are not a task record.
pub fn decode_task(bytes: &[u8]) -> Result<Task, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a reference list in the current shape.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the list cannot be serialized.
pub fn encode_list(references: &[Reference]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(references).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a reference list, accepting the legacy shape.
///
/// Legacy entries come back as local references with no foreign link.
///
/// # Errors
///
/// Returns `CodecError::UnknownListShape` if the bytes are neither shape. The
/// message carries the current-shape decode error, since that is the shape
/// the value was most likely meant to be in.
pub fn decode_list(bytes: &[u8]) -> Result<DecodedList, CodecError> {
    let current_err = match serde_json::from_slice::<Vec<Reference>>(bytes) {
        Ok(references) => {
            return Ok(DecodedList {
                references,
                shape: ListShape::Current,
            });
        }
        Err(e) => e,
    };

    match serde_json::from_slice::<Vec<TaskId>>(bytes) {
        Ok(ids) => Ok(DecodedList {
            references: ids.into_iter().map(Reference::local).collect(),
            shape: ListShape::Legacy,
        }),
        Err(_) => Err(CodecError::UnknownListShape(current_err.to_string())),
    }
}
