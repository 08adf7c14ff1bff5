//! Cross-user task workflows.
//!
//! [`ListManager`] composes the item and reference stores into the
//! add/send/accept/complete/remove/pop/bump/edit/reassign workflows. Each
//! single-list change is atomic; a workflow touching several lists either
//! converges or is compensated through a [`saga::Saga`].

pub mod manager;
pub mod saga;

pub use manager::{
    AcceptedTask, BumpedTask, CompletedTask, EditedTask, ListManager, Reassignment, RemovedTask,
    SentTask,
};

use thiserror::Error;

use crate::store::StoreError;

/// Stable classification of a [`ListError`], for mapping to user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced task or list entry is absent.
    NotFound,
    /// Task id already present in the target list.
    DuplicateEntry,
    /// Compare-and-set budget exhausted under contention.
    Conflict,
    /// Backend read/write error unrelated to concurrency.
    StorageFailure,
    /// Structurally disallowed transition.
    InvalidOperation,
}

/// Errors returned by [`ListManager`] workflows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// Referenced task or list entry is absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// Task id already present in the target list.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),
    /// Compare-and-set budget exhausted under contention.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Backend read/write error unrelated to concurrency.
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// The caller attempted a transition they are not allowed to make.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl ListError {
    /// The error's stable kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateEntry(_) => ErrorKind::DuplicateEntry,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
        }
    }
}

impl From<StoreError> for ListError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::DuplicateEntry(msg) => Self::DuplicateEntry(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::StorageFailure(msg) => Self::StorageFailure(msg),
        }
    }
}
