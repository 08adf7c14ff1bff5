//! Task record persistence.

use std::sync::Arc;

use tasklink_proto::codec;
use tasklink_proto::task::{Task, TaskId};

use super::{StoreError, item_key};
use crate::kv::KvStore;

/// Get/save/delete of task records by id.
///
/// Each record has a single owner and edits overwrite it wholesale, so no
/// concurrency control is applied here.
pub struct ItemStore<K> {
    kv: Arc<K>,
}

impl<K> Clone for ItemStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
        }
    }
}

impl<K: KvStore> ItemStore<K> {
    /// Creates an item store over the given backend.
    #[must_use]
    pub const fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Upserts a task record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if encoding or the write fails.
    pub async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let bytes = codec::encode_task(task)?;
        self.kv.set(&item_key(&task.id), bytes).await?;
        Ok(())
    }

    /// Loads a task record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists, or
    /// [`StoreError::StorageFailure`] if the read or decoding fails.
    pub async fn get(&self, task_id: &TaskId) -> Result<Task, StoreError> {
        let bytes = self
            .kv
            .get(&item_key(task_id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        Ok(codec::decode_task(&bytes)?)
    }

    /// Deletes a task record. Deleting an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if the backend delete fails.
    pub async fn delete(&self, task_id: &TaskId) -> Result<(), StoreError> {
        self.kv.delete(&item_key(task_id)).await?;
        Ok(())
    }

    /// Loads a task record and then deletes it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists (nothing is
    /// deleted), or [`StoreError::StorageFailure`] if any step fails.
    pub async fn take(&self, task_id: &TaskId) -> Result<Task, StoreError> {
        let task = self.get(task_id).await?;
        self.delete(task_id).await?;
        Ok(task)
    }
}
