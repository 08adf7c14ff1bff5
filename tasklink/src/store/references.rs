//! Per-user ordered reference lists with compare-and-set mutation.
//!
//! Each `(user, list kind)` pair is one stored value. Every mutation goes
//! through [`ReferenceStore::modify`]: read the list and its version token,
//! apply a pure transform, and write back only if the token is unchanged.
//! A lost race restarts from the read, up to the configured attempt budget,
//! after which the mutation fails with [`StoreError::Conflict`].
//!
//! Transforms run on every attempt, so checks such as duplicate detection
//! always see the freshest list. A transform error (missing or duplicate
//! entry) is terminal and returned immediately without retrying.

use std::sync::Arc;

use tasklink_proto::codec::{self, ListShape};
use tasklink_proto::reference::{ListKind, Reference};
use tasklink_proto::task::TaskId;

use super::{DEFAULT_CAS_ATTEMPTS, StoreError, list_key};
use crate::kv::KvStore;

/// A reference found by searching a user's lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedReference {
    /// List the entry was found in.
    pub kind: ListKind,
    /// The entry itself.
    pub reference: Reference,
    /// 0-based position within that list.
    pub position: usize,
}

/// A list as read from storage, with the bytes it was decoded from.
///
/// The raw bytes (or their absence) are the version token handed back to
/// `compare_and_set`.
struct Snapshot {
    references: Vec<Reference>,
    version: Option<Vec<u8>>,
}

/// Durable `(user, list kind) -> [Reference]` mapping.
pub struct ReferenceStore<K> {
    kv: Arc<K>,
    max_attempts: u32,
}

impl<K> Clone for ReferenceStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            max_attempts: self.max_attempts,
        }
    }
}

impl<K: KvStore> ReferenceStore<K> {
    /// Creates a reference store with the default attempt budget.
    #[must_use]
    pub const fn new(kv: Arc<K>) -> Self {
        Self::with_max_attempts(kv, DEFAULT_CAS_ATTEMPTS)
    }

    /// Creates a reference store with a custom attempt budget (at least 1).
    #[must_use]
    pub const fn with_max_attempts(kv: Arc<K>, max_attempts: u32) -> Self {
        Self {
            kv,
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }

    /// Appends a reference to the end of a list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEntry`] if the task id is already in
    /// the list, [`StoreError::Conflict`] if every attempt lost a race, or
    /// [`StoreError::StorageFailure`] on backend errors.
    pub async fn add_reference(
        &self,
        user_id: &str,
        kind: ListKind,
        reference: Reference,
    ) -> Result<(), StoreError> {
        self.modify(user_id, kind, |references| {
            if references.iter().any(|r| r.task_id == reference.task_id) {
                return Err(StoreError::DuplicateEntry(format!(
                    "task {} already in {kind} list of {user_id}",
                    reference.task_id
                )));
            }
            references.push(reference.clone());
            Ok(())
        })
        .await
    }

    /// Removes the entry for `task_id` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the entry is absent on the latest
    /// read, [`StoreError::Conflict`] if every attempt lost a race, or
    /// [`StoreError::StorageFailure`] on backend errors.
    pub async fn remove_reference(
        &self,
        user_id: &str,
        kind: ListKind,
        task_id: &TaskId,
    ) -> Result<Reference, StoreError> {
        self.modify(user_id, kind, |references| {
            let position = find(references, task_id)
                .ok_or_else(|| not_in_list(user_id, kind, task_id))?;
            Ok(references.remove(position))
        })
        .await
    }

    /// Removes and returns the entry at the front of a list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list is empty,
    /// [`StoreError::Conflict`] if every attempt lost a race, or
    /// [`StoreError::StorageFailure`] on backend errors.
    pub async fn pop_reference(
        &self,
        user_id: &str,
        kind: ListKind,
    ) -> Result<Reference, StoreError> {
        self.modify(user_id, kind, |references| {
            if references.is_empty() {
                return Err(StoreError::NotFound(format!(
                    "{kind} list of {user_id} is empty"
                )));
            }
            Ok(references.remove(0))
        })
        .await
    }

    /// Moves the entry for `task_id` to the front, keeping the relative order
    /// of all other entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the entry is absent,
    /// [`StoreError::Conflict`] if every attempt lost a race, or
    /// [`StoreError::StorageFailure`] on backend errors.
    pub async fn bump_reference(
        &self,
        user_id: &str,
        kind: ListKind,
        task_id: &TaskId,
    ) -> Result<(), StoreError> {
        self.modify(user_id, kind, |references| {
            let position = find(references, task_id)
                .ok_or_else(|| not_in_list(user_id, kind, task_id))?;
            references[..=position].rotate_right(1);
            Ok(())
        })
        .await
    }

    /// Looks up the entry for `task_id` and its position, without mutating.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if the list cannot be read.
    pub async fn get_reference(
        &self,
        user_id: &str,
        kind: ListKind,
        task_id: &TaskId,
    ) -> Result<Option<(Reference, usize)>, StoreError> {
        let mut references = self.get_list(user_id, kind).await?;
        Ok(find(&references, task_id).map(|position| (references.swap_remove(position), position)))
    }

    /// Searches the owned, sent and received lists, in that order, and
    /// returns the first entry for `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if a list cannot be read.
    pub async fn get_reference_and_list_kind(
        &self,
        user_id: &str,
        task_id: &TaskId,
    ) -> Result<Option<LocatedReference>, StoreError> {
        for kind in ListKind::SEARCH_ORDER {
            if let Some((reference, position)) = self.get_reference(user_id, kind, task_id).await? {
                return Ok(Some(LocatedReference {
                    kind,
                    reference,
                    position,
                }));
            }
        }
        Ok(None)
    }

    /// Returns a full list in stored order. An absent list is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if the list cannot be read or
    /// decoded.
    pub async fn get_list(
        &self,
        user_id: &str,
        kind: ListKind,
    ) -> Result<Vec<Reference>, StoreError> {
        Ok(self.load(&list_key(user_id, kind)).await?.references)
    }

    /// Reads a list and its version token.
    async fn load(&self, key: &str) -> Result<Snapshot, StoreError> {
        let Some(bytes) = self.kv.get(key).await? else {
            return Ok(Snapshot {
                references: Vec::new(),
                version: None,
            });
        };

        let decoded = codec::decode_list(&bytes)?;
        if decoded.shape == ListShape::Legacy {
            tracing::debug!(
                key,
                entries = decoded.references.len(),
                "read legacy list shape, upgrading in memory"
            );
        }

        Ok(Snapshot {
            references: decoded.references,
            version: Some(bytes),
        })
    }

    /// Read-modify-CAS-write with bounded retries.
    ///
    /// `transform` mutates the freshly read list in place and returns the
    /// operation's result; it runs once per attempt.
    async fn modify<R, F>(
        &self,
        user_id: &str,
        kind: ListKind,
        mut transform: F,
    ) -> Result<R, StoreError>
    where
        F: FnMut(&mut Vec<Reference>) -> Result<R, StoreError> + Send,
        R: Send,
    {
        let key = list_key(user_id, kind);

        for attempt in 1..=self.max_attempts {
            let Snapshot {
                mut references,
                version,
            } = self.load(&key).await?;

            let outcome = transform(&mut references)?;
            let bytes = codec::encode_list(&references)?;

            if self
                .kv
                .compare_and_set(&key, version.as_deref(), bytes)
                .await?
            {
                return Ok(outcome);
            }

            tracing::debug!(key = %key, attempt, "list changed concurrently, retrying");
        }

        tracing::warn!(
            key = %key,
            attempts = self.max_attempts,
            "giving up on list update after repeated conflicts"
        );
        Err(StoreError::Conflict(format!(
            "{key} changed on each of {} attempts",
            self.max_attempts
        )))
    }
}

fn find(references: &[Reference], task_id: &TaskId) -> Option<usize> {
    references.iter().position(|r| &r.task_id == task_id)
}

fn not_in_list(user_id: &str, kind: ListKind, task_id: &TaskId) -> StoreError {
    StoreError::NotFound(format!("task {task_id} not in {kind} list of {user_id}"))
}
