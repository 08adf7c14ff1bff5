//! List manager: the task workflows shared between users.
//!
//! A task sent from A to B exists as two task records, one per user, joined
//! by a pair of cross-linked references: A's sent-list entry points at B's
//! copy and B's received-list entry points back at A's. The manager is the
//! only writer of references and keeps that pairing intact.
//!
//! Ordering rules for cross-user writes:
//! - create before link: task records are saved before any reference points
//!   at them, and a failure rolls the workflow back through a [`Saga`];
//! - delete after unlink: the caller's reference is removed first (this is
//!   the authoritative change), then task records and the counterpart's
//!   reference are cleaned up best-effort, logging failures.

use std::sync::Arc;

use tasklink_proto::reference::{ForeignLink, ListKind, Reference};
use tasklink_proto::task::{Task, TaskId};
use tasklink_proto::view::{ExtendedTask, ListCounts};

use super::ListError;
use super::saga::{Compensation, Saga};
use crate::config::EngineConfig;
use crate::directory::{DEFAULT_PLACEHOLDER_NAME, UserDirectory};
use crate::kv::KvStore;
use crate::store::{ItemStore, LocatedReference, ReferenceStore};

/// Result of sending a task to another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTask {
    /// The sender's copy, referenced from their sent list.
    pub sender_task_id: TaskId,
    /// The receiver's copy, referenced from their received list.
    pub receiver_task_id: TaskId,
}

/// Result of accepting a received task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedTask {
    /// The task's message.
    pub message: String,
    /// The sender, to be notified.
    pub foreign_user_id: Option<String>,
}

/// Result of completing or popping a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    /// The deleted content, if either copy could still be read.
    pub task: Option<Task>,
    /// The counterpart whose copy was also removed.
    pub foreign_user_id: Option<String>,
    /// List the caller's reference was removed from.
    pub list: ListKind,
}

/// Result of removing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedTask {
    /// The deleted content, if either copy could still be read.
    pub task: Option<Task>,
    /// The counterpart whose copy was also removed.
    pub foreign_user_id: Option<String>,
    /// List the caller's reference was removed from.
    pub list: ListKind,
    /// List the counterpart's reference was found in.
    pub foreign_list: Option<ListKind>,
}

impl RemovedTask {
    /// The caller held the sent copy: they withdrew a task they handed out.
    #[must_use]
    pub fn is_sender(&self) -> bool {
        self.list == ListKind::Sent
    }

    /// The counterpart held the sent copy: the caller declined a task they
    /// were handed.
    #[must_use]
    pub fn is_decline(&self) -> bool {
        self.foreign_list == Some(ListKind::Sent)
    }
}

/// Result of bumping a sent task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpedTask {
    /// The task's message, if either copy could be read.
    pub message: Option<String>,
    /// The receiver whose list was reordered.
    pub foreign_user_id: String,
    /// The receiver's copy.
    pub foreign_task_id: TaskId,
}

/// Result of editing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedTask {
    /// The counterpart whose copy was updated too.
    pub foreign_user_id: Option<String>,
    /// List the caller's reference is in.
    pub list: ListKind,
    /// Message before the edit.
    pub previous_message: String,
}

/// Result of changing a task's assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    /// The task's message.
    pub message: String,
    /// The assignee that lost their copy, to be notified.
    pub previous_owner: Option<String>,
}

/// What a delete-after-unlink cleanup managed to remove.
struct Released {
    task: Option<Task>,
    foreign_user_id: Option<String>,
    foreign_list: Option<ListKind>,
}

/// Orchestrates task workflows over the item and reference stores.
pub struct ListManager<K, D> {
    items: ItemStore<K>,
    references: ReferenceStore<K>,
    directory: D,
    placeholder_name: String,
}

impl<K: KvStore, D: UserDirectory> ListManager<K, D> {
    /// Creates a manager with default settings.
    #[must_use]
    pub fn new(kv: Arc<K>, directory: D) -> Self {
        Self {
            items: ItemStore::new(Arc::clone(&kv)),
            references: ReferenceStore::new(kv),
            directory,
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
        }
    }

    /// Creates a manager using the store and directory settings of `config`.
    #[must_use]
    pub fn with_config(kv: Arc<K>, directory: D, config: &EngineConfig) -> Self {
        Self {
            items: ItemStore::new(Arc::clone(&kv)),
            references: ReferenceStore::with_max_attempts(kv, config.cas_attempts),
            directory,
            placeholder_name: config.placeholder_name.clone(),
        }
    }

    /// The underlying item store.
    #[must_use]
    pub const fn items(&self) -> &ItemStore<K> {
        &self.items
    }

    /// The underlying reference store.
    #[must_use]
    pub const fn references(&self) -> &ReferenceStore<K> {
        &self.references
    }

    /// Creates a task in `user_id`'s owned list.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the failing step; the task record is
    /// deleted again if the reference could not be added.
    pub async fn add_task(
        &self,
        user_id: &str,
        message: &str,
        description: &str,
        origin_post_id: Option<&str>,
    ) -> Result<Task, ListError> {
        let mut saga = Saga::new("add");
        let result = self
            .add_steps(&mut saga, user_id, message, description, origin_post_id)
            .await;
        self.finish(saga, result).await
    }

    async fn add_steps(
        &self,
        saga: &mut Saga,
        user_id: &str,
        message: &str,
        description: &str,
        origin_post_id: Option<&str>,
    ) -> Result<Task, ListError> {
        let task = Task::new(message, description, origin_post_id);
        self.items.save(&task).await?;
        saga.record(Compensation::DeleteTask(task.id.clone()));

        self.references
            .add_reference(user_id, ListKind::Owned, Reference::local(task.id.clone()))
            .await?;

        tracing::debug!(user_id, task_id = %task.id, "task added");
        Ok(task)
    }

    /// Sends a new task from `sender_id` to `receiver_id`.
    ///
    /// Creates one task record per side and a cross-linked reference pair.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the failing step after undoing every
    /// step that had already succeeded.
    pub async fn send_task(
        &self,
        sender_id: &str,
        receiver_id: &str,
        message: &str,
        description: &str,
        origin_post_id: Option<&str>,
    ) -> Result<SentTask, ListError> {
        let mut saga = Saga::new("send");
        let result = self
            .send_steps(
                &mut saga,
                sender_id,
                receiver_id,
                message,
                description,
                origin_post_id,
            )
            .await;
        self.finish(saga, result).await
    }

    async fn send_steps(
        &self,
        saga: &mut Saga,
        sender_id: &str,
        receiver_id: &str,
        message: &str,
        description: &str,
        origin_post_id: Option<&str>,
    ) -> Result<SentTask, ListError> {
        let sender_task = Task::new(message, description, origin_post_id);
        let receiver_task = sender_task.duplicate();

        self.items.save(&sender_task).await?;
        saga.record(Compensation::DeleteTask(sender_task.id.clone()));

        self.items.save(&receiver_task).await?;
        saga.record(Compensation::DeleteTask(receiver_task.id.clone()));

        self.references
            .add_reference(
                sender_id,
                ListKind::Sent,
                Reference::linked(sender_task.id.clone(), receiver_id, receiver_task.id.clone()),
            )
            .await?;
        saga.record(Compensation::RemoveReference {
            user_id: sender_id.to_string(),
            kind: ListKind::Sent,
            task_id: sender_task.id.clone(),
        });

        self.references
            .add_reference(
                receiver_id,
                ListKind::Received,
                Reference::linked(receiver_task.id.clone(), sender_id, sender_task.id.clone()),
            )
            .await?;

        tracing::info!(
            sender_id,
            receiver_id,
            task_id = %receiver_task.id,
            "task sent"
        );
        Ok(SentTask {
            sender_task_id: sender_task.id,
            receiver_task_id: receiver_task.id,
        })
    }

    /// Returns a user's list with each task annotated by where its
    /// counterpart currently sits.
    ///
    /// Entries whose task record cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the list itself cannot be read.
    pub async fn get_list(
        &self,
        user_id: &str,
        kind: ListKind,
    ) -> Result<Vec<ExtendedTask>, ListError> {
        let references = self.references.get_list(user_id, kind).await?;
        let mut tasks = Vec::with_capacity(references.len());

        for reference in references {
            let task = match self.items.get(&reference.task_id).await {
                Ok(task) => task,
                Err(err) => {
                    tracing::debug!(
                        user_id,
                        list = %kind,
                        task_id = %reference.task_id,
                        error = %err,
                        "skipping unreadable list entry"
                    );
                    continue;
                }
            };
            tasks.push(self.extend(task, reference.link.as_ref()).await);
        }

        Ok(tasks)
    }

    /// Counts the entries of each of a user's lists.
    ///
    /// # Errors
    ///
    /// Returns an error if any list cannot be read.
    pub async fn count_lists(&self, user_id: &str) -> Result<ListCounts, ListError> {
        let mut counts = ListCounts::default();
        for kind in ListKind::SEARCH_ORDER {
            counts.set(kind, self.references.get_list(user_id, kind).await?.len());
        }
        Ok(counts)
    }

    /// Moves a received task into the user's owned list, keeping its link to
    /// the sender.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFound`] if the task is not in the received
    /// list, or the storage error of the failing step after rollback.
    pub async fn accept_task(
        &self,
        user_id: &str,
        task_id: &TaskId,
    ) -> Result<AcceptedTask, ListError> {
        let (reference, _) = self
            .references
            .get_reference(user_id, ListKind::Received, task_id)
            .await?
            .ok_or_else(|| {
                ListError::NotFound(format!("task {task_id} not received by {user_id}"))
            })?;
        let task = self.items.get(task_id).await?;

        let mut saga = Saga::new("accept");
        let result = self.accept_steps(&mut saga, user_id, reference).await;
        let foreign_user_id = self.finish(saga, result).await?;

        tracing::info!(user_id, task_id = %task_id, "task accepted");
        Ok(AcceptedTask {
            message: task.message,
            foreign_user_id,
        })
    }

    async fn accept_steps(
        &self,
        saga: &mut Saga,
        user_id: &str,
        reference: Reference,
    ) -> Result<Option<String>, ListError> {
        let task_id = reference.task_id.clone();
        let foreign_user_id = reference.foreign_user_id().map(ToString::to_string);

        self.references
            .add_reference(user_id, ListKind::Owned, reference)
            .await?;
        saga.record(Compensation::RemoveReference {
            user_id: user_id.to_string(),
            kind: ListKind::Owned,
            task_id: task_id.clone(),
        });

        self.references
            .remove_reference(user_id, ListKind::Received, &task_id)
            .await?;

        Ok(foreign_user_id)
    }

    /// Completes a task from whichever list holds it, deleting both copies.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFound`] if the user has no such task, or the
    /// error of removing the user's own reference. Cleanup of task records
    /// and of the counterpart's side is best-effort and only logged.
    pub async fn complete_task(
        &self,
        user_id: &str,
        task_id: &TaskId,
    ) -> Result<CompletedTask, ListError> {
        let located = self.locate(user_id, task_id).await?;
        self.references
            .remove_reference(user_id, located.kind, task_id)
            .await?;

        let released = self.release(user_id, &located.reference, "complete").await;
        tracing::info!(user_id, task_id = %task_id, list = %located.kind, "task completed");
        Ok(CompletedTask {
            task: released.task,
            foreign_user_id: released.foreign_user_id,
            list: located.kind,
        })
    }

    /// Removes a task from whichever list holds it, deleting both copies.
    ///
    /// Same as [`complete_task`](Self::complete_task), but reports which side
    /// held the sent copy so the caller can word the notification as a
    /// removal or a decline.
    ///
    /// # Errors
    ///
    /// Same as [`complete_task`](Self::complete_task).
    pub async fn remove_task(
        &self,
        user_id: &str,
        task_id: &TaskId,
    ) -> Result<RemovedTask, ListError> {
        let located = self.locate(user_id, task_id).await?;
        self.references
            .remove_reference(user_id, located.kind, task_id)
            .await?;

        let released = self.release(user_id, &located.reference, "remove").await;
        tracing::info!(user_id, task_id = %task_id, list = %located.kind, "task removed");
        Ok(RemovedTask {
            task: released.task,
            foreign_user_id: released.foreign_user_id,
            list: located.kind,
            foreign_list: released.foreign_list,
        })
    }

    /// Completes the task at the front of the user's owned list.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFound`] if the owned list is empty, in which
    /// case nothing is changed.
    pub async fn pop_task(&self, user_id: &str) -> Result<CompletedTask, ListError> {
        let reference = self
            .references
            .pop_reference(user_id, ListKind::Owned)
            .await?;

        let released = self.release(user_id, &reference, "pop").await;
        tracing::info!(user_id, task_id = %reference.task_id, "task popped");
        Ok(CompletedTask {
            task: released.task,
            foreign_user_id: released.foreign_user_id,
            list: ListKind::Owned,
        })
    }

    /// Moves a task the user sent to the front of the receiver's received
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFound`] if the task is not in the user's sent
    /// list or no longer in the receiver's received list.
    pub async fn bump_task(
        &self,
        user_id: &str,
        task_id: &TaskId,
    ) -> Result<BumpedTask, ListError> {
        let (reference, _) = self
            .references
            .get_reference(user_id, ListKind::Sent, task_id)
            .await?
            .ok_or_else(|| ListError::NotFound(format!("task {task_id} not sent by {user_id}")))?;
        let Some(link) = reference.link else {
            return Err(ListError::InvalidOperation(format!(
                "sent task {task_id} has no receiver"
            )));
        };

        self.references
            .bump_reference(&link.user_id, ListKind::Received, &link.task_id)
            .await?;

        let message = match self.items.get(&link.task_id).await {
            Ok(task) => Some(task.message),
            Err(err) => {
                tracing::warn!(
                    task_id = %link.task_id,
                    error = %err,
                    "cannot read receiver's copy after bump, using sender's"
                );
                match self.items.get(task_id).await {
                    Ok(task) => Some(task.message),
                    Err(err) => {
                        tracing::warn!(
                            task_id = %task_id,
                            error = %err,
                            "cannot read sender's copy after bump either"
                        );
                        None
                    }
                }
            }
        };

        tracing::info!(user_id, receiver_id = %link.user_id, task_id = %task_id, "task bumped");
        Ok(BumpedTask {
            message,
            foreign_user_id: link.user_id,
            foreign_task_id: link.task_id,
        })
    }

    /// Replaces a task's message and description on both copies.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFound`] if the user has no such task, or the
    /// error of saving the user's own copy. Updating the counterpart's copy
    /// is best-effort.
    pub async fn edit_task(
        &self,
        user_id: &str,
        task_id: &TaskId,
        message: &str,
        description: &str,
    ) -> Result<EditedTask, ListError> {
        let located = self.locate(user_id, task_id).await?;

        let mut task = self.items.get(task_id).await?;
        let previous_message = task.set_content(message, description);
        self.items.save(&task).await?;

        if let Some(link) = &located.reference.link {
            let synced = match self.items.get(&link.task_id).await {
                Ok(mut foreign) => {
                    foreign.set_content(message, description);
                    self.items.save(&foreign).await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = synced {
                tracing::warn!(
                    foreign_user_id = %link.user_id,
                    task_id = %link.task_id,
                    error = %err,
                    "cannot update counterpart copy after edit"
                );
            }
        }

        Ok(EditedTask {
            foreign_user_id: located.reference.foreign_user_id().map(ToString::to_string),
            list: located.kind,
            previous_message,
        })
    }

    /// Hands a task the user owns outright to `new_owner_id`, or takes it
    /// back when `new_owner_id` is the user.
    ///
    /// A previous assignee loses their copy. Their reference is removed
    /// before the new pair is linked, as part of the same rollback unit.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotFound`] if the user has no such task,
    /// [`ListError::InvalidOperation`] if it is in their received list or was
    /// accepted from someone else, or the storage error of the failing step
    /// (including removal of the previous assignee's reference) after
    /// rollback.
    pub async fn change_assignment(
        &self,
        task_id: &TaskId,
        user_id: &str,
        new_owner_id: &str,
    ) -> Result<Reassignment, ListError> {
        let located = self.locate(user_id, task_id).await?;
        let owned_outright = match located.kind {
            ListKind::Owned => located.reference.link.is_none(),
            ListKind::Sent => true,
            ListKind::Received => false,
        };
        if !owned_outright {
            return Err(ListError::InvalidOperation(format!(
                "task {task_id} is not owned by {user_id}"
            )));
        }

        let task = self.items.get(task_id).await?;
        let current_owner = located
            .reference
            .foreign_user_id()
            .unwrap_or(user_id);
        if current_owner == new_owner_id {
            return Ok(Reassignment {
                message: task.message,
                previous_owner: None,
            });
        }

        let mut saga = Saga::new("reassign");
        let result = self
            .change_steps(&mut saga, user_id, new_owner_id, &task, &located)
            .await;
        let discard_foreign = self.finish(saga, result).await?;

        let previous = located.reference.link;
        if let Some(link) = previous.as_ref().filter(|_| discard_foreign) {
            self.discard_task(&link.task_id, "reassign").await;
        }

        tracing::info!(user_id, new_owner_id, task_id = %task_id, "task reassigned");
        Ok(Reassignment {
            message: task.message,
            previous_owner: previous.map(|link| link.user_id),
        })
    }

    /// Detaches the previous assignee, then moves the user's reference.
    ///
    /// Returns whether the previous assignee's task record is now orphaned.
    async fn change_steps(
        &self,
        saga: &mut Saga,
        user_id: &str,
        new_owner_id: &str,
        task: &Task,
        located: &LocatedReference,
    ) -> Result<bool, ListError> {
        let orphaned = match &located.reference.link {
            Some(link) => self.detach_steps(saga, user_id, &task.id, link).await?,
            None => false,
        };

        if new_owner_id == user_id {
            self.reclaim_steps(saga, user_id, located).await?;
        } else {
            self.reassign_steps(saga, user_id, new_owner_id, task, located)
                .await?;
        }
        Ok(orphaned)
    }

    /// Removes the previous assignee's reference if it still links back to
    /// `(user_id, task_id)`.
    async fn detach_steps(
        &self,
        saga: &mut Saga,
        user_id: &str,
        task_id: &TaskId,
        link: &ForeignLink,
    ) -> Result<bool, ListError> {
        let Some(located) = self
            .references
            .get_reference_and_list_kind(&link.user_id, &link.task_id)
            .await?
        else {
            tracing::warn!(
                foreign_user_id = %link.user_id,
                task_id = %link.task_id,
                "previous assignee's reference already gone"
            );
            return Ok(true);
        };

        if !links_back(&located.reference, user_id, task_id) {
            tracing::warn!(
                foreign_user_id = %link.user_id,
                task_id = %link.task_id,
                "previous assignee's reference links elsewhere, leaving it"
            );
            return Ok(false);
        }

        self.references
            .remove_reference(&link.user_id, located.kind, &link.task_id)
            .await?;
        saga.record(Compensation::RestoreReference {
            user_id: link.user_id.clone(),
            kind: located.kind,
            reference: located.reference,
        });
        Ok(true)
    }

    /// Sent -> owned for the same user.
    async fn reclaim_steps(
        &self,
        saga: &mut Saga,
        user_id: &str,
        located: &LocatedReference,
    ) -> Result<(), ListError> {
        let task_id = &located.reference.task_id;

        self.references
            .remove_reference(user_id, located.kind, task_id)
            .await?;
        saga.record(Compensation::RestoreReference {
            user_id: user_id.to_string(),
            kind: located.kind,
            reference: located.reference.clone(),
        });

        self.references
            .add_reference(user_id, ListKind::Owned, Reference::local(task_id.clone()))
            .await?;
        Ok(())
    }

    /// Creates the new assignee's copy and relinks the user's reference.
    async fn reassign_steps(
        &self,
        saga: &mut Saga,
        user_id: &str,
        new_owner_id: &str,
        task: &Task,
        located: &LocatedReference,
    ) -> Result<(), ListError> {
        let receiver_task = task.duplicate();

        self.items.save(&receiver_task).await?;
        saga.record(Compensation::DeleteTask(receiver_task.id.clone()));

        self.references
            .add_reference(
                new_owner_id,
                ListKind::Received,
                Reference::linked(receiver_task.id.clone(), user_id, task.id.clone()),
            )
            .await?;
        saga.record(Compensation::RemoveReference {
            user_id: new_owner_id.to_string(),
            kind: ListKind::Received,
            task_id: receiver_task.id.clone(),
        });

        self.references
            .remove_reference(user_id, located.kind, &task.id)
            .await?;
        saga.record(Compensation::RestoreReference {
            user_id: user_id.to_string(),
            kind: located.kind,
            reference: located.reference.clone(),
        });

        self.references
            .add_reference(
                user_id,
                ListKind::Sent,
                Reference::linked(task.id.clone(), new_owner_id, receiver_task.id),
            )
            .await?;
        Ok(())
    }

    /// Display name for `user_id`, or the configured placeholder.
    pub async fn display_name(&self, user_id: &str) -> String {
        match self.directory.display_name(user_id).await {
            Ok(name) => name,
            Err(err) => {
                tracing::debug!(user_id, error = %err, "using placeholder display name");
                self.placeholder_name.clone()
            }
        }
    }

    async fn locate(&self, user_id: &str, task_id: &TaskId) -> Result<LocatedReference, ListError> {
        self.references
            .get_reference_and_list_kind(user_id, task_id)
            .await?
            .ok_or_else(|| {
                ListError::NotFound(format!("task {task_id} not in any list of {user_id}"))
            })
    }

    async fn extend(&self, task: Task, link: Option<&ForeignLink>) -> ExtendedTask {
        let Some(link) = link else {
            return ExtendedTask::local(task);
        };

        let located = match self
            .references
            .get_reference_and_list_kind(&link.user_id, &link.task_id)
            .await
        {
            Ok(located) => located,
            Err(err) => {
                tracing::debug!(
                    foreign_user_id = %link.user_id,
                    error = %err,
                    "cannot locate counterpart entry"
                );
                None
            }
        };

        ExtendedTask {
            task,
            foreign_user: Some(self.display_name(&link.user_id).await),
            foreign_list: located.as_ref().map(|l| l.kind),
            foreign_position: located.map(|l| l.position),
        }
    }

    /// Deletes the task behind `user_id`'s already-unlinked reference and, if
    /// shared, the counterpart's reference and copy. Best-effort.
    async fn release(
        &self,
        user_id: &str,
        reference: &Reference,
        workflow: &'static str,
    ) -> Released {
        let task = self.discard_task(&reference.task_id, workflow).await;
        let Some(link) = &reference.link else {
            return Released {
                task,
                foreign_user_id: None,
                foreign_list: None,
            };
        };

        let (foreign_list, foreign_task) = self
            .release_counterpart(user_id, &reference.task_id, link, workflow)
            .await;
        Released {
            task: task.or(foreign_task),
            foreign_user_id: Some(link.user_id.clone()),
            foreign_list,
        }
    }

    /// Removes the counterpart's reference from whichever list holds it and
    /// deletes their copy. Best-effort.
    ///
    /// An entry that no longer links back to `(user_id, task_id)` belongs to
    /// another pair and is left alone, together with its task record.
    async fn release_counterpart(
        &self,
        user_id: &str,
        task_id: &TaskId,
        link: &ForeignLink,
        workflow: &'static str,
    ) -> (Option<ListKind>, Option<Task>) {
        let foreign_list = match self
            .references
            .get_reference_and_list_kind(&link.user_id, &link.task_id)
            .await
        {
            Ok(Some(located)) if links_back(&located.reference, user_id, task_id) => {
                if let Err(err) = self
                    .references
                    .remove_reference(&link.user_id, located.kind, &link.task_id)
                    .await
                {
                    tracing::warn!(
                        workflow,
                        foreign_user_id = %link.user_id,
                        task_id = %link.task_id,
                        error = %err,
                        "cannot clean counterpart list"
                    );
                }
                Some(located.kind)
            }
            Ok(Some(located)) => {
                tracing::warn!(
                    workflow,
                    foreign_user_id = %link.user_id,
                    task_id = %link.task_id,
                    list = %located.kind,
                    "counterpart reference links elsewhere, leaving it"
                );
                return (None, None);
            }
            Ok(None) => {
                tracing::warn!(
                    workflow,
                    foreign_user_id = %link.user_id,
                    task_id = %link.task_id,
                    "counterpart reference already gone"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    workflow,
                    foreign_user_id = %link.user_id,
                    error = %err,
                    "cannot read counterpart lists, keeping their copy"
                );
                return (None, None);
            }
        };

        let task = self.discard_task(&link.task_id, workflow).await;
        (foreign_list, task)
    }

    async fn discard_task(&self, task_id: &TaskId, workflow: &'static str) -> Option<Task> {
        match self.items.take(task_id).await {
            Ok(task) => Some(task),
            Err(err) => {
                tracing::warn!(workflow, task_id = %task_id, error = %err, "cannot delete task record");
                None
            }
        }
    }

    /// Commits the saga on success, compensates it on failure.
    async fn finish<T>(&self, saga: Saga, result: Result<T, ListError>) -> Result<T, ListError> {
        match result {
            Ok(value) => {
                saga.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(error = %err, steps = saga.len(), "workflow failed, compensating");
                saga.compensate(&self.items, &self.references).await;
                Err(err)
            }
        }
    }
}

/// Whether `reference` points at `(user_id, task_id)`.
fn links_back(reference: &Reference, user_id: &str, task_id: &TaskId) -> bool {
    reference
        .link
        .as_ref()
        .is_some_and(|link| link.user_id == user_id && link.task_id == *task_id)
}
