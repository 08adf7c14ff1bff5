//! Compensation for multi-step workflows.
//!
//! The backend has no multi-key transactions. A workflow that writes several
//! keys records, after each successful step, the action that would undo it.
//! On the first failing step the recorded actions run in reverse order; on
//! success the saga is committed and the actions are discarded.
//!
//! Compensation is best-effort: a failing undo is logged and the remaining
//! undos still run. The caller always returns the original error.

use tasklink_proto::reference::{ListKind, Reference};
use tasklink_proto::task::TaskId;

use crate::kv::KvStore;
use crate::store::{ItemStore, ReferenceStore};

/// An action that reverses one completed workflow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Delete a task record that the workflow saved.
    DeleteTask(TaskId),
    /// Remove a reference that the workflow added.
    RemoveReference {
        /// Owner of the list.
        user_id: String,
        /// List the reference was added to.
        kind: ListKind,
        /// Task id of the added reference.
        task_id: TaskId,
    },
    /// Put back a reference that the workflow removed. The entry is appended,
    /// so its original position is not restored.
    RestoreReference {
        /// Owner of the list.
        user_id: String,
        /// List the reference was removed from.
        kind: ListKind,
        /// The removed entry.
        reference: Reference,
    },
}

/// Ordered log of compensating actions for one workflow run.
#[derive(Debug)]
#[must_use = "a saga must be committed or compensated"]
pub struct Saga {
    workflow: &'static str,
    steps: Vec<Compensation>,
}

impl Saga {
    /// Starts an empty saga for the named workflow.
    pub const fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            steps: Vec::new(),
        }
    }

    /// Records the undo action for a step that just succeeded.
    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if no steps were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Marks the workflow as complete, discarding the undo log.
    pub fn commit(self) {
        tracing::trace!(
            workflow = self.workflow,
            steps = self.steps.len(),
            "workflow committed"
        );
    }

    /// Runs the recorded undo actions newest-first.
    ///
    /// Returns the number of undo actions that failed.
    pub async fn compensate<K: KvStore>(
        self,
        items: &ItemStore<K>,
        references: &ReferenceStore<K>,
    ) -> usize {
        let workflow = self.workflow;
        let mut failures = 0;

        for step in self.steps.into_iter().rev() {
            let result = match &step {
                Compensation::DeleteTask(task_id) => items.delete(task_id).await,
                Compensation::RemoveReference {
                    user_id,
                    kind,
                    task_id,
                } => references
                    .remove_reference(user_id, *kind, task_id)
                    .await
                    .map(|_| ()),
                Compensation::RestoreReference {
                    user_id,
                    kind,
                    reference,
                } => {
                    references
                        .add_reference(user_id, *kind, reference.clone())
                        .await
                }
            };

            if let Err(err) = result {
                failures += 1;
                tracing::warn!(
                    workflow,
                    step = ?step,
                    error = %err,
                    "compensation step failed"
                );
            }
        }

        if failures == 0 {
            tracing::debug!(workflow, "workflow rolled back");
        }
        failures
    }
}
