//! Read-side views handed to presentation layers.

use serde::{Deserialize, Serialize};

use crate::reference::ListKind;
use crate::task::Task;

/// A task annotated with where its counterpart copy currently sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedTask {
    /// The caller's own task record.
    #[serde(flatten)]
    pub task: Task,
    /// Display name of the counterpart user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_user: Option<String>,
    /// List the counterpart copy is currently in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_list: Option<ListKind>,
    /// 0-based position of the counterpart copy in that list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_position: Option<usize>,
}

impl ExtendedTask {
    /// Wraps a task that has no counterpart.
    #[must_use]
    pub const fn local(task: Task) -> Self {
        Self {
            task,
            foreign_user: None,
            foreign_list: None,
            foreign_position: None,
        }
    }
}

/// Number of entries in each of a user's lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCounts {
    /// Entries in the owned list.
    pub owned: usize,
    /// Entries in the sent list.
    pub sent: usize,
    /// Entries in the received list.
    pub received: usize,
}

impl ListCounts {
    /// Count for a single list.
    #[must_use]
    pub const fn get(&self, kind: ListKind) -> usize {
        match kind {
            ListKind::Owned => self.owned,
            ListKind::Sent => self.sent,
            ListKind::Received => self.received,
        }
    }

    /// Sets the count for a single list.
    pub const fn set(&mut self, kind: ListKind, count: usize) {
        match kind {
            ListKind::Owned => self.owned = count,
            ListKind::Sent => self.sent = count,
            ListKind::Received => self.received = count,
        }
    }

    /// Sum over all three lists.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.owned + self.sent + self.received
    }
}
