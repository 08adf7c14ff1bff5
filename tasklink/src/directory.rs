//! Display-name lookup for counterpart users.
//!
//! The engine only shows names in list views; ids are what it stores. A
//! failed lookup is never fatal: the manager substitutes a placeholder.

use std::collections::HashMap;

/// Default name shown when a user cannot be resolved.
pub const DEFAULT_PLACEHOLDER_NAME: &str = "Someone";

/// Errors returned by a [`UserDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// No user with this id exists.
    #[error("unknown user: {0}")]
    UnknownUser(String),
    /// The directory could not be queried.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves user ids to human-readable names.
pub trait UserDirectory: Send + Sync {
    /// Returns the display name for `user_id`.
    fn display_name(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<String, DirectoryError>> + Send;
}

/// A fixed id-to-name table.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
}

impl StaticDirectory {
    /// Creates an empty directory; every lookup fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user's name.
    #[must_use]
    pub fn with_user(mut self, user_id: &str, name: &str) -> Self {
        self.names.insert(user_id.to_string(), name.to_string());
        self
    }
}

impl UserDirectory for StaticDirectory {
    async fn display_name(&self, user_id: &str) -> Result<String, DirectoryError> {
        self.names
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownUser(user_id.to_string()))
    }
}
