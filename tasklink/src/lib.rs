//! `TaskLink`: cross-user task lists over a compare-and-set key-value store.
//!
//! Each user has three ordered lists (owned, sent, received) of references
//! to task records. Sending a task creates a copy for the receiver and links
//! the two references to each other; [`lists::ListManager`] keeps such pairs
//! consistent across every workflow.

pub mod config;
pub mod directory;
pub mod kv;
pub mod lists;
pub mod logging;
pub mod reminder;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use directory::{DirectoryError, StaticDirectory, UserDirectory};
pub use kv::{KvError, KvStore, MemoryKv};
pub use lists::{ErrorKind, ListError, ListManager};
pub use reminder::ReminderStore;
pub use store::StoreError;
