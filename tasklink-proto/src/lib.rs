//! Shared data model and storage encoding for `TaskLink`.
//!
//! Everything the engine persists lives here: task content records, the
//! reference records that make up each user's lists, and the JSON codec
//! that reads both the current and the legacy list shape.

pub mod codec;
pub mod reference;
pub mod task;
pub mod view;
