//! Version-checked saving with three-way merge.
//!
//! Every persisted whiteboard carries an integer `version`. A save first asks
//! the [`VersionOracle`] whether the stored version is ahead of the local one;
//! if so the local document is reconciled with the stored one by
//! [`resolve_conflicts`] before being written back with `version + 1`.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use whiteboard::storage::{BoardStorage, MemoryGateway};
//! use whiteboard::sync::SyncController;
//!
//! # async fn demo() -> Result<(), whiteboard::sync::SyncError> {
//! let storage = BoardStorage::default_board(Arc::new(MemoryGateway::new()));
//! let controller = SyncController::new(storage);
//!
//! let local = controller.load().await?;
//! let saved = controller.save(&local).await?;
//! assert_eq!(saved.version(), local.version + 1);
//! # Ok(())
//! # }
//! ```

mod autosave;
mod controller;
mod error;
mod oracle;
mod resolver;

#[cfg(test)]
mod testing;

pub use autosave::{AutoSaveConfig, AutoSaver, SaveEvent, SaveOutcome, SaveTrigger, SharedStore};
pub use controller::{SaveResult, SyncController};
pub use error::SyncError;
pub use oracle::{VersionCheck, VersionOracle};
pub use resolver::{resolve_conflicts, ConflictRecord, Resolution, Strategy};
