use chrono::Utc;

use super::error::SyncError;
use super::oracle::{VersionCheck, VersionOracle};
use super::resolver::{resolve_conflicts, ConflictRecord, Strategy};
use crate::models::WhiteboardDocument;
use crate::storage::{BoardStorage, DeleteOutcome};

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SaveResult {
    /// The document exactly as persisted, with its new version.
    pub document: WhiteboardDocument,
    /// Whether the remote had moved on and the local document was resolved against it.
    pub merged: bool,
    /// Remote version seen by the version check, if the check succeeded.
    pub remote_version: Option<u64>,
    pub conflicts: Vec<ConflictRecord>,
}

impl SaveResult {
    pub fn version(&self) -> u64 {
        self.document.version
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Orchestrates version-checked saves for one board.
///
/// Save sequence:
/// 1. Ask the oracle whether the stored version is ahead of the local one
/// 2. If it is, resolve the local document against the remote one
/// 3. Persist the result with its version incremented by one
///
/// The local document is only borrowed, so a failed save leaves the caller's
/// state as it was and the same document can be retried.
#[derive(Debug, Clone)]
pub struct SyncController {
    storage: BoardStorage,
    oracle: VersionOracle,
}

impl SyncController {
    pub fn new(storage: BoardStorage) -> Self {
        let oracle = VersionOracle::new(storage.clone());
        Self { storage, oracle }
    }

    pub fn board_id(&self) -> &str {
        self.storage.board_id()
    }

    pub fn storage(&self) -> &BoardStorage {
        &self.storage
    }

    pub async fn check(&self, local_version: u64) -> VersionCheck {
        self.oracle.check_for_conflicts(local_version).await
    }

    /// Loads the stored board, or an empty one when nothing is stored.
    pub async fn load(&self) -> Result<WhiteboardDocument, SyncError> {
        let doc = self.storage.load().await.map_err(SyncError::FetchFailed)?;
        tracing::info!(
            "Loaded board '{}' v{} ({} notes, {} sections)",
            self.board_id(),
            doc.version,
            doc.notes.len(),
            doc.sections.len()
        );
        Ok(doc)
    }

    /// Saves with the default merge strategy.
    pub async fn save(&self, local: &WhiteboardDocument) -> Result<SaveResult, SyncError> {
        self.save_with(local, Strategy::Merge).await
    }

    pub async fn save_with(
        &self,
        local: &WhiteboardDocument,
        strategy: Strategy,
    ) -> Result<SaveResult, SyncError> {
        let check = self.oracle.check_for_conflicts(local.version).await;

        let (mut outgoing, conflicts, merged) = match check.remote_data {
            Some(remote) if check.has_conflict => {
                let resolution = resolve_conflicts(local, &remote, strategy);
                tracing::info!(
                    "Resolved board '{}' with {} strategy: {} conflict(s)",
                    self.board_id(),
                    strategy,
                    resolution.conflict_count()
                );
                (resolution.merged, resolution.conflicts, true)
            }
            _ => (local.clone(), Vec::new(), false),
        };

        outgoing.version += 1;
        outgoing.timestamp = Some(Utc::now());

        self.storage
            .store(&outgoing)
            .await
            .map_err(SyncError::PersistFailed)?;

        tracing::info!(
            "Saved board '{}' as v{} via {} backend",
            self.board_id(),
            outgoing.version,
            self.storage.backend()
        );

        Ok(SaveResult {
            document: outgoing,
            merged,
            remote_version: check.remote_version,
            conflicts,
        })
    }

    /// Removes the stored board entirely.
    pub async fn delete_board(&self) -> Result<DeleteOutcome, SyncError> {
        let outcome = self
            .storage
            .delete()
            .await
            .map_err(SyncError::DeleteFailed)?;

        match outcome {
            DeleteOutcome::Deleted => tracing::info!("Deleted board '{}'", self.board_id()),
            DeleteOutcome::NotFound => {
                tracing::info!("Board '{}' not stored, nothing to delete", self.board_id())
            }
        }
        Ok(outcome)
    }
}
