mod board;
mod config_cmd;
mod note;
mod section;
mod session;
mod sync_cmd;

use clap::ValueEnum;
use std::sync::Arc;

use whiteboard::config::Config;
use whiteboard::models::WhiteboardDocument;
use whiteboard::storage::{BoardStorage, FileGateway, GatewayError, HttpGateway};
use whiteboard::store::DocumentStore;
use whiteboard::sync::SyncController;

pub use board::{clear, init, show};
pub use config_cmd::ConfigCommand;
pub use note::NoteCommand;
pub use section::SectionCommand;
pub use session::run as run_session;
pub use sync_cmd::{delete_board, pull, save, status};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The local working copy of a board and its remote counterpart.
pub struct Workspace {
    local: BoardStorage,
    remote: SyncController,
}

impl Workspace {
    pub fn open(config: &Config) -> Result<Self, GatewayError> {
        let board_id = config.board_id.value.clone();
        let local = BoardStorage::new(
            Arc::new(FileGateway::new(config.data_dir.value.clone())),
            board_id.clone(),
        );
        let remote = SyncController::new(BoardStorage::new(
            Arc::new(HttpGateway::new(config.server_url.value.clone())?),
            board_id,
        ));
        Ok(Self { local, remote })
    }

    pub fn board_id(&self) -> &str {
        self.local.board_id()
    }

    pub async fn load_store(&self) -> Result<DocumentStore, GatewayError> {
        Ok(DocumentStore::from_document(self.local.load().await?))
    }

    /// Writes the store back as the local working copy. Unsaved edits are
    /// stamped with the current time so they read as newer than the last sync.
    pub async fn commit(&self, store: &DocumentStore) -> Result<(), GatewayError> {
        if store.is_dirty() {
            self.local.store(&store.snapshot()).await
        } else {
            self.local.store(store.document()).await
        }
    }
}

/// Whether the working copy was edited after it was last synced.
pub fn has_unsynced_changes(doc: &WhiteboardDocument) -> bool {
    match (doc.last_updated, doc.timestamp) {
        (Some(edited), Some(synced)) => edited > synced,
        (_, None) => !doc.notes.is_empty() || !doc.sections.is_empty(),
        (None, Some(_)) => false,
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use whiteboard::models::Note;

    #[test]
    fn test_unsynced_changes() {
        let now = Utc::now();
        let mut doc = WhiteboardDocument::default();
        assert!(!has_unsynced_changes(&doc));

        doc.notes.push(Note::new(1, "a"));
        assert!(has_unsynced_changes(&doc));

        doc.timestamp = Some(now);
        doc.last_updated = Some(now - Duration::seconds(5));
        assert!(!has_unsynced_changes(&doc));

        doc.last_updated = Some(now + Duration::seconds(5));
        assert!(has_unsynced_changes(&doc));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long note body", 10), "a very ...");
        assert_eq!(truncate("abcdef", 2), "...");
        assert_eq!(truncate("abcdef", 0), "...");
    }
}
