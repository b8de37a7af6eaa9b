use std::sync::Arc;

use super::{board_key, validate_board_id, Gateway, GatewayError, DEFAULT_BOARD_ID};
use crate::models::WhiteboardDocument;

/// Result of deleting a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing was stored for the board.
    NotFound,
}

/// Typed access to one board's document through any gateway.
#[derive(Clone)]
pub struct BoardStorage {
    gateway: Arc<dyn Gateway>,
    board_id: String,
}

impl BoardStorage {
    pub fn new(gateway: Arc<dyn Gateway>, board_id: impl Into<String>) -> Self {
        Self {
            gateway,
            board_id: board_id.into(),
        }
    }

    pub fn default_board(gateway: Arc<dyn Gateway>) -> Self {
        Self::new(gateway, DEFAULT_BOARD_ID)
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn key(&self) -> String {
        board_key(&self.board_id)
    }

    pub fn backend(&self) -> &'static str {
        self.gateway.name()
    }

    /// Fetches the stored document.
    ///
    /// Returns `Ok(None)` when nothing is stored. A stored value that does not
    /// decode is replaced by an empty board rather than reported as an error.
    pub async fn fetch(&self) -> Result<Option<WhiteboardDocument>, GatewayError> {
        validate_board_id(&self.board_id)?;
        let key = self.key();

        let value = self.gateway.get(&key).await?;
        tracing::debug!(
            "Fetched {} from {} backend: {}",
            key,
            self.gateway.name(),
            if value.is_some() { "found" } else { "absent" }
        );

        Ok(value.map(|text| WhiteboardDocument::decode_or_default(&text)))
    }

    /// Fetches the stored document, or a fresh empty board when absent.
    pub async fn load(&self) -> Result<WhiteboardDocument, GatewayError> {
        Ok(self
            .fetch()
            .await?
            .unwrap_or_else(WhiteboardDocument::fresh))
    }

    /// Writes the document exactly as given.
    pub async fn store(&self, doc: &WhiteboardDocument) -> Result<(), GatewayError> {
        validate_board_id(&self.board_id)?;
        let key = self.key();

        let payload = doc
            .to_json()
            .map_err(|e| GatewayError::EncodeError(e.to_string()))?;
        self.gateway.put(&key, &payload).await?;

        tracing::debug!(
            "Stored {} v{} to {} backend ({} bytes)",
            key,
            doc.version,
            self.gateway.name(),
            payload.len()
        );
        Ok(())
    }

    pub async fn delete(&self) -> Result<DeleteOutcome, GatewayError> {
        validate_board_id(&self.board_id)?;

        if self.gateway.delete(&self.key()).await? {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }
}

impl std::fmt::Debug for BoardStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStorage")
            .field("backend", &self.gateway.name())
            .field("board_id", &self.board_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNote, WhiteboardDocument};
    use crate::storage::MemoryGateway;

    fn setup() -> (BoardStorage, MemoryGateway) {
        let gateway = MemoryGateway::new();
        let storage = BoardStorage::default_board(Arc::new(gateway.clone()));
        (storage, gateway)
    }

    #[tokio::test]
    async fn test_fetch_absent() {
        let (storage, _gateway) = setup();
        assert!(storage.fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_absent_gives_default() {
        let (storage, _gateway) = setup();
        let doc = storage.load().await.unwrap();
        assert_eq!(doc.version, 0);
        assert!(doc.notes.is_empty());
        assert!(doc.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_store_then_fetch() {
        let (storage, gateway) = setup();
        let mut doc = WhiteboardDocument::default();
        doc.add_note(NewNote::default());
        doc.version = 2;

        storage.store(&doc).await.unwrap();

        assert!(gateway.get("whiteboard_default").await.unwrap().is_some());
        assert_eq!(storage.fetch().await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn test_malformed_value_becomes_default() {
        let (storage, gateway) = setup();
        gateway.put("whiteboard_default", "not json").await.unwrap();

        let doc = storage.fetch().await.unwrap().unwrap();
        assert_eq!(doc, WhiteboardDocument::default());
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let (storage, _gateway) = setup();
        assert_eq!(storage.delete().await.unwrap(), DeleteOutcome::NotFound);

        storage.store(&WhiteboardDocument::default()).await.unwrap();
        assert_eq!(storage.delete().await.unwrap(), DeleteOutcome::Deleted);
    }

    #[tokio::test]
    async fn test_invalid_board_id() {
        let storage = BoardStorage::new(Arc::new(MemoryGateway::new()), "../x");
        assert!(matches!(
            storage.load().await,
            Err(GatewayError::InvalidKey(_))
        ));
    }
}
