//! Key-value persistence gateway.
//!
//! Every backend speaks the same three operations over string keys and
//! string values. Whiteboards are stored under `whiteboard_<board_id>` with
//! the JSON document as the value.
//!
//! Backends:
//! - [`FileGateway`]: one JSON file per key in a data directory
//! - [`MemoryGateway`]: process-local map
//! - [`HttpGateway`]: a remote whiteboard API server

mod board;
mod file;
mod http;
mod memory;

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

pub use board::{BoardStorage, DeleteOutcome};
pub use file::FileGateway;
pub use http::HttpGateway;
pub use memory::MemoryGateway;

/// Board used when none is given.
pub const DEFAULT_BOARD_ID: &str = "default";

const KEY_PREFIX: &str = "whiteboard_";

/// Returns the storage key for a board.
pub fn board_key(board_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, board_id)
}

/// Recovers the board id from a storage key.
pub fn board_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
}

/// Validates a board id to prevent path traversal in file-backed storage.
pub fn validate_board_id(board_id: &str) -> Result<(), GatewayError> {
    if board_id.is_empty()
        || board_id.contains('/')
        || board_id.contains('\\')
        || board_id.contains("..")
        || board_id.starts_with('.')
    {
        return Err(GatewayError::InvalidKey(board_id.to_string()));
    }
    Ok(())
}

/// A last-write-wins key-value store.
///
/// There is no compare-and-swap: concurrent writers are reconciled by the
/// version check in [`crate::sync`], not here.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns `Ok(None)` when the key has never been written or was deleted.
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), GatewayError>;

    /// Returns `Ok(false)` when there was nothing stored under `key`.
    async fn delete(&self, key: &str) -> Result<bool, GatewayError>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}

/// Errors reported by gateway backends.
#[derive(Debug)]
pub enum GatewayError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// Request to a remote backend failed before a response arrived.
    HttpError(String),
    /// Remote backend answered with an unexpected status.
    UnexpectedStatus(u16, String),
    /// Key is not a valid whiteboard key.
    InvalidKey(String),
    /// Document could not be serialized for storage.
    EncodeError(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            GatewayError::HttpError(e) => write!(f, "HTTP error: {}", e),
            GatewayError::UnexpectedStatus(status, body) => {
                write!(f, "Server returned status {}: {}", status, body)
            }
            GatewayError::InvalidKey(key) => write!(f, "Invalid board key: {}", key),
            GatewayError::EncodeError(e) => write!(f, "Failed to encode document: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_key_format() {
        assert_eq!(board_key("default"), "whiteboard_default");
        assert_eq!(board_key("team-42"), "whiteboard_team-42");
    }

    #[test]
    fn test_board_id_from_key() {
        assert_eq!(board_id_from_key("whiteboard_default"), Some("default"));
        assert_eq!(board_id_from_key("other_default"), None);
    }

    #[test]
    fn test_validate_board_id() {
        assert!(validate_board_id("default").is_ok());
        assert!(validate_board_id("my-board").is_ok());
        assert!(validate_board_id("board_123").is_ok());

        assert!(validate_board_id("").is_err());
        assert!(validate_board_id("../evil").is_err());
        assert!(validate_board_id("foo/bar").is_err());
        assert!(validate_board_id("foo\\bar").is_err());
        assert!(validate_board_id(".hidden").is_err());
    }
}
