//! Sync error types.

use crate::storage::GatewayError;

/// Errors surfaced by the sync controller.
///
/// Version-check failures never appear here: the oracle fails open and
/// reports them inside [`super::VersionCheck`].
#[derive(Debug)]
pub enum SyncError {
    /// Remote document could not be fetched for an explicit load
    FetchFailed(GatewayError),
    /// Remote write failed; nothing local was changed
    PersistFailed(GatewayError),
    /// Remote delete failed
    DeleteFailed(GatewayError),
}

impl SyncError {
    pub fn gateway_error(&self) -> &GatewayError {
        match self {
            SyncError::FetchFailed(e) | SyncError::PersistFailed(e) | SyncError::DeleteFailed(e) => e,
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::FetchFailed(e) => write!(f, "Failed to load whiteboard: {}", e),
            SyncError::PersistFailed(e) => write!(f, "Failed to save whiteboard: {}", e),
            SyncError::DeleteFailed(e) => write!(f, "Failed to delete whiteboard: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.gateway_error())
    }
}
