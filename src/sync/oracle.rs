use crate::models::WhiteboardDocument;
use crate::storage::BoardStorage;

/// Outcome of comparing a local version against the stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionCheck {
    pub has_conflict: bool,
    /// The remote document, present only when `has_conflict` is set.
    pub remote_data: Option<WhiteboardDocument>,
    pub local_version: u64,
    /// `None` when the remote could not be fetched.
    pub remote_version: Option<u64>,
    /// Fetch failure that was swallowed.
    pub error: Option<String>,
}

/// Detects remote writes the local document has not seen.
///
/// Trusts the `version` field entirely: a writer that persisted without
/// incrementing it is invisible here.
#[derive(Debug, Clone)]
pub struct VersionOracle {
    storage: BoardStorage,
}

impl VersionOracle {
    pub fn new(storage: BoardStorage) -> Self {
        Self { storage }
    }

    /// Reports a conflict iff the stored version is greater than `local_version`.
    ///
    /// An absent or undecodable remote counts as version 0. A failed fetch is
    /// reported as "no conflict" with the error attached, so saves keep
    /// working while the remote is unreachable.
    pub async fn check_for_conflicts(&self, local_version: u64) -> VersionCheck {
        let remote = match self.storage.fetch().await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(
                    "Version check for board '{}' failed, assuming no conflict: {}",
                    self.storage.board_id(),
                    e
                );
                return VersionCheck {
                    has_conflict: false,
                    remote_data: None,
                    local_version,
                    remote_version: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let remote_version = remote.as_ref().map(|doc| doc.version).unwrap_or(0);
        let has_conflict = remote_version > local_version;

        if has_conflict {
            tracing::info!(
                "Board '{}' changed remotely: local v{} vs remote v{}",
                self.storage.board_id(),
                local_version,
                remote_version
            );
        } else {
            tracing::debug!(
                "Board '{}' up to date: local v{} remote v{}",
                self.storage.board_id(),
                local_version,
                remote_version
            );
        }

        VersionCheck {
            has_conflict,
            remote_data: if has_conflict { remote } else { None },
            local_version,
            remote_version: Some(remote_version),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{GatewayError, MemoryGateway};
    use crate::sync::testing::FlakyGateway;
    use std::sync::Arc;

    async fn oracle_with_remote(version: Option<u64>) -> VersionOracle {
        let gateway = MemoryGateway::new();
        let storage = BoardStorage::default_board(Arc::new(gateway));
        if let Some(version) = version {
            let doc = WhiteboardDocument {
                version,
                ..Default::default()
            };
            storage.store(&doc).await.unwrap();
        }
        VersionOracle::new(storage)
    }

    #[tokio::test]
    async fn test_newer_remote_is_conflict() {
        let oracle = oracle_with_remote(Some(4)).await;
        let check = oracle.check_for_conflicts(3).await;

        assert!(check.has_conflict);
        assert_eq!(check.remote_version, Some(4));
        assert_eq!(check.local_version, 3);
        assert_eq!(check.remote_data.unwrap().version, 4);
    }

    #[tokio::test]
    async fn test_equal_version_is_not_conflict() {
        let oracle = oracle_with_remote(Some(3)).await;
        let check = oracle.check_for_conflicts(3).await;

        assert!(!check.has_conflict);
        assert!(check.remote_data.is_none());
        assert_eq!(check.remote_version, Some(3));
    }

    #[tokio::test]
    async fn test_older_remote_is_not_conflict() {
        let oracle = oracle_with_remote(Some(1)).await;
        assert!(!oracle.check_for_conflicts(3).await.has_conflict);
    }

    #[tokio::test]
    async fn test_absent_remote_is_version_zero() {
        let oracle = oracle_with_remote(None).await;

        let check = oracle.check_for_conflicts(0).await;
        assert!(!check.has_conflict);
        assert_eq!(check.remote_version, Some(0));
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_open() {
        let gateway = FlakyGateway::new();
        gateway.fail_gets(true);
        let oracle = VersionOracle::new(BoardStorage::default_board(Arc::new(gateway)));

        let check = oracle.check_for_conflicts(2).await;

        assert!(!check.has_conflict);
        assert!(check.remote_version.is_none());
        let error = check.error.unwrap();
        assert!(error.contains(&GatewayError::HttpError("offline".into()).to_string()));
    }
}
