use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Gateway, GatewayError};

/// Process-local gateway. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, GatewayError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_entries() {
        let gateway = MemoryGateway::new();
        let other = gateway.clone();

        gateway.put("whiteboard_a", "x").await.unwrap();

        assert_eq!(other.get("whiteboard_a").await.unwrap().as_deref(), Some("x"));
        assert_eq!(other.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let gateway = MemoryGateway::new();
        assert!(!gateway.delete("whiteboard_a").await.unwrap());

        gateway.put("whiteboard_a", "x").await.unwrap();
        assert!(gateway.delete("whiteboard_a").await.unwrap());
        assert!(gateway.is_empty().await);
    }
}
