//! Gateway that talks to a remote whiteboard API server.
//!
//! Keys map onto `/api/whiteboard/<board_id>`:
//! - `get` -> `GET` (404 means absent)
//! - `put` -> `POST` with the document as the JSON body
//! - `delete` -> `DELETE` (404 means nothing was stored)
//!
//! The server answers `GET` for an unknown board with an empty default
//! document, which the version check reads as version 0, the same as absent.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{board_id_from_key, Gateway, GatewayError};

/// Upper bound on any single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpGateway {
    server_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(server_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::HttpError(e.to_string()))?;

        Ok(Self {
            server_url: server_url.into(),
            client,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Builds the API URL for a storage key.
    fn board_url(&self, key: &str) -> Result<String, GatewayError> {
        let board_id =
            board_id_from_key(key).ok_or_else(|| GatewayError::InvalidKey(key.to_string()))?;

        // Bare hosts default to plain http
        let base_url = if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("http://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        Ok(format!(
            "{}/api/whiteboard/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(board_id)
        ))
    }
}

async fn unexpected(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    GatewayError::UnexpectedStatus(status, body)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let url = self.board_url(key)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::HttpError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| GatewayError::HttpError(e.to_string()))?;
                Ok(Some(body))
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let url = self.board_url(key)?;
        tracing::debug!("POST {} ({} bytes)", url, value.len());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| GatewayError::HttpError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(unexpected(response).await)
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, GatewayError> {
        let url = self.board_url(key)?;
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| GatewayError::HttpError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(unexpected(response).await),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WhiteboardDocument;
    use crate::server::{router, AppState};
    use crate::storage::{board_key, MemoryGateway};
    use std::sync::Arc;

    async fn spawn_server() -> (String, MemoryGateway) {
        let backend = MemoryGateway::new();
        let app = router(AppState::new(Arc::new(backend.clone())));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), backend)
    }

    #[test]
    fn test_board_url() {
        let gateway = HttpGateway::new("http://localhost:8080/").unwrap();
        assert_eq!(
            gateway.board_url("whiteboard_default").unwrap(),
            "http://localhost:8080/api/whiteboard/default"
        );
    }

    #[test]
    fn test_board_url_bare_host() {
        let gateway = HttpGateway::new("localhost:8080").unwrap();
        assert_eq!(
            gateway.board_url("whiteboard_team").unwrap(),
            "http://localhost:8080/api/whiteboard/team"
        );
    }

    #[test]
    fn test_board_url_encodes_board_id() {
        let gateway = HttpGateway::new("https://boards.example.com").unwrap();
        assert_eq!(
            gateway.board_url("whiteboard_my board").unwrap(),
            "https://boards.example.com/api/whiteboard/my%20board"
        );
    }

    #[test]
    fn test_board_url_rejects_foreign_keys() {
        let gateway = HttpGateway::new("http://localhost:8080").unwrap();
        assert!(matches!(
            gateway.board_url("settings"),
            Err(GatewayError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_roundtrip_against_server() {
        let (url, backend) = spawn_server().await;
        let gateway = HttpGateway::new(url).unwrap();
        let key = board_key("default");

        let mut doc = WhiteboardDocument::default();
        doc.version = 3;
        gateway.put(&key, &doc.to_json().unwrap()).await.unwrap();

        let stored = backend.get(&key).await.unwrap().unwrap();
        assert_eq!(WhiteboardDocument::from_json(&stored).unwrap().version, 3);

        let fetched = gateway.get(&key).await.unwrap().unwrap();
        let fetched = WhiteboardDocument::from_json(&fetched).unwrap();
        assert_eq!(fetched.version, 3);
        assert!(fetched.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_get_unknown_board_reads_as_version_zero() {
        let (url, _backend) = spawn_server().await;
        let gateway = HttpGateway::new(url).unwrap();

        let body = gateway.get(&board_key("nobody")).await.unwrap().unwrap();
        assert_eq!(WhiteboardDocument::from_json(&body).unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_delete_against_server() {
        let (url, _backend) = spawn_server().await;
        let gateway = HttpGateway::new(url).unwrap();
        let key = board_key("default");

        assert!(!gateway.delete(&key).await.unwrap());
        gateway
            .put(&key, &WhiteboardDocument::default().to_json().unwrap())
            .await
            .unwrap();
        assert!(gateway.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:1").unwrap();
        let result = gateway.get(&board_key("default")).await;
        assert!(matches!(result, Err(GatewayError::HttpError(_))));
    }
}
