use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::AppState;
use crate::models::WhiteboardDocument;
use crate::storage::{
    validate_board_id, BoardStorage, DeleteOutcome, GatewayError, DEFAULT_BOARD_ID,
};

/// Errors returned by the board endpoints.
#[derive(Debug)]
pub enum ApiError {
    /// Board id would escape the storage namespace.
    InvalidBoard(String),
    /// Request body was not a whiteboard document. Answered as a server
    /// failure, the same as any other failed save.
    InvalidBody(String),
    /// Backend failed to read or write.
    Storage(GatewayError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidBoard(id) => write!(f, "Invalid board id: {}", id),
            ApiError::InvalidBody(e) => write!(f, "Invalid body: {}", e),
            ApiError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidKey(id) => ApiError::InvalidBoard(id),
            e => ApiError::Storage(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::InvalidBoard(_) => (StatusCode::BAD_REQUEST, "invalid_board"),
            ApiError::InvalidBody(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_body"),
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct StatusMessage {
    success: bool,
    message: &'static str,
}

fn board(state: &AppState, board_id: String) -> Result<BoardStorage, ApiError> {
    validate_board_id(&board_id).map_err(|_| ApiError::InvalidBoard(board_id.clone()))?;
    Ok(BoardStorage::new(state.gateway.clone(), board_id))
}

async fn load(state: &AppState, board_id: String) -> Result<Json<WhiteboardDocument>, ApiError> {
    let storage = board(state, board_id)?;
    Ok(Json(storage.load().await?))
}

async fn save(
    state: &AppState,
    board_id: String,
    body: Result<Json<WhiteboardDocument>, JsonRejection>,
) -> Result<Json<StatusMessage>, ApiError> {
    let storage = board(state, board_id)?;
    let Json(mut doc) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    doc.timestamp = Some(Utc::now());
    storage.store(&doc).await?;

    tracing::info!(
        "Stored board '{}' v{} ({} notes, {} sections)",
        storage.board_id(),
        doc.version,
        doc.notes.len(),
        doc.sections.len()
    );

    Ok(Json(StatusMessage {
        success: true,
        message: "Saved successfully",
    }))
}

async fn delete(
    state: &AppState,
    board_id: String,
) -> Result<(StatusCode, Json<StatusMessage>), ApiError> {
    let storage = board(state, board_id)?;

    match storage.delete().await? {
        DeleteOutcome::Deleted => {
            tracing::info!("Deleted board '{}'", storage.board_id());
            Ok((
                StatusCode::OK,
                Json(StatusMessage {
                    success: true,
                    message: "Deleted successfully",
                }),
            ))
        }
        DeleteOutcome::NotFound => Ok((
            StatusCode::NOT_FOUND,
            Json(StatusMessage {
                success: false,
                message: "Board not found, nothing to delete",
            }),
        )),
    }
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> Result<Json<WhiteboardDocument>, ApiError> {
    load(&state, board_id).await
}

pub async fn get_default_board(
    State(state): State<AppState>,
) -> Result<Json<WhiteboardDocument>, ApiError> {
    load(&state, DEFAULT_BOARD_ID.to_string()).await
}

pub async fn save_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    body: Result<Json<WhiteboardDocument>, JsonRejection>,
) -> Result<Json<StatusMessage>, ApiError> {
    save(&state, board_id, body).await
}

pub async fn save_default_board(
    State(state): State<AppState>,
    body: Result<Json<WhiteboardDocument>, JsonRejection>,
) -> Result<Json<StatusMessage>, ApiError> {
    save(&state, DEFAULT_BOARD_ID.to_string(), body).await
}

pub async fn delete_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> Result<(StatusCode, Json<StatusMessage>), ApiError> {
    delete(&state, board_id).await
}

pub async fn delete_default_board(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StatusMessage>), ApiError> {
    delete(&state, DEFAULT_BOARD_ID.to_string()).await
}

pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "method_not_allowed",
            message: "Method not allowed".to_string(),
        }),
    )
        .into_response()
}
