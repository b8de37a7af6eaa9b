//! HTTP API for whiteboard storage.
//!
//! # Endpoints
//!
//! - `GET /health`: health check
//! - `GET /api/whiteboard/{board_id}`: stored board, or an empty one
//! - `POST|PUT /api/whiteboard/{board_id}`: store a board, stamping `timestamp`
//! - `DELETE /api/whiteboard/{board_id}`: remove a board
//!
//! `/api/whiteboard` without an id addresses the `default` board. Every
//! response carries permissive CORS headers and `OPTIONS` is answered with
//! `204 No Content`.

mod api;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::storage::Gateway;

pub use api::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn Gateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub fn backend(&self) -> &'static str {
        self.gateway.name()
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let board_routes = Router::new()
        .route(
            "/api/whiteboard",
            get(api::get_default_board)
                .post(api::save_default_board)
                .put(api::save_default_board)
                .delete(api::delete_default_board)
                .fallback(api::method_not_allowed),
        )
        .route(
            "/api/whiteboard/{board_id}",
            get(api::get_board)
                .post(api::save_board)
                .put(api::save_board)
                .delete(api::delete_board)
                .fallback(api::method_not_allowed),
        );

    Router::new()
        .route("/health", get(health))
        .merge(board_routes)
        .with_state(state)
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
}

/// Answers preflight requests and adds CORS headers to every response.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
