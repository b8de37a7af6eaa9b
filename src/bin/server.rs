//! Whiteboard API Server
//!
//! Serves the whiteboard storage API used by the `whiteboard` CLI.
//!
//! # Configuration
//!
//! Environment variables:
//! - `WHITEBOARD_PORT`: Port to listen on (default: 8080)
//! - `WHITEBOARD_DATA_DIR`: Directory to store boards (default: ~/.local/share/whiteboard-server)
//! - `WHITEBOARD_BACKEND`: `file` or `memory` (default: file)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whiteboard::server::{router, AppState};
use whiteboard::storage::{FileGateway, Gateway, MemoryGateway};

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq)]
enum Backend {
    File,
    Memory,
}

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory to store board files
    data_dir: PathBuf,
    backend: Backend,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, String> {
        let port = std::env::var("WHITEBOARD_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("WHITEBOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("whiteboard-server")
            });

        let backend = match std::env::var("WHITEBOARD_BACKEND").as_deref() {
            Err(_) | Ok("file") => Backend::File,
            Ok("memory") => Backend::Memory,
            Ok(other) => return Err(format!("Unknown backend '{}'", other)),
        };

        Ok(Self {
            port,
            data_dir,
            backend,
        })
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whiteboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let gateway: Arc<dyn Gateway> = match config.backend {
        Backend::File => {
            // Ensure data directory exists
            if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
                tracing::error!("Failed to create data directory: {}", e);
                std::process::exit(1);
            }
            tracing::info!("Data directory: {}", config.data_dir.display());
            Arc::new(FileGateway::new(config.data_dir.clone()))
        }
        Backend::Memory => {
            tracing::warn!("Using in-memory backend, boards are lost on shutdown");
            Arc::new(MemoryGateway::new())
        }
    };

    let state = AppState::new(gateway);
    tracing::info!("Storage backend: {}", state.backend());
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
