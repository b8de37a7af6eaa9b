//! Sticky-note whiteboard with version-checked saving.
//!
//! - [`models`]: notes, sections and the board document
//! - [`store`]: observable in-memory board with edit tracking
//! - [`storage`]: key-value gateways (file, memory, HTTP)
//! - [`sync`]: conflict detection, merge and auto-save
//! - [`server`]: the HTTP API the HTTP gateway talks to
//! - [`config`]: client configuration

pub mod config;
pub mod models;
pub mod server;
pub mod storage;
pub mod store;
pub mod sync;
