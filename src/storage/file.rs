//! File-backed gateway.
//!
//! Stores each key as a JSON file in the data directory:
//! ```text
//! <DATA_DIR>/
//!   whiteboard_default.json
//!   whiteboard_team.json
//! ```
//!
//! Writes go through a temp file and a rename so readers never observe a
//! half-written document. Each write gets its own temp file, so concurrent
//! writers to one key never share one; the last rename wins.

use async_trait::async_trait;
use rand::Rng;
use std::io;
use std::path::PathBuf;
use tokio::fs;

use super::{validate_board_id, Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct FileGateway {
    data_dir: PathBuf,
}

impl FileGateway {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the file path for a key, rejecting keys that could escape the
    /// data directory.
    fn path(&self, key: &str) -> Result<PathBuf, GatewayError> {
        validate_board_id(key).map_err(|_| GatewayError::InvalidKey(key.to_string()))?;
        Ok(self.data_dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl Gateway for FileGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let path = self.path(key)?;

        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GatewayError::IoError(path, e)),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let path = self.path(key)?;

        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| GatewayError::IoError(self.data_dir.clone(), e))?;

        let suffix: u64 = rand::rng().random();
        let temp_path = path.with_extension(format!("json.{:016x}.tmp", suffix));

        if let Err(e) = fs::write(&temp_path, value).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(GatewayError::IoError(temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(GatewayError::IoError(path, e));
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, GatewayError> {
        let path = self.path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GatewayError::IoError(path, e)),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
