//! Local filesystem storage implementation.
//!
//! Stores the state as gzip-compressed JSON. Writes go to a sibling
//! `*.tmp` file which is renamed over the target, so a reader only ever sees
//! the previous snapshot or the new one.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{StateStore, WatchState};

/// Compressed snapshot on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage for the given snapshot path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and compress a state in memory.
    fn encode(state: &WatchState) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        serde_json::to_writer(&mut encoder, state)?;
        encoder.flush()?;
        Ok(encoder.finish()?)
    }

    /// Decompress and parse a snapshot.
    fn decode(bytes: &[u8]) -> Result<WatchState> {
        Ok(serde_json::from_reader(GzDecoder::new(bytes))?)
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl StateStore for LocalStorage {
    async fn load(&self) -> Result<WatchState> {
        match self.read_bytes().await? {
            Some(bytes) => {
                let state = Self::decode(&bytes)?;
                log::info!(
                    "Loaded state from {}: {} items, cursor {}, {} known",
                    self.path.display(),
                    state.universe.len(),
                    state.cursor,
                    state.facts.len()
                );
                Ok(state)
            }
            None => {
                log::warn!("No state found at {}, starting fresh", self.path.display());
                Ok(WatchState::default())
            }
        }
    }

    async fn save(&self, state: &WatchState) -> Result<()> {
        let bytes = Self::encode(state)?;
        write_atomic(&self.path, &bytes).await?;
        log::info!(
            "State saved to {} ({} bytes)",
            self.path.display(),
            bytes.len()
        );
        Ok(())
    }
}

/// Temporary sibling used while writing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Ensure parent directory exists.
async fn ensure_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Write bytes to the temporary sibling of `path` without publishing them.
async fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    ensure_dir(path).await?;

    let tmp = temp_path(path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    Ok(tmp)
}

/// Write bytes atomically (write to temp, then rename).
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = write_temp(path, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
