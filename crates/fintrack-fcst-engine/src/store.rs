//! Persistence for trained model artifacts.
//!
//! Artifacts are opaque byte blobs to the stores; the service decides the
//! encoding. Saves are last-writer-wins, which is acceptable because two
//! concurrent trainings of the same key produce equally valid models.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::types::ArtifactKey;

/// Load/save access to persisted model artifacts.
pub trait ArtifactStore {
    /// The stored blob for a key, `None` when nothing was saved yet.
    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>>;

    /// Persist a blob under a key, replacing any previous value.
    fn save(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for Arc<S> {
    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn save(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        (**self).save(key, bytes)
    }
}

/// Artifact store backed by a process-local map. Nothing survives restarts.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        let map = self
            .blobs
            .read()
            .map_err(|e| EngineError::Store(format!("artifact store lock poisoned: {}", e)))?;
        Ok(map.get(&key.storage_key()).cloned())
    }

    fn save(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        let mut map = self
            .blobs
            .write()
            .map_err(|e| EngineError::Store(format!("artifact store lock poisoned: {}", e)))?;
        map.insert(key.storage_key(), bytes.to_vec());
        Ok(())
    }
}

/// Artifact store writing one file per key under a base directory.
///
/// Writes go through a temp file and a rename so a crash mid-write never
/// leaves a truncated artifact behind.
#[derive(Debug)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsArtifactStore { dir: dir.into() }
    }

    /// The file for a key. The storage key must stay a single path component
    /// under the base directory, so separators in it are rejected rather
    /// than joined.
    fn artifact_path(&self, key: &ArtifactKey) -> Result<PathBuf> {
        let storage_key = key.storage_key();
        if storage_key.contains(['/', '\\']) {
            return Err(EngineError::Store(format!(
                "artifact key {:?} contains a path separator",
                storage_key
            )));
        }
        Ok(self.dir.join(format!("{}.json", storage_key)))
    }

    fn io_error(path: &Path, action: &str, err: std::io::Error) -> EngineError {
        EngineError::Store(format!("{} {}: {}", action, path.display(), err))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        let path = self.artifact_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(key = %key, path = %path.display(), "loaded model artifact");
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(&path, "failed to read", err)),
        }
    }

    fn save(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        let path = self.artifact_path(key)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| Self::io_error(&self.dir, "failed to create", e))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| Self::io_error(&tmp, "failed to write", e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_error(&path, "failed to replace", e))?;

        info!(key = %key, path = %path.display(), "saved model artifact");
        Ok(())
    }
}
