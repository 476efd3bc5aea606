//! Key-value persistence port
//!
//! The station library only sees [`KeyValueStore`]; the desktop app injects a
//! [`FileStore`], tests use [`MemoryStore`].

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AppError, Result};

/// Blob storage addressed by string keys
pub trait KeyValueStore {
    /// Returns `None` when nothing is stored under `key`
    fn load(&self, key: &str) -> Result<Option<String>>;
    /// Replaces whatever is stored under `key`
    fn save(&self, key: &str, blob: &str) -> Result<()>;
    /// Removing a missing key is not an error
    fn clear(&self, key: &str) -> Result<()>;
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::Storage(format!("invalid key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("cannot read {:?}: {}", path, e))),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::Storage(format!("cannot create {:?}: {}", self.dir, e)))?;

        // Write-then-rename so readers never observe a partial snapshot
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob)
            .map_err(|e| AppError::Storage(format!("cannot write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| AppError::Storage(format!("cannot replace {:?}: {}", path, e)))?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("cannot remove {:?}: {}", path, e))),
        }
    }
}

/// In-memory store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
