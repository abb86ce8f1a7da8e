//! Local persistence of a single JSON document.
//!
//! Content lives at `<dir>/<key>.json`. It is read on first access and kept
//! in memory; nothing reaches disk until [`Storage::save`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StorageError;

pub const DEFAULT_KEY: &str = "storage";

/// Directory name under the platform data dir.
const APP_NAME: &str = "carbon";

#[derive(Debug)]
pub struct Storage {
    dir: PathBuf,
    key: String,
    content: Option<Value>,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
            content: None,
        }
    }

    /// Storage under the platform data directory (`~/.local/share/carbon`).
    pub fn open_default(key: &str) -> Result<Self, StorageError> {
        let dir = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(dir.join(APP_NAME), key))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    /// The stored document, loading it on first use. A missing file reads
    /// as `{}`; an unreadable or corrupt one is discarded and reset.
    pub fn content(&mut self) -> &mut Value {
        if self.content.is_none() {
            self.content = Some(self.load());
        }
        self.content.get_or_insert_with(empty)
    }

    pub fn set_content(&mut self, content: Value) {
        self.content = Some(content);
    }

    fn load(&self) -> Value {
        let path = self.path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return empty(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Storage unreadable, starting empty");
                return empty();
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Storage corrupt, resetting");
                discard(&path);
                empty()
            }
        }
    }

    /// Write the in-memory document to disk. Does nothing if it was never
    /// loaded or set.
    pub fn try_save(&self) -> Result<(), StorageError> {
        let Some(content) = &self.content else {
            return Ok(());
        };
        fs::create_dir_all(&self.dir)?;
        let text = serde_json::to_string_pretty(content)?;
        fs::write(self.path(), text)?;
        debug!(key = %self.key, "Storage saved");
        Ok(())
    }

    /// Like [`Storage::try_save`], but failures are only logged.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(key = %self.key, error = %e, "Storage did not save");
        }
    }

    /// Forget the document in memory and on disk.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.content = None;
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove corrupt storage");
    }
}
