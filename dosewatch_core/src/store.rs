//! Durable key/value store for the engine's three records.
//!
//! The engine persists per-user dosage state, settings, and the user
//! registry as three independent string records. Malformed or unreadable
//! content on load is treated as absent so callers always fall back to
//! defaults; saves are atomic (tempfile + rename) with file locking.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Storage contract consumed by the engine
///
/// `load` returns `None` for missing or unreadable records, never an
/// error; `save` failures are logged by the implementation and swallowed,
/// matching the fire-and-forget persistence model.
pub trait DurableStore: Send {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str);
}

impl<T: DurableStore + Sync + ?Sized> DurableStore for std::sync::Arc<T> {
    fn load(&self, key: &str) -> Option<String> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) {
        (**self).save(key, value)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// File-backed store writing one `<key>.json` per record under a data dir
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn try_load(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(Some(contents))
    }

    fn try_save(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        // Unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(self.record_path(key))
            .map_err(|e| Error::Io(e.error))?;

        Ok(())
    }
}

impl DurableStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        match self.try_load(key) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read record {:?}: {}. Treating as absent.", key, e);
                None
            }
        }
    }

    fn save(&self, key: &str, value: &str) {
        if let Err(e) = self.try_save(key, value) {
            tracing::warn!("Failed to save record {:?}: {}", key, e);
        } else {
            tracing::debug!("Saved record {:?}", key);
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record before handing the store to an engine
    pub fn preload(&self, key: &str, value: &str) {
        self.records
            .lock()
            .expect("store poisoned")
            .insert(key.into(), value.into());
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.records.lock().expect("store poisoned").get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) {
        self.records
            .lock()
            .expect("store poisoned")
            .insert(key.into(), value.into());
    }
}
