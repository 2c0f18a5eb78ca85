use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use foraging_core::{decode, encode, SummaryRecord};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::persisted::{GalleryBlob, GALLERY_KEY, GALLERY_VERSION};

/// Byte-oriented persistent storage, injected wherever something is saved.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Clone, Debug)]
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

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source: std::io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Summaries of finished games, stored as one versioned blob.
pub struct GalleryStore {
    store: Box<dyn KeyValueStore>,
}

impl GalleryStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored records, most recent first. Unreadable or outdated data reads as empty.
    pub fn load(&self) -> Vec<SummaryRecord> {
        self.load_blob().records
    }

    fn load_blob(&self) -> GalleryBlob {
        let bytes = match self.store.get(GALLERY_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return GalleryBlob::default(),
            Err(err) => {
                warn!(%err, "gallery unreadable, starting empty");
                return GalleryBlob::default();
            }
        };
        let blob = match decode::<GalleryBlob>(&bytes) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(%err, "gallery malformed, starting empty");
                return GalleryBlob::default();
            }
        };
        if blob.version != GALLERY_VERSION {
            warn!(
                found = blob.version,
                expected = GALLERY_VERSION,
                "gallery schema mismatch, starting empty"
            );
            return GalleryBlob::default();
        }
        blob
    }

    /// Prepends `record`. Returns `false` when its room is already stored.
    pub fn save_record(&mut self, record: SummaryRecord) -> Result<bool, StorageError> {
        let mut blob = self.load_blob();
        if blob
            .records
            .iter()
            .any(|existing| existing.room_id == record.room_id)
        {
            debug!(room_id = %record.room_id, "summary already in gallery");
            return Ok(false);
        }
        blob.records.insert(0, record);
        let bytes = encode(&blob)?;
        self.store.put(GALLERY_KEY, &bytes)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.store.delete(GALLERY_KEY)
    }
}
