//! Whole-document storage backends
//!
//! A backend stores one opaque byte blob. `FileStorage` replaces its file
//! atomically (temp file in the same directory, then rename), so a failed
//! write never leaves a truncated document behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The temp file could not replace the document
    #[error("Atomic replace failed: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Backend refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A place that holds one serialized document
pub trait Storage: Send + Sync {
    /// Current contents, `None` when nothing has been written yet
    fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the contents in full
    fn write(&self, bytes: &[u8]) -> StorageResult<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// JSON file on local disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Open a file-backed store, creating the parent directory if needed
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening document storage at: {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Storage for FileStorage {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(self.directory())?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        debug!("Wrote {} bytes to {:?}", bytes.len(), self.path);
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Volatile backend used by tests and embedded callers
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(Some(bytes.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().ok().and_then(|data| data.clone())
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        let data = self
            .data
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        Ok(data.clone())
    }

    fn write(&self, bytes: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        let mut data = self
            .data
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))?;
        *data = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        (**self).read()
    }

    fn write(&self, bytes: &[u8]) -> StorageResult<()> {
        (**self).write(bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Typed JSON view over a backend
pub struct JsonDocument<T> {
    storage: Box<dyn Storage>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            _marker: PhantomData,
        }
    }

    /// Read and parse; `None` when the backend is empty
    pub fn try_load(&self) -> StorageResult<Option<T>> {
        match self.storage.read()? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read and parse, falling back to the default document
    ///
    /// A missing, unreadable or corrupt document never stops the caller.
    pub fn load(&self) -> T {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("No document at {}, starting empty", self.storage.describe());
                T::default()
            }
            Err(e) => {
                warn!(
                    "Failed to read document at {}, starting empty: {}",
                    self.storage.describe(),
                    e
                );
                T::default()
            }
        }
    }

    pub fn save(&self, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.storage.write(&bytes)
    }

    pub fn describe(&self) -> String {
        self.storage.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_file_storage_missing_file_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path().join("nested/dir/doc.json")).unwrap();
        assert!(storage.read().unwrap().is_none());
        assert!(temp_dir.path().join("nested/dir").is_dir());
    }

    #[test]
    fn test_file_storage_write_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path().join("doc.json")).unwrap();

        storage.write(b"first version, rather long").unwrap();
        storage.write(b"second").unwrap();

        assert_eq!(storage.read().unwrap().unwrap(), b"second");
        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_json_document_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let doc: JsonDocument<Sample> =
            JsonDocument::new(FileStorage::open(temp_dir.path().join("s.json")).unwrap());

        assert_eq!(doc.load(), Sample::default());
        let value = Sample { name: "map".into(), count: 3 };
        doc.save(&value).unwrap();
        assert_eq!(doc.load(), value);
    }

    #[test]
    fn test_corrupt_document_falls_back_to_default() {
        let doc: JsonDocument<Sample> = JsonDocument::new(MemoryStorage::with_contents("{\"name\": tru"));
        assert!(doc.try_load().is_err());
        assert_eq!(doc.load(), Sample::default());
    }

    #[test]
    fn test_memory_storage_write_failure() {
        let storage = MemoryStorage::with_contents("old");
        storage.set_fail_writes(true);
        assert!(matches!(storage.write(b"new"), Err(StorageError::Unavailable(_))));
        assert_eq!(storage.contents().unwrap(), b"old");
    }
}
