//! Injected key/value storage for shopper session records.
//!
//! The storefront persists two opaque JSON records per shopper: the access
//! token and the cart ID. Where they live depends on the caller:
//!
//! - [`MemoryStore`] - process memory (tests, the server's shared token and
//!   each browser's shopper)
//! - [`FileStore`] - a JSON file on disk (CLI)
//!
//! Sessions receive an `Arc<dyn SessionStore>` explicitly; nothing reads a
//! process-wide store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Well-known storage keys.
pub mod keys {
    /// Key for the access-token record.
    pub const CREDENTIALS: &str = "ep_credentials";

    /// Key for the current cart ID.
    pub const CART_ID: &str = "ep_cart_id";

    /// Browser-session key for the shopper a browser maps to.
    pub const SHOPPER: &str = "ep_shopper";
}

/// Errors raised by a [`SessionStore`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded.
    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The backend reported an error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Key/value storage for opaque JSON records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the record stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the record stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Delete the record stored under `key`. Missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a typed record.
///
/// A record that exists but does not decode as `T` is treated as absent, so a
/// stale or hand-edited entry is replaced rather than blocking the shopper.
///
/// # Errors
///
/// Returns an error only if the backend itself fails.
pub async fn load<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(value) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring unreadable session record");
            Ok(None)
        }
    }
}

/// Encode and store a typed record.
///
/// # Errors
///
/// Returns an error if encoding fails or the backend rejects the write.
pub async fn save<T: Serialize + Sync>(
    store: &dyn SessionStore,
    key: &str,
    record: &T,
) -> Result<(), StorageError> {
    store.set(key, serde_json::to_value(record)?).await
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Store backed by a single JSON object on disk.
///
/// Every operation re-reads the file so concurrent processes see each
/// other's writes; within a process, writes are serialized.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StorageError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::Backend(format!(
                "{} does not contain a JSON object (found {})",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }

    async fn write_all(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_vec_pretty(map)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(&map).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        if map.remove(key).is_some() {
            self.write_all(&map).await?;
        }
        Ok(())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
