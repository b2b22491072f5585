//! Key-value backends for persisted identity.
//!
//! A backend is a flat string-to-string map with one atomic primitive,
//! [`KeyValueStore::update`]. Every identity write or clear goes through a
//! single `update`, so readers never see half of a record.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;

pub type Entries = BTreeMap<String, String>;

/// Synchronous, shared key-value storage.
///
/// Implementations must make `update` atomic with respect to every other
/// caller holding the same backend, and `load` must return a consistent view.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read every entry in one pass.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the underlying storage cannot be read.
    fn load(&self) -> Result<Entries, StoreError>;

    /// Apply `mutate` to the entries as one atomic step.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the entries cannot be read or persisted.
    fn update(&self, mutate: &mut dyn FnMut(&mut Entries)) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// See [`load`](Self::load).
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    /// # Errors
    ///
    /// See [`update`](Self::update).
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(&mut |entries: &mut Entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    /// # Errors
    ///
    /// See [`update`](Self::update).
    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(&mut |entries: &mut Entries| {
            entries.remove(key);
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process storage. Clones share the same map, which is how several UI
/// surfaces in one browsing context see each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, mostly for tests and migrations.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self) -> Result<Entries, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn update(&self, mutate: &mut dyn FnMut(&mut Entries)) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        mutate(&mut *guard);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// A JSON object file on disk.
///
/// Every `load` re-reads the file so writes from other processes are picked
/// up on the next read. Writes go to a uniquely named sibling temp file and
/// are renamed into place. The file is created `0600` on unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn parse(&self, raw: &str) -> Result<Entries, StoreError> {
        serde_json::from_str(raw)
            .map_err(|e| StoreError::Backend(format!("parse {}: {e}", self.path.display())))
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        match self.read_raw()? {
            Some(raw) => self.parse(&raw),
            None => Ok(Entries::new()),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!("mkdir {}: {e}", parent.display()))
                })?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                    {
                        tracing::warn!("failed to chmod 0700 {}: {e}", parent.display());
                    }
                }
                parent
            }
            _ => Path::new("."),
        };

        let body = serde_json::to_string_pretty(entries).map_err(|e| StoreError::Serialize {
            field: "entries",
            reason: e.to_string(),
        })?;

        // Unique per write, so two processes never share a temp file.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::Backend(format!("temp file in {}: {e}", dir.display())))?;
        tmp.write_all(body.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::Backend(format!("write {}: {e}", tmp.path().display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    StoreError::Backend(format!("chmod {}: {e}", tmp.path().display()))
                })?;
        }

        tmp.persist(&self.path).map(drop).map_err(|e| {
            StoreError::Backend(format!("rename into {}: {}", self.path.display(), e.error))
        })
    }
}

impl KeyValueStore for FileStore {
    fn load(&self) -> Result<Entries, StoreError> {
        self.read_entries()
    }

    /// A file that no longer parses is replaced by the result of `mutate`
    /// applied to an empty map, so a clear or a fresh login can recover it.
    fn update(&self, mutate: &mut dyn FnMut(&mut Entries)) -> Result<(), StoreError> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StoreError::Backend("file store lock poisoned".into()))?;
        let (mut entries, corrupt) = match self.read_raw()? {
            None => (Entries::new(), false),
            Some(raw) => match self.parse(&raw) {
                Ok(entries) => (entries, false),
                Err(error) => {
                    tracing::warn!(
                        %error,
                        path = %self.path.display(),
                        "identity file is corrupt; starting from an empty store"
                    );
                    (Entries::new(), true)
                }
            },
        };
        let before = entries.clone();
        mutate(&mut entries);
        if entries == before && !corrupt {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}
