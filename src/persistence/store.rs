//! Key-value store backends

use std::collections::BTreeMap;

use super::StoreError;

/// Opaque string store the gateway reads and writes
pub trait PersistenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: PersistenceStore + ?Sized> PersistenceStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-memory store (tests and throwaway sessions)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    /// Successful `set` calls
    pub set_count: usize,
    /// Reject every write with a backend error
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every write until `fail_writes` is cleared
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("writes disabled".to_string()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.set_count += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten through a temp file on every change
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct FileStore {
    path: std::path::PathBuf,
    entries: BTreeMap<String, String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    /// Open `path`, starting empty if it is missing or unreadable
    pub fn open(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => {
                    log::info!("Opened save file {:?}", path);
                    entries
                }
                Err(e) => {
                    log::warn!("Save file {:?} is corrupt ({}), starting fresh", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No save file at {:?}", path);
                BTreeMap::new()
            }
            Err(e) => {
                log::warn!("Could not read save file {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn write_file(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PersistenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.write_file()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.write_file()?;
        }
        Ok(())
    }
}

/// Browser LocalStorage, keys namespaced with a prefix
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
    prefix: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    /// None when LocalStorage is unavailable (private mode, sandboxed frame)
    pub fn open(prefix: &str) -> Option<Self> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()?;
        Some(Self {
            storage,
            prefix: prefix.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[cfg(target_arch = "wasm32")]
impl PersistenceStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(&self.full_key(key)).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(&self.full_key(key), value)
            .map_err(|e| StoreError::Backend(format!("{:?}", e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage
            .remove_item(&self.full_key(key))
            .map_err(|e| StoreError::Backend(format!("{:?}", e)))
    }
}
