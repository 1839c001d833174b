//! Persistent key-value shelves for optimization results.
//!
//! A shelf is one JSON object on disk. Reads load the whole file; every
//! `put` rewrites it through a temp file in the same directory and an atomic
//! rename. Shelves assume a single writer.

use gn_types::{GnResult, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the master index inside the shelf directory.
pub const DIRECTORY_SHELF: &str = "directory.shelf";

/// Key under which a run's result is stored in a method shelf.
pub fn shelf_key(species: &str, trait_name: &str) -> String {
    format!("{species}|{trait_name}")
}

/// Split a `species|trait` key back into its parts.
pub fn split_shelf_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('|')
}

/// Keyed persistent store.
pub trait Store<V> {
    fn get(&self, key: &str) -> Option<V>;
    fn put(&mut self, key: &str, value: V) -> GnResult<()>;
    fn contains(&self, key: &str) -> bool;
}

/// A `Store` backed by a single JSON file.
#[derive(Debug)]
pub struct JsonShelf<V> {
    path: PathBuf,
    entries: BTreeMap<String, serde_json::Value>,
    _marker: PhantomData<V>,
}

impl<V> JsonShelf<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Open the shelf at `path`. A missing file is an empty shelf.
    pub fn open<P: AsRef<Path>>(path: P) -> GnResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::Open {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        };
        debug!("Opened shelf {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries,
            _marker: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode the value under `key`, surfacing a malformed entry as an error.
    pub fn try_get(&self, key: &str) -> GnResult<Option<V>> {
        self.entries
            .get(key)
            .map(|value| {
                <V as serde::Deserialize>::deserialize(value).map_err(|e| {
                    StoreError::Read {
                        path: self.path.display().to_string(),
                        message: format!("entry '{key}': {e}"),
                    }
                    .into()
                })
            })
            .transpose()
    }

    fn persist(&self) -> GnResult<()> {
        let write_error = |message: String| StoreError::Write {
            path: self.path.display().to_string(),
            message,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| write_error(e.to_string()))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| write_error(e.to_string()))?;
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| write_error(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| write_error(e.error.to_string()))?;
        Ok(())
    }
}

impl<V> Store<V> for JsonShelf<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Option<V> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring unreadable shelf entry: {}", e);
                None
            }
        }
    }

    /// Refuses values that would not decode again, such as a NaN float
    /// that JSON stores as `null`.
    fn put(&mut self, key: &str, value: V) -> GnResult<()> {
        let encoded = serde_json::to_value(value)?;
        if let Err(e) = <V as serde::Deserialize>::deserialize(&encoded) {
            return Err(StoreError::Write {
                path: self.path.display().to_string(),
                message: format!("entry '{key}' would not read back: {e}"),
            }
            .into());
        }
        self.entries.insert(key.to_string(), encoded);
        self.persist()?;
        debug!("Wrote '{}' to shelf {}", key, self.path.display());
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Root directory holding the method shelves and the master index.
#[derive(Debug, Clone)]
pub struct ShelfDirectory {
    root: PathBuf,
}

impl ShelfDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shelf_path(&self, shelf_name: &str) -> PathBuf {
        self.root.join(shelf_name)
    }

    pub fn open_method_shelf<V>(&self, shelf_name: &str) -> GnResult<JsonShelf<V>>
    where
        V: Serialize + DeserializeOwned,
    {
        JsonShelf::open(self.shelf_path(shelf_name))
    }

    /// The master index maps method display names to shelf file names.
    pub fn open_master_index(&self) -> GnResult<JsonShelf<String>> {
        JsonShelf::open(self.shelf_path(DIRECTORY_SHELF))
    }
}
