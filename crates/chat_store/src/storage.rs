use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Key-value contract for durable local storage.
///
/// Keys are flat identifiers; values are opaque text. Implementations must
/// make `set` all-or-nothing: a crashed write may lose the new value but
/// never corrupts the previous one.
pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// File-backed storage with one file per key under a root directory.
///
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| StoreError::io("creating storage root", &root, source))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::io("reading value", &path, source)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|source| StoreError::io("writing value", &tmp, source))?;
        fs::rename(&tmp, &path)
            .map_err(|source| StoreError::io("committing value", &path, source))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::io("removing value", &path, source)),
        }
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey {
            key: key.to_string(),
        })
    }
}
