//! Durable JSON-file store.

use crate::{KeyValueStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use parking_lot::Mutex;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// Store persisted as one JSON object of string values.
///
/// Every operation re-reads the file and every mutation rewrites it through a
/// temp file + rename, so other processes pointed at the same path see
/// changes on their next access (best effort, last writer wins).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, creating the parent directory if needed.
    /// The file itself is created on the first write.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), "Opened file store");
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store; an unreadable document is logged
    /// and treated as empty so a corrupt file never blocks startup.
    fn read_entries(&self) -> StorageResult<Entries> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Store file is not a JSON object of strings, treating as empty"
                );
                Ok(Entries::new())
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        atomic_write(&self.path, &content)
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut Entries) -> (T, bool)) -> StorageResult<T> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        let (result, dirty) = f(&mut entries);
        if dirty {
            self.write_entries(&entries)?;
        }
        Ok(result)
    }
}

impl KeyValueStore for FileStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.with_entries(|entries| {
            let changed = entries.get(key).map(String::as_str) != Some(value);
            entries.insert(key.to_string(), value.to_string());
            ((), changed)
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_entries(|entries| (entries.get(key).cloned(), false))
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        self.with_entries(|entries| {
            let existed = entries.remove(key).is_some();
            (existed, existed)
        })
    }
}

fn atomic_write(path: &Path, content: &str) -> StorageResult<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::Backend(format!("invalid store path: {}", path.display())))?;

    let tmp_path = dir.join(format!(
        ".{}.portal.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let write_result = (|| -> Result<(), io::Error> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("session.json")).unwrap();

        assert_eq!(store.get("token").unwrap(), None);
        assert!(!store.remove("token").unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_get_remove_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileStore::open(&path).unwrap();

        store.set("token", "abc").unwrap();
        store.set("signInTries", "2").unwrap();
        assert_eq!(store.get("token").unwrap(), Some("abc".to_string()));

        let raw: Entries = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("signInTries").map(String::as_str), Some("2"));

        assert!(store.remove("token").unwrap());
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_two_handles_share_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let first = FileStore::open(&path).unwrap();
        let second = FileStore::open(&path).unwrap();

        first.set("token", "shared").unwrap();
        assert_eq!(second.get("token").unwrap(), Some("shared".to_string()));

        second.remove("token").unwrap();
        assert!(!first.has("token").unwrap());
    }

    #[test]
    fn test_corrupt_file_reads_as_empty_and_is_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2, 3").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "fresh").unwrap();
        assert_eq!(store.get("token").unwrap(), Some("fresh".to_string()));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["session.json".to_string()]);
    }
}
