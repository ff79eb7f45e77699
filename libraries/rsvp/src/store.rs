//! # RecordStore
//! The device-local copy of every RSVP submitted from this device, keyed by identity key.
//!
//! The whole mapping is loaded when the store is opened and the whole mapping is written back after
//! every upsert. Submissions are human-paced, so there is no batching and no log: the backend
//! replaces one blob in one step, which means a crash mid-write loses at most the write in progress.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::Write as _,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::data_model::RsvpRecord;

pub const DEFAULT_STORAGE_KEY: &str = "ankit_rsvps";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("stored snapshot is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("could not serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Durable home for the serialized snapshot.
pub trait StorageBackend {
    /// Read the last snapshot, or `None` if nothing has been written yet.
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the snapshot. Either the new bytes or the previous ones must survive a crash.
    fn replace(&mut self, bytes: &[u8]) -> Result<(), StorageError>;
}

/// A JSON snapshot file, replaced by writing a sibling `.tmp` and renaming it into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: impl AsRef<Path>, storage_key: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{storage_key}.json")),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        Ok((!bytes.is_empty()).then_some(bytes))
    }

    fn replace(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("tmp");
        let written = std::fs::File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
                log::debug!("Could not remove {}: {cleanup}", tmp_path.display());
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// In-memory backend. Clones share the same blob, so a test can reopen a store over it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Rc<RefCell<Option<Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.blob.borrow().clone()
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.contents())
    }

    fn replace(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        *self.blob.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }
}

pub struct RecordStore<B: StorageBackend> {
    records: BTreeMap<String, RsvpRecord>,
    backend: B,
}

impl<B: StorageBackend> RecordStore<B> {
    /// Load every persisted record. A corrupt snapshot is an error, never silently emptied.
    pub fn open(backend: B) -> Result<Self, StorageError> {
        let records = match backend.load()? {
            Some(bytes) => parse_snapshot(&bytes)?,
            None => BTreeMap::new(),
        };
        log::info!("Loaded {} RSVP record(s) from local storage", records.len());
        Ok(Self { records, backend })
    }

    /// Insert or overwrite the record at `key` and persist the full mapping.
    ///
    /// If persisting fails the previous entry is restored, so memory never runs ahead of disk.
    pub fn upsert(&mut self, key: String, record: RsvpRecord) -> Result<(), StorageError> {
        let record = record.with_key(key.clone());
        let previous = self.records.insert(key.clone(), record);

        if let Err(e) = self.persist() {
            log::error!("Failed to persist RSVP snapshot: {e}");
            match previous {
                Some(previous) => self.records.insert(key, previous),
                None => self.records.remove(&key),
            };
            return Err(e);
        }

        Ok(())
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &RsvpRecord> {
        self.records.values()
    }

    pub fn get(&self, key: &str) -> Option<&RsvpRecord> {
        self.records.get(key)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        // serialize before touching the backend so a serialization failure leaves it untouched
        let bytes = serde_json::to_vec_pretty(&self.records).map_err(StorageError::Serialize)?;
        self.backend.replace(&bytes)
    }
}

/// Decode a snapshot blob, restoring each record's key from the mapping.
pub fn parse_snapshot(bytes: &[u8]) -> Result<BTreeMap<String, RsvpRecord>, StorageError> {
    let records: BTreeMap<String, RsvpRecord> =
        serde_json::from_slice(bytes).map_err(StorageError::Corrupt)?;
    Ok(records
        .into_iter()
        .map(|(key, record)| {
            let record = record.with_key(key.clone());
            (key, record)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{Attendance, RsvpForm};

    fn record(name: &str, phone: &str, attend: &str) -> RsvpRecord {
        RsvpRecord::from_form(RsvpForm {
            name: name.to_string(),
            phone: phone.to_string(),
            attend: attend.to_string(),
            ..Default::default()
        })
    }

    #[derive(Default)]
    struct BrokenDisk {
        inner: MemoryStorage,
        fail_writes: bool,
    }

    impl StorageBackend for BrokenDisk {
        fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.load()
        }

        fn replace(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.replace(bytes)
        }
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let mut store = RecordStore::open(MemoryStorage::default()).unwrap();
        store
            .upsert("9999999999".into(), record("Asha", "9999999999", "no"))
            .unwrap();
        store
            .upsert("9999999999".into(), record("Asha Verma", "9999999999", "maybe"))
            .unwrap();

        assert_eq!(store.count(), 1);
        let stored = store.get("9999999999").unwrap();
        assert_eq!(stored.name, "Asha Verma");
        assert_eq!(stored.attendance, Attendance::Maybe);
        assert_eq!(stored.key, "9999999999");
    }

    #[test]
    fn reopen_recovers_every_record() {
        let storage = MemoryStorage::default();
        let mut store = RecordStore::open(storage.clone()).unwrap();
        store.upsert("Asha".into(), record("Asha", "", "yes")).unwrap();
        store
            .upsert("8888888888".into(), record("Ravi", "8888888888", "no"))
            .unwrap();

        let reopened = RecordStore::open(storage).unwrap();
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.get("Asha").unwrap().attendance, Attendance::Yes);
        assert_eq!(reopened.get("8888888888").unwrap().key, "8888888888");
    }

    #[test]
    fn snapshot_is_a_mapping_of_key_to_form_fields() {
        let storage = MemoryStorage::default();
        let mut store = RecordStore::open(storage.clone()).unwrap();
        store.upsert("Asha".into(), record("Asha", "", "yes")).unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_slice(&storage.contents().unwrap()).unwrap();
        assert_eq!(
            snapshot,
            serde_json::json!({
                "Asha": { "name": "Asha", "phone": "", "email": "", "count": "", "attend": "yes" }
            })
        );
    }

    #[test]
    fn failed_write_rolls_back_memory() {
        let mut store = RecordStore::open(BrokenDisk::default()).unwrap();
        store.upsert("Asha".into(), record("Asha", "", "yes")).unwrap();

        store.backend.fail_writes = true;
        let err = store
            .upsert("Asha".into(), record("Asha", "", "no"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert!(
            store
                .upsert("Ravi".into(), record("Ravi", "", "no"))
                .is_err()
        );

        assert_eq!(store.count(), 1);
        assert_eq!(store.get("Asha").unwrap().attendance, Attendance::Yes);

        let persisted = parse_snapshot(&store.backend().inner.contents().unwrap()).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted["Asha"].attendance, Attendance::Yes);
    }

    #[test]
    fn corrupt_snapshot_refuses_to_open() {
        let mut storage = MemoryStorage::default();
        storage.replace(b"{ not json").unwrap();
        assert!(matches!(
            RecordStore::open(storage),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn file_storage_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), DEFAULT_STORAGE_KEY);
        assert_eq!(storage.path(), dir.path().join("ankit_rsvps.json"));

        let mut store = RecordStore::open(storage.clone()).unwrap();
        assert_eq!(store.count(), 0);
        store.upsert("Asha".into(), record("Asha", "", "yes")).unwrap();
        store
            .upsert("Asha".into(), record("Asha", "", "maybe"))
            .unwrap();

        assert!(!storage.path().with_extension("tmp").exists());
        let reopened = RecordStore::open(storage).unwrap();
        assert_eq!(reopened.count(), 1);
        assert_eq!(reopened.get("Asha").unwrap().attendance, Attendance::Maybe);
    }

    #[test]
    fn failed_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsvps.json");
        // a non-empty directory in the way makes the final rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let mut storage = FileStorage::at(&path);
        let result = storage.replace(b"{}");

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert!(!path.with_extension("tmp").exists());
        assert!(path.join("occupied").exists());
    }

    #[test]
    fn empty_file_loads_as_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsvps.json");
        std::fs::write(&path, b"").unwrap();

        let store = RecordStore::open(FileStorage::at(&path)).unwrap();
        assert_eq!(store.count(), 0);
    }
}
