//! In-memory backend: a sorted map under a read-write lock.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{SecretBackend, StorageError, StorageResult};
use crate::record::SecretRecord;
use crate::version::Version;

#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<BTreeMap<(String, Version), SecretRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all names.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Replace a stored record in place, bypassing the insert precondition.
    ///
    /// Lets tests simulate corruption of data at rest.
    pub fn overwrite(&self, record: SecretRecord) {
        self.records
            .write()
            .insert((record.name.clone(), record.version.clone()), record);
    }
}

impl SecretBackend for MemoryBackend {
    fn get(&self, name: &str, version: &Version) -> StorageResult<Option<SecretRecord>> {
        Ok(self
            .records
            .read()
            .get(&(name.to_string(), version.clone()))
            .cloned())
    }

    fn versions(&self, name: &str) -> StorageResult<Vec<SecretRecord>> {
        Ok(self
            .records
            .read()
            .range((name.to_string(), Version::zero())..)
            .take_while(|((n, _), _)| n == name)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn scan(&self) -> StorageResult<Vec<SecretRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn put_if_absent(&self, record: &SecretRecord) -> StorageResult<()> {
        match self
            .records
            .write()
            .entry((record.name.clone(), record.version.clone()))
        {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                name: record.name.clone(),
                version: record.version.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    fn delete(&self, name: &str, version: &Version) -> StorageResult<bool> {
        Ok(self
            .records
            .write()
            .remove(&(name.to_string(), version.clone()))
            .is_some())
    }

    fn bootstrap(&self) -> StorageResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DigestAlgorithm;

    fn record(name: &str, version: u64) -> SecretRecord {
        SecretRecord {
            name: name.into(),
            version: Version::pad(version).unwrap(),
            key: vec![1],
            contents: vec![2],
            hmac: vec![3],
            digest: DigestAlgorithm::Sha256,
        }
    }

    #[test]
    fn versions_are_scoped_and_sorted() {
        let backend = MemoryBackend::new();
        for (name, v) in [("b", 1), ("a", 10), ("a", 2), ("ab", 1), ("a", 1)] {
            backend.put_if_absent(&record(name, v)).unwrap();
        }
        let versions: Vec<u64> = backend
            .versions("a")
            .unwrap()
            .iter()
            .map(|r| r.version.value())
            .collect();
        assert_eq!(versions, vec![1, 2, 10]);
        assert_eq!(backend.highest("a").unwrap().unwrap().version.value(), 10);
        assert!(backend.highest("zzz").unwrap().is_none());
    }

    #[test]
    fn put_if_absent_refuses_overwrite() {
        let backend = MemoryBackend::new();
        backend.put_if_absent(&record("x", 1)).unwrap();
        let err = backend.put_if_absent(&record("x", 1)).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn delete_reports_existence() {
        let backend = MemoryBackend::new();
        backend.put_if_absent(&record("x", 1)).unwrap();
        let v = Version::pad(1).unwrap();
        assert!(backend.delete("x", &v).unwrap());
        assert!(!backend.delete("x", &v).unwrap());
        assert!(backend.is_empty());
    }
}
