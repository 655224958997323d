use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;

/// In-memory key-value store for unit tests.
///
/// Ordered so prefix scans come back sorted like the durable backends.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of raw backend entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_put_and_delete() {
        let mut store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
                BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
            ])
            .unwrap();
        store
            .atomic_batch_write(vec![BatchOperation::delete(b"a".to_vec())])
            .unwrap();

        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert!(store.exists(b"b").unwrap());
    }

    #[test]
    fn test_prefix_scan_is_sorted_and_bounded() {
        let mut store = InMemoryKVStore::new();
        store.put(b"p:2", b"x").unwrap();
        store.put(b"p:1", b"y").unwrap();
        store.put(b"q:1", b"z").unwrap();

        let scan = store.prefix_scan(b"p:").unwrap();
        let keys: Vec<_> = scan.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![b"p:1".as_slice(), b"p:2".as_slice()]);
    }
}
