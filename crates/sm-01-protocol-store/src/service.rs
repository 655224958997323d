//! # Protocol Store Service
//!
//! Versioned, namespaced key-value state over a [`KeyValueStore`] backend.
//!
//! - Reads (`get`, `has`, `entries`) always see committed state.
//! - Writes (`set`, `delete`) are buffered until [`ProtocolStore::commit`].
//! - `commit` writes the buffered operations, the new version and the new
//!   commitment root in one atomic backend batch. An empty commit is a no-op;
//!   a failed commit discards the buffer.
//!
//! One store is shared by every component of a machine identity. Clones share
//! the same backend and buffer.

use crate::adapters::{FileBackedKVStore, InMemoryKVStore};
use crate::algorithms::merkle::{build_path, compute_root, leaf_hash, InclusionProof};
use crate::config::{StoreBackend, StoreConfig};
use crate::domain::entities::CommitInfo;
use crate::domain::keys::{commit_key, latest_commit_key, NamespacePath, MERKLE_AREA};
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use parking_lot::Mutex;
use shared_crypto::Hash;
use shared_types::{SoloMachineError, SoloResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

struct StoreInner {
    backend: Box<dyn KeyValueStore>,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    latest: CommitInfo,
}

impl StoreInner {
    /// Committed Merkle-area entries with `pending` applied on top.
    fn merkle_view(
        &self,
        pending: &BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> SoloResult<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut view: BTreeMap<Vec<u8>, Vec<u8>> =
            self.backend.prefix_scan(&[MERKLE_AREA])?.into_iter().collect();
        for (key, value) in pending.range(vec![MERKLE_AREA]..) {
            if key.first() != Some(&MERKLE_AREA) {
                break;
            }
            match value {
                Some(v) => {
                    view.insert(key.clone(), v.clone());
                }
                None => {
                    view.remove(key);
                }
            }
        }
        Ok(view)
    }
}

/// Handle to the shared protocol store.
#[derive(Clone)]
pub struct ProtocolStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ProtocolStore {
    /// Wrap a backend, loading the latest commit record.
    pub fn new<B: KeyValueStore + 'static>(backend: B) -> SoloResult<Self> {
        let latest = match backend.get(&latest_commit_key())? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| SoloMachineError::corrupted(format!("commit record: {e}")))?,
            None => CommitInfo::genesis(),
        };
        debug!(version = latest.version, "protocol store loaded");
        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner {
                backend: Box::new(backend),
                pending: BTreeMap::new(),
                latest,
            })),
        })
    }

    /// Fresh volatile store.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                backend: Box::new(InMemoryKVStore::new()),
                pending: BTreeMap::new(),
                latest: CommitInfo::genesis(),
            })),
        }
    }

    /// Open the backend `config` selects.
    pub fn open(config: &StoreConfig) -> SoloResult<Self> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::File => Self::new(FileBackedKVStore::open(&config.path)?),
            #[cfg(feature = "rocksdb")]
            StoreBackend::RocksDb => {
                use crate::adapters::{RocksDbConfig, RocksDbStore};
                let rocks = RocksDbConfig {
                    path: config.path.clone(),
                    sync_writes: config.sync_writes,
                    ..Default::default()
                };
                Self::new(RocksDbStore::open(rocks)?)
            }
            #[cfg(not(feature = "rocksdb"))]
            StoreBackend::RocksDb => Err(SoloMachineError::Configuration {
                message: "store backend `rocksdb` requires the `rocksdb` feature".to_string(),
            }),
        }
    }

    /// Top-level plain namespace.
    pub fn namespace(&self, name: &str) -> Namespace {
        Namespace {
            store: self.clone(),
            path: NamespacePath::root(name, false),
        }
    }

    /// Top-level namespace whose entries contribute to the commitment root.
    pub fn merkle_namespace(&self, name: &str) -> Namespace {
        Namespace {
            store: self.clone(),
            path: NamespacePath::root(name, true),
        }
    }

    /// Latest committed version; 0 before the first commit.
    pub fn version(&self) -> u64 {
        self.inner.lock().latest.version
    }

    /// Commitment root of the latest version.
    pub fn root(&self) -> Hash {
        self.inner.lock().latest.root
    }

    /// Commit record of an earlier version.
    pub fn commit_info(&self, version: u64) -> SoloResult<Option<CommitInfo>> {
        let inner = self.inner.lock();
        match inner.backend.get(&commit_key(version))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(|e| {
                SoloMachineError::corrupted(format!("commit record {version}: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    /// True if writes are buffered.
    pub fn has_pending(&self) -> bool {
        !self.inner.lock().pending.is_empty()
    }

    /// Drop buffered writes.
    pub fn discard(&self) {
        self.inner.lock().pending.clear();
    }

    /// Atomically persist buffered writes and return the new version.
    pub fn commit(&self) -> SoloResult<u64> {
        let mut inner = self.inner.lock();
        if inner.pending.is_empty() {
            return Ok(inner.latest.version);
        }
        let pending = std::mem::take(&mut inner.pending);

        let view = inner.merkle_view(&pending)?;
        let leaves: Vec<Hash> = view.iter().map(|(k, v)| leaf_hash(k, v)).collect();
        let info = CommitInfo {
            version: inner.latest.version + 1,
            root: compute_root(&leaves),
            merkle_entries: leaves.len() as u64,
        };
        let record = bincode::serialize(&info).map_err(SoloMachineError::serialization)?;

        let writes = pending.len();
        let mut ops: Vec<BatchOperation> = pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::Put { key, value },
                None => BatchOperation::Delete { key },
            })
            .collect();
        ops.push(BatchOperation::put(commit_key(info.version), record.clone()));
        ops.push(BatchOperation::put(latest_commit_key(), record));

        if let Err(e) = inner.backend.atomic_batch_write(ops) {
            warn!(version = info.version, error = %e, "commit failed, buffered writes discarded");
            return Err(e.into());
        }
        inner.latest = info;
        debug!(
            version = info.version,
            writes,
            merkle_entries = info.merkle_entries,
            "store committed"
        );
        Ok(info.version)
    }

    fn get_raw(&self, key: &[u8]) -> SoloResult<Option<Vec<u8>>> {
        Ok(self.inner.lock().backend.get(key)?)
    }

    fn exists_raw(&self, key: &[u8]) -> SoloResult<bool> {
        Ok(self.inner.lock().backend.exists(key)?)
    }

    fn stage(&self, key: Vec<u8>, value: Option<Vec<u8>>) {
        self.inner.lock().pending.insert(key, value);
    }

    fn scan(&self, prefix: &[u8]) -> SoloResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.inner.lock().backend.prefix_scan(prefix)?)
    }

    fn prove_raw(&self, key: &[u8]) -> SoloResult<Option<(Vec<u8>, InclusionProof)>> {
        let inner = self.inner.lock();
        let committed = inner.backend.prefix_scan(&[MERKLE_AREA])?;
        let Some(index) = committed.iter().position(|(k, _)| k == key) else {
            return Ok(None);
        };
        let leaves: Vec<Hash> = committed.iter().map(|(k, v)| leaf_hash(k, v)).collect();
        let path = build_path(&leaves, index).unwrap_or_default();
        Ok(Some((
            committed[index].1.clone(),
            InclusionProof {
                key: key.to_vec(),
                path,
            },
        )))
    }
}

/// A namespace within the store. Cheap to clone.
#[derive(Clone)]
pub struct Namespace {
    store: ProtocolStore,
    path: NamespacePath,
}

impl Namespace {
    /// Nested namespace.
    pub fn child(&self, name: &str) -> Namespace {
        Namespace {
            store: self.store.clone(),
            path: self.path.child(name),
        }
    }

    /// Nested namespace whose entries contribute to the commitment root.
    pub fn merkle_child(&self, name: &str) -> Namespace {
        Namespace {
            store: self.store.clone(),
            path: self.path.merkle_child(name),
        }
    }

    /// Slash-separated path, for logs.
    pub fn name(&self) -> String {
        self.path.display()
    }

    /// Store this namespace belongs to.
    pub fn store(&self) -> &ProtocolStore {
        &self.store
    }

    /// Committed value of `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> SoloResult<Option<Vec<u8>>> {
        self.store.get_raw(&self.path.entry_key(key.as_ref()))
    }

    /// Committed value of `key`, or a `NotFound` storage error.
    pub fn require(&self, key: impl AsRef<[u8]>) -> SoloResult<Vec<u8>> {
        let key = key.as_ref();
        self.get(key)?.ok_or_else(|| {
            SoloMachineError::not_found(format!(
                "{}/{}",
                self.name(),
                String::from_utf8_lossy(key)
            ))
        })
    }

    /// True if `key` is committed.
    pub fn has(&self, key: impl AsRef<[u8]>) -> SoloResult<bool> {
        self.store.exists_raw(&self.path.entry_key(key.as_ref()))
    }

    /// Buffer a write.
    pub fn set(&self, key: impl AsRef<[u8]>, value: impl Into<Vec<u8>>) {
        self.store
            .stage(self.path.entry_key(key.as_ref()), Some(value.into()));
    }

    /// Buffer a delete.
    pub fn delete(&self, key: impl AsRef<[u8]>) {
        self.store.stage(self.path.entry_key(key.as_ref()), None);
    }

    /// Committed entries directly in this namespace, sorted by key.
    pub fn entries(&self) -> SoloResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let prefix = self.path.entry_prefix();
        Ok(self
            .store
            .scan(&prefix)?
            .into_iter()
            .map(|(k, v)| (k[prefix.len()..].to_vec(), v))
            .collect())
    }

    /// Committed value of `key` with its inclusion proof under
    /// [`ProtocolStore::root`].
    pub fn prove(&self, key: impl AsRef<[u8]>) -> SoloResult<(Vec<u8>, InclusionProof)> {
        let key = key.as_ref();
        if !self.path.is_merkle() {
            return Err(SoloMachineError::not_found(format!(
                "namespace {} is not merkle-committed",
                self.name()
            )));
        }
        self.store
            .prove_raw(&self.path.entry_key(key))?
            .ok_or_else(|| {
                SoloMachineError::not_found(format!(
                    "{}/{}",
                    self.name(),
                    String::from_utf8_lossy(key)
                ))
            })
    }

    /// Committed big-endian `u64`.
    pub fn get_u64(&self, key: impl AsRef<[u8]>) -> SoloResult<Option<u64>> {
        let key = key.as_ref();
        match self.get(key)? {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    SoloMachineError::corrupted(format!(
                        "{}/{} is not a u64",
                        self.name(),
                        String::from_utf8_lossy(key)
                    ))
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
        }
    }

    /// Buffer a big-endian `u64`.
    pub fn set_u64(&self, key: impl AsRef<[u8]>, value: u64) {
        self.set(key, value.to_be_bytes().to_vec());
    }

    /// Committed UTF-8 string.
    pub fn get_string(&self, key: impl AsRef<[u8]>) -> SoloResult<Option<String>> {
        let key = key.as_ref();
        match self.get(key)? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|_| {
                SoloMachineError::corrupted(format!(
                    "{}/{} is not UTF-8",
                    self.name(),
                    String::from_utf8_lossy(key)
                ))
            }),
        }
    }

    /// Buffer a string.
    pub fn set_string(&self, key: impl AsRef<[u8]>, value: &str) {
        self.set(key, value.as_bytes().to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::merkle::verify_inclusion;
    use crate::domain::errors::KVStoreError;
    use crate::ports::outbound::ScanResult;

    /// Backend that fails every batch write.
    struct FailingBatchStore(InMemoryKVStore);

    impl KeyValueStore for FailingBatchStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
            self.0.get(key)
        }
        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
            self.0.put(key, value)
        }
        fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
            self.0.delete(key)
        }
        fn atomic_batch_write(&mut self, _: Vec<BatchOperation>) -> Result<(), KVStoreError> {
            Err(KVStoreError::IOError {
                message: "disk full".into(),
            })
        }
        fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
            self.0.exists(key)
        }
        fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
            self.0.prefix_scan(prefix)
        }
    }

    #[test]
    fn test_reads_see_committed_state_only() {
        let store = ProtocolStore::in_memory();
        let ns = store.namespace("solo-machine");

        ns.set("sequence", b"1".to_vec());
        assert_eq!(ns.get("sequence").unwrap(), None);
        assert!(!ns.has("sequence").unwrap());

        assert_eq!(store.commit().unwrap(), 1);
        assert_eq!(ns.get("sequence").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_empty_commit_does_not_advance_version() {
        let store = ProtocolStore::in_memory();
        assert_eq!(store.commit().unwrap(), 0);
        store.namespace("a").set("k", b"v".to_vec());
        assert_eq!(store.commit().unwrap(), 1);
        assert_eq!(store.commit().unwrap(), 1);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = ProtocolStore::in_memory();
        let chains = store.namespace("chains");
        let a = chains.child("a");
        let ab = chains.child("ab");
        a.set("client-id", b"A".to_vec());
        ab.set("client-id", b"AB".to_vec());
        chains.set("client-id", b"parent".to_vec());
        store.commit().unwrap();

        assert_eq!(a.get("client-id").unwrap(), Some(b"A".to_vec()));
        assert_eq!(ab.get("client-id").unwrap(), Some(b"AB".to_vec()));
        assert_eq!(chains.entries().unwrap().len(), 1);
        assert_eq!(a.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_and_typed_accessors() {
        let store = ProtocolStore::in_memory();
        let ns = store.namespace("n");
        ns.set_u64("seq", 42);
        ns.set_string("div", "abc");
        store.commit().unwrap();
        assert_eq!(ns.get_u64("seq").unwrap(), Some(42));
        assert_eq!(ns.get_string("div").unwrap().as_deref(), Some("abc"));

        ns.delete("seq");
        store.commit().unwrap();
        assert_eq!(ns.get_u64("seq").unwrap(), None);
        assert!(ns.require("seq").unwrap_err().is_not_found());
    }

    #[test]
    fn test_malformed_u64_is_corrupted() {
        let store = ProtocolStore::in_memory();
        let ns = store.namespace("n");
        ns.set("seq", vec![1, 2, 3]);
        store.commit().unwrap();
        assert!(matches!(
            ns.get_u64("seq"),
            Err(SoloMachineError::Storage {
                kind: shared_types::StorageErrorKind::Corrupted,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_commit_discards_pending_and_keeps_version() {
        let store = ProtocolStore::new(FailingBatchStore(InMemoryKVStore::new())).unwrap();
        let ns = store.namespace("n");
        ns.set("k", b"v".to_vec());
        assert!(store.commit().is_err());
        assert!(!store.has_pending());
        assert_eq!(store.version(), 0);
        assert_eq!(ns.get("k").unwrap(), None);
    }

    #[test]
    fn test_merkle_root_tracks_merkle_area_only() {
        let store = ProtocolStore::in_memory();
        let plain = store.namespace("plain");
        let lc = store.namespace("chains").child("t").merkle_child("light-client");

        plain.set("k", b"v".to_vec());
        store.commit().unwrap();
        assert_eq!(store.root(), [0u8; 32]);

        lc.set("clientState", b"cs".to_vec());
        store.commit().unwrap();
        let root = store.root();
        assert_ne!(root, [0u8; 32]);

        plain.set("k", b"changed".to_vec());
        store.commit().unwrap();
        assert_eq!(store.root(), root);
    }

    #[test]
    fn test_prove_and_verify() {
        let store = ProtocolStore::in_memory();
        let lc = store.merkle_namespace("light-client");
        for h in 1..=5u64 {
            lc.set(format!("consensusStates/1-{h}"), vec![h as u8]);
        }
        store.commit().unwrap();

        let root = store.root();
        let (value, proof) = lc.prove("consensusStates/1-3").unwrap();
        assert_eq!(value, vec![3]);
        assert!(verify_inclusion(&root, &proof, &value));
        assert!(!verify_inclusion(&root, &proof, &[4]));

        assert!(lc.prove("consensusStates/1-9").unwrap_err().is_not_found());
        assert!(store.namespace("plain").prove("x").is_err());
    }

    #[test]
    fn test_commit_history_is_recorded() {
        let store = ProtocolStore::in_memory();
        store.merkle_namespace("m").set("a", b"1".to_vec());
        store.commit().unwrap();
        let first_root = store.root();
        store.merkle_namespace("m").set("a", b"2".to_vec());
        store.commit().unwrap();

        let v1 = store.commit_info(1).unwrap().unwrap();
        assert_eq!(v1.root, first_root);
        assert_ne!(store.commit_info(2).unwrap().unwrap().root, first_root);
        assert!(store.commit_info(3).unwrap().is_none());
    }

    #[test]
    fn test_version_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::file(dir.path().join("store.db"));
        {
            let store = ProtocolStore::open(&config).unwrap();
            store.namespace("n").set_u64("seq", 7);
            store.commit().unwrap();
            store.namespace("n").set_u64("seq", 8);
            store.commit().unwrap();
        }
        let store = ProtocolStore::open(&config).unwrap();
        assert_eq!(store.version(), 2);
        assert_eq!(store.namespace("n").get_u64("seq").unwrap(), Some(8));
    }
}
