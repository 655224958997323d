use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-backed key-value store, the default durable backend.
///
/// The whole map is rewritten on every mutation through a temp file that is
/// fsynced and renamed over the original, so a crash leaves either the old
/// or the new contents on disk. Layout:
/// `[key_len:u32 LE][key][value_len:u32 LE][value]...`
#[derive(Debug)]
pub struct FileBackedKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating it on first write.
    ///
    /// A truncated or malformed file is an error rather than an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read(&path) {
            Ok(bytes) => Self::decode(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = data.len(), "opened file-backed store");
        Ok(Self { data, path })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, KVStoreError> {
        fn take<'a>(bytes: &'a [u8], cursor: &mut usize, n: usize) -> Result<&'a [u8], KVStoreError> {
            let end = cursor.checked_add(n).filter(|end| *end <= bytes.len()).ok_or_else(|| {
                KVStoreError::Corrupted {
                    message: format!("truncated record at offset {cursor}"),
                }
            })?;
            let out = &bytes[*cursor..end];
            *cursor = end;
            Ok(out)
        }
        fn take_len(bytes: &[u8], cursor: &mut usize) -> Result<usize, KVStoreError> {
            let raw = take(bytes, cursor, 4)?;
            let mut arr = [0u8; 4];
            arr.copy_from_slice(raw);
            Ok(u32::from_le_bytes(arr) as usize)
        }

        let mut data = BTreeMap::new();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let key_len = take_len(bytes, &mut cursor)?;
            let key = take(bytes, &mut cursor, key_len)?.to_vec();
            let value_len = take_len(bytes, &mut cursor)?;
            let value = take(bytes, &mut cursor, value_len)?.to_vec();
            data.insert(key, value);
        }
        Ok(data)
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (key, value) in &self.data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }
        bytes
    }

    fn save_to_file(&self) -> Result<(), KVStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(&self.encode())?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Apply `ops` to a copy, persist it, then swap it in. On failure the
    /// in-memory view is left matching the file.
    fn apply(&mut self, ops: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut next = self.data.clone();
        for op in ops {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        let previous = std::mem::replace(&mut self.data, next);
        if let Err(e) = self.save_to_file() {
            self.data = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.apply(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.apply(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.apply(operations)
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
