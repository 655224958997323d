//! # RocksDB Storage Adapter
//!
//! RocksDB implementation of the `KeyValueStore` trait, enabled with the
//! `rocksdb` feature. Batches go through a single `WriteBatch` with fsync, so
//! a commit is atomic and durable when it returns.

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use parking_lot::RwLock;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::PathBuf;
use std::sync::Arc;

/// RocksDB tuning for a small, write-light protocol store.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache in bytes
    pub block_cache_size: usize,
    /// fsync every write
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/solo-machine.rocksdb"),
            block_cache_size: 8 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small cache, no fsync.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open the database at `config.path`, creating it if missing.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut table = rocksdb::BlockBasedOptions::default();
        table.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&table);

        let db = DB::open(&opts, &config.path).map_err(failed("open"))?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    fn write_opts(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

fn failed(op: &'static str) -> impl Fn(rocksdb::Error) -> KVStoreError {
    move |e| KVStoreError::IOError {
        message: format!("rocksdb {op}: {e}"),
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.read().get(key).map_err(failed("get"))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .write()
            .put_opt(key, value, &self.write_opts())
            .map_err(failed("put"))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .write()
            .delete_opt(key, &self.write_opts())
            .map_err(failed("delete"))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(key, value),
                BatchOperation::Delete { key } => batch.delete(key),
            }
        }
        self.db
            .write()
            .write_opt(batch, &self.write_opts())
            .map_err(failed("batch write"))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.db.read().get_pinned(key).map_err(failed("get"))?.is_some())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let db = self.db.read();
        let mut entries = Vec::new();
        for item in db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(failed("scan"))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.into_vec(), value.into_vec()));
        }
        Ok(entries)
    }
}
