//! Key-value store facade wrapping the embedded LevelDB engine.
//!
//! Grounded on `LevelDbProvider` (open/get/put/flush over `rusty_leveldb::DB`), with
//! delete/iterate/batch/repair added — none of those are exercised anywhere in the
//! corpus this was grounded on, so their shape follows the crate's ordinary CRUD
//! conventions rather than a directly observed call site. `repair` in particular is
//! flagged as unverified below.

use std::path::{Path, PathBuf};

use rusty_leveldb::{LdbIterator, Options, WriteBatch, DB};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("store operation failed: {0}")]
    Op(String),
}

/// A deferred batch of put/delete operations, committed atomically.
pub struct Batch {
    inner: WriteBatch,
}

impl Batch {
    fn new() -> Self {
        Batch {
            inner: WriteBatch::new(),
        }
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.inner.put(key, value);
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.inner.delete(key);
    }
}

/// Wraps a `rusty_leveldb::DB`, with a `hold_open` policy controlling whether the
/// handle is cached across scoped accesses or opened fresh each time.
pub struct StoreFacade {
    path: PathBuf,
    hold_open: bool,
    handle: Option<DB>,
}

impl StoreFacade {
    pub fn new(path: impl Into<PathBuf>, hold_open: bool) -> Self {
        StoreFacade {
            path: path.into(),
            hold_open,
            handle: None,
        }
    }

    pub fn hold_open(&self) -> bool {
        self.hold_open
    }

    fn open_handle(&self) -> Result<DB, StoreError> {
        let opts = Options {
            create_if_missing: true,
            ..Options::default()
        };
        DB::open(&self.path, opts).map_err(|e| StoreError::Open {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Scoped access to the handle: under `hold_open` it is cached on the facade and
    /// released only by [`StoreFacade::close`]; otherwise a fresh handle is opened for
    /// this call and dropped when the closure returns. Either way, release is
    /// structural — there's no path where the borrow escapes this call.
    pub fn with_db<T>(&mut self, f: impl FnOnce(&mut DB) -> T) -> Result<T, StoreError> {
        if self.hold_open {
            if self.handle.is_none() {
                self.handle = Some(self.open_handle()?);
            }
            let db = self.handle.as_mut().expect("handle just inserted");
            Ok(f(db))
        } else {
            let mut db = self.open_handle()?;
            Ok(f(&mut db))
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_db(|db| db.get(key))
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let result = self.with_db(|db| db.put(key, value).map_err(|e| e.to_string()))?;
        result.map_err(StoreError::Op)
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        let result = self.with_db(|db| db.delete(key).map_err(|e| e.to_string()))?;
        result.map_err(StoreError::Op)
    }

    pub fn new_batch(&self) -> Batch {
        Batch::new()
    }

    pub fn commit(&mut self, batch: Batch) -> Result<(), StoreError> {
        let result = self.with_db(|db| db.write(batch.inner, true).map_err(|e| e.to_string()))?;
        result.map_err(StoreError::Op)
    }

    /// All (key, value) pairs in the store, ordered by the store's own key ordering.
    /// Materialized eagerly: under `hold_open=false` the handle does not outlive this
    /// call, so a borrowed streaming iterator isn't an option here.
    pub fn iterate(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let result = self.with_db(|db| -> Result<Vec<(Vec<u8>, Vec<u8>)>, String> {
            let mut it = db.new_iter().map_err(|e| e.to_string())?;
            let mut out = Vec::new();
            let mut key = Vec::new();
            let mut val = Vec::new();
            while it.advance() {
                it.current(&mut key, &mut val);
                out.push((key.clone(), val.clone()));
            }
            Ok(out)
        })?;
        result.map_err(StoreError::Op)
    }

    /// Releases the cached handle, if any. Idempotent.
    pub fn close(&mut self) {
        self.handle = None;
    }

    /// Best-effort repair hook, exposed but never called automatically anywhere in
    /// this engine — matching the source, which declares a repair flag that is never
    /// actually set. A host application decides when to invoke this.
    pub fn repair(path: &Path) -> Result<(), StoreError> {
        debug!(path = %path.display(), "repairing store");
        let opts = Options {
            create_if_missing: false,
            ..Options::default()
        };
        rusty_leveldb::repair(path, opts).map_err(|e| StoreError::Op(e.to_string()))
    }
}
