use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use parking_lot::RwLock;
use crate::error::{Error, Result};
use crate::store::SessionStore;

/// In-memory session store for tests and demos.
///
/// Clones share the same slots. Read and write failures can be injected to
/// exercise the fail-open paths.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    values: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw value, bypassing encoding. Useful to seed corrupt records.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.values.write().insert(key.into(), value.into());
    }

    /// Returns the raw stored value.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.values.read().get(key).cloned()
    }

    /// Makes subsequent reads fail with a persistence error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail with a persistence error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Persistence(format!("read of {key} failed")));
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence(format!("write of {key} failed")));
        }
        self.inner.values.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.values.write().remove(key);
        Ok(())
    }
}
