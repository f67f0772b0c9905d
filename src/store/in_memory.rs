//! InMemoryStore - ordered, BTreeMap-backed store for the server binary and tests.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::{Scan, ScanItem, ScanQuery, Store, StoreError, StoreKey, StoreProvider};
use crate::context::CallContext;

/// In-memory store keyed by `(kind, name)`.
///
/// Scans walk a kind in lexicographic name order, and the resume position of
/// an item is its name, so a scan resumed from any item continues right after
/// it. Keys are unique, so every scan is already distinct. Clone-friendly via
/// Arc.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<RwLock<BTreeMap<StoreKey, Vec<u8>>>>,
    open_handles: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles acquired through [`StoreProvider::connect`] and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &StoreKey) -> bool {
        self.storage
            .read()
            .map(|storage| storage.contains_key(key))
            .unwrap_or(false)
    }

    /// Total number of stored records across all kinds.
    pub fn len(&self) -> usize {
        self.storage.read().map(|storage| storage.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Fault("lock poisoned".into())
    }
}

impl Store for InMemoryStore {
    fn get(&self, ctx: &CallContext, key: &StoreKey) -> Result<Vec<u8>, StoreError> {
        ctx.check()?;
        let storage = self.storage.read().map_err(|_| Self::poisoned())?;
        storage.get(key).cloned().ok_or(StoreError::NoSuchKey)
    }

    fn put(
        &self,
        ctx: &CallContext,
        key: &StoreKey,
        value: Vec<u8>,
    ) -> Result<StoreKey, StoreError> {
        ctx.check()?;
        let mut storage = self.storage.write().map_err(|_| Self::poisoned())?;
        storage.insert(key.clone(), value);
        Ok(key.clone())
    }

    fn delete(&self, ctx: &CallContext, key: &StoreKey) -> Result<(), StoreError> {
        ctx.check()?;
        let mut storage = self.storage.write().map_err(|_| Self::poisoned())?;
        storage.remove(key);
        Ok(())
    }

    fn scan<'a>(
        &'a self,
        ctx: &'a CallContext,
        query: ScanQuery,
    ) -> Result<Scan<'a>, StoreError> {
        ctx.check()?;

        let position = if query.resume.is_empty() {
            None
        } else {
            let name = String::from_utf8(query.resume)
                .map_err(|_| StoreError::InvalidResume("not a key position".into()))?;
            if !name.starts_with(&query.prefix) {
                return Err(StoreError::InvalidResume(format!(
                    "position {} is outside the scanned range {}",
                    name, query.prefix
                )));
            }
            Some(name)
        };

        Ok(Box::new(InMemoryScan {
            store: self,
            ctx,
            kind: query.kind,
            prefix: query.prefix,
            position,
            done: false,
        }))
    }
}

/// Scan cursor that re-reads the map on every step, so no lock is held
/// between items and concurrent writers are never blocked by a slow reader.
struct InMemoryScan<'a> {
    store: &'a InMemoryStore,
    ctx: &'a CallContext,
    kind: String,
    prefix: String,
    position: Option<String>,
    done: bool,
}

impl InMemoryScan<'_> {
    fn step(&mut self) -> Result<Option<ScanItem>, StoreError> {
        self.ctx.check()?;
        let storage = self
            .store
            .storage
            .read()
            .map_err(|_| InMemoryStore::poisoned())?;

        let lower = match &self.position {
            Some(name) => Bound::Excluded(StoreKey::new(self.kind.clone(), name.clone())),
            None => Bound::Included(StoreKey::new(self.kind.clone(), self.prefix.clone())),
        };

        let next = storage
            .range((lower, Bound::Unbounded))
            .next()
            .filter(|(key, _)| key.kind == self.kind && key.name.starts_with(&self.prefix))
            .map(|(key, value)| (key.clone(), value.clone()));
        drop(storage);

        Ok(next.map(|(key, value)| {
            self.position = Some(key.name.clone());
            ScanItem {
                resume: key.name.clone().into_bytes(),
                key,
                value,
            }
        }))
    }
}

impl Iterator for InMemoryScan<'_> {
    type Item = Result<ScanItem, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// A store handle scoped to one operation. Dropping it releases the handle.
pub struct InMemoryHandle {
    store: InMemoryStore,
}

impl Drop for InMemoryHandle {
    fn drop(&mut self) {
        self.store.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Store for InMemoryHandle {
    fn get(&self, ctx: &CallContext, key: &StoreKey) -> Result<Vec<u8>, StoreError> {
        self.store.get(ctx, key)
    }

    fn put(
        &self,
        ctx: &CallContext,
        key: &StoreKey,
        value: Vec<u8>,
    ) -> Result<StoreKey, StoreError> {
        self.store.put(ctx, key, value)
    }

    fn delete(&self, ctx: &CallContext, key: &StoreKey) -> Result<(), StoreError> {
        self.store.delete(ctx, key)
    }

    fn scan<'a>(
        &'a self,
        ctx: &'a CallContext,
        query: ScanQuery,
    ) -> Result<Scan<'a>, StoreError> {
        self.store.scan(ctx, query)
    }
}

impl StoreProvider for InMemoryStore {
    type Handle = InMemoryHandle;

    fn connect(&self, ctx: &CallContext) -> Result<Self::Handle, StoreError> {
        ctx.check()?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryHandle {
            store: self.clone(),
        })
    }
}
