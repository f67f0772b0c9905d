//! Shared fixtures: a store wrapper that injects faults and delays.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use resource_registry::store::{InMemoryHandle, Scan, ScanQuery};
use resource_registry::{
    Api, CallContext, InMemoryStore, Project, Registry, Spec, Store, StoreError, StoreKey,
    StoreProvider, Version,
};

#[derive(Default)]
struct Faults {
    /// Names whose deletion fails.
    failing_deletes: Mutex<HashSet<String>>,
    /// Refuse every connection.
    unavailable: AtomicBool,
    /// Cancel the call after this many scan items have been yielded.
    cancel_after: Mutex<Option<usize>>,
    /// Sleep this long before yielding each scan item.
    scan_delay: Mutex<Option<Duration>>,
    /// Delete calls attempted, failed or not.
    deletes: AtomicUsize,
}

/// An in-memory store whose handles can be told to misbehave.
#[derive(Clone, Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    faults: Arc<Faults>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn fail_delete_of(&self, name: &str) {
        self.faults
            .failing_deletes
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn cancel_after(&self, items: usize) {
        *self.faults.cancel_after.lock().unwrap() = Some(items);
    }

    pub fn delay_scans(&self, delay: Duration) {
        *self.faults.scan_delay.lock().unwrap() = Some(delay);
    }

    pub fn delete_calls(&self) -> usize {
        self.faults.deletes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, kind: &str, name: &str) -> bool {
        self.inner.contains(&StoreKey::new(kind, name))
    }
}

pub struct FaultyHandle {
    inner: InMemoryHandle,
    faults: Arc<Faults>,
}

impl Store for FaultyHandle {
    fn get(&self, ctx: &CallContext, key: &StoreKey) -> Result<Vec<u8>, StoreError> {
        self.inner.get(ctx, key)
    }

    fn put(
        &self,
        ctx: &CallContext,
        key: &StoreKey,
        value: Vec<u8>,
    ) -> Result<StoreKey, StoreError> {
        self.inner.put(ctx, key, value)
    }

    fn delete(&self, ctx: &CallContext, key: &StoreKey) -> Result<(), StoreError> {
        self.faults.deletes.fetch_add(1, Ordering::SeqCst);
        if self.faults.failing_deletes.lock().unwrap().contains(&key.name) {
            return Err(StoreError::Fault(format!("injected failure deleting {}", key.name)));
        }
        self.inner.delete(ctx, key)
    }

    fn scan<'a>(
        &'a self,
        ctx: &'a CallContext,
        query: ScanQuery,
    ) -> Result<Scan<'a>, StoreError> {
        let scan = self.inner.scan(ctx, query)?;
        let cancel_after = *self.faults.cancel_after.lock().unwrap();
        let delay = *self.faults.scan_delay.lock().unwrap();
        let mut yielded = 0usize;
        Ok(Box::new(scan.inspect(move |_| {
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            yielded += 1;
            if cancel_after == Some(yielded) {
                ctx.cancel();
            }
        })))
    }
}

impl StoreProvider for FaultyStore {
    type Handle = FaultyHandle;

    fn connect(&self, ctx: &CallContext) -> Result<Self::Handle, StoreError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(FaultyHandle {
            inner: self.inner.connect(ctx)?,
            faults: self.faults.clone(),
        })
    }
}

/// Names used by the seeded hierarchy.
pub const PROJECT: &str = "projects/demo";
pub const API: &str = "projects/demo/apis/petstore";
pub const VERSION: &str = "projects/demo/apis/petstore/versions/v1";
pub const SPEC: &str = "projects/demo/apis/petstore/versions/v1/specs/openapi.yaml";

/// Create one project with an api, a version and a spec below it.
pub fn seed_hierarchy<P: StoreProvider>(registry: &Registry<P>) {
    let ctx = CallContext::new();
    registry
        .create(&ctx, "", "demo", &Project::default())
        .unwrap();
    registry
        .create(&ctx, PROJECT, "petstore", &Api::default())
        .unwrap();
    registry
        .create(&ctx, API, "v1", &Version::default())
        .unwrap();
    registry
        .create(
            &ctx,
            VERSION,
            "openapi.yaml",
            &Spec {
                style: "openapi/v3".into(),
                contents: b"openapi: 3.0.0".to_vec(),
                ..Default::default()
            },
        )
        .unwrap();
}
