//! Resource lifecycle engine.
//!
//! `Registry<P>` implements create, get, update, delete and list for every
//! [`Resource`] type against a storage collaborator. It keeps no state
//! between calls: each operation acquires a store handle from the provider,
//! works through it sequentially, and drops it on return.
//!
//! ## Example
//!
//! ```ignore
//! use resource_registry::{CallContext, InMemoryStore, Project, Registry};
//!
//! let registry = Registry::new(InMemoryStore::new());
//! let ctx = CallContext::new();
//! let demo = registry.create::<Project>(&ctx, "", "demo", &Project::default())?;
//! let same = registry.get::<Project>(&ctx, "projects/demo")?;
//! ```

mod lifecycle;
mod list;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

use crate::config::EngineOptions;
use crate::context::CallContext;
use crate::error::RegistryError;
use crate::models::Resource;
use crate::store::{Store, StoreError, StoreKey, StoreProvider};

pub use list::{ListRequest, Page};

/// The lifecycle engine, generic over the store provider.
pub struct Registry<P> {
    provider: P,
    options: EngineOptions,
}

impl<P: StoreProvider> Registry<P> {
    /// Create an engine with default page sizes and cascade policy.
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, EngineOptions::default())
    }

    pub fn with_options(provider: P, options: EngineOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Acquire the store handle for one operation.
    fn connect(&self, ctx: &CallContext) -> Result<P::Handle, RegistryError> {
        ctx.check()?;
        Ok(self.provider.connect(ctx)?)
    }
}

/// Current time at the resolution records store.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A timestamp strictly after `previous`, normally the current time.
fn next_update_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    let current = now();
    if current > previous {
        current
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

fn decode<R: Resource>(bytes: &[u8]) -> Result<R, RegistryError> {
    serde_json::from_slice(bytes)
        .map_err(|e| RegistryError::internal_with("stored record could not be decoded", e))
}

fn encode<R: Resource>(record: &R) -> Result<Vec<u8>, RegistryError> {
    serde_json::to_vec(record)
        .map_err(|e| RegistryError::internal_with("record could not be encoded", e))
}

/// Whether `key` is present, treating only `NoSuchKey` as absence.
fn exists<S: Store>(store: &S, ctx: &CallContext, key: &StoreKey) -> Result<bool, RegistryError> {
    match store.get(ctx, key) {
        Ok(_) => Ok(true),
        Err(StoreError::NoSuchKey) => Ok(false),
        Err(err) => Err(err.into()),
    }
}
