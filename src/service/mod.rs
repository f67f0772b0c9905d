//! Service: collection handler registry and JSON-level dispatch.
//!
//! `Service<P>` wraps a [`Registry`] and a set of collection handlers keyed
//! by collection label (`projects`, `apis`, ...). Each handler moves records
//! of one resource type between JSON and the typed engine, so the transports
//! never name a concrete resource type.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use resource_registry::{service::Service, InMemoryStore, Registry};
//!
//! let service = Arc::new(Service::standard(Registry::new(InMemoryStore::new())));
//!
//! let app = resource_registry::service::http::router(service.clone(), timeout);
//! resource_registry::service::grpc::serve_grpc(service, addr, Some(timeout)).await?;
//! ```

#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "http")]
pub mod http;

use std::collections::HashMap;
use std::marker::PhantomData;

use serde_json::Value;

use crate::context::CallContext;
use crate::error::RegistryError;
use crate::models::{Api, Project, Resource, Spec, UpdateMask, Version, View};
use crate::names::ResourceName;
use crate::registry::{ListRequest, Registry};
use crate::store::StoreProvider;

/// One page of JSON records.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse {
    pub items: Vec<Value>,
    pub next_page_token: String,
}

/// Typed operations for one collection, erased to JSON.
trait CollectionHandler<P>: Send + Sync {
    fn create(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        parent: &str,
        id: &str,
        input: Value,
    ) -> Result<Value, RegistryError>;

    fn get(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        name: &str,
        view: View,
    ) -> Result<Value, RegistryError>;

    fn update(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        name: &str,
        input: Value,
        mask: &UpdateMask,
        allow_missing: bool,
    ) -> Result<Value, RegistryError>;

    fn list(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        request: &ListRequest,
        view: View,
    ) -> Result<ListResponse, RegistryError>;
}

struct Typed<R>(PhantomData<fn() -> R>);

impl<R: Resource> Typed<R> {
    fn decode(input: Value) -> Result<R, RegistryError> {
        Ok(serde_json::from_value(input)?)
    }

    fn encode(mut record: R, view: View) -> Result<Value, RegistryError> {
        record.strip_for_view(view);
        serde_json::to_value(record)
            .map_err(|e| RegistryError::internal_with("record could not be encoded", e))
    }
}

impl<P: StoreProvider, R: Resource> CollectionHandler<P> for Typed<R> {
    fn create(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        parent: &str,
        id: &str,
        input: Value,
    ) -> Result<Value, RegistryError> {
        let record = registry.create(ctx, parent, id, &Self::decode(input)?)?;
        Self::encode(record, View::Basic)
    }

    fn get(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        name: &str,
        view: View,
    ) -> Result<Value, RegistryError> {
        Self::encode(registry.get::<R>(ctx, name)?, view)
    }

    fn update(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        name: &str,
        input: Value,
        mask: &UpdateMask,
        allow_missing: bool,
    ) -> Result<Value, RegistryError> {
        let record = registry.update(ctx, name, &Self::decode(input)?, mask, allow_missing)?;
        Self::encode(record, View::Basic)
    }

    fn list(
        &self,
        registry: &Registry<P>,
        ctx: &CallContext,
        request: &ListRequest,
        view: View,
    ) -> Result<ListResponse, RegistryError> {
        let page = registry.list::<R>(ctx, request)?;
        let items = page
            .items
            .into_iter()
            .map(|record| Self::encode(record, view))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResponse {
            items,
            next_page_token: page.next_page_token,
        })
    }
}

/// A registry exposed through named collections.
pub struct Service<P> {
    registry: Registry<P>,
    handlers: HashMap<&'static str, Box<dyn CollectionHandler<P>>>,
}

impl<P: StoreProvider> Service<P> {
    /// A service with no collections registered.
    pub fn new(registry: Registry<P>) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
        }
    }

    /// A service exposing projects, apis, versions and specs.
    pub fn standard(registry: Registry<P>) -> Self {
        Self::new(registry)
            .collection::<Project>()
            .collection::<Api>()
            .collection::<Version>()
            .collection::<Spec>()
    }

    /// Register the collection for resource type `R`.
    ///
    /// Uses builder pattern: returns `self` for chaining.
    pub fn collection<R: Resource>(mut self) -> Self {
        self.handlers
            .insert(R::KIND.collection(), Box::new(Typed::<R>(PhantomData)));
        self
    }

    fn handler(&self, collection: &str) -> Result<&dyn CollectionHandler<P>, RegistryError> {
        self.handlers
            .get(collection)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| RegistryError::NotFound(format!("unknown collection {:?}", collection)))
    }

    fn handler_for_name(&self, name: &str) -> Result<&dyn CollectionHandler<P>, RegistryError> {
        let parsed = ResourceName::parse(name)?;
        self.handler(parsed.kind().collection())
    }

    pub fn create(
        &self,
        ctx: &CallContext,
        parent: &str,
        collection: &str,
        id: &str,
        input: Value,
    ) -> Result<Value, RegistryError> {
        self.handler(collection)?
            .create(&self.registry, ctx, parent, id, input)
    }

    pub fn get(&self, ctx: &CallContext, name: &str, view: View) -> Result<Value, RegistryError> {
        self.handler_for_name(name)?
            .get(&self.registry, ctx, name, view)
    }

    pub fn update(
        &self,
        ctx: &CallContext,
        name: &str,
        input: Value,
        mask: &UpdateMask,
        allow_missing: bool,
    ) -> Result<Value, RegistryError> {
        self.handler_for_name(name)?
            .update(&self.registry, ctx, name, input, mask, allow_missing)
    }

    pub fn delete(&self, ctx: &CallContext, name: &str) -> Result<(), RegistryError> {
        self.handler_for_name(name)?;
        self.registry.delete(ctx, name)
    }

    pub fn list(
        &self,
        ctx: &CallContext,
        collection: &str,
        request: &ListRequest,
        view: View,
    ) -> Result<ListResponse, RegistryError> {
        self.handler(collection)?
            .list(&self.registry, ctx, request, view)
    }

    /// Registered collection labels, sorted.
    pub fn collections(&self) -> Vec<&str> {
        let mut collections: Vec<&str> = self.handlers.keys().copied().collect();
        collections.sort_unstable();
        collections
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &Registry<P> {
        &self.registry
    }
}
