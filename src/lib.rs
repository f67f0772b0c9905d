//! Resource registry: CRUD, filtered listing and cursor pagination over
//! hierarchical resource names, backed by a key-value store.
//!
//! The engine ([`Registry`]) is generic over a [`StoreProvider`]; the
//! [`service`] module exposes it over HTTP and gRPC.

// The `Filterable` derive emits paths rooted at `resource_registry`.
extern crate self as resource_registry;

pub mod compile;
pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod models;
pub mod names;
pub mod registry;
pub mod service;
pub mod store;

pub use config::{CascadePolicy, EngineOptions, ServerConfig};
pub use context::{CallContext, Interrupted};
pub use cursor::{bound_page_size, PageCursor, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use error::RegistryError;
pub use filter::{FieldType, FieldValue, FilterPredicate, FilterSchema, Filterable};
pub use models::{Api, Project, Resource, ResourceMeta, Spec, UpdateMask, Version, View};
pub use names::{parent_name, parse_parent, ResourceKind, ResourceName};
pub use registry::{ListRequest, Page, Registry};
pub use resource_registry_macros::Filterable;
pub use service::Service;
pub use store::{InMemoryStore, Store, StoreError, StoreKey, StoreProvider};

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` overrides
/// `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("resource_registry={},registry={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
