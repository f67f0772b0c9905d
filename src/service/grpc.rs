//! gRPC transport: maps `registry.v1.RegistryService` calls onto the service.
//!
//! Requires the `grpc` feature. Uses tonic for the gRPC server and prost
//! for message serialization (standard protobuf wire format, no `.proto` file).
//! Resources travel as JSON strings, the same documents the HTTP transport
//! exchanges.
//!
//! ## RPCs
//!
//! - `CreateResource`, `GetResource`, `UpdateResource`, `DeleteResource`,
//!   `ListResources`: the lifecycle operations.
//! - `Health`: health check returning the registered collections.
//!
//! The `grpc-timeout` request header becomes the call's deadline; without
//! it the server's default request timeout applies.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};
use tracing::{error, info};

use super::Service;
use crate::context::CallContext;
use crate::error::RegistryError;
use crate::models::{UpdateMask, View};
use crate::registry::ListRequest;
use crate::store::StoreProvider;

// ---------------------------------------------------------------------------
// Message types (prost: standard protobuf wire format)
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateResourceRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub collection: String,
    #[prost(string, tag = "3")]
    pub id: String,
    #[prost(string, tag = "4")]
    pub resource: String, // JSON string
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ResourceResponse {
    #[prost(string, tag = "1")]
    pub resource: String, // JSON string
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetResourceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    /// `basic` (default) or `full`.
    #[prost(string, tag = "2")]
    pub view: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateResourceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub resource: String, // JSON string
    #[prost(string, repeated, tag = "3")]
    pub update_mask: Vec<String>,
    #[prost(bool, tag = "4")]
    pub allow_missing: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteResourceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteResourceResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListResourcesRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub collection: String,
    #[prost(string, tag = "3")]
    pub filter: String,
    #[prost(int32, tag = "4")]
    pub page_size: i32,
    #[prost(string, tag = "5")]
    pub page_token: String,
    #[prost(string, tag = "6")]
    pub view: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListResourcesResponse {
    #[prost(string, repeated, tag = "1")]
    pub resources: Vec<String>, // JSON strings
    #[prost(string, tag = "2")]
    pub next_page_token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthResponse {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(string, repeated, tag = "2")]
    pub collections: Vec<String>,
}

// ---------------------------------------------------------------------------
// Generated service trait + server/client
// ---------------------------------------------------------------------------

include!(concat!(env!("OUT_DIR"), "/registry.v1.RegistryService.rs"));

pub use registry_service_client::RegistryServiceClient;
pub use registry_service_server::{RegistryService, RegistryServiceServer};

// ---------------------------------------------------------------------------
// Handler implementation
// ---------------------------------------------------------------------------

/// gRPC handler that wraps a `Service<P>` and implements the generated
/// `RegistryService` trait. Mirrors the HTTP transport.
pub struct GrpcHandler<P> {
    service: Arc<Service<P>>,
    default_timeout: Option<Duration>,
}

impl<P> GrpcHandler<P> {
    pub fn new(service: Arc<Service<P>>, default_timeout: Option<Duration>) -> Self {
        Self {
            service,
            default_timeout,
        }
    }

    fn context(&self, metadata: &MetadataMap) -> Result<CallContext, Status> {
        let timeout = match metadata.get("grpc-timeout") {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| Status::invalid_argument("grpc-timeout is not ASCII"))?;
                Some(parse_grpc_timeout(raw).ok_or_else(|| {
                    Status::invalid_argument(format!("malformed grpc-timeout {:?}", raw))
                })?)
            }
            None => self.default_timeout,
        };
        Ok(match timeout {
            Some(timeout) => CallContext::with_timeout(timeout),
            None => CallContext::new(),
        })
    }
}

#[tonic::async_trait]
impl<P: StoreProvider + 'static> RegistryService for GrpcHandler<P> {
    async fn create_resource(
        &self,
        request: Request<CreateResourceRequest>,
    ) -> Result<Response<ResourceResponse>, Status> {
        let ctx = self.context(request.metadata())?;
        let req = request.into_inner();
        let input = parse_resource(&req.resource)?;
        let created = self
            .service
            .create(&ctx, &req.parent, &req.collection, &req.id, input)
            .map_err(to_status)?;
        Ok(Response::new(ResourceResponse {
            resource: created.to_string(),
        }))
    }

    async fn get_resource(
        &self,
        request: Request<GetResourceRequest>,
    ) -> Result<Response<ResourceResponse>, Status> {
        let ctx = self.context(request.metadata())?;
        let req = request.into_inner();
        let view: View = req.view.parse().map_err(to_status)?;
        let resource = self
            .service
            .get(&ctx, &req.name, view)
            .map_err(to_status)?;
        Ok(Response::new(ResourceResponse {
            resource: resource.to_string(),
        }))
    }

    async fn update_resource(
        &self,
        request: Request<UpdateResourceRequest>,
    ) -> Result<Response<ResourceResponse>, Status> {
        let ctx = self.context(request.metadata())?;
        let req = request.into_inner();
        let input = parse_resource(&req.resource)?;
        let mask = UpdateMask::new(req.update_mask);
        let updated = self
            .service
            .update(&ctx, &req.name, input, &mask, req.allow_missing)
            .map_err(to_status)?;
        Ok(Response::new(ResourceResponse {
            resource: updated.to_string(),
        }))
    }

    async fn delete_resource(
        &self,
        request: Request<DeleteResourceRequest>,
    ) -> Result<Response<DeleteResourceResponse>, Status> {
        let ctx = self.context(request.metadata())?;
        let req = request.into_inner();
        self.service.delete(&ctx, &req.name).map_err(to_status)?;
        Ok(Response::new(DeleteResourceResponse {}))
    }

    async fn list_resources(
        &self,
        request: Request<ListResourcesRequest>,
    ) -> Result<Response<ListResourcesResponse>, Status> {
        let ctx = self.context(request.metadata())?;
        let req = request.into_inner();
        let view: View = req.view.parse().map_err(to_status)?;
        let list = ListRequest {
            parent: req.parent,
            filter: req.filter,
            page_size: req.page_size,
            page_token: req.page_token,
        };
        let page = self
            .service
            .list(&ctx, &req.collection, &list, view)
            .map_err(to_status)?;
        Ok(Response::new(ListResourcesResponse {
            resources: page.items.iter().map(Value::to_string).collect(),
            next_page_token: page.next_page_token,
        }))
    }

    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        let collections: Vec<String> = self
            .service
            .collections()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        Ok(Response::new(HealthResponse {
            ok: true,
            collections,
        }))
    }
}

/// An empty payload is an empty object.
fn parse_resource(raw: &str) -> Result<Value, Status> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| to_status(e.into()))
}

/// Map an engine error to the matching gRPC status.
pub fn to_status(err: RegistryError) -> Status {
    let message = err.to_string();
    match err {
        RegistryError::InvalidArgument(_) => Status::invalid_argument(message),
        RegistryError::NotFound(_) => Status::not_found(message),
        RegistryError::AlreadyExists(_) => Status::already_exists(message),
        RegistryError::Internal { .. } => {
            error!(error = %err, cause = ?std::error::Error::source(&err), "request failed");
            Status::internal(message)
        }
        RegistryError::Cancelled => Status::cancelled(message),
        RegistryError::DeadlineExceeded => Status::deadline_exceeded(message),
    }
}

/// Parse a `grpc-timeout` header value: at most eight digits and a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(raw: &str) -> Option<Duration> {
    let unit = raw.chars().last()?;
    let digits = &raw[..raw.len() - unit.len_utf8()];
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    match unit {
        'H' => Some(Duration::from_secs(value * 3600)),
        'M' => Some(Duration::from_secs(value * 60)),
        'S' => Some(Duration::from_secs(value)),
        'm' => Some(Duration::from_millis(value)),
        'u' => Some(Duration::from_micros(value)),
        'n' => Some(Duration::from_nanos(value)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

/// Create a `RegistryServiceServer` from a shared `Service<P>`.
pub fn grpc_server<P: StoreProvider + 'static>(
    service: Arc<Service<P>>,
    default_timeout: Option<Duration>,
) -> RegistryServiceServer<GrpcHandler<P>> {
    RegistryServiceServer::new(GrpcHandler::new(service, default_timeout))
}

/// Bind and serve the gRPC transport at the given address.
pub async fn serve_grpc<P: StoreProvider + 'static>(
    service: Arc<Service<P>>,
    addr: SocketAddr,
    default_timeout: Option<Duration>,
) -> Result<(), tonic::transport::Error> {
    info!(%addr, "gRPC transport listening");
    tonic::transport::Server::builder()
        .add_service(grpc_server(service, default_timeout))
        .serve(addr)
        .await
}
