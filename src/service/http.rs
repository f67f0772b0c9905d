//! HTTP transport: maps REST-style requests onto the service.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! Paths under `/v1/` are resource names. A path ending in a collection label
//! addresses a collection, any other path addresses one resource.
//!
//! - `GET /v1/{parent}/{collection}?filter=&page_size=&page_token=&view=`: list.
//! - `POST /v1/{parent}/{collection}?id={id}`: create. Body = JSON resource.
//! - `GET /v1/{name}?view=basic|full`: get.
//! - `PATCH /v1/{name}?update_mask=a,b&allow_missing=true`: update. Body = JSON fields.
//! - `DELETE /v1/{name}`: delete (cascades to children).
//! - `GET /health`: `{ "ok": true, "collections": [...] }`.
//!
//! Failures return `{ "error": { "code", "status", "message" } }` with the
//! matching HTTP status.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, info};

use super::Service;
use crate::context::CallContext;
use crate::error::RegistryError;
use crate::models::{UpdateMask, View};
use crate::names::ResourceKind;
use crate::registry::ListRequest;
use crate::store::StoreProvider;

type Params = Query<HashMap<String, String>>;

struct HttpState<P> {
    service: Arc<Service<P>>,
    request_timeout: Duration,
}

impl<P> Clone for HttpState<P> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<P> HttpState<P> {
    fn context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout)
    }
}

/// A `/v1/` path split into what it addresses.
#[derive(Debug)]
enum Target {
    Collection { parent: String, collection: String },
    Resource { name: String },
}

impl Target {
    fn parse(path: &str) -> Result<Self, RegistryError> {
        let path = path.trim_matches('/');
        let segments: Vec<&str> = path.split('/').collect();
        if path.is_empty() {
            return Err(RegistryError::InvalidArgument("empty resource path".into()));
        }
        if segments.len() % 2 == 1 {
            let (collection, parent) = segments
                .split_last()
                .map(|(last, rest)| (last.to_string(), rest.join("/")))
                .unwrap_or_default();
            if ResourceKind::from_collection(&collection).is_none() {
                return Err(RegistryError::NotFound(format!(
                    "unknown collection {:?}",
                    collection
                )));
            }
            Ok(Target::Collection { parent, collection })
        } else {
            Ok(Target::Resource {
                name: path.to_string(),
            })
        }
    }
}

/// Build an axum `Router` serving the given service.
pub fn router<P>(service: Arc<Service<P>>, request_timeout: Duration) -> Router
where
    P: StoreProvider + 'static,
{
    Router::new()
        .route("/health", get(health_handler::<P>))
        .route(
            "/v1/*path",
            get(get_handler::<P>)
                .post(create_handler::<P>)
                .patch(update_handler::<P>)
                .delete(delete_handler::<P>),
        )
        .with_state(HttpState {
            service,
            request_timeout,
        })
}

/// Serve the service over HTTP at the given address.
pub async fn serve<P>(
    service: Arc<Service<P>>,
    addr: SocketAddr,
    request_timeout: Duration,
) -> Result<(), std::io::Error>
where
    P: StoreProvider + 'static,
{
    let app = router(service, request_timeout);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP transport listening");
    axum::serve(listener, app).await
}

/// `GET /health`: returns `{ "ok": true, "collections": [...] }`.
async fn health_handler<P: StoreProvider + 'static>(
    State(state): State<HttpState<P>>,
) -> impl IntoResponse {
    let collections = state.service.collections();
    Json(json!({ "ok": true, "collections": collections }))
}

/// `GET /v1/...`: list a collection or get one resource.
async fn get_handler<P: StoreProvider + 'static>(
    State(state): State<HttpState<P>>,
    Path(path): Path<String>,
    Query(params): Params,
) -> Response {
    respond(get_inner(&state, &path, &params))
}

fn get_inner<P: StoreProvider>(
    state: &HttpState<P>,
    path: &str,
    params: &HashMap<String, String>,
) -> Result<Value, RegistryError> {
    let view: View = params.get("view").map(String::as_str).unwrap_or("").parse()?;
    let ctx = state.context();
    match Target::parse(path)? {
        Target::Resource { name } => state.service.get(&ctx, &name, view),
        Target::Collection { parent, collection } => {
            let request = ListRequest {
                parent,
                filter: params.get("filter").cloned().unwrap_or_default(),
                page_size: page_size(params)?,
                page_token: params.get("page_token").cloned().unwrap_or_default(),
            };
            let page = state.service.list(&ctx, &collection, &request, view)?;
            Ok(json!({
                collection: page.items,
                "next_page_token": page.next_page_token,
            }))
        }
    }
}

/// `POST /v1/{parent}/{collection}?id=`: create.
async fn create_handler<P: StoreProvider + 'static>(
    State(state): State<HttpState<P>>,
    Path(path): Path<String>,
    Query(params): Params,
    body: Bytes,
) -> Response {
    respond(create_inner(&state, &path, &params, &body))
}

fn create_inner<P: StoreProvider>(
    state: &HttpState<P>,
    path: &str,
    params: &HashMap<String, String>,
    body: &[u8],
) -> Result<Value, RegistryError> {
    let Target::Collection { parent, collection } = Target::parse(path)? else {
        return Err(RegistryError::InvalidArgument(
            "create needs a collection path".into(),
        ));
    };
    let id = params
        .get("id")
        .ok_or_else(|| RegistryError::InvalidArgument("missing id parameter".into()))?;
    let input = body_json(body)?;
    state
        .service
        .create(&state.context(), &parent, &collection, id, input)
}

/// `PATCH /v1/{name}`: update.
async fn update_handler<P: StoreProvider + 'static>(
    State(state): State<HttpState<P>>,
    Path(path): Path<String>,
    Query(params): Params,
    body: Bytes,
) -> Response {
    respond(update_inner(&state, &path, &params, &body))
}

fn update_inner<P: StoreProvider>(
    state: &HttpState<P>,
    path: &str,
    params: &HashMap<String, String>,
    body: &[u8],
) -> Result<Value, RegistryError> {
    let Target::Resource { name } = Target::parse(path)? else {
        return Err(RegistryError::InvalidArgument(
            "update needs a resource path".into(),
        ));
    };
    let mask = UpdateMask::parse(params.get("update_mask").map(String::as_str).unwrap_or(""));
    let allow_missing = match params.get("allow_missing").map(String::as_str) {
        None | Some("") | Some("false") => false,
        Some("true") => true,
        Some(other) => {
            return Err(RegistryError::InvalidArgument(format!(
                "allow_missing must be true or false, got {:?}",
                other
            )))
        }
    };
    let input = body_json(body)?;
    state
        .service
        .update(&state.context(), &name, input, &mask, allow_missing)
}

/// `DELETE /v1/{name}`: delete with cascade.
async fn delete_handler<P: StoreProvider + 'static>(
    State(state): State<HttpState<P>>,
    Path(path): Path<String>,
) -> Response {
    let result = match Target::parse(&path) {
        Ok(Target::Resource { name }) => state
            .service
            .delete(&state.context(), &name)
            .map(|()| json!({})),
        Ok(Target::Collection { .. }) => Err(RegistryError::InvalidArgument(
            "delete needs a resource path".into(),
        )),
        Err(err) => Err(err),
    };
    respond(result)
}

fn page_size(params: &HashMap<String, String>) -> Result<i32, RegistryError> {
    match params.get("page_size") {
        None => Ok(0),
        Some(raw) if raw.is_empty() => Ok(0),
        Some(raw) => raw.parse().map_err(|_| {
            RegistryError::InvalidArgument(format!("page_size {:?} is not an integer", raw))
        }),
    }
}

/// An empty body is an empty object.
fn body_json(body: &[u8]) -> Result<Value, RegistryError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    Ok(serde_json::from_slice(body)?)
}

fn respond(result: Result<Value, RegistryError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &RegistryError) -> Response {
    if matches!(e, RegistryError::Internal { .. }) {
        error!(error = %e, cause = ?std::error::Error::source(e), "request failed");
    }
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "error": {
            "code": e.status_code(),
            "status": e.status_name(),
            "message": e.to_string(),
        }
    });
    (status, Json(body)).into_response()
}
