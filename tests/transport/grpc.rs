//! gRPC transport integration tests.
//!
//! Starts a tonic gRPC server and exercises it with the generated client.

use std::sync::Arc;
use std::time::Duration;

use resource_registry::service::grpc::{
    grpc_server, CreateResourceRequest, DeleteResourceRequest, GetResourceRequest,
    HealthRequest, ListResourcesRequest, RegistryServiceClient, UpdateResourceRequest,
};
use resource_registry::{InMemoryStore, Registry, Service};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;
use tonic::Code;

type Client = RegistryServiceClient<Channel>;

/// Bind to port 0, spawn the gRPC server, and return a connected client.
async fn start_server() -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service = Arc::new(Service::standard(Registry::new(InMemoryStore::new())));
    let grpc_svc = grpc_server(service, None);
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(grpc_svc)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    RegistryServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap()
}

async fn create(client: &mut Client, parent: &str, collection: &str, id: &str, body: Value) -> Value {
    let resp = client
        .create_resource(CreateResourceRequest {
            parent: parent.into(),
            collection: collection.into(),
            id: id.into(),
            resource: body.to_string(),
        })
        .await
        .unwrap()
        .into_inner();
    serde_json::from_str(&resp.resource).unwrap()
}

#[tokio::test]
async fn health_check() {
    let mut client = start_server().await;
    let resp = client.health(HealthRequest {}).await.unwrap().into_inner();
    assert!(resp.ok);
    assert_eq!(resp.collections, vec!["apis", "projects", "specs", "versions"]);
}

#[tokio::test]
async fn project_lifecycle() {
    let mut client = start_server().await;

    let created = create(&mut client, "", "projects", "demo", json!({ "display_name": "Demo" })).await;
    assert_eq!(created["name"], "projects/demo");

    let updated = client
        .update_resource(UpdateResourceRequest {
            name: "projects/demo".into(),
            resource: json!({ "display_name": "Demo2" }).to_string(),
            update_mask: vec!["display_name".into()],
            allow_missing: false,
        })
        .await
        .unwrap()
        .into_inner();
    let updated: Value = serde_json::from_str(&updated.resource).unwrap();
    assert_eq!(updated["display_name"], "Demo2");
    assert_eq!(updated["create_time"], created["create_time"]);

    let fetched = client
        .get_resource(GetResourceRequest {
            name: "projects/demo".into(),
            view: String::new(),
        })
        .await
        .unwrap()
        .into_inner();
    let fetched: Value = serde_json::from_str(&fetched.resource).unwrap();
    assert_eq!(fetched, updated);

    let page = client
        .list_resources(ListResourcesRequest {
            collection: "projects".into(),
            filter: "project_id == 'other'".into(),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert!(page.resources.is_empty());
    assert!(page.next_page_token.is_empty());

    client
        .delete_resource(DeleteResourceRequest {
            name: "projects/demo".into(),
        })
        .await
        .unwrap();
    let status = client
        .get_resource(GetResourceRequest {
            name: "projects/demo".into(),
            view: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let mut client = start_server().await;
    create(&mut client, "", "projects", "demo", json!({})).await;

    let status = client
        .create_resource(CreateResourceRequest {
            parent: String::new(),
            collection: "projects".into(),
            id: "demo".into(),
            resource: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    let status = client
        .get_resource(GetResourceRequest {
            name: "projects/Not Valid".into(),
            view: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = client
        .get_resource(GetResourceRequest {
            name: "projects/demo".into(),
            view: "everything".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = client
        .list_resources(ListResourcesRequest {
            collection: "widgets".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    let status = client
        .update_resource(UpdateResourceRequest {
            name: "projects/demo".into(),
            resource: "{}".into(),
            update_mask: vec!["create_time".into()],
            allow_missing: false,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn paging_over_grpc() {
    let mut client = start_server().await;
    for i in 0..7 {
        create(&mut client, "", "projects", &format!("p{i}"), json!({})).await;
    }

    let mut total = 0;
    let mut calls = 0;
    let mut token = String::new();
    loop {
        calls += 1;
        let page = client
            .list_resources(ListResourcesRequest {
                collection: "projects".into(),
                page_size: 3,
                page_token: token,
                ..Default::default()
            })
            .await
            .unwrap()
            .into_inner();
        total += page.resources.len();
        if page.next_page_token.is_empty() {
            break;
        }
        token = page.next_page_token;
    }
    assert_eq!(total, 7);
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn client_deadline_reaches_the_engine() {
    let mut client = start_server().await;
    create(&mut client, "", "projects", "demo", json!({})).await;

    let mut request = tonic::Request::new(GetResourceRequest {
        name: "projects/demo".into(),
        view: String::new(),
    });
    request.set_timeout(Duration::from_secs(5));
    let resp = client.get_resource(request).await.unwrap().into_inner();
    let project: Value = serde_json::from_str(&resp.resource).unwrap();
    assert_eq!(project["project_id"], "demo");

    let mut request = tonic::Request::new(GetResourceRequest {
        name: "projects/demo".into(),
        view: String::new(),
    });
    request
        .metadata_mut()
        .insert("grpc-timeout", "soon".parse().unwrap());
    let status = client.get_resource(request).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}
