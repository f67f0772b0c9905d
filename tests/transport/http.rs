//! HTTP transport integration tests.
//!
//! Starts an axum server and exercises it with reqwest.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use resource_registry::service::http;
use resource_registry::{InMemoryStore, Registry, Service};
use serde_json::{json, Value};

/// Bind to port 0 and return the base URL.
async fn start_server() -> String {
    let service = Arc::new(Service::standard(Registry::new(InMemoryStore::new())));
    let app = http::router(service, Duration::from_secs(5));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn create(client: &reqwest::Client, base: &str, path: &str, id: &str, body: Value) -> Value {
    let resp = client
        .post(format!("{base}/v1/{path}?id={id}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "creating {path}/{id}");
    resp.json().await.unwrap()
}

async fn error_of(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap();
    (status, body["error"].clone())
}

#[tokio::test]
async fn health_check() {
    let base = start_server().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["collections"], json!(["apis", "projects", "specs", "versions"]));
}

#[tokio::test]
async fn project_lifecycle() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let created = create(&client, &base, "projects", "demo", json!({ "display_name": "Demo" })).await;
    assert_eq!(created["name"], "projects/demo");
    assert_eq!(created["project_id"], "demo");
    assert_eq!(created["create_time"], created["update_time"]);

    let updated: Value = client
        .patch(format!("{base}/v1/projects/demo?update_mask=display_name"))
        .json(&json!({ "display_name": "Demo2", "description": "ignored" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["display_name"], "Demo2");
    assert_eq!(updated["description"], "");

    let fetched: Value = client
        .get(format!("{base}/v1/projects/demo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, updated);

    let page: Value = client
        .get(format!("{base}/v1/projects"))
        .query(&[("filter", "project_id == 'demo'")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["projects"].as_array().unwrap().len(), 1);
    assert_eq!(page["next_page_token"], "");

    let resp = client
        .delete(format!("{base}/v1/projects/demo"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/v1/projects/demo"))
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["status"], "NOT_FOUND");
    assert_eq!(error["code"], 404);
}

#[tokio::test]
async fn spec_contents_follow_the_view() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    create(&client, &base, "projects", "demo", json!({})).await;
    create(&client, &base, "projects/demo/apis", "petstore", json!({})).await;
    create(&client, &base, "projects/demo/apis/petstore/versions", "v1", json!({})).await;

    let contents = STANDARD.encode("openapi: 3.0.0");
    let created = create(
        &client,
        &base,
        "projects/demo/apis/petstore/versions/v1/specs",
        "openapi.yaml",
        json!({ "style": "openapi/v3", "contents": contents }),
    )
    .await;
    assert_eq!(created["size_bytes"], 14);
    assert_eq!(created["contents"], "");

    let spec = "projects/demo/apis/petstore/versions/v1/specs/openapi.yaml";
    let full: Value = client
        .get(format!("{base}/v1/{spec}?view=full"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(full["contents"], contents);
    assert_eq!(full["hash"].as_str().unwrap().len(), 64);

    let listed: Value = client
        .get(format!("{base}/v1/projects/demo/apis/petstore/versions/v1/specs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["specs"][0]["contents"], "");
}

#[tokio::test]
async fn errors_carry_status_codes() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    create(&client, &base, "projects", "demo", json!({})).await;

    let resp = client
        .post(format!("{base}/v1/projects?id=demo"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(resp).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["status"], "ALREADY_EXISTS");

    let resp = client
        .get(format!("{base}/v1/projects"))
        .query(&[("filter", "owner == 'me'")])
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["status"], "INVALID_ARGUMENT");

    let resp = client
        .get(format!("{base}/v1/projects?page_token=garbage!"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{base}/v1/projects"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("{base}/v1/projects/demo/widgets"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{base}/v1/projects/demo/apis?id=petstore"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_pages_through_a_collection() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    for i in 0..5 {
        create(&client, &base, "projects", &format!("p{i}"), json!({})).await;
    }

    let mut seen = Vec::new();
    let mut token = String::new();
    loop {
        let page: Value = client
            .get(format!("{base}/v1/projects"))
            .query(&[("page_size", "2"), ("page_token", token.as_str())])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        for project in page["projects"].as_array().unwrap() {
            seen.push(project["project_id"].as_str().unwrap().to_string());
        }
        token = page["next_page_token"].as_str().unwrap().to_string();
        if token.is_empty() {
            break;
        }
    }
    assert_eq!(seen, vec!["p0", "p1", "p2", "p3", "p4"]);
}

#[tokio::test]
async fn update_with_allow_missing_creates() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .patch(format!("{base}/v1/projects/fresh"))
        .json(&json!({ "display_name": "Fresh" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let created: Value = client
        .patch(format!("{base}/v1/projects/fresh?allow_missing=true"))
        .json(&json!({ "display_name": "Fresh" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["name"], "projects/fresh");
    assert_eq!(created["display_name"], "Fresh");
}
