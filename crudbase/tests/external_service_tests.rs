//! External service client against a local stub of a sibling service.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_test::assert_ok;

use crudbase::graphql::SERVICE_TOKEN_HEADER;
use crudbase::{Error, ErrorCode, ExternalService, FetchResult};

#[derive(Debug, Default)]
struct Captured {
    token: Option<String>,
    bodies: Vec<Value>,
}

type Shared = Arc<Mutex<Captured>>;

fn capture(state: &Shared, headers: &HeaderMap, body: Option<Value>) {
    let mut captured = state.lock().unwrap();
    captured.token = headers
        .get(SERVICE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.bodies.extend(body);
}

async fn health(State(state): State<Shared>, headers: HeaderMap) -> Json<bool> {
    capture(&state, &headers, None);
    Json(true)
}

async fn hook(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    capture(&state, &headers, Some(body));
    Json(json!({ "received": true }))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_stub() -> (String, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/health-check", post(health))
        .route("/hook/event", post(hook))
        .route("/broken", post(broken))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

#[derive(Serialize)]
struct UserCreated {
    id: String,
    email: String,
}

#[tokio::test]
async fn test_health_check() {
    let (domain, state) = spawn_stub().await;
    let service = ExternalService::new(domain, Some("s3cr3t".to_string()));

    assert!(assert_ok!(service.health_check().await));
    assert_eq!(state.lock().unwrap().token.as_deref(), Some("s3cr3t"));
}

#[tokio::test]
async fn test_emit_event_sends_name_and_target() {
    let (domain, state) = spawn_stub().await;
    let service = ExternalService::new(domain, Some("s3cr3t".to_string()));

    let target = UserCreated {
        id: "42".to_string(),
        email: "a@b.c".to_string(),
    };
    assert!(assert_ok!(service.emit_event("user.created", &target).await));

    let captured = state.lock().unwrap();
    assert_eq!(
        captured.bodies,
        vec![json!({
            "event_name": "user.created",
            "target": { "id": "42", "email": "a@b.c" }
        })]
    );
}

#[tokio::test]
async fn test_token_header_omitted_without_token() {
    let (domain, state) = spawn_stub().await;
    let service = ExternalService::new(domain, None);

    assert!(assert_ok!(service.health_check().await));
    assert_eq!(state.lock().unwrap().token, None);
}

#[tokio::test]
async fn test_fetch_data_decodes_body() {
    let (domain, _) = spawn_stub().await;
    let service = ExternalService::new(domain, None);

    let result: FetchResult<Value> = assert_ok!(
        service
            .fetch_data("/hook/event", Some(&json!({ "event_name": "ping", "target": null })))
            .await
    );
    assert_eq!(
        result,
        FetchResult {
            data: Some(json!({ "received": true })),
            status: true,
        }
    );
}

#[tokio::test]
async fn test_non_ok_status_is_reported() {
    let (domain, _) = spawn_stub().await;
    let service = ExternalService::new(domain, None);

    let broken: FetchResult<Value> =
        assert_ok!(service.fetch_data::<_, ()>("/broken", None).await);
    assert_eq!(
        broken,
        FetchResult {
            data: None,
            status: false,
        }
    );

    let missing: FetchResult<Value> =
        assert_ok!(service.fetch_data::<_, ()>("/not-there", None).await);
    assert!(!missing.status);
}

#[tokio::test]
async fn test_duplicate_slashes_are_collapsed() {
    let (domain, _) = spawn_stub().await;
    let service = ExternalService::new(format!("{domain}/"), None);

    assert!(assert_ok!(service.health_check().await));
}

#[tokio::test]
async fn test_unreachable_service_is_an_error() {
    let service = ExternalService::new("http://127.0.0.1:1", None);

    let err = service.health_check().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(err.code(), ErrorCode::InternalServerError);
}
