//! Integration tests for the corral-api HTTP surface
//!
//! Covers the chunked upload protocol end to end (init/chunk/state/
//! complete/cancel), the conversation upsert and unread-counter behavior,
//! phone canonicalization on lead writes, and the error taxonomy
//! (404 unknown id, 400 missing field, 409 rejected transition).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use corral_api::{build_router, AppState};
use corral_common::config;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

struct TestApp {
    app: Router,
    files_dir: PathBuf,
    staging_dir: PathBuf,
    // Root folder lives as long as the test
    _root: TempDir,
}

/// Test helper: fresh database, staging and files dirs under a temp root
async fn setup() -> TestApp {
    let root = TempDir::new().unwrap();
    let files_dir = config::files_dir(root.path());
    let staging_dir = config::staging_dir(root.path());
    std::fs::create_dir_all(&files_dir).unwrap();
    std::fs::create_dir_all(&staging_dir).unwrap();

    let pool = corral_common::db::init_database(&config::database_path(root.path()))
        .await
        .unwrap();

    let state = AppState::new(pool, files_dir.clone(), staging_dir.clone());
    TestApp {
        app: build_router(state, None),
        files_dir,
        staging_dir,
        _root: root,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "corral-test-boundary";

/// Build a multipart chunk-upload request by hand
fn post_chunk(upload_id: &str, index: Option<&str>, data: &[u8]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    let mut text_part = |name: &str, value: &str| {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    };
    text_part("upload_id", upload_id);
    if let Some(index) = index {
        text_part("index", index);
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"chunk\"; filename=\"blob\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/uploads/catalogue/chunk")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

/// Helper: init a session and return its upload_id
async fn init_upload(app: &Router, filename: &str, total_chunks: i64) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/uploads/catalogue/init",
            &json!({ "filename": filename, "total_chunks": total_chunks }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    body["upload_id"].as_str().unwrap().to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup().await;
    let (status, body) = send(&t.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "corral-api");
    assert!(body["version"].is_string());
}

// =============================================================================
// Upload protocol
// =============================================================================

#[tokio::test]
async fn test_init_requires_total_chunks() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        post_json("/api/uploads/catalogue/init", &json!({ "filename": "a.png" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("total_chunks"));
}

#[tokio::test]
async fn test_init_rejects_excessive_total_chunks() {
    let t = setup().await;

    // An absurd chunk count must fail fast at init; sized work downstream
    // (completeness check, reassembly) derives from this number.
    let (status, body) = send(
        &t.app,
        post_json(
            "/api/uploads/catalogue/init",
            &json!({ "filename": "a.png", "total_chunks": 5_000_000_000i64 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("total_chunks"));

    let (status, _) = send(
        &t.app,
        post_json(
            "/api/uploads/catalogue/init",
            &json!({ "filename": "a.png", "total_chunks": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_round_trip() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.png", 2).await;

    let (status, body) = send(&t.app, post_chunk(&upload_id, Some("0"), b"AAAA")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"], 0);

    let (status, _) = send(&t.app, post_chunk(&upload_id, Some("1"), b"BBBB")).await;
    assert_eq!(status, StatusCode::OK);

    // State reflects both parts and the uploading status
    let (status, body) = send(
        &t.app,
        get(&format!("/api/uploads/catalogue/state?upload_id={}", upload_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["parts"], json!([0, 1]));
    assert_eq!(body["status"], "uploading");
    assert_eq!(body["total_chunks"], 2);

    let (status, body) = send(
        &t.app,
        post_json(
            "/api/uploads/catalogue/complete",
            &json!({ "upload_id": upload_id, "title": "demo" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["file"]["status"], "completed");
    assert_eq!(body["file"]["title"], "demo");

    // Final artifact is the in-order concatenation of the chunks
    let url = body["file"]["url"].as_str().unwrap();
    let name = url.rsplit('/').next().unwrap();
    let artifact = t.files_dir.join("catalogue").join(name);
    assert_eq!(std::fs::read(&artifact).unwrap(), b"AAAABBBB");

    // Staged bytes are cleaned up after finalize
    assert!(!t.staging_dir.join(&upload_id).exists());
}

#[tokio::test]
async fn test_chunk_unknown_upload_id() {
    let t = setup().await;
    let (status, body) = send(&t.app, post_chunk("no-such-upload", Some("0"), b"xx")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_chunk_missing_index() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.png", 1).await;

    let (status, body) = send(&t.app, post_chunk(&upload_id, None, b"xx")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("index"));
}

#[tokio::test]
async fn test_chunk_index_out_of_range() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.png", 2).await;

    let (status, _) = send(&t.app, post_chunk(&upload_id, Some("5"), b"xx")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complete_rejects_incomplete_upload() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.png", 3).await;

    // Middle chunk never arrives
    send(&t.app, post_chunk(&upload_id, Some("0"), b"AA")).await;
    send(&t.app, post_chunk(&upload_id, Some("2"), b"CC")).await;

    let (status, body) = send(
        &t.app,
        post_json("/api/uploads/catalogue/complete", &json!({ "upload_id": upload_id })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("incomplete"));
}

#[tokio::test]
async fn test_complete_is_exactly_once() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.png", 1).await;
    send(&t.app, post_chunk(&upload_id, Some("0"), b"DATA")).await;

    let (status, _) = send(
        &t.app,
        post_json("/api/uploads/catalogue/complete", &json!({ "upload_id": upload_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &t.app,
        post_json("/api/uploads/catalogue/complete", &json!({ "upload_id": upload_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("already"));
}

#[tokio::test]
async fn test_reupload_replaces_chunk_bytes() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.bin", 1).await;

    send(&t.app, post_chunk(&upload_id, Some("0"), b"old-bytes")).await;
    send(&t.app, post_chunk(&upload_id, Some("0"), b"new-bytes")).await;

    let (status, body) = send(
        &t.app,
        post_json("/api/uploads/catalogue/complete", &json!({ "upload_id": upload_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let url = body["file"]["url"].as_str().unwrap();
    let name = url.rsplit('/').next().unwrap();
    let artifact = t.files_dir.join("catalogue").join(name);
    assert_eq!(std::fs::read(&artifact).unwrap(), b"new-bytes");
}

#[tokio::test]
async fn test_cancel_removes_staged_bytes() {
    let t = setup().await;
    let upload_id = init_upload(&t.app, "a.png", 2).await;
    send(&t.app, post_chunk(&upload_id, Some("0"), b"AAAA")).await;

    assert!(t.staging_dir.join(&upload_id).exists());

    let (status, body) = send(
        &t.app,
        post_json("/api/uploads/catalogue/cancel", &json!({ "upload_id": upload_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(!t.staging_dir.join(&upload_id).exists());

    // Session record survives, state reports the terminal status
    let (status, body) = send(
        &t.app,
        get(&format!("/api/uploads/catalogue/state?upload_id={}", upload_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["status"], "cancelled");

    // Finalizing a cancelled session is rejected
    let (status, _) = send(
        &t.app,
        post_json("/api/uploads/catalogue/complete", &json!({ "upload_id": upload_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_unknown_upload_id() {
    let t = setup().await;
    let (status, _) = send(
        &t.app,
        post_json("/api/uploads/catalogue/cancel", &json!({ "upload_id": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_state_unknown_upload_id() {
    let t = setup().await;
    let (status, body) = send(&t.app, get("/api/uploads/catalogue/state?upload_id=nope")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
    assert_eq!(body["parts"], json!([]));
}

#[tokio::test]
async fn test_catalogue_list_filters_by_project() {
    let t = setup().await;

    for project in ["p1", "p2"] {
        let (_, body) = send(
            &t.app,
            post_json(
                "/api/uploads/catalogue/init",
                &json!({ "filename": "a.png", "total_chunks": 1, "project_id": project }),
            ),
        )
        .await;
        let upload_id = body["upload_id"].as_str().unwrap().to_string();
        send(&t.app, post_chunk(&upload_id, Some("0"), b"x")).await;
        send(
            &t.app,
            post_json("/api/uploads/catalogue/complete", &json!({ "upload_id": upload_id })),
        )
        .await;
    }

    let (status, body) = send(&t.app, get("/api/uploads/catalogue/list?project_id=p1")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["catalogues"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["project_id"], "p1");

    let (_, body) = send(&t.app, get("/api/uploads/catalogue/list")).await;
    assert_eq!(body["catalogues"].as_array().unwrap().len(), 2);
}

// =============================================================================
// WhatsApp conversations
// =============================================================================

fn webhook_text(from: &str, body_text: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "entry-1",
            "changes": [{
                "field": "messages",
                "value": {
                    "metadata": { "display_phone_number": "918888888888" },
                    "messages": [{
                        "from": from,
                        "type": "text",
                        "text": { "body": body_text }
                    }]
                }
            }]
        }]
    })
}

#[tokio::test]
async fn test_webhook_creates_conversation_with_unread() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        post_json("/api/whatsapp/webhook", &webhook_text("919876543210", "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&t.app, get("/api/whatsapp/conversations")).await;
    assert_eq!(status, StatusCode::OK);
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["contact"], "+919876543210");
    assert_eq!(conversations[0]["unread_count"], 1);
    assert_eq!(conversations[0]["last_message_dir"], "in");
    assert_eq!(conversations[0]["last_message_text"], "hi");
    assert!(conversations[0]["age_sec"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn test_two_inbound_messages_increment_unread() {
    let t = setup().await;

    send(&t.app, post_json("/api/whatsapp/webhook", &webhook_text("919876543210", "one"))).await;
    send(&t.app, post_json("/api/whatsapp/webhook", &webhook_text("919876543210", "two"))).await;

    let (_, body) = send(&t.app, get("/api/whatsapp/conversations")).await;
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1, "same contact must not fork a second row");
    assert_eq!(conversations[0]["unread_count"], 2);
    assert_eq!(conversations[0]["last_message_text"], "two");
}

#[tokio::test]
async fn test_send_resets_unread_and_flips_direction() {
    let t = setup().await;

    send(&t.app, post_json("/api/whatsapp/webhook", &webhook_text("919876543210", "hi"))).await;

    // Outbound send addresses the same contact in canonical form
    let (status, _) = send(
        &t.app,
        post_json(
            "/api/whatsapp/send",
            &json!({ "to": "+919876543210", "text": "hello" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&t.app, get("/api/whatsapp/conversations")).await;
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["last_message_dir"], "out");
    assert_eq!(conversations[0]["unread_count"], 0);
    assert_eq!(conversations[0]["last_message_text"], "hello");
}

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let t = setup().await;

    send(&t.app, post_json("/api/whatsapp/webhook", &webhook_text("919876543210", "hi"))).await;

    for _ in 0..2 {
        let (status, body) = send(
            &t.app,
            post_json(
                "/api/whatsapp/conversations/919876543210/read",
                &json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = send(&t.app, get("/api/whatsapp/conversations")).await;
        assert_eq!(body.as_array().unwrap()[0]["unread_count"], 0);
    }
}

#[tokio::test]
async fn test_mark_read_unknown_contact_is_noop() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        post_json("/api/whatsapp/conversations/911111111111/read", &json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_send_media_records_preview() {
    let t = setup().await;

    let (status, _) = send(
        &t.app,
        post_json(
            "/api/whatsapp/send_media",
            &json!({ "to": "9876543210", "media_url": "https://example.com/a.jpg", "media_type": "image" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&t.app, get("/api/whatsapp/conversations")).await;
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations[0]["last_message_text"], "[media]");
    assert_eq!(conversations[0]["last_message_dir"], "out");
}

#[tokio::test]
async fn test_session_status_stub() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        get("/api/whatsapp/session_status?contact=919876543210"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["within_24h"], true);
}

// =============================================================================
// Leads and tasks
// =============================================================================

#[tokio::test]
async fn test_lead_phone_is_canonicalized_on_create() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        post_json(
            "/api/leads",
            &json!({ "name": "Asha", "phone": "09876543210", "company": "Acme" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], "+919876543210");
    assert_eq!(body["status"], "New");
    // Unknown attributes ride along in the extension map
    assert_eq!(body["company"], "Acme");
}

#[tokio::test]
async fn test_lead_phone_is_canonicalized_on_update() {
    let t = setup().await;

    let (_, body) = send(
        &t.app,
        post_json("/api/leads", &json!({ "name": "Asha", "phone": "9876543210" })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        post_put(&format!("/api/leads/{}", id), &json!({ "phone": "+91 9123 456 789" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], "+919123456789");
    assert_eq!(body["name"], "Asha", "unspecified fields keep their values");
}

#[tokio::test]
async fn test_lead_not_found() {
    let t = setup().await;
    let (status, _) = send(&t.app, get("/api/leads/no-such-lead")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lead_delete() {
    let t = setup().await;

    let (_, body) = send(&t.app, post_json("/api/leads", &json!({ "name": "X" }))).await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(&t.app, delete(&format!("/api/leads/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&t.app, delete(&format!("/api/leads/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_requires_title() {
    let t = setup().await;
    let (status, body) = send(&t.app, post_json("/api/tasks", &json!({ "status": "Open" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_task_crud_round_trip() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        post_json("/api/tasks", &json!({ "title": "Call lead", "due_date": "2026-09-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Open");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        post_put(&format!("/api/tasks/{}", id), &json!({ "status": "Done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Done");
    assert_eq!(body["title"], "Call lead");

    let (_, body) = send(&t.app, get("/api/tasks?status=Done")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

fn post_put(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
}
