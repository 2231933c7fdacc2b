//! Router-level tests driven through `tower::ServiceExt::oneshot` against
//! in-memory SQLite stores.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use laurel_store_sqlite::{SqliteDocumentStore, SqliteReferenceStore};
use rand_core::OsRng;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt as _;
use uuid::Uuid;

use super::*;
use crate::accounts::{AccountConfig, ProfileKind, provision};

type State = AppState<SqliteDocumentStore, SqliteReferenceStore>;

const PASSWORD: &str = "secret";

struct Fixture {
  state:   State,
  uploads: TempDir,
}

fn account(
  username: &str,
  role: &str,
  profile: Option<ProfileKind>,
  advisor: Option<&str>,
  hash: &str,
) -> AccountConfig {
  AccountConfig {
    username:      username.into(),
    password_hash: hash.into(),
    user_id:       Uuid::new_v4(),
    role:          role.into(),
    profile,
    advisor:       advisor.map(Into::into),
    permissions:   None,
  }
}

/// alice (student, advised by bob), bob and carol (advisors), root (admin).
async fn fixture() -> Fixture {
  let uploads = tempfile::tempdir().unwrap();
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(PASSWORD.as_bytes(), &salt)
    .unwrap()
    .to_string();

  let accounts = vec![
    account("alice", "student", Some(ProfileKind::Student), Some("bob"), &hash),
    account("bob", "advisor", Some(ProfileKind::Lecturer), None, &hash),
    account("carol", "advisor", Some(ProfileKind::Lecturer), None, &hash),
    account("root", "admin", None, None, &hash),
  ];

  let config = ServerConfig {
    host:                 "127.0.0.1".to_string(),
    port:                 8080,
    document_store_path:  ":memory:".into(),
    reference_store_path: ":memory:".into(),
    upload_dir:           uploads.path().to_path_buf(),
    store_timeout_ms:     5_000,
    admin_role:           "admin".to_string(),
    seed_roles:           true,
    max_upload_bytes:     1024 * 1024,
    accounts:             accounts.clone(),
  };

  let documents = SqliteDocumentStore::open_in_memory().await.unwrap();
  let references = SqliteReferenceStore::open_in_memory().await.unwrap();
  references.seed_default_roles().await.unwrap();
  let auth = provision(&references, &accounts).await.unwrap();

  let state = AppState::new(Arc::new(documents), Arc::new(references), auth, config);
  Fixture { state, uploads }
}

fn auth_header(user: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{PASSWORD}")))
}

async fn send(state: &State, req: Request<Body>) -> (StatusCode, Value) {
  let resp = router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, body)
}

async fn call(
  state: &State,
  method: &str,
  uri: &str,
  user: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder()
    .method(method)
    .uri(uri)
    .header(header::AUTHORIZATION, auth_header(user));
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  send(state, builder.body(body).unwrap()).await
}

/// Create a draft as alice and return its id.
async fn create_draft(state: &State, title: &str) -> String {
  let (status, body) = call(
    state,
    "POST",
    "/api/v1/achievements",
    "alice",
    Some(json!({ "title": title, "achievementType": "competition", "tags": ["x", "y"] })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_str().unwrap().to_string()
}

async fn submitted(state: &State, title: &str) -> String {
  let id = create_draft(state, title).await;
  let uri = format!("/api/v1/achievements/{id}/submit");
  let (status, _) = call(state, "POST", &uri, "alice", None).await;
  assert_eq!(status, StatusCode::OK);
  id
}

// ── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_get_401_with_challenge() {
  let f = fixture().await;
  let req = Request::builder()
    .uri("/api/v1/achievements")
    .body(Body::empty())
    .unwrap();
  let resp = router(f.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_gets_401() {
  let f = fixture().await;
  let req = Request::builder()
    .uri("/api/v1/achievements")
    .header(header::AUTHORIZATION, format!("Basic {}", B64.encode("alice:nope")))
    .body(Body::empty())
    .unwrap();
  let (status, _) = send(&f.state, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Create / read ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_draft_and_lists_it() {
  let f = fixture().await;
  let id = create_draft(&f.state, "Olympiad Gold").await;

  let (status, body) = call(&f.state, "GET", &format!("/api/v1/achievements/{id}"), "alice", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "draft");
  assert_eq!(body["tags"], json!(["x", "y"]));
  assert_eq!(body["points"], 0);

  let (status, body) = call(&f.state, "GET", "/api/v1/achievements?type=competition", "alice", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (_, body) = call(&f.state, "GET", "/api/v1/achievements?type=paper", "alice", None).await;
  assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_with_identity_field_is_400() {
  let f = fixture().await;
  let (status, body) = call(
    &f.state,
    "POST",
    "/api/v1/achievements",
    "alice",
    Some(json!({ "id": "abc", "title": "t" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("id"));
}

#[tokio::test]
async fn create_forces_points_to_zero() {
  let f = fixture().await;
  let (status, body) = call(
    &f.state,
    "POST",
    "/api/v1/achievements",
    "alice",
    Some(json!({ "title": "t", "points": 500 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["points"], 0);
}

#[tokio::test]
async fn advisor_cannot_create() {
  let f = fixture().await;
  let (status, _) = call(
    &f.state,
    "POST",
    "/api/v1/achievements",
    "bob",
    Some(json!({ "title": "t" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_404() {
  let f = fixture().await;
  let (status, _) = call(&f.state, "GET", "/api/v1/achievements/not-an-id", "alice", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let unknown = laurel_core::DocumentId::generate();
  let (status, _) = call(&f.state, "GET", &format!("/api/v1/achievements/{unknown}"), "alice", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn readers_are_owner_advisor_or_admin() {
  let f = fixture().await;
  let id = create_draft(&f.state, "t").await;
  let uri = format!("/api/v1/achievements/{id}");

  for (user, expected) in [
    ("alice", StatusCode::OK),
    ("bob", StatusCode::OK),
    ("root", StatusCode::OK),
    ("carol", StatusCode::FORBIDDEN),
  ] {
    let (status, _) = call(&f.state, "GET", &uri, user, None).await;
    assert_eq!(status, expected, "{user}");
  }
}

// ── Update / delete ─────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_updates_draft_content() {
  let f = fixture().await;
  let id = create_draft(&f.state, "Old").await;
  let uri = format!("/api/v1/achievements/{id}");

  let (status, body) = call(&f.state, "PATCH", &uri, "alice", Some(json!({ "title": "New" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["title"], "New");

  let (status, _) = call(&f.state, "PATCH", &uri, "alice", Some(json!({ "studentId": "x" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&f.state, "PATCH", &uri, "alice", Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_draft_then_gone() {
  let f = fixture().await;
  let id = create_draft(&f.state, "t").await;
  let uri = format!("/api/v1/achievements/{id}");

  let (status, body) = call(&f.state, "DELETE", &uri, "alice", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "deleted");

  let (status, _) = call(&f.state, "GET", &uri, "alice", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&f.state, "DELETE", &uri, "alice", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_submitted_is_400() {
  let f = fixture().await;
  let id = submitted(&f.state, "t").await;
  let (status, _) = call(&f.state, "DELETE", &format!("/api/v1/achievements/{id}"), "alice", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Workflow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resubmit_is_409() {
  let f = fixture().await;
  let id = submitted(&f.state, "t").await;
  let (status, _) = call(&f.state, "POST", &format!("/api/v1/achievements/{id}/submit"), "alice", None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn verify_flow_and_history() {
  let f = fixture().await;
  let id = submitted(&f.state, "Olympiad Gold").await;

  let verify = format!("/api/v1/achievements/{id}/verify");
  let (status, _) = call(&f.state, "POST", &verify, "bob", Some(json!({ "points": 0 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(&f.state, "POST", &verify, "bob", Some(json!({ "points": 10 }))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["status"], "verified");
  assert_eq!(body["points"], 10);

  // A second verify finds the record already verified.
  let (status, _) = call(&f.state, "POST", &verify, "bob", Some(json!({ "points": 10 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(&f.state, "GET", &format!("/api/v1/achievements/{id}/history"), "alice", None).await;
  assert_eq!(status, StatusCode::OK);
  let events: Vec<&str> = body["timeline"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["event"].as_str().unwrap())
    .collect();
  assert_eq!(events, ["created", "submitted", "verified", "last_updated"]);
  assert_eq!(body["achievement"]["points"], 10);
}

#[tokio::test]
async fn unassigned_advisor_cannot_verify() {
  let f = fixture().await;
  let id = submitted(&f.state, "t").await;

  let (status, _) = call(
    &f.state,
    "POST",
    &format!("/api/v1/achievements/{id}/verify"),
    "carol",
    Some(json!({ "points": 10 })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, body) = call(&f.state, "GET", &format!("/api/v1/achievements/{id}"), "alice", None).await;
  assert_eq!(body["status"], "submitted");
}

#[tokio::test]
async fn reject_requires_note() {
  let f = fixture().await;
  let id = submitted(&f.state, "t").await;
  let reject = format!("/api/v1/achievements/{id}/reject");

  let (status, _) = call(&f.state, "POST", &reject, "bob", Some(json!({ "note": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(
    &f.state,
    "POST",
    &reject,
    "bob",
    Some(json!({ "rejectionNote": "missing certificate" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "rejected");
  assert_eq!(body["rejectionNote"], "missing certificate");
}

#[tokio::test]
async fn advisee_listing_filters_by_status() {
  let f = fixture().await;
  create_draft(&f.state, "draft").await;
  submitted(&f.state, "pending").await;

  let (status, body) = call(&f.state, "GET", "/api/v1/achievements/advisees", "bob", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);

  let (_, body) = call(&f.state, "GET", "/api/v1/achievements/advisees?status=submitted", "bob", None).await;
  let records = body.as_array().unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0]["title"], "pending");

  let (_, body) = call(&f.state, "GET", "/api/v1/achievements/advisees", "carol", None).await;
  assert!(body.as_array().unwrap().is_empty());

  let (status, _) = call(&f.state, "GET", "/api/v1/achievements/advisees", "alice", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Attachments ─────────────────────────────────────────────────────────────

const BOUNDARY: &str = "laurel-test-boundary";

fn multipart(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
  let mut body = format!(
    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
  )
  .into_bytes();
  body.extend_from_slice(bytes);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
  body
}

async fn upload(state: &State, id: &str, user: &str, body: Vec<u8>) -> (StatusCode, Value) {
  let req = Request::builder()
    .method("POST")
    .uri(format!("/api/v1/achievements/{id}/attachments"))
    .header(header::AUTHORIZATION, auth_header(user))
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(body))
    .unwrap();
  send(state, req).await
}

#[tokio::test]
async fn upload_stores_file_and_serves_it() {
  let f = fixture().await;
  let id = create_draft(&f.state, "t").await;

  let (status, body) = upload(
    &f.state,
    &id,
    "alice",
    multipart("file", "cert.pdf", "application/pdf", b"%PDF-1.4"),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["fileName"], "cert.pdf");
  assert_eq!(body["fileType"], "application/pdf");

  let url = body["fileUrl"].as_str().unwrap().to_string();
  assert!(url.starts_with(&format!("/static/achievements/{id}/")));
  let on_disk = f.uploads.path().join(url.trim_start_matches("/static/"));
  assert_eq!(std::fs::read(on_disk).unwrap(), b"%PDF-1.4");

  let req = Request::builder().uri(&url).body(Body::empty()).unwrap();
  let resp = router(f.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);

  let (_, body) = call(&f.state, "GET", &format!("/api/v1/achievements/{id}/history"), "alice", None).await;
  assert_eq!(body["timeline"][1]["event"], "attachment_uploaded");
  assert_eq!(body["timeline"][1]["file"]["fileName"], "cert.pdf");
}

#[tokio::test]
async fn upload_without_file_part_is_400() {
  let f = fixture().await;
  let id = create_draft(&f.state, "t").await;
  let (status, _) = upload(
    &f.state,
    &id,
    "alice",
    multipart("other", "x.txt", "text/plain", b"hello"),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn advisor_cannot_upload() {
  let f = fixture().await;
  let id = create_draft(&f.state, "t").await;
  let (status, _) = upload(
    &f.state,
    &id,
    "bob",
    multipart("file", "x.txt", "text/plain", b"hello"),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn statistics_follow_the_callers_scope() {
  let f = fixture().await;
  let id = submitted(&f.state, "Olympiad Gold").await;
  let verify = format!("/api/v1/achievements/{id}/verify");
  let (status, _) = call(&f.state, "POST", &verify, "bob", Some(json!({ "points": 10 }))).await;
  assert_eq!(status, StatusCode::OK);
  create_draft(&f.state, "draft").await;

  let (status, body) = call(&f.state, "GET", "/api/v1/reports/statistics", "alice", None).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["scope"], "own");
  assert_eq!(body["total"], 2);
  assert_eq!(body["byStatus"]["verified"], 1);
  assert_eq!(body["byStatus"]["draft"], 1);
  assert_eq!(body["byType"]["competition"], 2);
  assert_eq!(body["verifiedPoints"], 10);

  let (_, body) = call(&f.state, "GET", "/api/v1/reports/statistics", "bob", None).await;
  assert_eq!(body["scope"], "advisees");
  assert_eq!(body["total"], 2);

  let (_, body) = call(&f.state, "GET", "/api/v1/reports/statistics", "carol", None).await;
  assert_eq!(body["scope"], "advisees");
  assert_eq!(body["total"], 0);

  let (_, body) = call(&f.state, "GET", "/api/v1/reports/statistics", "root", None).await;
  assert_eq!(body["scope"], "all");
  assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn student_report_access() {
  let f = fixture().await;
  let id = create_draft(&f.state, "t").await;
  let (_, record) = call(&f.state, "GET", &format!("/api/v1/achievements/{id}"), "alice", None).await;
  let student_id = record["studentId"].as_str().unwrap().to_string();
  let uri = format!("/api/v1/reports/students/{student_id}");

  for user in ["alice", "bob", "root"] {
    let (status, body) = call(&f.state, "GET", &uri, user, None).await;
    assert_eq!(status, StatusCode::OK, "{user}: {body}");
    assert_eq!(body["studentId"], student_id.as_str());
    assert_eq!(body["statistics"]["total"], 1);
    assert_eq!(body["achievements"][0]["id"], id.as_str());
  }

  let (status, _) = call(&f.state, "GET", &uri, "carol", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&f.state, "GET", "/api/v1/reports/students/not-a-uuid", "root", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
