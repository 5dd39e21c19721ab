//! Web API Filesystem Tests
//!
//! Integration tests for the `/api/v1/in-system/files` endpoints.

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;
use updown::web::router::create_router;
use updown::{Config, Database, DatabaseBackend, FileSystemBackend};

const PREFIX: &str = "/api/v1/in-system/files";

/// Create a test server with a temporary upload directory.
async fn create_test_server() -> (TestServer, TempDir) {
    create_test_server_with_config(Config::default()).await
}

async fn create_test_server_with_config(config: Config) -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file_system =
        FileSystemBackend::new(temp_dir.path()).expect("Failed to create upload directory");

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let router = create_router(Some(file_system), DatabaseBackend::new(db), &config);
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, temp_dir)
}

fn file_part(name: &str, content: &[u8], mime: &str) -> Part {
    Part::bytes(content.to_vec()).file_name(name).mime_type(mime)
}

async fn upload(server: &TestServer, name: &str, content: &[u8]) -> axum_test::TestResponse {
    server
        .post(&format!("{PREFIX}/upload"))
        .multipart(MultipartForm::new().add_part("file", file_part(name, content, "text/plain")))
        .await
}

fn assert_standard_error(body: &Value, status: u16, kind: &str, message: &str, path: &str) {
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(body["status"], status);
    assert_eq!(body["error"], kind);
    assert_eq!(body["message"], message);
    assert_eq!(body["path"], path);
}

#[tokio::test]
async fn test_upload_file() {
    let (server, temp_dir) = create_test_server().await;

    let response = upload(&server, "testing-one.txt", b"testing...").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["fileName"], "testing-one.txt");
    assert_eq!(body["fileType"], "text/plain");
    assert_eq!(body["fileSize"], 10);
    assert_eq!(body["fileSizeReadable"], "10 B");
    assert!(body["fileDownloadUri"]
        .as_str()
        .unwrap()
        .ends_with("/api/v1/in-system/files/download/testing-one.txt"));

    let stored = std::fs::read(temp_dir.path().join("testing-one.txt")).unwrap();
    assert_eq!(stored, b"testing...");
}

#[tokio::test]
async fn test_upload_invalid_file_name() {
    let (server, temp_dir) = create_test_server().await;

    let response = upload(&server, "te!sting.txt", b"testing...").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_standard_error(
        &body,
        400,
        "UploadError",
        "Invalid file name: te!sting.txt",
        "/api/v1/in-system/files/upload",
    );
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_path_traversal_rejected() {
    let (server, temp_dir) = create_test_server().await;

    let response = upload(&server, "../escape.txt", b"nope").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!temp_dir.path().parent().unwrap().join("escape.txt").exists());
}

#[tokio::test]
async fn test_upload_duplicate_file() {
    let (server, temp_dir) = create_test_server().await;

    upload(&server, "testing-one.txt", b"first").await.assert_status_ok();
    let response = upload(&server, "testing-one.txt", b"second").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "UploadError");
    assert_eq!(body["message"], "File already exists: testing-one.txt");

    let stored = std::fs::read(temp_dir.path().join("testing-one.txt")).unwrap();
    assert_eq!(stored, b"first");
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server
        .post(&format!("{PREFIX}/upload"))
        .multipart(MultipartForm::new().add_text("other", "value"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "UploadError");
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let mut config = Config::default();
    config.files.max_upload_size_mb = 1;
    let (server, temp_dir) = create_test_server_with_config(config).await;

    let response = upload(&server, "big.bin", &vec![0u8; 2 * 1024 * 1024]).await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!temp_dir.path().join("big.bin").exists());
}

#[tokio::test]
async fn test_upload_multiple_files() {
    let (server, temp_dir) = create_test_server().await;

    let form = MultipartForm::new()
        .add_part("files", file_part("testing-one.txt", b"one", "text/plain"))
        .add_part("files", file_part("testing-two.png", &[0x89, 0x50, 0x4e, 0x47], "image/png"));
    let response = server.post(&format!("{PREFIX}/uploads")).multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let files = body.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["fileName"], "testing-one.txt");
    assert_eq!(files[0]["fileSize"], 3);
    assert_eq!(files[1]["fileName"], "testing-two.png");
    assert_eq!(files[1]["fileType"], "image/png");

    assert!(temp_dir.path().join("testing-one.txt").exists());
    assert!(temp_dir.path().join("testing-two.png").exists());
}

#[tokio::test]
async fn test_upload_multiple_files_with_invalid_name() {
    let (server, temp_dir) = create_test_server().await;

    let form = MultipartForm::new()
        .add_part("files", file_part("testing-one.txt", b"one", "text/plain"))
        .add_part("files", file_part("te!sting.txt", b"two", "text/plain"));
    let response = server.post(&format!("{PREFIX}/uploads")).multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid file name: te!sting.txt");
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_file() {
    let (server, _temp_dir) = create_test_server().await;
    upload(&server, "testing-one.txt", b"testing...").await.assert_status_ok();

    let response = server
        .get(&format!("{PREFIX}/download/testing-one.txt"))
        .await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"testing...");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=testing-one.txt"
    );
    assert!(response
        .header("content-type")
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_download_invalid_file_name() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server.get(&format!("{PREFIX}/download/te!sting.txt")).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_standard_error(
        &body,
        400,
        "DownloadError",
        "Invalid file name: te!sting.txt",
        "/api/v1/in-system/files/download/te!sting.txt",
    );
}

#[tokio::test]
async fn test_download_not_found() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server.get(&format!("{PREFIX}/download/missing.txt")).await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "NotFoundError");
    assert_eq!(body["message"], "File not found: missing.txt");
}

#[tokio::test]
async fn test_list_files() {
    let (server, _temp_dir) = create_test_server().await;

    let response = server.get(PREFIX).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), Value::Array(vec![]));

    upload(&server, "testing-one.txt", b"testing...").await.assert_status_ok();
    upload(&server, "testing-two.txt", b"more testing").await.assert_status_ok();

    let response = server.get(PREFIX).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let files = body.as_array().unwrap();
    assert_eq!(files.len(), 2);

    for (file, (name, size)) in files
        .iter()
        .zip([("testing-one.txt", 10), ("testing-two.txt", 12)])
    {
        assert_eq!(file["fileName"], name);
        assert_eq!(file["fileSize"], size);
        assert!(file["fileDownloadUri"].as_str().unwrap().contains(name));
    }
}

#[tokio::test]
async fn test_unavailable_upload_directory() {
    let db = Database::open_in_memory().await.unwrap();
    let router = create_router(None, DatabaseBackend::new(db), &Config::default());
    let server = TestServer::new(router).unwrap();

    let response = upload(&server, "testing-one.txt", b"testing...").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_standard_error(
        &body,
        500,
        "InternalError",
        "Fatal error while creating file upload directory",
        "/api/v1/in-system/files/upload",
    );
}
