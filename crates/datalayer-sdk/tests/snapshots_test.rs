//! Runtime Snapshot API Tests
//!
//! Snapshot creation, deletion with wait-until-gone, download, and resumable
//! upload against a mock server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use datalayer_client::tus;
use datalayer_sdk::{
    ClientError, DatalayerClient, DatalayerClientConfig, MemoryUploadStore, PollPolicy,
    ProgressCallback, UploadStore, model::UploadSnapshot,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

const SNAPSHOTS: &str = "/api/runtimes/v1/runtime-snapshots";
const UPLOAD: &str = "/api/runtimes/v1/runtime-snapshots/upload";

fn fast_deletion() -> PollPolicy {
    PollPolicy::default()
        .with_initial_delay(Duration::from_millis(10))
        .with_factor(2.0)
        .with_max_delay(Duration::from_millis(40))
        .with_timeout(Duration::from_secs(5))
}

async fn client_with(server: &MockServer, snapshot_deletion: PollPolicy) -> DatalayerClient {
    let config = DatalayerClientConfig {
        run_urls: vec![server.uri()],
        token: Some("test-token".to_string()),
        snapshot_deletion,
        upload_chunk_size: 4,
        ..Default::default()
    };
    DatalayerClient::new(config).await.unwrap()
}

fn snapshot_json(uid: &str, status: &str) -> serde_json::Value {
    json!({
        "uid": uid,
        "name": "before-training",
        "environment": "python-cpu-env",
        "format": "tar.gz",
        "status": status,
        "updated_at": 1_700_000_000,
    })
}

// ============== Snapshot CRUD Tests ==============

#[tokio::test]
async fn test_create_and_get_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SNAPSHOTS))
        .and(body_json(json!({
            "pod_name": "jupyter-ada-abc12",
            "name": "before-training",
            "description": "",
            "stop": false,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "snapshot": snapshot_json("snap-1", "creating"),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "snapshot": snapshot_json("snap-1", "ready"),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SNAPSHOTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "snapshots": [snapshot_json("snap-1", "ready")],
        })))
        .mount(&server)
        .await;

    let client = DatalayerClient::from_token(&server.uri(), "test-token").unwrap();
    let created = client
        .create_snapshot("jupyter-ada-abc12", "before-training", "", false)
        .await
        .unwrap();
    assert!(!created.is_ready());

    let fetched = client.get_snapshot("snap-1").await.unwrap();
    assert!(fetched.is_ready());

    let all = client.list_snapshots().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_create_snapshot_requires_pod_and_name() {
    let server = MockServer::start().await;
    let client = DatalayerClient::from_token(&server.uri(), "test-token").unwrap();

    assert!(matches!(
        client.create_snapshot("", "name", "", false).await,
        Err(ClientError::Argument(_))
    ));
    assert!(matches!(
        client.create_snapshot("jupyter-a", "", "", true).await,
        Err(ClientError::Argument(_))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============== Deletion Tests ==============

#[tokio::test]
async fn test_delete_snapshot_waits_for_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "snapshot": snapshot_json("snap-1", "deleting"),
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, fast_deletion()).await;
    client.delete_snapshot("snap-1").await.unwrap();
}

#[tokio::test]
async fn test_snapshot_delete_consumes_value() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/snap-2", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-2", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_with(&server, fast_deletion()).await;
    let snapshot: datalayer_sdk::model::RuntimeSnapshot =
        serde_json::from_value(snapshot_json("snap-2", "ready")).unwrap();
    snapshot.delete(&client).await.unwrap();
}

#[tokio::test]
async fn test_delete_snapshot_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "snapshot": snapshot_json("snap-1", "deleting"),
        })))
        .mount(&server)
        .await;

    let policy = fast_deletion().with_timeout(Duration::from_millis(100));
    let client = client_with(&server, policy).await;
    let err = client.delete_snapshot("snap-1").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(ref m) if m.contains("snap-1")));
}

#[tokio::test]
async fn test_delete_snapshot_with_zero_timeout_checks_once() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, PollPolicy::default().with_timeout(Duration::ZERO)).await;
    client.delete_snapshot("snap-1").await.unwrap();
}

#[tokio::test]
async fn test_delete_snapshot_propagates_poll_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "unavailable"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, fast_deletion()).await;
    let err = client.delete_snapshot("snap-1").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_delete_missing_snapshot_fails_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/gone", SNAPSHOTS)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatalayerClient::from_token(&server.uri(), "test-token").unwrap();
    let err = client.delete_snapshot("gone").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

// ============== Transfer Tests ==============

#[tokio::test]
async fn test_download_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/snap-1", SNAPSHOTS)))
        .and(query_param("download", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("snap-1.tar.gz");

    let client = DatalayerClient::from_token(&server.uri(), "test-token").unwrap();
    let written = client.download_snapshot("snap-1", &dest).await.unwrap();

    assert_eq!(written, 13);
    assert_eq!(std::fs::read(&dest).unwrap(), b"archive-bytes");
}

#[tokio::test]
async fn test_upload_snapshot_with_metadata_and_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .and(header("Tus-Resumable", "1.0.0"))
        .and(header("Upload-Length", "6"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/uploads/snap"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/uploads/snap"))
        .and(header("Upload-Offset", "0"))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "4"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/uploads/snap"))
        .and(header("Upload-Offset", "4"))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "6"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("backup.tar.gz");
    std::fs::write(&file, b"abcdef").unwrap();

    let store = Arc::new(MemoryUploadStore::new());
    let client = client_with(&server, fast_deletion()).await.with_upload_store(store.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let progress: ProgressCallback =
        Arc::new(move |sent, total| recorded.lock().unwrap().push((sent, total)));

    let upload = UploadSnapshot::new("backup", "python-cpu-env").with_description("nightly");
    let url = client
        .upload_snapshot(&file, &upload, Some(progress))
        .await
        .unwrap();

    assert_eq!(url, format!("{}/uploads/snap", server.uri()));
    assert_eq!(seen.lock().unwrap().last(), Some(&(6, 6)));
    assert!(store.is_empty());

    let requests = server.received_requests().await.unwrap();
    let creation = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let encoded = creation
        .headers
        .get("Upload-Metadata")
        .unwrap()
        .to_str()
        .unwrap();
    let metadata = tus::decode_metadata(encoded).unwrap();
    assert!(metadata.contains(&("filename".to_string(), "backup.tar.gz".to_string())));
    assert!(metadata.contains(&("name".to_string(), "backup".to_string())));
    assert!(metadata.contains(&("description".to_string(), "nightly".to_string())));
    assert!(metadata.contains(&("environment".to_string(), "python-cpu-env".to_string())));
}

#[tokio::test]
async fn test_upload_snapshot_resumes_known_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/uploads/new"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/uploads/half"))
        .respond_with(ResponseTemplate::new(200).insert_header("Upload-Offset", "4"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/uploads/half"))
        .and(header("Upload-Offset", "4"))
        .respond_with(ResponseTemplate::new(204).insert_header("Upload-Offset", "6"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("backup.tar.gz");
    std::fs::write(&file, b"abcdef").unwrap();

    let store = Arc::new(MemoryUploadStore::new());
    let fingerprint = tus::fingerprint(&file).await.unwrap();
    store
        .put(&fingerprint, &format!("{}/uploads/half", server.uri()))
        .await
        .unwrap();

    let client = client_with(&server, fast_deletion()).await.with_upload_store(store.clone());
    let upload = UploadSnapshot::new("backup", "python-cpu-env");
    let url = client.upload_snapshot(&file, &upload, None).await.unwrap();

    assert!(url.ends_with("/uploads/half"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upload_snapshot_requires_name() {
    let server = MockServer::start().await;
    let client = DatalayerClient::from_token(&server.uri(), "test-token").unwrap();

    let upload = UploadSnapshot::new("", "python-cpu-env");
    let err = client
        .upload_snapshot(std::path::Path::new("missing.tar.gz"), &upload, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Argument(ref e) if e.argument() == "name"));
}
