//! Integration tests for the PixPlot HTTP contract.
//!
//! Exercises the three exchanges against a wiremock server: multipart
//! upload (including the 403 permission path), job creation (202 and
//! "already exists"), and status polling.

use std::io::Write;
use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vizpipe_client::{PixPlotClient, PlotArgs, PlotBackend, PollOutcome, TriggerOutcome};
use vizpipe_core::Error;

fn write_temp_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let file_path = dir.path().join(name);
    let mut file = std::fs::File::create(&file_path).unwrap();
    file.write_all(contents).unwrap();
    file_path
}

#[tokio::test]
async fn test_upload_returns_create_instructions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/send_photos"))
        .and(body_string_contains("folder_name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "create_pixplot_post_info": {
                "json": {"args": ["--source", "folder-1"]}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let metadata = write_temp_file(&staging, "metadata.csv", b"filename\na.jpg\n");
    let image = write_temp_file(&staging, "a.jpg", b"fake image bytes");

    let client = PixPlotClient::new(mock_server.uri());
    let receipt = client
        .upload(&metadata, &[image], "folder-1")
        .await
        .unwrap();

    assert_eq!(
        receipt.create_request,
        json!({"args": ["--source", "folder-1"]})
    );
}

#[tokio::test]
async fn test_upload_403_is_forbidden() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/send_photos"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let metadata = write_temp_file(&staging, "metadata.csv", b"filename\n");

    let client = PixPlotClient::new(mock_server.uri());
    let err = client
        .upload(&metadata, &[], "folder-1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn test_upload_response_missing_instructions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/send_photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let metadata = write_temp_file(&staging, "metadata.csv", b"filename\n");

    let client = PixPlotClient::new(mock_server.uri());
    let err = client
        .upload(&metadata, &[], "folder-1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_trigger_accepted_returns_key() {
    let mock_server = MockServer::start().await;

    // The creation body must carry the appended plot arguments.
    Mock::given(method("POST"))
        .and(path("/api/pixplot"))
        .and(body_string_contains("--cell_size"))
        .and(body_string_contains("--n_neighbors"))
        .and(body_string_contains("--min_dist"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"key": "K"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = PixPlotClient::new(mock_server.uri());
    let receipt = vizpipe_client::UploadReceipt {
        create_request: json!({"args": ["--source", "folder-1"]}),
    };
    let outcome = client
        .trigger(&receipt, &PlotArgs::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TriggerOutcome::Accepted {
            key: "K".to_string()
        }
    );
}

#[tokio::test]
async fn test_trigger_already_exists_tracks_existing_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/pixplot"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "plot folder-1 already exists"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = PixPlotClient::new(mock_server.uri());
    let receipt = vizpipe_client::UploadReceipt {
        create_request: json!({"args": []}),
    };
    let outcome = client
        .trigger(&receipt, &PlotArgs::default())
        .await
        .unwrap();

    assert_eq!(outcome, TriggerOutcome::AlreadyRunning);
}

#[tokio::test]
async fn test_trigger_unexpected_response_is_job_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/pixplot"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "disk full"})))
        .mount(&mock_server)
        .await;

    let client = PixPlotClient::new(mock_server.uri());
    let receipt = vizpipe_client::UploadReceipt {
        create_request: json!({"args": []}),
    };
    let err = client
        .trigger(&receipt, &PlotArgs::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Job(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_status_running_then_done() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/pixplot"))
        .and(query_param("key", "K"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/pixplot"))
        .and(query_param("key", "K"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"report": "clustering\nprojecting\nDone!\n"})),
        )
        .mount(&mock_server)
        .await;

    let client = PixPlotClient::new(mock_server.uri());
    assert_eq!(client.status("K").await.unwrap(), PollOutcome::Running);
    assert_eq!(client.status("K").await.unwrap(), PollOutcome::Running);
    assert_eq!(client.status("K").await.unwrap(), PollOutcome::Done);
}

#[tokio::test]
async fn test_status_error_report_is_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/pixplot"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"report": "traceback: out of memory"})),
        )
        .mount(&mock_server)
        .await;

    let client = PixPlotClient::new(mock_server.uri());
    match client.status("K").await.unwrap() {
        PollOutcome::Failed(body) => assert!(body.contains("out of memory")),
        other => panic!("expected Failed, got {:?}", other),
    }
}
