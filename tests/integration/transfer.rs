//! Downloads against a local HTTP server.

use std::sync::Mutex;

use skin_updater::config::NetworkSettings;
use skin_updater::transfer::{NoProgress, ProgressEvent, ProgressSink, TransferClient, TransferError};
use tempfile::TempDir;
use wiremock::MockServer;

use crate::common::{mock_file, mock_page, mock_status};

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
    completed: Mutex<Option<Result<u64, String>>>,
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(*event);
    }

    fn on_complete(&self, result: Result<u64, &TransferError>) {
        *self.completed.lock().unwrap() = Some(result.map_err(ToString::to_string));
    }
}

fn client() -> TransferClient {
    TransferClient::new(&NetworkSettings::default()).unwrap()
}

#[tokio::test]
async fn test_download_to_file_reports_progress() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    mock_file(&server, "/downloads/latest.zip", body.clone()).await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("latest.zip");
    let sink = RecordingSink::default();

    let bytes = client()
        .download_to_file(&format!("{}/downloads/latest.zip", server.uri()), &dest, &sink)
        .await
        .unwrap();

    assert_eq!(bytes, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);

    let events = sink.events.lock().unwrap();
    assert!(!events.is_empty());
    let last = events.last().unwrap();
    assert_eq!(last.bytes_received, body.len() as u64);
    assert_eq!(last.total_bytes, Some(body.len() as u64));
    assert_eq!(last.percentage(), Some(100.0));
    assert!(events.windows(2).all(|w| w[0].bytes_received <= w[1].bytes_received));

    assert_eq!(*sink.completed.lock().unwrap(), Some(Ok(body.len() as u64)));
}

#[tokio::test]
async fn test_download_status_error() {
    let server = MockServer::start().await;
    mock_status(&server, "/downloads/missing.zip", 404).await;

    let temp = TempDir::new().unwrap();
    let sink = RecordingSink::default();
    let err = client()
        .download_to_file(
            &format!("{}/downloads/missing.zip", server.uri()),
            &temp.path().join("missing.zip"),
            &sink,
        )
        .await
        .unwrap_err();

    match err {
        TransferError::Status {
            status,
            ..
        } => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(sink.events.lock().unwrap().is_empty());
    assert!(matches!(*sink.completed.lock().unwrap(), Some(Err(_))));
}

#[tokio::test]
async fn test_download_unwritable_destination() {
    let server = MockServer::start().await;
    mock_file(&server, "/file.bin", b"data".to_vec()).await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("no-such-dir").join("file.bin");
    let err = client()
        .download_to_file(&format!("{}/file.bin", server.uri()), &dest, &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Write { .. }));
}

#[tokio::test]
async fn test_download_to_string() {
    let server = MockServer::start().await;
    mock_page(&server, "/", "<html>hello</html>").await;

    let text = client().download_to_string(&format!("{}/", server.uri())).await.unwrap();
    assert_eq!(text, "<html>hello</html>");
}
