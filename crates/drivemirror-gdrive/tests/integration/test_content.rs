//! Integration tests for content downloads and exports

use drivemirror_core::domain::RemoteId;
use drivemirror_core::ports::{ContentStream, IDriveService};
use futures_util::TryStreamExt;

use crate::common;

async fn collect(stream: ContentStream) -> Vec<u8> {
    stream
        .chunks
        .try_concat()
        .await
        .expect("content stream failed")
}

#[tokio::test]
async fn test_download_streams_raw_bytes() {
    let (server, service) = common::setup_drive_mock().await;
    let content = b"hello from drive".to_vec();
    common::mount_download(&server, "file-001", &content).await;

    let stream = service
        .download(&RemoteId::new("file-001".to_string()).unwrap())
        .await
        .expect("download failed");

    assert_eq!(stream.content_length, Some(content.len() as u64));
    assert_eq!(collect(stream).await, content);
}

#[tokio::test]
async fn test_export_requests_target_format() {
    let (server, service) = common::setup_drive_mock().await;
    common::mount_export(&server, "doc-001", "application/pdf", b"%PDF-1.7").await;

    let stream = service
        .export(
            &RemoteId::new("doc-001".to_string()).unwrap(),
            "application/pdf",
        )
        .await
        .expect("export failed");

    assert_eq!(collect(stream).await, b"%PDF-1.7");
}

#[tokio::test]
async fn test_download_missing_file_is_error() {
    let (_server, service) = common::setup_drive_mock().await;

    let result = service
        .download(&RemoteId::new("nope".to_string()).unwrap())
        .await;

    let err = result.expect_err("unmatched request should fail");
    assert!(format!("{err:#}").contains("Not found"));
}
