//! Integration tests for folder listings
//!
//! Verifies the `files.list` query shape, pagination tokens and the
//! per-request outcome mapping of listing batches.

use std::time::Duration;

use drivemirror_core::domain::PageToken;
use drivemirror_core::ports::{IDriveService, ListOutcome, ListRequest};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_listing_parses_files_and_folders() {
    let (server, service) = common::setup_drive_mock().await;

    common::mount_listing(
        &server,
        "root",
        serde_json::json!([
            {
                "id": "folder-001",
                "name": "Projects",
                "mimeType": "application/vnd.google-apps.folder"
            },
            {
                "id": "file-001",
                "name": "notes.txt",
                "mimeType": "text/plain",
                "md5Checksum": "abc123",
                "size": "12",
                "modifiedTime": "2024-01-01T00:00:00Z"
            }
        ]),
        None,
    )
    .await;

    let outcomes = service
        .list_children_batch(&[common::list_request("root")])
        .await
        .expect("listing batch failed");

    assert_eq!(outcomes.len(), 1);
    let ListOutcome::Page(page) = &outcomes[0] else {
        panic!("expected a page, got {:?}", outcomes[0]);
    };
    assert_eq!(page.entries.len(), 2);
    assert!(page.entries[0].is_dir());
    assert_eq!(page.entries[1].name, "notes.txt");
    assert_eq!(page.entries[1].size, Some(12));
    assert_eq!(page.entries[1].modified_time, Some(1_704_067_200_000));
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_listing_sends_fields_order_and_token() {
    let (server, service) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", common::children_query("folder-9")))
        .and(query_param(
            "fields",
            "nextPageToken,files(id,name,mimeType,md5Checksum,webViewLink,size,modifiedTime)",
        ))
        .and(query_param("orderBy", "folder,name,modifiedTime"))
        .and(query_param("pageSize", "250"))
        .and(query_param("pageToken", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [],
            "nextPageToken": "tok-3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ListRequest {
        page_token: Some(PageToken::new("tok-2".to_string()).unwrap()),
        page_size: 250,
        ..common::list_request("folder-9")
    };
    let outcomes = service.list_children_batch(&[request]).await.unwrap();

    let ListOutcome::Page(page) = &outcomes[0] else {
        panic!("expected a page");
    };
    assert_eq!(page.next_page_token.as_ref().unwrap().as_str(), "tok-3");
}

#[tokio::test]
async fn test_batch_reports_outcome_per_request() {
    let (server, service) = common::setup_drive_mock().await;

    common::mount_listing(&server, "ok-folder", serde_json::json!([]), None).await;
    common::mount_listing_error(&server, "throttled", 429, "Rate Limit Exceeded").await;
    common::mount_listing_error(&server, "missing", 404, "File not found: missing.").await;

    let outcomes = service
        .list_children_batch(&[
            common::list_request("ok-folder"),
            common::list_request("throttled"),
            common::list_request("missing"),
        ])
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], ListOutcome::Page(_)));
    assert_eq!(
        outcomes[1],
        ListOutcome::Failed {
            status: 429,
            message: "Rate Limit Exceeded".to_string()
        }
    );
    assert!(matches!(outcomes[2], ListOutcome::Failed { status: 404, .. }));
}

#[tokio::test]
async fn test_batch_fails_on_malformed_body() {
    let (server, service) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = service
        .list_children_batch(&[common::list_request("root")])
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_stalled_request_is_interrupted_alone() {
    let (server, service) =
        common::setup_drive_mock_with_list_timeout(Duration::from_millis(200)).await;

    common::mount_listing(
        &server,
        "fast",
        serde_json::json!([{ "id": "f1", "name": "a.txt", "mimeType": "text/plain" }]),
        None,
    )
    .await;
    common::mount_stalled_listing(&server, "slow", Duration::from_secs(3), 1).await;

    let outcomes = service
        .list_children_batch(&[common::list_request("fast"), common::list_request("slow")])
        .await
        .expect("one stalled request must not fail the batch");

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(&outcomes[0], ListOutcome::Page(page) if page.entries.len() == 1));
    assert!(matches!(&outcomes[1], ListOutcome::Interrupted { .. }));
}
