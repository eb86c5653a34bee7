//! Remote tree walk through the Google Drive adapter

use std::sync::Arc;
use std::time::Duration;

use drivemirror_gdrive::{DriveClient, GoogleDriveService, StaticTokenProvider};
use drivemirror_sync::{RemoteWalker, WalkError, WalkerOptions};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

fn query(parent: &str) -> String {
    format!("'{parent}' in parents and trashed = false")
}

async fn mount_listing(server: &MockServer, parent: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", query(parent)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": files })))
        .mount(server)
        .await;
}

/// The first `times` listings of `parent` hang past the client's timeout
async fn mount_stall(server: &MockServer, parent: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", query(parent)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "files": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(times)
        .with_priority(1)
        .mount(server)
        .await;
}

async fn drive_tree() -> MockServer {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "root",
        serde_json::json!([
            { "id": "a", "name": "A", "mimeType": FOLDER_MIME },
            { "id": "b", "name": "B", "mimeType": FOLDER_MIME },
            { "id": "t", "name": "top.txt", "mimeType": "text/plain", "md5Checksum": "aa" }
        ]),
    )
    .await;
    mount_listing(
        &server,
        "a",
        serde_json::json!([{ "id": "a1", "name": "a1.txt", "mimeType": "text/plain" }]),
    )
    .await;
    mount_listing(
        &server,
        "b",
        serde_json::json!([{ "id": "b1", "name": "b1.txt", "mimeType": "text/plain" }]),
    )
    .await;
    server
}

fn walker(server: &MockServer, max_retries: u32) -> RemoteWalker {
    let client = DriveClient::with_base_url(
        Arc::new(StaticTokenProvider::new("test-access-token")),
        server.uri(),
    )
    .with_list_timeout(Duration::from_millis(200));
    RemoteWalker::new(
        Arc::new(GoogleDriveService::new(client)),
        WalkerOptions {
            batch_size: 100,
            page_size: 1000,
            retry_delay: Duration::ZERO,
            max_retries,
        },
    )
}

async fn collect(mut walker: RemoteWalker) -> Result<Vec<String>, WalkError> {
    let mut paths = Vec::new();
    while let Some(file) = walker.next().await? {
        paths.push(file.path().to_string());
    }
    Ok(paths)
}

#[tokio::test]
async fn test_walk_completes_when_one_listing_stalls() {
    let server = drive_tree().await;
    mount_stall(&server, "b", 1).await;

    let paths = collect(walker(&server, 20)).await.unwrap();
    assert_eq!(paths, vec!["top.txt", "A/a1.txt", "B/b1.txt"]);

    let requests = server.received_requests().await.unwrap();
    let listings_of = |parent: &str| {
        let q = query(parent);
        requests
            .iter()
            .filter(|r| r.url.query_pairs().any(|(k, v)| k == "q" && v == q))
            .count()
    };
    assert_eq!(listings_of("b"), 2);
    assert_eq!(listings_of("a"), 1);
    assert_eq!(listings_of("root"), 1);
}

#[tokio::test]
async fn test_walk_gives_up_on_a_listing_that_keeps_stalling() {
    let server = drive_tree().await;
    mount_stall(&server, "a", 10).await;

    let err = collect(walker(&server, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        WalkError::RetriesExhausted { ref path, retries: 1 } if path == "A"
    ));
}
