//! Remote tree walk: ordering, naming, pagination and retries

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use drivemirror_sync::{RemoteWalker, WalkError, WalkerOptions};

use crate::common::{dir, file, FakeDrive};

fn options() -> WalkerOptions {
    WalkerOptions {
        batch_size: 100,
        page_size: 1000,
        retry_delay: Duration::ZERO,
        max_retries: 20,
    }
}

async fn walk(drive: &Arc<FakeDrive>, options: WalkerOptions) -> Result<Vec<String>, WalkError> {
    let mut walker = RemoteWalker::new(drive.clone(), options);
    let mut paths = Vec::new();
    while let Some(file) = walker.next().await? {
        paths.push(file.path().to_string());
    }
    Ok(paths)
}

fn small_tree() -> FakeDrive {
    FakeDrive::new()
        .folder(
            "root",
            vec![dir("a", "A"), dir("b", "B"), file("t", "top.txt", b"top")],
        )
        .folder("a", vec![dir("c", "C"), file("a1", "a1.txt", b"a1")])
        .folder("b", vec![file("b1", "b1.txt", b"b1")])
        .folder("c", vec![file("c1", "c1.txt", b"c1")])
}

#[tokio::test]
async fn test_walk_yields_every_file_in_batch_order() {
    let drive = Arc::new(small_tree());
    let paths = walk(&drive, options()).await.unwrap();
    assert_eq!(paths, vec!["top.txt", "A/a1.txt", "B/b1.txt", "A/C/c1.txt"]);
    assert_eq!(drive.batches().len(), 3);
}

#[tokio::test]
async fn test_single_request_batches_go_depth_first() {
    let drive = Arc::new(small_tree());
    let paths = walk(
        &drive,
        WalkerOptions {
            batch_size: 1,
            ..options()
        },
    )
    .await
    .unwrap();
    assert_eq!(paths, vec!["top.txt", "A/a1.txt", "A/C/c1.txt", "B/b1.txt"]);
    assert!(drive.batches().iter().all(|b| b.len() == 1));
}

#[tokio::test]
async fn test_colliding_names_get_distinct_paths() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder(
                "root",
                vec![
                    dir("p1", "Photos"),
                    dir("p2", "Photos"),
                    file("r1", "Report", b"1"),
                    file("r2", "Report", b"2"),
                    file("r3", "Report", b"3"),
                    file("x1", "a:b", b"x"),
                    file("x2", "a*b", b"y"),
                ],
            )
            .folder("p1", vec![file("f1", "img.jpg", b"i1")])
            .folder("p2", vec![file("f2", "img.jpg", b"i2")]),
    );
    let paths = walk(&drive, options()).await.unwrap();

    assert_eq!(
        paths,
        vec![
            "Report",
            "Report, (1)",
            "Report, (2)",
            "ab",
            "ab, (1)",
            "Photos/img.jpg",
            "Photos, (1)/img.jpg",
        ]
    );
    let unique: HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), paths.len());
}

#[tokio::test]
async fn test_pages_are_followed_in_order() {
    let entries = (0..5)
        .map(|i| file(&format!("f{i}"), &format!("file{i}"), b"x"))
        .collect();
    let drive = Arc::new(FakeDrive::new().folder("root", entries));
    let paths = walk(
        &drive,
        WalkerOptions {
            page_size: 2,
            ..options()
        },
    )
    .await
    .unwrap();

    assert_eq!(paths, vec!["file0", "file1", "file2", "file3", "file4"]);
    let tokens: Vec<Option<String>> = drive
        .batches()
        .iter()
        .flatten()
        .map(|r| r.page_token.as_ref().map(|t| t.to_string()))
        .collect();
    assert_eq!(
        tokens,
        vec![None, Some("2".to_string()), Some("4".to_string())]
    );
}

#[tokio::test]
async fn test_batches_never_exceed_batch_size() {
    let folders: Vec<_> = (0..5).map(|i| dir(&format!("d{i}"), &format!("dir{i}"))).collect();
    let mut drive = FakeDrive::new().folder("root", folders);
    for i in 0..5 {
        drive = drive.folder(&format!("d{i}"), vec![file(&format!("f{i}"), "x", b"x")]);
    }
    let drive = Arc::new(drive);

    let paths = walk(
        &drive,
        WalkerOptions {
            batch_size: 2,
            ..options()
        },
    )
    .await
    .unwrap();

    assert_eq!(paths.len(), 5);
    let batches = drive.batches();
    assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 2));
    assert_eq!(batches.len(), 4);
}

#[tokio::test]
async fn test_transient_failures_do_not_change_the_result() {
    let clean = Arc::new(small_tree());
    let mut expected = walk(&clean, options()).await.unwrap();

    let flaky = Arc::new(
        small_tree()
            .fail_listing("a", &[503, 429])
            .fail_listing("root", &[401])
            .fail_listing("c", &[500, 403, 503]),
    );
    let mut paths = walk(&flaky, options()).await.unwrap();

    expected.sort();
    paths.sort();
    assert_eq!(paths, expected);
}

#[tokio::test]
async fn test_interrupted_listing_only_retries_that_folder() {
    let clean = Arc::new(small_tree());
    let expected = walk(&clean, options()).await.unwrap();

    let flaky = Arc::new(small_tree().interrupt_listing("b", 2));
    let paths = walk(&flaky, options()).await.unwrap();
    assert_eq!(paths.len(), expected.len());
    assert_eq!(
        paths.iter().collect::<HashSet<_>>(),
        expected.iter().collect::<HashSet<_>>()
    );

    let per_folder = |id: &str| {
        flaky
            .batches()
            .iter()
            .flatten()
            .filter(|r| r.parent_id.as_str() == id)
            .count()
    };
    assert_eq!(per_folder("b"), 3);
    assert_eq!(per_folder("a"), 1);
    assert_eq!(per_folder("c"), 1);
    assert_eq!(per_folder("root"), 1);
}

#[tokio::test]
async fn test_interruptions_count_against_max_retries() {
    let drive = Arc::new(small_tree().interrupt_listing("c", 5));
    let err = walk(
        &drive,
        WalkerOptions {
            max_retries: 3,
            ..options()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        WalkError::RetriesExhausted { ref path, retries: 3 } if path == "A/C"
    ));
}

#[tokio::test]
async fn test_retries_exhausted_aborts_the_walk() {
    let drive = Arc::new(small_tree().fail_listing("a", &[503, 503, 503]));
    let err = walk(
        &drive,
        WalkerOptions {
            max_retries: 2,
            ..options()
        },
    )
    .await
    .unwrap_err();

    match err {
        WalkError::RetriesExhausted { path, retries } => {
            assert_eq!(path, "A");
            assert_eq!(retries, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let attempts = drive
        .batches()
        .iter()
        .flatten()
        .filter(|r| r.parent_id.as_str() == "a")
        .count();
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn test_non_retryable_status_aborts_the_walk() {
    // "b" has no listing, so the fake answers 404
    let drive = Arc::new(FakeDrive::new().folder("root", vec![dir("b", "B")]));
    let err = walk(&drive, options()).await.unwrap_err();
    assert!(matches!(err, WalkError::Remote { status: 404, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_retried_batch_waits_for_retry_delay() {
    let delay = Duration::from_secs(30);
    let opts = WalkerOptions {
        retry_delay: delay,
        ..options()
    };

    let start = tokio::time::Instant::now();
    walk(&Arc::new(small_tree()), opts.clone()).await.unwrap();
    assert!(start.elapsed() < delay);

    let start = tokio::time::Instant::now();
    let drive = Arc::new(small_tree().fail_listing("b", &[429]));
    walk(&drive, opts).await.unwrap();
    assert!(start.elapsed() >= delay);
}
