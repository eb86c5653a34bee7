//! End-to-end mirror runs: expected layout, idempotence and remote changes

use drivemirror_sync::MirrorOptions;

use crate::common::{doc, doc_policy, export_bytes, file, EventLog, FakeDrive, Harness};

fn notes_and_doc() -> Harness {
    Harness::new(
        FakeDrive::new()
            .raw("root", "n", "notes.txt", b"hello")
            .folder("root", vec![doc("d", "Doc", 1_000)]),
    )
    .with_policy(doc_policy(&["application/pdf"]))
}

#[tokio::test]
async fn test_first_run_produces_expected_layout() {
    let h = notes_and_doc();
    let log = EventLog::new();
    let report = h.engine(h.options(3)).run(&log.sender).await.unwrap();

    assert_eq!(report.synced, Some(2));
    assert_eq!(h.files(), vec!["Doc.bak.pdf", "Doc.html", "notes.txt"]);
    assert_eq!(std::fs::read(h.root().join("notes.txt")).unwrap(), b"hello");
    assert_eq!(
        std::fs::read(h.root().join("Doc.bak.pdf")).unwrap(),
        export_bytes("d", "application/pdf")
    );

    let html = std::fs::read_to_string(h.root().join("Doc.html")).unwrap();
    assert!(html.contains("https://docs.google.com/document/d/d/edit"));
    assert!(html.contains("modifiedTime: 1000"));
}

#[tokio::test]
async fn test_second_run_transfers_nothing() {
    let h = notes_and_doc();
    let log = EventLog::new();
    h.engine(h.options(3)).run(&log.sender).await.unwrap();
    let requests = h.drive.content_requests();
    let html = std::fs::read_to_string(h.root().join("Doc.html")).unwrap();

    let report = h.engine(h.options(3)).run(&log.sender).await.unwrap();

    assert_eq!(report.download.skipped, 2);
    assert_eq!(report.download.saved_variants, 0);
    assert_eq!(h.drive.content_requests(), requests);
    assert_eq!(
        std::fs::read_to_string(h.root().join("Doc.html")).unwrap(),
        html
    );
}

#[tokio::test]
async fn test_matching_local_file_is_not_downloaded() {
    let h = notes_and_doc();
    std::fs::write(h.root().join("notes.txt"), b"hello").unwrap();

    let log = EventLog::new();
    h.engine(h.options(1)).run(&log.sender).await.unwrap();

    assert!(h.drive.downloads().is_empty());
    assert_eq!(h.drive.exports().len(), 1);
}

#[tokio::test]
async fn test_remote_changes_are_picked_up() {
    let h = notes_and_doc();
    let log = EventLog::new();
    h.engine(h.options(2)).run(&log.sender).await.unwrap();

    h.drive.set_content("n", b"hello again");
    h.drive.set_folder(
        "root",
        vec![file("n", "notes.txt", b"hello again"), doc("d", "Doc", 2_000)],
    );
    let report = h.engine(h.options(2)).run(&log.sender).await.unwrap();

    assert_eq!(report.download.skipped, 0);
    assert_eq!(report.download.saved_variants, 3);
    assert_eq!(
        std::fs::read(h.root().join("notes.txt")).unwrap(),
        b"hello again"
    );
    let html = std::fs::read_to_string(h.root().join("Doc.html")).unwrap();
    assert!(html.contains("modifiedTime: 2000"));
}

#[tokio::test]
async fn test_same_named_documents_do_not_overwrite_each_other() {
    let h = Harness::new(
        FakeDrive::new().folder("root", vec![doc("d1", "Doc", 1), doc("d2", "Doc", 2)]),
    )
    .with_policy(doc_policy(&["application/pdf"]));
    let log = EventLog::new();
    h.engine(h.options(4)).run(&log.sender).await.unwrap();

    assert_eq!(
        h.files(),
        vec!["Doc, (1).bak.pdf", "Doc, (1).html", "Doc.bak.pdf", "Doc.html"]
    );
    assert_eq!(
        std::fs::read(h.root().join("Doc, (1).bak.pdf")).unwrap(),
        export_bytes("d2", "application/pdf")
    );
}

#[tokio::test]
async fn test_cached_run_skips_the_walk() {
    let h = notes_and_doc();
    let log = EventLog::new();
    h.engine(h.options(1)).run(&log.sender).await.unwrap();
    let batches = h.drive.batches().len();

    let options = MirrorOptions {
        use_cache: true,
        ..h.options(1)
    };
    let report = h.engine(options).run(&log.sender).await.unwrap();

    assert_eq!(report.synced, None);
    assert_eq!(h.drive.batches().len(), batches);
    assert_eq!(report.download.skipped, 2);
}
