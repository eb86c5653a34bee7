//! Reconciliation of the local tree after a download pass

use drivemirror_sync::MirrorOptions;

use crate::common::{dir, doc, EventLog, FakeDrive, Harness};

const REPO_URL: &str = "https://example.com/tool.git";

fn touch(root: &std::path::Path, rel: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"leftover").unwrap();
}

fn mirrored_drive() -> FakeDrive {
    FakeDrive::new()
        .folder("root", vec![dir("d1", "one")])
        .raw("root", "k", "keep.txt", b"keep")
        .raw("d1", "o", "one.bin", b"one")
        .raw(
            "root",
            "p",
            "tool.git.json",
            format!(r#"{{"url": "{REPO_URL}"}}"#).as_bytes(),
        )
        .folder("root", vec![doc("d", "Doc", 10)])
}

fn deleting(h: &Harness) -> MirrorOptions {
    MirrorOptions {
        delete: true,
        ..h.options(2)
    }
}

#[tokio::test]
async fn test_delete_leaves_exactly_the_used_paths() {
    let h = Harness::new(mirrored_drive());
    let root = h.root();
    touch(root, "stale.txt");
    touch(root, "one/old.bin");
    touch(root, "gone/deep/x.bin");
    touch(root, "Doc.bak.docx");
    // files inside a working copy are never orphans
    touch(root, "tool/src/main.rs");
    h.repos.insert(&root.join("tool"), &[("origin", REPO_URL)]);

    let log = EventLog::new();
    let report = h.engine(deleting(&h)).run(&log.sender).await.unwrap();

    let cleanup = report.cleanup.unwrap();
    assert_eq!(cleanup.orphans, 4);
    assert_eq!(cleanup.deleted, 4);
    assert_eq!(cleanup.failed, 0);
    assert_eq!(cleanup.pruned_dirs, 2);
    assert_eq!(
        h.files(),
        vec![
            "Doc.bak.pdf",
            "Doc.bak.txt",
            "Doc.html",
            "keep.txt",
            "one/one.bin",
            "tool.git.json",
            "tool/src/main.rs",
        ]
    );
    assert!(!root.join("gone").exists());
}

#[tokio::test]
async fn test_nothing_is_deleted_without_delete_flag() {
    let h = Harness::new(mirrored_drive());
    touch(h.root(), "stale.txt");

    let log = EventLog::new();
    let report = h.engine(h.options(2)).run(&log.sender).await.unwrap();

    assert!(report.cleanup.is_none());
    assert!(h.root().join("stale.txt").exists());
}

#[tokio::test]
async fn test_remote_removal_is_mirrored_locally() {
    let h = Harness::new(mirrored_drive());
    let log = EventLog::new();
    h.engine(deleting(&h)).run(&log.sender).await.unwrap();
    assert!(h.root().join("one/one.bin").exists());

    h.drive.set_folder("d1", Vec::new());
    let report = h.engine(deleting(&h)).run(&log.sender).await.unwrap();

    let cleanup = report.cleanup.unwrap();
    assert_eq!(cleanup.deleted, 1);
    assert_eq!(cleanup.pruned_dirs, 1);
    assert!(!h.root().join("one").exists());
    assert!(h.root().join("keep.txt").exists());
    assert!(h.root().join("tool").exists());
}
