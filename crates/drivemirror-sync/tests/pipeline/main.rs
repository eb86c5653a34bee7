//! Pipeline tests for drivemirror-sync
//!
//! Runs the walker, the download scheduler and the cleaner against an
//! in-memory drive and a fake repository manager, writing into temporary
//! directories. The walker is also driven through the Google Drive adapter
//! against a mock HTTP server.

mod common;

mod test_cleanup;
mod test_drive_adapter;
mod test_scenario;
mod test_walker;
