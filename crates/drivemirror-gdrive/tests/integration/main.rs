//! Integration tests for drivemirror-gdrive
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies
//! end-to-end behavior of the client, folder listings, batches,
//! downloads, and exports.


mod test_content;
mod test_listing;
