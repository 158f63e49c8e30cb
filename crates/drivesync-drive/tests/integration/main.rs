//! Integration tests for drivesync-drive
//!
//! Uses wiremock to simulate the Drive v3 API and the OAuth token endpoint,
//! and verifies the client, the changes feed, file requests and the
//! credential providers end to end.

mod common;

mod test_auth;
mod test_changes;
mod test_files;
mod test_retry;
