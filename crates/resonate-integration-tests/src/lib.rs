//! Integration test crate for the Resonate release platform.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end release flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p resonate-integration-tests -- --ignored
//! ```
