//! Integration tests for the watcher
//!
//! These tests use wiremock to stand in for TestFlight pages and Discord
//! webhooks, and tempfile directories for the target store.

mod notify_tests;
mod watch_tests;
