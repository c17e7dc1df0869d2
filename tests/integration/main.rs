//! Integration tests for Listwatch
//!
//! These tests run complete watch cycles against wiremock servers and check the
//! snapshots and run logs left on disk.

mod run_tests;
