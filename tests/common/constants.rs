//! Shared constants for end-to-end tests

/// Service key the fake API accepts.
pub const TEST_SERVICE_KEY: &str = "test-service-key";

/// Timeout waiting for a spawned server to answer.
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per request timeout of the test client.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Upstream timeout of the server under test.
pub const UPSTREAM_TIMEOUT_SECS: u64 = 2;
