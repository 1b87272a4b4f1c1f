//! Integration tests for telecall-session.
//!
//! Tests are organized by functionality:
//! - `negotiation_tests` - offer/answer, candidates and message filtering
//! - `lifecycle_tests` - join failures, local actions and teardown
//! - `call_tests` - two calls talking over a real channel

pub mod lifecycle_tests;

use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
