//! Integration tests for telecall-server.
//!
//! Tests are organized by functionality:
//! - `relay_tests` - forwarding, membership and HTTP surface of the relay
//! - `call_tests` - negotiators talking through a live relay

pub mod relay_tests;

use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
