//! Integration tests for tvstream
//!
//! Tests are organized by component:
//! - resolver_test: IP lookup + stream backend over a mock HTTP server
//! - player_test: Player handle guards and teardown
//! - controller_test: Session lifecycle, failures, stale continuations
//! - input_test: Remote-control keys and visibility handling
//! - lifecycle_test: Full app flows (startup, background/foreground cycling)
//!
//! Shared fakes live in common/mod.rs.

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
