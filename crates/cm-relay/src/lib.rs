//! cm-relay library target.
//!
//! Exposes the router, configuration and state for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod config;
pub mod request_id;
pub mod routes;
pub mod state;
