//! India Visual Dataset HTTP host.
//!
//! Serves contribution sessions and the review console to a browser front
//! end. Exposes config, state, error handling and routes so integration
//! tests and the binary entrypoint share them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod sessions;
pub mod state;
