//! # deskflow-server
//!
//! The HTTP surface of Deskflow: JSON turn endpoints and SSE streaming
//! variants for the supervisor (multi-agent) and the generalist single
//! agent. Every failure inside a turn is caught at the handler boundary and
//! converted to the error envelope; the blast radius of any turn is one
//! chat response.

pub mod app;
pub mod envelope;
pub mod handlers;

pub use app::{ServerConfig, create_app};
pub use envelope::ApiResponse;
