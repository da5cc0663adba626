//! REST API module for external integrations
//!
//! Exposes the readiness state, the resolved drain plan and the prometheus
//! metrics over HTTP.

mod dto;
mod handlers;
mod server;

pub use dto::{HealthResponse, ReadyResponse, StateResponse};
pub use server::{router, run_server, ApiState};
