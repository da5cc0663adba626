//! Kubelift: single-node Kubernetes bring-up
//!
//! This crate tracks when a freshly started cluster becomes usable and resolves
//! which resources get drained when it is stopped.

pub mod error;
pub mod metrics;
pub mod options;
pub mod state;

#[cfg(feature = "rest-api")]
pub mod rest_api;

pub use crate::error::{Error, Result};
