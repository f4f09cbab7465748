//! Axum route handlers.
//!
//! - [`auth`]: login and identity endpoints
//! - [`health`]: liveness probe

pub mod auth;
pub mod health;
