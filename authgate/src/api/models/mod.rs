//! Request and response bodies of the HTTP surface.

pub mod auth;
