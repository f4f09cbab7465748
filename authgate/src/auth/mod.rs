//! Authentication: backends, the request protocol and session cookies.
//!
//! # Modules
//!
//! - [`backend`]: the [`backend::AuthenticationBackend`] trait and the name-based factory
//! - [`basic`], [`keystone`], [`noauth`]: backend implementations
//! - [`authenticator`]: per-request protocol (session cookie first, then Basic credentials)
//! - [`bootstrap`]: default role on first login, permissions cookie refresh
//! - [`middleware`]: route protection and the [`middleware::Identity`] extractor
//! - [`headers`]: outbound credential headers for calling another instance
//! - [`session`]: cookie names, rendering and lookup
//! - [`password`]: Argon2 hashing and session token generation
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use authgate::auth::middleware::{Identity, wrap};
//!
//! async fn protected_handler(identity: Identity) -> String {
//!     format!("Hello, {}!", identity.username.as_deref().unwrap_or("session user"))
//! }
//!
//! let router = wrap(Router::new().route("/hello", get(protected_handler)), authenticator);
//! ```

pub mod authenticator;
pub mod backend;
pub mod basic;
pub mod bootstrap;
pub mod headers;
pub mod keystone;
pub mod middleware;
pub mod noauth;
pub mod password;
pub mod session;
