//! # authgate: authentication gateway for HTTP services
//!
//! `authgate` decides whether an HTTP request is authenticated. It delegates credential checks to
//! one of several pluggable backends, turns a successful check into a session cookie, and makes
//! sure every user who logs in for the first time holds a role in the RBAC store.
//!
//! ## Request Flow
//!
//! A request to a protected route goes through [`auth::middleware`]:
//!
//! 1. An `authtok` session cookie is accepted as-is and refreshed on the response.
//! 2. Otherwise `Authorization: Basic ...` is decoded and handed to the configured backend
//!    ([`auth::backend`]). Malformed headers are rejected before the backend is contacted.
//! 3. After a successful check, a user with no role gets the backend's default role, and the
//!    `permissions` cookie is recomputed from the RBAC store ([`auth::bootstrap`]).
//! 4. The handler runs with an [`auth::middleware::Identity`] in the request extensions.
//!
//! Backends are selected by name from configuration: `basic` checks local Argon2 hashes,
//! `keystone` exchanges the credentials for a token with an OpenStack identity service, and
//! `noauth` turns authentication off.
//!
//! For the other direction, [`auth::headers`] builds the headers a client needs to call another
//! instance of the gateway.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use authgate::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     authgate::install_crypto_provider();
//!     let args = authgate::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     authgate::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod rbac;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};

use crate::{
    auth::{authenticator::Authenticator, backend::new_backend_by_name, middleware},
    rbac::InMemoryRbac,
};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .authenticator(authenticator)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub authenticator: Authenticator,
}

/// Install the process-wide rustls crypto provider used by outbound HTTPS clients.
///
/// Safe to call more than once; later calls leave the installed provider in place.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Build the backend and RBAC store the configuration describes.
#[instrument(skip_all, fields(backend = %config.auth.backend))]
pub fn build_authenticator(config: &Config) -> errors::Result<Authenticator> {
    let backend = new_backend_by_name(&config.auth.backend, config)?;
    let rbac = Arc::new(InMemoryRbac::from_config(&config.rbac));
    Ok(Authenticator::new(backend, rbac))
}

/// Build the application router.
///
/// `/login` and `/healthz` are open; everything under `/api` is wrapped by the configured
/// backend.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let protected = middleware::wrap(
        Router::new().route("/api/me", get(api::handlers::auth::me)),
        state.authenticator.clone(),
    );

    Router::new()
        .route("/login", post(api::handlers::auth::login))
        .route("/healthz", get(api::handlers::health::healthz))
        .merge(protected)
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            ),
        )
}

/// The gateway server.
///
/// [`Application::new`] builds the backend, RBAC store and router from configuration;
/// [`Application::serve`] binds the listener and runs until the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance from configuration
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting authentication gateway with configuration: {:#?}", config);

        let authenticator = build_authenticator(&config)?;
        let state = AppState::builder().authenticator(authenticator).build();
        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Authentication gateway listening on http://{}, backend {}",
            bind_addr, self.config.auth.backend
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
