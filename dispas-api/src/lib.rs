//! # Dispas API Server
//!
//! JSON-over-HTTP access to the registry, the announcement log, the scanner
//! and the distribution engine.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and log size
//! - `POST /api/v1/keys/generate` - Generate an identity key set
//! - `POST /api/v1/registry/register` - Register or rotate a meta-address
//! - `GET /api/v1/registry/:identity` - Look up a meta-address
//! - `POST /api/v1/stealth/create` - Derive a one-time address (optionally announce it)
//! - `POST /api/v1/stealth/send` - Stealth transfer to a registered identity
//! - `POST /api/v1/stealth/scan` - Scan the log with a viewing key
//! - `POST /api/v1/announcements` - Append an announcement
//! - `GET /api/v1/announcements?from&to` - Read a sequence window
//! - `POST /api/v1/distribute` - Exact-sum batch distribution
//! - `GET /api/v1/balances/:account` - Ledger balance
//!
//! Errors are returned as `{"error": {"code", "message"}}` where `code` is
//! the stable [`DispasError::code`](dispas_core::DispasError::code).
//!
//! ## Example
//!
//! ```rust,ignore
//! use dispas_api::{ApiConfig, ApiServer};
//!
//! let config = ApiConfig::from_env()?;
//! let server = ApiServer::open(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod routes;
mod handlers;
mod state;
mod dto;
mod error;

pub use routes::create_router;
pub use state::{AppState, ApiConfig};
pub use error::ApiError;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use dispas_core::error::Result;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// API server for Dispas.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server with an in-memory announcement log.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Creates a server, opening the configured announcement log.
    pub async fn open(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::open(config).await?),
        })
    }

    /// Shared state, e.g. for seeding balances.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes and layers configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the configured address.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.socket_addr();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Dispas API server listening on {}", addr);

        axum::serve(listener, self.router()).await
    }
}
