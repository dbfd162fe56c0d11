//! # fedauth-server
//!
//! HTTP server for federated sign-in.
//!
//! The token validator (XML signature verification) and the identity
//! linker (the application's account store) are supplied by the embedding
//! application; everything else is built from [`FederationConfig`].
//!
//! ## Usage
//!
//! ```ignore
//! use fedauth_core::FederationConfig;
//! use fedauth_server::{telemetry, Server};
//!
//! let config = FederationConfig::from_env()?;
//! telemetry::init_tracing(&config.log_level);
//! Server::new(config, validator, linker)?.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod router;
pub mod telemetry;

pub use router::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fedauth_core::FederationConfig;
use fedauth_protocol::endpoints::FederationState;
use fedauth_protocol::{IdentityLinker, IssuerTrustRegistry, LoginOrchestrator, TokenValidator};
use fedauth_session::SessionCookieCodec;
use tokio::net::TcpListener;

/// The federated sign-in server.
#[derive(Debug)]
pub struct Server {
    config: FederationConfig,
    state: FederationState,
}

impl Server {
    /// Validates the configuration and builds the trust registry, cookie
    /// key ring and sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the cookie keys
    /// cannot be loaded.
    pub fn new(
        config: FederationConfig,
        validator: Arc<dyn TokenValidator>,
        linker: Arc<dyn IdentityLinker>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let registry = Arc::new(IssuerTrustRegistry::from_config(&config.trusted_issuers)?);
        let cookies = Arc::new(SessionCookieCodec::from_config(&config)?);
        let orchestrator = Arc::new(LoginOrchestrator::new(&config, registry, validator, linker));

        tracing::info!(
            audience = %config.expected_audience_uri,
            trusted_issuers = config.trusted_issuers.len(),
            require_ssl = config.require_secure_transport,
            app_root = %orchestrator.app_root(),
            "Federated sign-in configured"
        );
        if config.secure_channel_unobservable() {
            tracing::warn!(
                "A secure channel is required but X-Forwarded-Proto is not trusted; \
                 plain HTTP sign-ins will be refused. Set FEDAUTH_TRUST_FORWARDED_PROTO \
                 behind a TLS-terminating proxy"
            );
        }

        let state = FederationState::new(orchestrator, cookies)
            .with_trust_forwarded_proto(config.trust_forwarded_proto);

        Ok(Self { config, state })
    }

    /// The trust registry, for adding issuers at runtime.
    #[must_use]
    pub fn registry(&self) -> &Arc<IssuerTrustRegistry> {
        self.state.orchestrator.registry()
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Creates the router without starting the server.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Binds `host:port` and serves until Ctrl-C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
