//! Signaling server listener
//!
//! Binds the HTTP listener and wires the router to the coordinator actor.
//! With a [`TlsConfig`] the same router is served over HTTPS through
//! rustls, which browsers require before they hand out camera access on
//! anything but localhost.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::bridge::{FfmpegLauncher, Launcher};
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::server::config::{ServerConfig, TlsConfig};
use crate::server::http::{self, AppState};
use crate::server::ingest::IngestPeers;

/// How long TLS connections get to finish once shutdown starts
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

static CRYPTO_PROVIDER: Once = Once::new();

/// Signaling server
pub struct SignalingServer {
    config: ServerConfig,
    coordinator: Coordinator,
    coordinator_task: JoinHandle<()>,
    ingest: Arc<IngestPeers>,
}

impl SignalingServer {
    /// Create a new server that bridges to ffmpeg
    ///
    /// Must be called from within a tokio runtime; the coordinator actor is
    /// spawned immediately.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let launcher = Arc::new(FfmpegLauncher::new(config.bridge.clone()));
        Self::with_launcher(config, launcher)
    }

    /// Create a new server with a custom encoder launcher
    pub fn with_launcher(config: ServerConfig, launcher: Arc<dyn Launcher>) -> Result<Self> {
        let ingest = Arc::new(
            IngestPeers::new(config.ice_servers.clone(), config.ice_gathering_timeout)?
                .connect_timeout(config.ingest_connect_timeout),
        );

        let (coordinator, coordinator_task) =
            Coordinator::spawn_with_capacity(config.bridge.clone(), launcher, config.command_buffer);

        Ok(Self {
            config,
            coordinator,
            coordinator_task,
            ingest,
        })
    }

    /// Handle to the coordinator actor
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Build the HTTP router
    ///
    /// Each call creates a fresh connection limit.
    pub fn router(&self) -> Router {
        http::router(AppState::new(
            self.coordinator.clone(),
            Arc::clone(&self.ingest),
            self.config.max_connections,
        ))
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Serves HTTPS when a TLS config is set, plain HTTP otherwise. Once
    /// `shutdown` resolves, in-flight connections are drained and the
    /// coordinator stops the bridge before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(tls) = self.config.tls.clone() {
            return self.serve_tls(tls, shutdown).await;
        }

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Signaling server listening");
        tracing::warn!("Serving plain HTTP; browsers only allow camera capture over HTTPS or on localhost");

        self.serve(listener, shutdown).await
    }

    /// Serve plain HTTP on an already bound listener
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        self.finish().await;
        result.map_err(Into::into)
    }

    /// Serve HTTPS on the configured bind address
    pub async fn serve_tls<F>(self, tls: TlsConfig, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        install_crypto_provider();

        let rustls = match RustlsConfig::from_pem_file(&tls.cert, &tls.key).await {
            Ok(rustls) => rustls,
            Err(e) => {
                tracing::error!(
                    cert = %tls.cert.display(),
                    key = %tls.key.display(),
                    error = %e,
                    "Failed to load TLS certificate"
                );
                self.finish().await;
                return Err(e.into());
            }
        };

        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            signal.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        });

        tracing::info!(
            addr = %self.config.bind_addr,
            cert = %tls.cert.display(),
            "Signaling server listening with TLS"
        );

        let result = axum_server::bind_rustls(self.config.bind_addr, rustls)
            .handle(handle)
            .serve(self.router().into_make_service())
            .await;

        self.finish().await;
        result.map_err(Into::into)
    }

    /// Stop the coordinator and wait for it
    async fn finish(self) {
        // Upgraded sockets outlive the HTTP server and still hold handles
        if let Err(e) = self.coordinator.shutdown().await {
            tracing::debug!(error = %e, "Coordinator already stopped");
        }
        if let Err(e) = self.coordinator_task.await {
            tracing::error!(error = %e, "Coordinator task failed");
        }

        tracing::info!("Signaling server stopped");
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

/// rustls needs a process-wide provider when more than one is compiled in
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("rustls crypto provider already installed");
        }
    });
}

impl std::fmt::Debug for SignalingServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingServer")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
