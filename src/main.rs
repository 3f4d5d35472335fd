//! broadcast-relay server binary
//!
//! Configuration comes from the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `5000` |
//! | `BIND_ADDR` | `0.0.0.0:$PORT` |
//! | `MAX_CONNECTIONS` | `0` (unlimited) |
//! | `FFMPEG_PATH` | `ffmpeg` |
//! | `RTMP_URL` | `rtmp://localhost:1935/live/stream` |
//! | `TLS_CERT`, `TLS_KEY` | `cert.pem`, `key.pem` when both exist, else plain HTTP |
//!
//! Log verbosity follows `RUST_LOG`.

use broadcast_relay::{ServerConfig, SignalingServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("broadcast_relay=debug".parse()?),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let rtmp_url = config.bridge.output_url.clone();
    let scheme = if config.tls.is_some() { "https" } else { "http" };
    let server = SignalingServer::new(config)?;

    tracing::info!(
        addr = %server.bind_addr(),
        scheme = scheme,
        rtmp_url = %rtmp_url,
        "Starting signaling server"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
