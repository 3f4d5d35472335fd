//! Signaling server
//!
//! Routes:
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/ws` | WebSocket signaling + binary media chunks |
//! | GET | `/status` | broadcaster/viewer counts and bridge state |
//! | POST | `/broadcast` | one-shot non-trickle offer/answer ingest |
//! | GET | `/favicon.ico` | 204 |
//!
//! All routes are served over HTTPS when a [`TlsConfig`] is configured.

pub mod config;
pub mod http;
pub mod ingest;
pub mod listener;
pub mod socket;

pub use config::{ServerConfig, TlsConfig};
pub use ingest::IngestPeers;
pub use listener::SignalingServer;
