//! Statistics for the coordinator and the RTMP bridge

pub mod metrics;

pub use metrics::{BridgeStats, StatusSnapshot};
