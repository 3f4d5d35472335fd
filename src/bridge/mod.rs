//! RTMP bridge
//!
//! Owns the ffmpeg subprocess that re-encodes the broadcaster's recorded
//! WebM chunks and publishes them as RTMP. The bridge is a state machine
//! driven by two inputs: requests from the coordinator (`start`, `stop`,
//! `data`) and [`BridgeEvent`]s reported by the tasks that spawn, feed and
//! wait on the subprocess.
//!
//! # States
//!
//! ```text
//!            start()                 Started
//!   Idle ───────────► Starting ─────────────────► Streaming ──┐ data(chunk)
//!    ▲                   │   │                       │  ▲    │
//!    │  SpawnFailed/     │   │ stop()                │  └────┘
//!    │  StartTimedOut    ▼   │                       │ stop()
//!    ├────────────── Failed  └──────────┐            ▼
//!    │                                  └──────► Stopping
//!    └──────────────────── Exited ◄────────────────┘
//! ```
//!
//! A stop while Starting waits in Stopping for the launch to report back
//! and kills whatever it produced.
//!
//! Every spawn gets a generation number. Events carrying an older generation
//! are stale: a stale `Started` kills the process it carries, and a new
//! spawn waits until every abandoned process has reported its exit, so two
//! subprocesses are never alive at once.
//!
//! # Data path
//!
//! Chunks go through one bounded channel to a single pump task that owns
//! the subprocess stdin and writes them with `write_all`, so byte order is
//! the arrival order and chunk boundaries never interleave. When ffmpeg
//! stops reading and the channel fills up, new chunks are dropped and
//! counted instead of queueing without limit.

pub mod config;
pub mod error;
pub mod pipe;
pub mod process;
pub mod state;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use process::{ChildProcess, FfmpegLauncher, Launcher, Spawned};
pub use state::{BridgeEvent, BridgeState, MediaBridge};
