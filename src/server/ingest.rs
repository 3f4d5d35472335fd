//! One-shot WebRTC ingest
//!
//! Backs `POST /broadcast`: the client posts a complete offer, the server
//! answers after ICE gathering finishes (non-trickle), and the resulting peer
//! connection receives the client's tracks. Ingest peers are independent of
//! the broadcaster slot. A peer that has not connected within the connect
//! timeout is closed and forgotten.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::error::{Error, Result};

type PeerMap = Arc<Mutex<HashMap<u64, Arc<RTCPeerConnection>>>>;

/// Default time an answered ingest peer gets to reach Connected
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side peers created by the ingest endpoint
pub struct IngestPeers {
    api: API,
    ice_servers: Vec<String>,
    gathering_timeout: Duration,
    connect_timeout: Duration,
    peers: PeerMap,
    next_id: AtomicU64,
}

impl IngestPeers {
    /// Build the WebRTC API with default codecs and interceptors
    pub fn new(ice_servers: Vec<String>, gathering_timeout: Duration) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            ice_servers,
            gathering_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            peers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        })
    }

    /// Set how long an answered peer may take to connect
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Number of live ingest peers
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    /// Whether no ingest peer is live
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Answer `offer`, waiting for ICE gathering to finish or time out
    pub async fn answer(&self, offer: RTCSessionDescription) -> Result<RTCSessionDescription> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pc = Arc::new(self.api.new_peer_connection(self.rtc_config()).await?);

        self.install_handlers(id, &pc);
        self.peers.lock().await.insert(id, Arc::clone(&pc));

        match self.negotiate(&pc, offer).await {
            Ok(answer) => {
                tracing::info!(ingest_id = id, "Broadcast stream started");
                self.watch_connect(id, pc);
                Ok(answer)
            }
            Err(e) => {
                self.peers.lock().await.remove(&id);
                if let Err(close_err) = pc.close().await {
                    tracing::debug!(ingest_id = id, error = %close_err, "Failed to close ingest peer");
                }
                Err(e)
            }
        }
    }

    /// Drop the peer if it is not connected once the connect timeout elapses
    fn watch_connect(&self, id: u64, pc: Arc<RTCPeerConnection>) {
        let peers = Arc::clone(&self.peers);
        let timeout = self.connect_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let state = pc.connection_state();
            if state == RTCPeerConnectionState::Connected {
                return;
            }
            if peers.lock().await.remove(&id).is_some() {
                tracing::warn!(
                    ingest_id = id,
                    state = %state,
                    timeout = ?timeout,
                    "Ingest peer never connected, closing"
                );
                if let Err(e) = pc.close().await {
                    tracing::debug!(ingest_id = id, error = %e, "Failed to close ingest peer");
                }
            }
        });
    }

    fn rtc_config(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }

    fn install_handlers(&self, id: u64, pc: &Arc<RTCPeerConnection>) {
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            tracing::info!(
                ingest_id = id,
                kind = %track.kind(),
                track_id = %track.id(),
                stream_id = %track.stream_id(),
                "Track received from broadcaster"
            );
            Box::pin(async {})
        }));

        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            match candidate {
                Some(c) => tracing::debug!(
                    ingest_id = id,
                    address = %c.address,
                    port = c.port,
                    "Ingest ICE candidate"
                ),
                None => tracing::debug!(ingest_id = id, "Ingest ICE gathering finished"),
            }
            Box::pin(async {})
        }));

        let peers = Arc::clone(&self.peers);
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            tracing::info!(ingest_id = id, state = %state, "Ingest connection state changed");
            let peers = Arc::clone(&peers);
            Box::pin(async move {
                if matches!(
                    state,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
                ) {
                    if let Some(pc) = peers.lock().await.remove(&id) {
                        // close() must not run inside the state callback
                        tokio::spawn(async move {
                            let _ = pc.close().await;
                        });
                    }
                }
            })
        }));
    }

    async fn negotiate(
        &self,
        pc: &Arc<RTCPeerConnection>,
        offer: RTCSessionDescription,
    ) -> Result<RTCSessionDescription> {
        pc.set_remote_description(offer).await?;
        let answer = pc.create_answer(None).await?;

        let mut gathering = pc.gathering_complete_promise().await;
        pc.set_local_description(answer).await?;

        if tokio::time::timeout(self.gathering_timeout, gathering.recv())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout = ?self.gathering_timeout,
                "ICE gathering incomplete, answering with candidates so far"
            );
        }

        pc.local_description()
            .await
            .ok_or_else(|| Error::WebRtc(webrtc::Error::new("no local description".to_owned())))
    }
}

impl std::fmt::Debug for IngestPeers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPeers")
            .field("ice_servers", &self.ice_servers)
            .field("gathering_timeout", &self.gathering_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}
