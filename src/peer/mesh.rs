//! Multi-peer connection orchestration
//!
//! One `Mesh` owns any number of independently negotiated peer links, all
//! publishing the same local media. Outbound negotiation traffic leaves
//! through the signal callback; inbound traffic enters through the
//! `accept_*` methods.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use crate::media::{MediaConstraints, MediaHolder, MediaProvider};

use super::error::MeshError;
use super::event::{RemoteStream, SignalCallback, SignalEvent};
use super::link::PeerLink;
use super::state::NegotiationState;

/// Default STUN servers used when no ICE servers are configured explicitly
pub const DEFAULT_STUN_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

/// A single STUN or TURN server entry
#[derive(Debug, Clone, Default)]
pub struct IceServerConfig {
    /// Server URLs, e.g. `stun:stun.l.google.com:19302`
    pub urls: Vec<String>,
    /// TURN username (leave empty for STUN)
    pub username: String,
    /// TURN credential (leave empty for STUN)
    pub credential: String,
}

impl IceServerConfig {
    fn to_rtc(&self) -> RTCIceServer {
        RTCIceServer {
            urls: self.urls.clone(),
            username: self.username.clone(),
            credential: self.credential.clone(),
        }
    }
}

/// Mesh configuration
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// ICE servers handed to every created peer connection
    pub ice_servers: Vec<IceServerConfig>,
    /// Local media to acquire at startup
    pub constraints: MediaConstraints,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }],
            constraints: MediaConstraints::default(),
        }
    }
}

/// A set of independently negotiated peer links sharing one local media source
///
/// Peer ids are opaque caller-chosen strings, unique for the life of the
/// mesh. Every link walks the description exchange on its own; a failure on
/// one link never touches the others.
pub struct Mesh {
    links: Arc<RwLock<HashMap<String, Arc<PeerLink>>>>,
    media: Arc<MediaHolder>,
    on_signal: Arc<SignalCallback>,
    config: MeshConfig,
}

impl Mesh {
    /// Create a mesh and start acquiring local media in the background
    ///
    /// Must be called from within a tokio runtime: acquisition runs in a
    /// spawned task. Registering before acquisition finishes is allowed and
    /// attaches no tracks in that window; await [`MediaHolder::ready`] first
    /// when tracks are required from the start.
    pub fn new<P, F>(config: MeshConfig, provider: P, on_signal: F) -> Self
    where
        P: MediaProvider + 'static,
        F: Fn(SignalEvent) + Send + Sync + 'static,
    {
        let media = MediaHolder::spawn(provider, config.constraints);

        Self {
            links: Arc::new(RwLock::new(HashMap::new())),
            media,
            on_signal: Arc::new(Box::new(on_signal)),
            config,
        }
    }

    /// The shared local media holder
    pub fn media(&self) -> &MediaHolder {
        &self.media
    }

    /// Register a peer id and create its link
    ///
    /// Builds the underlying connection, installs its event handlers and
    /// attaches the currently held local tracks. Emits no signaling event
    /// itself; events start flowing once negotiation begins.
    pub async fn register(&self, id: &str) -> Result<(), MeshError> {
        {
            let links = self.links.read().await;
            if links.contains_key(id) {
                return Err(MeshError::DuplicatePeer(id.to_string()));
            }
        }

        let pc = self.new_peer_connection().await?;
        self.install_handlers(id, &pc);

        let media = self.media.current();
        let mut senders = Vec::with_capacity(media.tracks().len());
        for track in media.tracks() {
            match pc.add_track(Arc::clone(track)).await {
                Ok(sender) => senders.push(sender),
                Err(e) => {
                    if let Err(close_err) = pc.close().await {
                        warn!("Failed to close link to peer {}: {}", id, close_err);
                    }
                    return Err(MeshError::Negotiation {
                        id: id.to_string(),
                        source: e,
                    });
                }
            }
        }

        let track_count = senders.len();
        let link = Arc::new(PeerLink::new(id.to_string(), pc, senders));

        {
            let mut links = self.links.write().await;
            if links.contains_key(id) {
                // Lost a registration race for the same id
                drop(links);
                if let Err(e) = link.close().await {
                    warn!("Failed to close link to peer {}: {}", id, e);
                }
                return Err(MeshError::DuplicatePeer(id.to_string()));
            }
            links.insert(id.to_string(), link);
        }

        info!("Registered peer {} with {} local tracks", id, track_count);
        Ok(())
    }

    /// Remove a peer link and close its connection
    ///
    /// The id becomes free for registration again.
    pub async fn unregister(&self, id: &str) -> Result<(), MeshError> {
        let link = {
            let mut links = self.links.write().await;
            links
                .remove(id)
                .ok_or_else(|| MeshError::UnknownPeer(id.to_string()))?
        };

        link.close().await?;
        info!("Unregistered peer {}", id);
        Ok(())
    }

    /// Close every remaining peer link
    ///
    /// Call before dropping the mesh; closing releases the handler closures
    /// each connection holds.
    pub async fn shutdown(&self) {
        let links: Vec<Arc<PeerLink>> = {
            let mut map = self.links.write().await;
            map.drain().map(|(_, link)| link).collect()
        };

        for link in &links {
            if let Err(e) = link.close().await {
                warn!("Failed to close link to peer {}: {}", link.id(), e);
            }
        }

        if !links.is_empty() {
            info!("Closed {} peer links", links.len());
        }
    }

    /// Start negotiation with a registered peer by emitting a local offer
    ///
    /// Emits exactly one `VideoOffer` event carrying the description the
    /// connection actually applied. On failure the link returns to its
    /// previous state and stays usable.
    pub async fn initiate_offer(&self, id: &str) -> Result<(), MeshError> {
        let link = self.link(id).await?;
        link.transition(NegotiationState::Registered, NegotiationState::OfferSent)?;

        match self.send_offer(&link).await {
            Ok(()) => Ok(()),
            Err(e) => {
                link.set_state(NegotiationState::Registered);
                Err(e)
            }
        }
    }

    /// Apply a remote offer and reply with a local answer
    ///
    /// Emits exactly one `VideoAnswer` event; once it returns, the link is
    /// negotiated from this side's point of view. Candidates queued before
    /// the offer arrived are applied as part of this call.
    pub async fn accept_offer(
        &self,
        id: &str,
        sdp: RTCSessionDescription,
    ) -> Result<(), MeshError> {
        let link = self.link(id).await?;
        link.transition(NegotiationState::Registered, NegotiationState::AnswerSent)?;

        match self.send_answer(&link, sdp).await {
            Ok(()) => {
                link.set_state(NegotiationState::Negotiated);
                Ok(())
            }
            Err(e) => {
                link.set_state(NegotiationState::Registered);
                Err(e)
            }
        }
    }

    /// Apply the remote answer to an offer this mesh initiated
    ///
    /// Valid only while the link is awaiting an answer; the link reports
    /// `Negotiated` only once the answer has been applied. Emits nothing.
    pub async fn accept_answer(
        &self,
        id: &str,
        sdp: RTCSessionDescription,
    ) -> Result<(), MeshError> {
        let link = self.link(id).await?;

        let state = link.state();
        if state != NegotiationState::OfferSent {
            return Err(MeshError::InvalidState {
                id: id.to_string(),
                expected: NegotiationState::OfferSent,
                actual: state,
            });
        }

        link.pc()
            .set_remote_description(sdp)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: id.to_string(),
                source: e,
            })?;
        link.apply_pending_candidates().await;

        // Commit after the apply: state readers never see Negotiated while
        // the answer is in flight, and a failed apply leaves the link still
        // awaiting one. A racing duplicate loses here and is rejected.
        link.transition(NegotiationState::OfferSent, NegotiationState::Negotiated)?;
        debug!("Peer {} negotiated", id);
        Ok(())
    }

    /// Apply a remote network candidate for a registered peer
    ///
    /// Valid any time after registration, any number of times. Candidates
    /// arriving before the remote description are queued and applied right
    /// after it lands. Never emits a signaling event.
    pub async fn accept_remote_candidate(
        &self,
        id: &str,
        candidate: RTCIceCandidateInit,
    ) -> Result<(), MeshError> {
        let link = self.link(id).await?;
        link.add_remote_candidate(candidate).await
    }

    /// Ids of all registered peers
    pub async fn peer_ids(&self) -> Vec<String> {
        let links = self.links.read().await;
        links.keys().cloned().collect()
    }

    /// Whether a peer id is registered
    pub async fn contains(&self, id: &str) -> bool {
        let links = self.links.read().await;
        links.contains_key(id)
    }

    /// Number of registered peers
    pub async fn len(&self) -> usize {
        let links = self.links.read().await;
        links.len()
    }

    /// Whether no peers are registered
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Negotiation state of a registered peer
    pub async fn negotiation_state(&self, id: &str) -> Result<NegotiationState, MeshError> {
        let link = self.link(id).await?;
        Ok(link.state())
    }

    /// Number of local tracks attached to a registered peer's connection
    ///
    /// Zero when the peer was registered before media acquisition finished.
    pub async fn track_count(&self, id: &str) -> Result<usize, MeshError> {
        let link = self.link(id).await?;
        Ok(link.sender_count())
    }

    async fn link(&self, id: &str) -> Result<Arc<PeerLink>, MeshError> {
        let links = self.links.read().await;
        links
            .get(id)
            .cloned()
            .ok_or_else(|| MeshError::UnknownPeer(id.to_string()))
    }

    async fn new_peer_connection(&self) -> Result<Arc<RTCPeerConnection>, MeshError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Default::default(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers: Vec<RTCIceServer> = self
            .config
            .ice_servers
            .iter()
            .map(IceServerConfig::to_rtc)
            .collect();

        let pc = api
            .new_peer_connection(RTCConfiguration {
                ice_servers,
                ..Default::default()
            })
            .await?;

        Ok(Arc::new(pc))
    }

    /// Wire the connection's events to the signal callback
    fn install_handlers(&self, id: &str, pc: &Arc<RTCPeerConnection>) {
        let on_signal = Arc::clone(&self.on_signal);
        let peer_id = id.to_string();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let on_signal = Arc::clone(&on_signal);
            let peer_id = peer_id.clone();

            Box::pin(async move {
                if let Some(candidate) = candidate {
                    match candidate.to_json() {
                        Ok(init) if init.candidate.is_empty() => {
                            debug!("Peer {} produced an empty candidate, skipping", peer_id);
                        }
                        Ok(init) => {
                            on_signal(SignalEvent::NewIceCandidate {
                                id: peer_id,
                                candidate: init,
                            });
                        }
                        Err(e) => {
                            warn!("Failed to serialize candidate for peer {}: {}", peer_id, e);
                        }
                    }
                } else {
                    // End-of-gathering marker; the remote side needs no event
                    debug!("Peer {} finished gathering candidates", peer_id);
                }
            })
        }));

        let on_signal = Arc::clone(&self.on_signal);
        let peer_id = id.to_string();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let on_signal = Arc::clone(&on_signal);
                let peer_id = peer_id.clone();

                Box::pin(async move {
                    let stream = RemoteStream {
                        stream_id: track.stream_id(),
                        track,
                    };
                    info!(
                        "Remote track from peer {} (stream {})",
                        peer_id, stream.stream_id
                    );
                    on_signal(SignalEvent::NewTrack {
                        id: peer_id,
                        stream,
                    });
                })
            },
        ));

        let peer_id = id.to_string();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            debug!("Peer {} connection state: {}", peer_id, state);
            Box::pin(async {})
        }));
    }

    async fn send_offer(&self, link: &PeerLink) -> Result<(), MeshError> {
        let id = link.id().to_string();
        let pc = link.pc();

        let offer = pc
            .create_offer(None)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: id.clone(),
                source: e,
            })?;

        pc.set_local_description(offer)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: id.clone(),
                source: e,
            })?;

        // Read the description back so the emitted offer is the one the
        // connection actually applied.
        let local = pc
            .local_description()
            .await
            .ok_or_else(|| MeshError::MissingLocalDescription(id.clone()))?;

        debug!("Emitting offer for peer {}", id);
        (self.on_signal)(SignalEvent::VideoOffer { id, sdp: local });
        Ok(())
    }

    async fn send_answer(
        &self,
        link: &PeerLink,
        offer: RTCSessionDescription,
    ) -> Result<(), MeshError> {
        let id = link.id().to_string();
        let pc = link.pc();

        pc.set_remote_description(offer)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: id.clone(),
                source: e,
            })?;
        link.apply_pending_candidates().await;

        let answer = pc
            .create_answer(None)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: id.clone(),
                source: e,
            })?;

        pc.set_local_description(answer)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: id.clone(),
                source: e,
            })?;

        let local = pc
            .local_description()
            .await
            .ok_or_else(|| MeshError::MissingLocalDescription(id.clone()))?;

        debug!("Emitting answer for peer {}", id);
        (self.on_signal)(SignalEvent::VideoAnswer { id, sdp: local });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StaticProvider;

    fn offline_mesh() -> Mesh {
        let config = MeshConfig {
            ice_servers: Vec::new(),
            constraints: MediaConstraints::default(),
        };
        let provider = StaticProvider::from_constraints(&config.constraints);
        Mesh::new(config, provider, |_| {})
    }

    #[test]
    fn test_default_config() {
        let config = MeshConfig::default();
        assert_eq!(config.ice_servers.len(), 1);
        assert!(
            config.ice_servers[0].urls[0].starts_with("stun:"),
            "Default servers should be STUN urls"
        );
        assert!(config.constraints.audio);
        assert!(config.constraints.video);
    }

    #[test]
    fn test_ice_server_mapping() {
        let entry = IceServerConfig {
            urls: vec!["turn:turn.example.net:3478".to_string()],
            username: "user".to_string(),
            credential: "secret".to_string(),
        };

        let server = entry.to_rtc();
        assert_eq!(server.urls, entry.urls);
        assert_eq!(server.username, "user");
        assert_eq!(server.credential, "secret");
    }

    #[tokio::test]
    async fn test_mesh_starts_empty() {
        let mesh = offline_mesh();
        assert!(mesh.is_empty().await);
        assert!(mesh.peer_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_peer_rejected() {
        let mesh = offline_mesh();

        let err = mesh
            .initiate_offer("nobody")
            .await
            .expect_err("Offer to an unknown id must fail");
        assert!(matches!(err, MeshError::UnknownPeer(ref id) if id == "nobody"));
    }
}
