//! Per-peer link state

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;

use super::error::MeshError;
use super::state::NegotiationState;

/// One registered peer: the underlying connection plus negotiation bookkeeping
pub(crate) struct PeerLink {
    id: String,
    pc: Arc<RTCPeerConnection>,
    /// Sender handles for the local tracks attached at registration.
    /// Held so the tracks stay bound to the connection for the link's life.
    senders: Vec<Arc<RTCRtpSender>>,
    state: AtomicU8,
    /// Remote candidates that arrived before the remote description did
    pending_candidates: Mutex<Vec<RTCIceCandidateInit>>,
}

impl PeerLink {
    pub(crate) fn new(
        id: String,
        pc: Arc<RTCPeerConnection>,
        senders: Vec<Arc<RTCRtpSender>>,
    ) -> Self {
        Self {
            id,
            pc,
            senders,
            state: AtomicU8::new(NegotiationState::Registered as u8),
            pending_candidates: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn pc(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }

    pub(crate) fn sender_count(&self) -> usize {
        self.senders.len()
    }

    /// Current negotiation state
    pub(crate) fn state(&self) -> NegotiationState {
        NegotiationState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Unconditional state change, for edges that cannot be contested
    pub(crate) fn set_state(&self, state: NegotiationState) {
        let old = NegotiationState::from_u8(self.state.swap(state as u8, Ordering::SeqCst));
        if old != state {
            debug!("Peer {} negotiation state {:?} -> {:?}", self.id, old, state);
        }
    }

    /// Move from the expected state to the next one, rejecting anything else
    ///
    /// The swap is atomic, so two racing calls cannot both pass the gate.
    pub(crate) fn transition(
        &self,
        expected: NegotiationState,
        next: NegotiationState,
    ) -> Result<(), MeshError> {
        match self.state.compare_exchange(
            expected as u8,
            next as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                debug!(
                    "Peer {} negotiation state {:?} -> {:?}",
                    self.id, expected, next
                );
                Ok(())
            }
            Err(actual) => Err(MeshError::InvalidState {
                id: self.id.clone(),
                expected,
                actual: NegotiationState::from_u8(actual),
            }),
        }
    }

    /// Apply a remote candidate, or queue it until the remote description lands
    pub(crate) async fn add_remote_candidate(
        &self,
        candidate: RTCIceCandidateInit,
    ) -> Result<(), MeshError> {
        if self.pc.remote_description().await.is_none() {
            debug!(
                "Peer {} has no remote description yet, queuing candidate",
                self.id
            );
            self.pending_candidates.lock().push(candidate);

            // The description can land between the check above and the push,
            // and its drain would then run before the push and miss this
            // candidate. Re-check and drain it ourselves in that case.
            if self.pc.remote_description().await.is_some() {
                self.apply_pending_candidates().await;
            }
            return Ok(());
        }

        self.pc
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| MeshError::Negotiation {
                id: self.id.clone(),
                source: e,
            })
    }

    /// Drain candidates queued before the remote description was applied
    ///
    /// Individual failures are logged and skipped: one malformed candidate
    /// must not block the rest of the queue.
    pub(crate) async fn apply_pending_candidates(&self) {
        let pending: Vec<RTCIceCandidateInit> = {
            let mut queue = self.pending_candidates.lock();
            queue.drain(..).collect()
        };

        for candidate in pending {
            debug!("Peer {} applying queued candidate", self.id);
            if let Err(e) = self.pc.add_ice_candidate(candidate).await {
                warn!("Peer {} rejected queued candidate: {}", self.id, e);
            }
        }
    }

    /// Close the underlying connection
    pub(crate) async fn close(&self) -> Result<(), MeshError> {
        self.pc.close().await?;
        Ok(())
    }
}
