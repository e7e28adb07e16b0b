//! Mesh error types

use thiserror::Error;

use super::state::NegotiationState;

/// Errors that can occur while orchestrating peer links
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Peer id already registered: {0}")]
    DuplicatePeer(String),

    #[error("Unknown peer id: {0}")]
    UnknownPeer(String),

    #[error("Peer {id} is {actual:?}, expected {expected:?}")]
    InvalidState {
        id: String,
        expected: NegotiationState,
        actual: NegotiationState,
    },

    #[error("Negotiation with peer {id} failed: {source}")]
    Negotiation {
        id: String,
        #[source]
        source: webrtc::Error,
    },

    #[error("Peer {0} has no local description after one was applied")]
    MissingLocalDescription(String),

    #[error("WebRTC error: {0}")]
    Rtc(#[from] webrtc::Error),
}
