//! Outbound signaling events

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_remote::TrackRemote;

/// Callback invoked with every outbound signaling event
///
/// Called synchronously at the point the triggering negotiation step
/// completes. Keep it cheap: push into a channel and return.
pub type SignalCallback = Box<dyn Fn(SignalEvent) + Send + Sync + 'static>;

/// A remote media track surfaced by a peer link
#[derive(Clone)]
pub struct RemoteStream {
    /// Stream id announced by the remote peer
    pub stream_id: String,
    /// The remote track carrying the media
    pub track: Arc<TrackRemote>,
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStream")
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}

/// Events emitted toward the caller's signaling transport
///
/// The serializable variants are meant to be forwarded verbatim to the
/// remote peer named by `id`; the remote side feeds them back into its own
/// mesh. `NewTrack` is delivered locally only and refuses serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SignalEvent {
    /// A local network candidate for the remote peer to try
    #[serde(rename = "NEW_ICE_CANDIDATE")]
    NewIceCandidate {
        id: String,
        candidate: RTCIceCandidateInit,
    },

    /// The local session description offered to the remote peer
    #[serde(rename = "VIDEO_OFFER")]
    VideoOffer {
        id: String,
        sdp: RTCSessionDescription,
    },

    /// The local session description answering a remote offer
    #[serde(rename = "VIDEO_ANSWER")]
    VideoAnswer {
        id: String,
        sdp: RTCSessionDescription,
    },

    /// A remote media stream became available on a link
    #[serde(skip)]
    NewTrack { id: String, stream: RemoteStream },
}

impl SignalEvent {
    /// Peer id this event belongs to
    pub fn peer_id(&self) -> &str {
        match self {
            Self::NewIceCandidate { id, .. }
            | Self::VideoOffer { id, .. }
            | Self::VideoAnswer { id, .. }
            | Self::NewTrack { id, .. } => id,
        }
    }
}
