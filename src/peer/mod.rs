//! Peer connection management
//!
//! Registers peers by caller-chosen id, drives the offer/answer exchange for
//! each of them and surfaces everything the outside world needs (outbound
//! descriptions, network candidates, incoming tracks) through one callback.

mod error;
mod event;
mod link;
mod mesh;
mod state;

pub use error::MeshError;
pub use event::{RemoteStream, SignalCallback, SignalEvent};
pub use mesh::{IceServerConfig, Mesh, MeshConfig, DEFAULT_STUN_SERVERS};
pub use state::NegotiationState;
