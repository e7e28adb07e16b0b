//! peermesh - Multi-peer WebRTC connection orchestration
//!
//! This library manages a set of WebRTC peer connections that share one
//! local media source, driving offer/answer negotiation per peer and
//! handing signaling traffic to the application through a single callback.

pub mod media;
pub mod peer;

pub use media::{LocalMedia, MediaConstraints, MediaProvider, StaticProvider};
pub use peer::{Mesh, MeshConfig, MeshError, SignalEvent};
