//! Local media acquisition and sharing
//!
//! Owns the single locally-acquired track set that every peer link
//! publishes, and the asynchronous provider seam it is acquired through.

mod error;
mod holder;
mod provider;
mod source;

pub use error::MediaError;
pub use holder::{AcquireState, MediaHolder};
pub use provider::{MediaProvider, StaticProvider};
pub use source::{LocalMedia, MediaConstraints};
