//! Holder for the shared local media source

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::error::MediaError;
use super::provider::MediaProvider;
use super::source::{LocalMedia, MediaConstraints};

/// Progress of the one-shot local media acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireState {
    /// The acquisition task is still running
    Pending,
    /// Local media is available
    Ready,
    /// The provider failed; holds the provider's error message
    Failed(String),
}

impl AcquireState {
    /// Check if acquisition finished successfully
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if acquisition finished with an error
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Owner of the local media shared across all peer links
///
/// Starts with an empty track set and is filled exactly once, when the
/// background acquisition task finishes. Reads are cheap snapshots; a peer
/// registered before acquisition completes simply sees no tracks. Await
/// [`MediaHolder::ready`] to guarantee tracks (or a surfaced failure)
/// before registering.
pub struct MediaHolder {
    current: RwLock<LocalMedia>,
    state_rx: watch::Receiver<AcquireState>,
}

impl MediaHolder {
    /// Start acquisition from the provider and return the holder tracking it
    pub(crate) fn spawn<P>(provider: P, constraints: MediaConstraints) -> Arc<Self>
    where
        P: MediaProvider + 'static,
    {
        let (state_tx, state_rx) = watch::channel(AcquireState::Pending);
        let holder = Arc::new(Self {
            current: RwLock::new(LocalMedia::empty()),
            state_rx,
        });

        let task_holder = holder.clone();
        tokio::spawn(async move {
            match provider.acquire(&constraints).await {
                Ok(media) => {
                    debug!(
                        "Local media acquired: stream {} with {} tracks",
                        media.stream_id(),
                        media.tracks().len()
                    );
                    // The snapshot must be in place before the state flips,
                    // so ready() always observes the tracks.
                    *task_holder.current.write() = media;
                    let _ = state_tx.send(AcquireState::Ready);
                }
                Err(e) => {
                    warn!("Local media acquisition failed: {}", e);
                    let _ = state_tx.send(AcquireState::Failed(e.to_string()));
                }
            }
        });

        holder
    }

    /// Snapshot of the current local media
    ///
    /// Empty until acquisition succeeds; unchanged forever after a failure.
    pub fn current(&self) -> LocalMedia {
        self.current.read().clone()
    }

    /// Current acquisition status
    pub fn status(&self) -> AcquireState {
        self.state_rx.borrow().clone()
    }

    /// Wait for acquisition to finish
    ///
    /// Resolves with the acquired media, or with the stored failure. Safe to
    /// call any number of times, from any task.
    pub async fn ready(&self) -> Result<LocalMedia, MediaError> {
        let mut rx = self.state_rx.clone();
        loop {
            let state = rx.borrow().clone();
            match state {
                AcquireState::Ready => return Ok(self.current()),
                AcquireState::Failed(msg) => return Err(MediaError::AcquisitionFailed(msg)),
                AcquireState::Pending => {}
            }

            if rx.changed().await.is_err() {
                // Acquisition task dropped its sender without reporting,
                // which only happens when the runtime is shutting down.
                return Err(MediaError::AcquisitionCancelled);
            }
        }
    }
}
