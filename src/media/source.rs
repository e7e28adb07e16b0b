//! Local media track sets

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;
use webrtc::track::track_local::TrackLocal;

/// Which kinds of local media to acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Request an audio track
    pub audio: bool,
    /// Request a video track
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// A set of local tracks published to every peer link
///
/// All tracks share one stream id, so the remote side groups them into a
/// single media stream.
#[derive(Clone)]
pub struct LocalMedia {
    stream_id: String,
    tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl LocalMedia {
    /// A track set with a fresh stream id and no tracks
    ///
    /// This is what peer links see while acquisition is still running.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Wrap existing tracks under a fresh stream id
    pub fn new(tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        Self {
            stream_id: format!("stream-{}", Uuid::new_v4()),
            tracks,
        }
    }

    /// Wrap existing tracks under the given stream id
    pub fn with_stream_id(
        stream_id: String,
        tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Self {
        Self { stream_id, tracks }
    }

    /// Stream id shared by all tracks in this set
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// The tracks themselves
    pub fn tracks(&self) -> &[Arc<dyn TrackLocal + Send + Sync>] {
        &self.tracks
    }

    /// Whether the set holds no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMedia")
            .field("stream_id", &self.stream_id)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}
