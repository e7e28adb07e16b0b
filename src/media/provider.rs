//! Media acquisition seam

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use super::error::MediaError;
use super::source::{LocalMedia, MediaConstraints};

/// Source of local media tracks
///
/// Implementations own device access, permission prompts, and whatever else
/// producing tracks requires. `acquire` is called exactly once per mesh,
/// at construction time.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Produce the local track set for the given constraints
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError>;
}

/// Provider serving a track set fixed at construction time
///
/// Useful when the application builds its own tracks and feeds samples into
/// them directly, and as the no-hardware provider in tests.
pub struct StaticProvider {
    media: LocalMedia,
}

impl StaticProvider {
    /// Serve exactly the given media, ignoring acquisition constraints
    pub fn new(media: LocalMedia) -> Self {
        Self { media }
    }

    /// Synthesize placeholder Opus/VP8 sample tracks matching the constraints
    ///
    /// The tracks carry no samples until the caller writes some; they exist
    /// so negotiated sessions advertise the expected media sections.
    pub fn from_constraints(constraints: &MediaConstraints) -> Self {
        // Tracks embed the stream id they announce on the wire, so the set's
        // id has to be decided before the tracks are built.
        let stream_id = format!("stream-{}", Uuid::new_v4());

        let mut tracks: Vec<Arc<dyn TrackLocal + Send + Sync>> = Vec::new();
        if constraints.audio {
            tracks.push(audio_track(&stream_id));
        }
        if constraints.video {
            tracks.push(video_track(&stream_id));
        }

        Self {
            media: LocalMedia::with_stream_id(stream_id, tracks),
        }
    }
}

#[async_trait]
impl MediaProvider for StaticProvider {
    async fn acquire(&self, _constraints: &MediaConstraints) -> Result<LocalMedia, MediaError> {
        Ok(self.media.clone())
    }
}

/// Opus sample track with the standard 48kHz stereo capability
fn audio_track(stream_id: &str) -> Arc<dyn TrackLocal + Send + Sync> {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: "audio/opus".to_string(),
            clock_rate: 48000,
            channels: 2,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
        "audio".to_string(),
        stream_id.to_string(),
    ))
}

/// VP8 sample track with the standard 90kHz video clock
fn video_track(stream_id: &str) -> Arc<dyn TrackLocal + Send + Sync> {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: "video/VP8".to_string(),
            clock_rate: 90000,
            channels: 0,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
        "video".to_string(),
        stream_id.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_serves_fixed_media() {
        let provider = StaticProvider::from_constraints(&MediaConstraints::default());
        let media = provider
            .acquire(&MediaConstraints::default())
            .await
            .expect("Acquisition should not fail");

        assert_eq!(media.tracks().len(), 2, "Audio and video tracks expected");
    }

    #[tokio::test]
    async fn test_constraints_select_tracks() {
        let audio_only = MediaConstraints {
            audio: true,
            video: false,
        };
        let provider = StaticProvider::from_constraints(&audio_only);
        let media = provider
            .acquire(&audio_only)
            .await
            .expect("Acquisition should not fail");

        assert_eq!(media.tracks().len(), 1);
    }

    #[tokio::test]
    async fn test_no_constraints_means_no_tracks() {
        let none = MediaConstraints {
            audio: false,
            video: false,
        };
        let provider = StaticProvider::from_constraints(&none);
        let media = provider
            .acquire(&none)
            .await
            .expect("Acquisition should not fail");

        assert!(media.is_empty());
    }
}
