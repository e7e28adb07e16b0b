//! Media acquisition tests
//!
//! Tests for the background acquisition lifecycle: registering before media
//! is ready, waiting on readiness and surfacing provider failures.

use std::time::Duration;

use async_trait::async_trait;

use peermesh::media::{AcquireState, MediaError};
use peermesh::{LocalMedia, MediaConstraints, MediaProvider, Mesh, MeshConfig, StaticProvider};

/// Provider that takes a while, standing in for slow device startup
struct SlowProvider {
    delay: Duration,
}

#[async_trait]
impl MediaProvider for SlowProvider {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError> {
        tokio::time::sleep(self.delay).await;
        StaticProvider::from_constraints(constraints)
            .acquire(constraints)
            .await
    }
}

/// Provider whose device is unavailable
struct FailingProvider;

#[async_trait]
impl MediaProvider for FailingProvider {
    async fn acquire(&self, _constraints: &MediaConstraints) -> Result<LocalMedia, MediaError> {
        Err(MediaError::AcquisitionFailed(
            "device unavailable".to_string(),
        ))
    }
}

fn offline_config() -> MeshConfig {
    MeshConfig {
        ice_servers: Vec::new(),
        ..Default::default()
    }
}

/// Test: Registering before media is ready attaches no tracks
/// Given acquisition still in flight
/// When a peer is registered
/// Then its connection carries zero local tracks
/// And a peer registered after readiness carries them all
#[tokio::test]
async fn test_register_before_media_ready() {
    let provider = SlowProvider {
        delay: Duration::from_secs(1),
    };
    let mesh = Mesh::new(offline_config(), provider, |_| {});

    assert!(
        matches!(mesh.media().status(), AcquireState::Pending),
        "Acquisition should still be pending"
    );
    mesh.register("early")
        .await
        .expect("Registration must work during acquisition");
    assert_eq!(
        mesh.track_count("early")
            .await
            .expect("Failed to read track count"),
        0,
        "No tracks exist yet to attach"
    );

    let media = mesh.media().ready().await.expect("Failed to acquire media");
    assert_eq!(media.tracks().len(), 2, "Audio and video should be ready");

    mesh.register("late")
        .await
        .expect("Failed to register peer");
    assert_eq!(
        mesh.track_count("late")
            .await
            .expect("Failed to read track count"),
        2,
        "Tracks acquired by now should be attached"
    );
}

/// Test: Waiting on readiness returns the acquired media
#[tokio::test]
async fn test_ready_returns_media() {
    let config = offline_config();
    let provider = StaticProvider::from_constraints(&config.constraints);
    let mesh = Mesh::new(config, provider, |_| {});

    let media = mesh.media().ready().await.expect("Failed to acquire media");
    assert_eq!(media.tracks().len(), 2);
    assert!(media.stream_id().starts_with("stream-"));
    assert!(mesh.media().status().is_ready());
}

/// Test: A failing provider surfaces its error
/// Given a provider whose acquisition fails
/// Then waiting on readiness reports the failure
/// And the mesh stays usable with zero tracks
#[tokio::test]
async fn test_failed_acquisition_surfaces() {
    let mesh = Mesh::new(offline_config(), FailingProvider, |_| {});

    let err = mesh
        .media()
        .ready()
        .await
        .expect_err("Failure must reach the caller");
    assert!(
        matches!(err, MediaError::AcquisitionFailed(ref msg) if msg.contains("device unavailable")),
        "Original failure message should be preserved: {err}"
    );
    assert!(mesh.media().status().is_failed());

    // Connections still work, just without local tracks
    mesh.register("bob")
        .await
        .expect("Registration must survive media failure");
    assert_eq!(
        mesh.track_count("bob")
            .await
            .expect("Failed to read track count"),
        0
    );
}

/// Test: Audio-only constraints produce a single track
#[tokio::test]
async fn test_audio_only_constraints() {
    let constraints = MediaConstraints {
        audio: true,
        video: false,
    };
    let config = MeshConfig {
        ice_servers: Vec::new(),
        constraints,
    };
    let provider = StaticProvider::from_constraints(&constraints);
    let mesh = Mesh::new(config, provider, |_| {});

    let media = mesh.media().ready().await.expect("Failed to acquire media");
    assert_eq!(media.tracks().len(), 1, "Only the audio track should exist");

    mesh.register("bob").await.expect("Failed to register peer");
    assert_eq!(
        mesh.track_count("bob")
            .await
            .expect("Failed to read track count"),
        1
    );
}
