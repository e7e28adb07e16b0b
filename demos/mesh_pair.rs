//! Two meshes negotiating over an in-process signaling channel
//!
//! Run with:
//!   cargo run --example mesh_pair
//!
//! Each mesh's signal events are routed straight into the other mesh, the
//! way a signaling service would relay them between browsers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use peermesh::peer::NegotiationState;
use peermesh::{Mesh, MeshConfig, SignalEvent, StaticProvider};

fn setup_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Deliver one mesh's outbound events to its counterpart
///
/// `remote_label` is the id the counterpart registered the sender under.
async fn route(
    mut rx: UnboundedReceiver<SignalEvent>,
    remote: Arc<Mesh>,
    remote_label: &'static str,
) {
    while let Some(event) = rx.recv().await {
        let result = match event {
            SignalEvent::VideoOffer { sdp, .. } => remote.accept_offer(remote_label, sdp).await,
            SignalEvent::VideoAnswer { sdp, .. } => remote.accept_answer(remote_label, sdp).await,
            SignalEvent::NewIceCandidate { candidate, .. } => {
                remote.accept_remote_candidate(remote_label, candidate).await
            }
            SignalEvent::NewTrack { id, stream } => {
                info!("Incoming track from {} on stream {}", id, stream.stream_id);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("Relay to {} failed: {}", remote_label, e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    // Host candidates are enough inside one process, no STUN required
    let config = MeshConfig {
        ice_servers: Vec::new(),
        ..Default::default()
    };

    let (alice_tx, alice_rx) = mpsc::unbounded_channel();
    let alice = Arc::new(Mesh::new(
        config.clone(),
        StaticProvider::from_constraints(&config.constraints),
        move |event| {
            let _ = alice_tx.send(event);
        },
    ));

    let (bob_tx, bob_rx) = mpsc::unbounded_channel();
    let bob = Arc::new(Mesh::new(
        config.clone(),
        StaticProvider::from_constraints(&config.constraints),
        move |event| {
            let _ = bob_tx.send(event);
        },
    ));

    alice.media().ready().await?;
    bob.media().ready().await?;

    tokio::spawn(route(alice_rx, Arc::clone(&bob), "alice"));
    tokio::spawn(route(bob_rx, Arc::clone(&alice), "bob"));

    alice.register("bob").await?;
    bob.register("alice").await?;

    info!("Alice calls Bob");
    alice.initiate_offer("bob").await?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let alice_state = alice.negotiation_state("bob").await?;
        let bob_state = bob.negotiation_state("alice").await?;
        if alice_state == NegotiationState::Negotiated && bob_state == NegotiationState::Negotiated
        {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("Negotiation did not finish: alice={alice_state:?} bob={bob_state:?}");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    info!("Both sides negotiated");

    alice.shutdown().await;
    bob.shutdown().await;
    Ok(())
}
