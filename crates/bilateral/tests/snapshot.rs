//! Persisting channel snapshots and resuming from them.

use std::fs;
use std::time::Duration;

use bilateral::sync::{MemoryNetwork, MemoryTransport};
use bilateral::{Channel, Keypair, Node, NodeConfig, NodeError, NodeId, Peer, SyncConfig};

async fn node(
    network: &std::sync::Arc<MemoryNetwork>,
    party: &str,
    keypair: &Keypair,
    peer_party: &str,
    peer_key: &Keypair,
) -> Node<MemoryTransport> {
    let node = Node::new(
        keypair.clone(),
        network
            .create_transport(NodeId::from_public_key(&keypair.public_key()))
            .await,
        NodeConfig::new(party).with_sync(SyncConfig {
            ack_timeout: Duration::from_secs(5),
        }),
    );
    node.register_peer(
        peer_party,
        Peer {
            node_id: NodeId::from_public_key(&peer_key.public_key()),
            public_key: peer_key.public_key(),
        },
    )
    .await;
    node
}

#[tokio::test]
async fn test_snapshot_survives_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("C1.json");

    let network = MemoryNetwork::new();
    let ka = Keypair::from_seed(&[0xA1; 32]);
    let kb = Keypair::from_seed(&[0xB2; 32]);
    let alice = node(&network, "alice", &ka, "bob", &kb).await;
    let bob = node(&network, "bob", &kb, "alice", &ka).await;

    alice.open_channel("C1", "bob").await?;
    bob.open_channel("C1", "alice").await?;
    let (sent, served) = tokio::join!(bob.transfer("C1", "USD", 25), alice.serve_one());
    sent?;
    served?;

    let snapshot = alice.channel_snapshot("C1").await?;
    fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)?;
    drop(alice);

    // same network id, fresh node
    let alice = node(&network, "alice", &ka, "bob", &kb).await;
    let restored: Channel = serde_json::from_slice(&fs::read(&path)?)?;
    assert_eq!(restored, snapshot);
    alice.restore_channel(restored).await?;

    let (sent, served) = tokio::join!(alice.transfer("C1", "USD", 5), bob.serve_one());
    assert_eq!(sent?, 2);
    served?;
    assert_eq!(alice.channel_snapshot("C1").await?.balance("USD"), 20);
    Ok(())
}

#[tokio::test]
async fn test_placeholder_snapshot_cannot_transfer() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let ka = Keypair::from_seed(&[0xA1; 32]);
    let kb = Keypair::from_seed(&[0xB2; 32]);
    let alice = node(&network, "alice", &ka, "bob", &kb).await;

    let placeholder: Channel =
        serde_json::from_str(r#"{ "id": "C1", "counterparty": "bob" }"#)?;
    alice.restore_channel(placeholder).await?;

    assert!(matches!(
        alice.transfer("C1", "USD", 1).await,
        Err(NodeError::Sync(bilateral::sync::SyncError::Tracker(
            bilateral::TrackerError::ChannelNotInitialized(_)
        )))
    ));
    Ok(())
}
