//! End-to-end exchange between two nodes over the memory transport.

use std::time::Duration;

use bilateral::sync::{MemoryNetwork, MemoryTransport, RejectCode, SyncError};
use bilateral::{
    Event, Keypair, Node, NodeConfig, NodeError, NodeId, PartyId, Peer, SyncConfig, Transfer,
};

async fn pair() -> (Node<MemoryTransport>, Node<MemoryTransport>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let network = MemoryNetwork::new();
    let ka = Keypair::from_seed(&[0xA1; 32]);
    let kb = Keypair::from_seed(&[0xB2; 32]);
    let peer_a = Peer {
        node_id: NodeId::from_public_key(&ka.public_key()),
        public_key: ka.public_key(),
    };
    let peer_b = Peer {
        node_id: NodeId::from_public_key(&kb.public_key()),
        public_key: kb.public_key(),
    };
    let sync = SyncConfig {
        ack_timeout: Duration::from_secs(5),
    };

    let alice = Node::new(
        ka,
        network.create_transport(peer_a.node_id).await,
        NodeConfig::new("alice").with_sync(sync.clone()),
    );
    let bob = Node::new(
        kb,
        network.create_transport(peer_b.node_id).await,
        NodeConfig::new("bob").with_sync(sync),
    );
    alice.register_peer("bob", peer_b).await;
    bob.register_peer("alice", peer_a).await;
    (alice, bob)
}

#[tokio::test]
async fn test_end_to_end_scenario() -> anyhow::Result<()> {
    let (alice, bob) = pair().await;
    let seed_a = alice.open_channel("C1", "bob").await?;
    let seed_b = bob.open_channel("C1", "alice").await?;
    assert_eq!(seed_a, seed_b);

    let (sent, served) = tokio::join!(alice.transfer("C1", "USD", 100), bob.serve_one());
    assert_eq!(sent?, 1);
    assert!(matches!(served?, Event::Received { seq: 1, .. }));

    let (sent, served) = tokio::join!(bob.transfer("C1", "USD", 50), alice.serve_one());
    assert_eq!(sent?, 2);
    assert!(matches!(served?, Event::Received { seq: 2, .. }));

    let a = alice.channel_snapshot("C1").await?;
    let b = bob.channel_snapshot("C1").await?;
    assert_eq!(a.seq_number(), 2);
    assert_eq!(a.balance("USD"), -50);
    assert_eq!(b.balance("USD"), 50);
    assert_eq!(a.chain_hash(), b.chain_hash());
    assert!(a.receipt(2).is_some());
    assert!(b.receipt(1).is_some());

    let expected = vec![Transfer {
        sender: PartyId::from("alice"),
        receiver: PartyId::from("bob"),
        asset_type: "USD".into(),
        amount: 50,
    }];
    assert_eq!(alice.net("C1").await?, expected);
    assert_eq!(bob.net("C1").await?, expected);

    assert!(alice.check_convergence(&b).await?.is_converged());
    Ok(())
}

#[tokio::test]
async fn test_multiple_assets_net_independently() -> anyhow::Result<()> {
    let (alice, bob) = pair().await;
    alice.open_channel("C1", "bob").await?;
    bob.open_channel("C1", "alice").await?;

    for (asset, amount) in [("USD", 30), ("EUR", 7), ("USD", 10)] {
        let (sent, served) = tokio::join!(alice.transfer("C1", asset, amount), bob.serve_one());
        sent?;
        served?;
    }
    let (sent, served) = tokio::join!(bob.transfer("C1", "EUR", 7), alice.serve_one());
    sent?;
    served?;

    let net = bob.net("C1").await?;
    assert_eq!(net.len(), 1);
    assert_eq!(net[0].asset_type, "USD");
    assert_eq!(net[0].amount, 40);
    assert_eq!(net[0].sender, PartyId::from("alice"));
    Ok(())
}

#[tokio::test]
async fn test_transfer_to_unopened_channel_is_rejected() -> anyhow::Result<()> {
    let (alice, bob) = pair().await;
    alice.open_channel("C1", "bob").await?;

    let (sent, served) = tokio::join!(alice.transfer("C1", "USD", 1), bob.serve_one());
    assert!(matches!(
        sent,
        Err(NodeError::Sync(SyncError::Rejected {
            code: RejectCode::ChannelNotFound,
            ..
        }))
    ));
    assert!(matches!(served?, Event::Refused { .. }));
    Ok(())
}

#[tokio::test]
async fn test_close_refused_while_transfer_pending() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let ka = Keypair::from_seed(&[1; 32]);
    let kb = Keypair::from_seed(&[2; 32]);
    let alice = Node::new(
        ka.clone(),
        network
            .create_transport(NodeId::from_public_key(&ka.public_key()))
            .await,
        NodeConfig::new("alice").with_sync(SyncConfig {
            ack_timeout: Duration::from_millis(20),
        }),
    );
    let _bob_transport = network
        .create_transport(NodeId::from_public_key(&kb.public_key()))
        .await;
    alice
        .register_peer(
            "bob",
            Peer {
                node_id: NodeId::from_public_key(&kb.public_key()),
                public_key: kb.public_key(),
            },
        )
        .await;
    alice.open_channel("C1", "bob").await?;

    // nobody serves bob's side
    assert!(matches!(
        alice.transfer("C1", "USD", 1).await,
        Err(NodeError::Sync(SyncError::Timeout(_)))
    ));
    assert!(matches!(
        alice.close_channel("C1").await,
        Err(NodeError::Sync(SyncError::TransferOutstanding { seq: 1, .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn test_close_returns_final_state() -> anyhow::Result<()> {
    let (alice, bob) = pair().await;
    alice.open_channel("C1", "bob").await?;
    bob.open_channel("C1", "alice").await?;
    let (sent, served) = tokio::join!(alice.transfer("C1", "USD", 9), bob.serve_one());
    sent?;
    served?;

    let closed = alice.close_channel("C1").await?.expect("channel was open");
    assert_eq!(closed.balance("USD"), -9);
    assert!(alice.close_channel("C1").await?.is_none());
    assert!(matches!(
        alice.net("C1").await,
        Err(NodeError::Tracker(_))
    ));
    Ok(())
}
