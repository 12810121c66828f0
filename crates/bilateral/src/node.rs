//! The Node: one party's view of all its bilateral channels.
//!
//! A node pairs a [`Tracker`] with an [`Exchange`], so that every transfer
//! it makes is announced to the counterparty and acknowledged before the
//! next one on the same channel.

use std::collections::HashMap;

use bilateral_core::{ChainHash, Channel, ChannelId, Keypair, PartyId, PublicKey, Transfer};
use bilateral_sync::{
    verify_convergence, ConvergenceResult, Event, Exchange, NodeId, SyncConfig, SyncError,
    Transport,
};
use bilateral_tracker::{Tracker, TrackerError};
use tokio::sync::Mutex;

use crate::error::{NodeError, Result};

/// Configuration for a node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// The local party.
    pub party: PartyId,
    /// Sync configuration.
    pub sync: SyncConfig,
    /// Refuse to close a channel whose history does not verify.
    pub verify_history_on_close: bool,
}

impl NodeConfig {
    pub fn new(party: impl Into<PartyId>) -> Self {
        Self {
            party: party.into(),
            sync: SyncConfig::default(),
            verify_history_on_close: true,
        }
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}

/// How to reach and authenticate a counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub node_id: NodeId,
    pub public_key: PublicKey,
}

struct NodeState<T: Transport> {
    tracker: Tracker,
    exchange: Exchange<T>,
    peers: HashMap<PartyId, Peer>,
}

/// The main Node struct.
///
/// All operations take `&self`; state lives behind one async mutex. A
/// `transfer` holds it until the acknowledgment arrives, so the node serves
/// nothing else meanwhile except messages picked up by that transfer.
pub struct Node<T: Transport> {
    config: NodeConfig,
    node_id: NodeId,
    public_key: PublicKey,
    state: Mutex<NodeState<T>>,
}

impl<T: Transport> Node<T> {
    /// Create a node. Peers address it by `transport.local_node_id()`.
    pub fn new(keypair: Keypair, transport: T, config: NodeConfig) -> Self {
        let node_id = transport.local_node_id();
        let public_key = keypair.public_key();
        let exchange = Exchange::new(transport, keypair, config.sync.clone());
        Self {
            node_id,
            public_key,
            state: Mutex::new(NodeState {
                tracker: Tracker::new(config.party.clone()),
                exchange,
                peers: HashMap::new(),
            }),
            config,
        }
    }

    pub fn party(&self) -> &PartyId {
        &self.config.party
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Peers
    // ─────────────────────────────────────────────────────────────────────────

    /// Register how to reach a counterparty. Replaces a previous entry.
    pub async fn register_peer(&self, party: impl Into<PartyId>, peer: Peer) {
        let party = party.into();
        tracing::debug!(peer = %party, "registered peer");
        self.state.lock().await.peers.insert(party, peer);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Channels
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a channel with a registered counterparty. Returns its seed.
    pub async fn open_channel(
        &self,
        id: impl Into<ChannelId>,
        counterparty: impl Into<PartyId>,
    ) -> Result<ChainHash> {
        let id = id.into();
        let counterparty = counterparty.into();
        let mut state = self.state.lock().await;
        let peer = Self::peer(&state, &counterparty)?;

        let seed = state.tracker.open(id.clone(), counterparty)?.chain_hash();
        state.exchange.attach(id, peer.node_id, peer.public_key);
        Ok(seed)
    }

    /// Send value over a channel and wait for the counterparty's ack.
    pub async fn transfer(&self, id: &str, asset_type: &str, amount: u64) -> Result<u64> {
        let mut state = self.state.lock().await;
        let NodeState {
            tracker, exchange, ..
        } = &mut *state;
        Ok(exchange.transfer(tracker, id, asset_type, amount).await?)
    }

    /// Handle the next incoming protocol message.
    pub async fn serve_one(&self) -> Result<Event> {
        let mut state = self.state.lock().await;
        let NodeState {
            tracker, exchange, ..
        } = &mut *state;
        Ok(exchange.serve_one(tracker).await?)
    }

    /// Settlement instructions for a channel.
    pub async fn net(&self, id: &str) -> Result<Vec<Transfer>> {
        Ok(self.state.lock().await.tracker.net(id)?)
    }

    /// A copy of a channel, suitable for persisting.
    pub async fn channel_snapshot(&self, id: &str) -> Result<Channel> {
        self.state
            .lock()
            .await
            .tracker
            .channel(id)
            .cloned()
            .ok_or_else(|| TrackerError::ChannelNotFound(id.into()).into())
    }

    /// Re-insert a persisted channel and resume serving it.
    pub async fn restore_channel(&self, channel: Channel) -> Result<()> {
        let mut state = self.state.lock().await;
        let peer = Self::peer(&state, channel.counterparty())?;
        let id = channel.id().clone();

        state.tracker.restore(channel)?;
        state.exchange.attach(id, peer.node_id, peer.public_key);
        Ok(())
    }

    /// Close a channel and hand back its final state.
    ///
    /// Closing an absent channel is a no-op. A channel with an
    /// unacknowledged transfer stays open.
    pub async fn close_channel(&self, id: &str) -> Result<Option<Channel>> {
        let mut state = self.state.lock().await;
        if !state.tracker.contains(id) {
            return Ok(None);
        }

        if let Some(pending) = state.exchange.session(id).and_then(|s| s.pending()) {
            return Err(SyncError::TransferOutstanding {
                channel: id.into(),
                seq: pending.seq,
            }
            .into());
        }
        if self.config.verify_history_on_close && !state.tracker.verify(id)? {
            tracing::error!(channel = id, "history does not verify, refusing to close");
            return Err(NodeError::HistoryMismatch(id.into()));
        }

        state.exchange.detach(id);
        Ok(state.tracker.delete(id))
    }

    /// Compare our view of a channel with the counterparty's snapshot.
    pub async fn check_convergence(&self, remote: &Channel) -> Result<ConvergenceResult> {
        let state = self.state.lock().await;
        let id = remote.id().as_str();
        let local = state
            .tracker
            .channel(id)
            .ok_or_else(|| TrackerError::ChannelNotFound(id.into()))?;
        Ok(verify_convergence(
            &self.config.party,
            local,
            local.counterparty(),
            remote,
        )?)
    }

    fn peer(state: &NodeState<T>, party: &PartyId) -> Result<Peer> {
        state
            .peers
            .get(party)
            .copied()
            .ok_or_else(|| NodeError::UnknownPeer(party.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilateral_sync::{MemoryNetwork, MemoryTransport};

    async fn node(party: &str, seed: u8) -> Node<MemoryTransport> {
        let network = MemoryNetwork::new();
        let keypair = Keypair::from_seed(&[seed; 32]);
        let transport = network
            .create_transport(NodeId::from_public_key(&keypair.public_key()))
            .await;
        Node::new(keypair, transport, NodeConfig::new(party))
    }

    #[tokio::test]
    async fn test_open_requires_registered_peer() {
        let alice = node("alice", 1).await;
        assert!(matches!(
            alice.open_channel("C1", "bob").await,
            Err(NodeError::UnknownPeer(_))
        ));

        let key = Keypair::from_seed(&[2; 32]).public_key();
        alice
            .register_peer(
                "bob",
                Peer {
                    node_id: NodeId::from_public_key(&key),
                    public_key: key,
                },
            )
            .await;
        let seed = alice.open_channel("C1", "bob").await.unwrap();
        assert_eq!(
            seed,
            bilateral_core::chain::seed(&"C1".into(), &"alice".into(), &"bob".into())
        );
    }

    #[tokio::test]
    async fn test_close_absent_channel_is_noop() {
        let alice = node("alice", 1).await;
        assert!(alice.close_channel("C1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_of_missing_channel_fails() {
        let alice = node("alice", 1).await;
        assert!(matches!(
            alice.channel_snapshot("C1").await,
            Err(NodeError::Tracker(TrackerError::ChannelNotFound(_)))
        ));
    }
}
