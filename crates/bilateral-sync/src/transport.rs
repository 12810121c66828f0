//! Transport abstraction for the sync protocol.
//!
//! A transport delivers [`SyncMessage`]s between nodes. It is not trusted:
//! everything it hands over is checked by the session before it touches a
//! channel.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{NodeId, SyncMessage};

/// Transport trait for sending and receiving sync messages.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a specific peer.
    async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()>;

    /// Receive the next message from any peer.
    ///
    /// Returns the sender's NodeId and the message.
    async fn recv(&self) -> Result<(NodeId, SyncMessage)>;

    /// Receive with timeout.
    ///
    /// Returns None if timeout expires before a message arrives.
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(NodeId, SyncMessage)>>;

    /// Get the local node's identity.
    fn local_node_id(&self) -> NodeId;

    /// Check if a specific peer is reachable.
    async fn is_connected(&self, peer: &NodeId) -> bool;
}

/// An in-memory transport for tests.
///
/// Messages cross the network in their wire encoding, so the codec is
/// exercised exactly as with a real transport.
pub mod memory {
    use super::*;
    use crate::error::SyncError;
    use crate::messages::{decode_message, encode_message};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex, RwLock};

    const QUEUE_DEPTH: usize = 1000;

    #[derive(Debug)]
    struct Envelope {
        from: NodeId,
        payload: Vec<u8>,
    }

    /// Shared routing table for memory transports.
    #[derive(Default)]
    pub struct MemoryNetwork {
        senders: RwLock<HashMap<NodeId, mpsc::Sender<Envelope>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport connected to this network.
        pub async fn create_transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
            self.senders.write().await.insert(node_id, tx);

            MemoryTransport {
                node_id,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
            }
        }

        /// Remove a node; later sends to it fail.
        pub async fn disconnect(&self, node_id: &NodeId) {
            self.senders.write().await.remove(node_id);
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        node_id: NodeId,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::Receiver<Envelope>>,
    }

    impl MemoryTransport {
        fn open(envelope: Envelope) -> Result<(NodeId, SyncMessage)> {
            Ok((envelope.from, decode_message(&envelope.payload)?))
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()> {
            let payload = encode_message(&message)?;
            let sender = self
                .network
                .senders
                .read()
                .await
                .get(peer)
                .cloned()
                .ok_or_else(|| SyncError::TransportError("peer not found".into()))?;
            sender
                .send(Envelope {
                    from: self.node_id,
                    payload,
                })
                .await
                .map_err(|_| SyncError::TransportError("peer disconnected".into()))
        }

        async fn recv(&self) -> Result<(NodeId, SyncMessage)> {
            let mut rx = self.receiver.lock().await;
            match rx.recv().await {
                Some(envelope) => Self::open(envelope),
                None => Err(SyncError::TransportError("channel closed".into())),
            }
        }

        async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(NodeId, SyncMessage)>> {
            let mut rx = self.receiver.lock().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Self::open(envelope).map(Some),
                Ok(None) => Err(SyncError::TransportError("channel closed".into())),
                Err(_) => Ok(None),
            }
        }

        fn local_node_id(&self) -> NodeId {
            self.node_id
        }

        async fn is_connected(&self, peer: &NodeId) -> bool {
            self.network.senders.read().await.contains_key(peer)
        }
    }
}
