//! Exchange driver: moves session messages over a transport.
//!
//! The driver owns the sessions of every channel it serves. It borrows the
//! tracker per call so the caller decides how the tracker is shared.

use std::collections::HashMap;
use std::time::Duration;

use bilateral_core::{ChannelId, Keypair, PublicKey};
use bilateral_tracker::Tracker;
use tokio::time::Instant;

use crate::error::{Result, SyncError};
use crate::messages::{
    NodeId, RejectCode, SyncMessage, TransferAck, TransferReject, TransferRequest,
};
use crate::session::ChannelSession;
use crate::transport::Transport;

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long `transfer` waits for the counterparty's answer.
    pub ack_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(30),
        }
    }
}

/// What handling one incoming message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// We recorded a counterparty transfer and acknowledged it.
    Received { channel_id: ChannelId, seq: u64 },
    /// We refused a counterparty transfer.
    Refused {
        channel_id: ChannelId,
        seq: u64,
        code: RejectCode,
    },
    /// The counterparty acknowledged our pending transfer.
    Acknowledged { channel_id: ChannelId, seq: u64 },
    /// The counterparty refused our pending transfer.
    Rejected {
        channel_id: ChannelId,
        seq: u64,
        code: RejectCode,
        message: String,
    },
}

/// Runs the acknowledged-transfer protocol for one node.
pub struct Exchange<T: Transport> {
    transport: T,
    keypair: Keypair,
    config: SyncConfig,
    sessions: HashMap<ChannelId, ChannelSession>,
}

impl<T: Transport> Exchange<T> {
    pub fn new(transport: T, keypair: Keypair, config: SyncConfig) -> Self {
        Self {
            transport,
            keypair,
            config,
            sessions: HashMap::new(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.transport.local_node_id()
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Start serving a channel whose counterparty is `peer`.
    ///
    /// Replaces any previous session for the same channel.
    pub fn attach(&mut self, channel_id: impl Into<ChannelId>, peer: NodeId, peer_key: PublicKey) {
        let channel_id = channel_id.into();
        let session = ChannelSession::new(channel_id.clone(), peer, peer_key);
        self.sessions.insert(channel_id, session);
    }

    /// Stop serving a channel.
    pub fn detach(&mut self, channel_id: &str) -> Option<ChannelSession> {
        self.sessions.remove(channel_id)
    }

    pub fn session(&self, channel_id: &str) -> Option<&ChannelSession> {
        self.sessions.get(channel_id)
    }

    /// Send value and wait for the counterparty's acknowledgment.
    ///
    /// Messages for other channels that arrive meanwhile are served as
    /// usual. On timeout the transfer stays pending: a late ack handled by
    /// [`serve_one`](Self::serve_one) still settles it.
    pub async fn transfer(
        &mut self,
        tracker: &mut Tracker,
        channel_id: &str,
        asset_type: &str,
        amount: u64,
    ) -> Result<u64> {
        let session = self
            .sessions
            .get_mut(channel_id)
            .ok_or_else(|| SyncError::NoSession(channel_id.into()))?;
        let request = session.initiate(tracker, &self.keypair, asset_type, amount)?;
        let peer = *session.peer();
        let seq = request.seq;
        tracing::debug!(channel = channel_id, seq, asset = asset_type, amount, "sending transfer");

        self.transport
            .send(&peer, SyncMessage::Transfer(request))
            .await?;

        let deadline = Instant::now() + self.config.ack_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (from, message) = match self.transport.recv_timeout(remaining).await? {
                Some(received) => received,
                None => {
                    return Err(SyncError::Timeout(format!(
                        "waiting for ack of seq {} on channel '{}'",
                        seq, channel_id
                    )))
                }
            };

            // Failures about other channels or sequence numbers must not
            // abandon this transfer; its ack may still be queued.
            let ours = message.channel_id().as_str() == channel_id && message.seq() == seq;
            match self.handle(tracker, from, message).await {
                Ok(Event::Rejected {
                    channel_id: id,
                    seq: s,
                    code,
                    message,
                }) if id.as_str() == channel_id && s == seq => {
                    return Err(SyncError::Rejected { code, message });
                }
                Ok(_) => {}
                Err(e) if ours || matches!(e, SyncError::TransportError(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        channel = channel_id,
                        seq,
                        "ignoring unrelated message while awaiting ack: {}",
                        e
                    );
                }
            }

            let settled = self
                .sessions
                .get(channel_id)
                .map_or(true, |s| s.pending().is_none());
            if settled {
                return Ok(seq);
            }
        }
    }

    /// Receive one message and handle it.
    pub async fn serve_one(&mut self, tracker: &mut Tracker) -> Result<Event> {
        let (from, message) = self.transport.recv().await?;
        self.handle(tracker, from, message).await
    }

    /// Like [`serve_one`](Self::serve_one), giving up after `timeout`.
    pub async fn serve_timeout(
        &mut self,
        tracker: &mut Tracker,
        timeout: Duration,
    ) -> Result<Option<Event>> {
        match self.transport.recv_timeout(timeout).await? {
            Some((from, message)) => self.handle(tracker, from, message).await.map(Some),
            None => Ok(None),
        }
    }

    async fn handle(
        &mut self,
        tracker: &mut Tracker,
        from: NodeId,
        message: SyncMessage,
    ) -> Result<Event> {
        match message {
            SyncMessage::Transfer(request) => self.handle_transfer(tracker, from, request).await,
            SyncMessage::Ack(ack) => self.handle_ack(&ack),
            SyncMessage::Reject(reject) => self.handle_reject(reject),
        }
    }

    async fn handle_transfer(
        &mut self,
        tracker: &mut Tracker,
        from: NodeId,
        request: TransferRequest,
    ) -> Result<Event> {
        let outcome = match self.sessions.get_mut(request.channel_id.as_str()) {
            Some(session) if *session.peer() == from => {
                session.accept(tracker, &self.keypair, &request)
            }
            _ => Err(SyncError::NoSession(request.channel_id.clone())),
        };

        match outcome {
            Ok(ack) => {
                let seq = ack.seq;
                self.transport.send(&from, SyncMessage::Ack(ack)).await?;
                Ok(Event::Received {
                    channel_id: request.channel_id,
                    seq,
                })
            }
            Err(e) => {
                let code = e.reject_code();
                tracing::warn!(
                    channel = %request.channel_id,
                    seq = request.seq,
                    code = ?code,
                    "refusing transfer: {}",
                    e
                );
                let reject = TransferReject {
                    channel_id: request.channel_id.clone(),
                    seq: request.seq,
                    code,
                    message: e.to_string(),
                };
                self.transport.send(&from, SyncMessage::Reject(reject)).await?;
                Ok(Event::Refused {
                    channel_id: request.channel_id,
                    seq: request.seq,
                    code,
                })
            }
        }
    }

    fn handle_ack(&mut self, ack: &TransferAck) -> Result<Event> {
        let session = self
            .sessions
            .get_mut(ack.channel_id.as_str())
            .ok_or_else(|| SyncError::NoSession(ack.channel_id.clone()))?;
        let seq = session.acknowledge(ack).map_err(|e| {
            tracing::warn!(channel = %ack.channel_id, seq = ack.seq, "ignoring acknowledgment: {}", e);
            e
        })?;
        tracing::debug!(channel = %ack.channel_id, seq, "transfer acknowledged");
        Ok(Event::Acknowledged {
            channel_id: ack.channel_id.clone(),
            seq,
        })
    }

    fn handle_reject(&mut self, reject: TransferReject) -> Result<Event> {
        let session = self
            .sessions
            .get_mut(reject.channel_id.as_str())
            .ok_or_else(|| SyncError::NoSession(reject.channel_id.clone()))?;
        session.rejected(&reject)?;
        Ok(Event::Rejected {
            channel_id: reject.channel_id,
            seq: reject.seq,
            code: reject.code,
            message: reject.message,
        })
    }
}
