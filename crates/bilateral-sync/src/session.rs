//! Per-channel protocol state.
//!
//! A [`ChannelSession`] enforces the ordering rules the tracker itself does
//! not: one outstanding send per channel, strictly consecutive sequence
//! numbers, and signature plus chain-hash checks before anything is
//! recorded. It performs no I/O; the [`Exchange`](crate::Exchange) moves its
//! messages.

use std::collections::BTreeMap;

use bilateral_core::{ChainHash, ChannelId, Direction, Keypair, PublicKey, Signature};
use bilateral_tracker::{Tracker, TrackerError};

use crate::error::{Result, SyncError};
use crate::messages::{statement, NodeId, TransferAck, TransferReject, TransferRequest};

/// A send recorded locally that the counterparty has not acknowledged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransfer {
    pub seq: u64,
    pub chain_hash: ChainHash,
}

/// Protocol state for one channel.
#[derive(Debug, Clone)]
pub struct ChannelSession {
    channel_id: ChannelId,
    peer: NodeId,
    peer_key: PublicKey,
    pending: Option<PendingTransfer>,
    /// Counterparty acknowledgments of our sends, by sequence number.
    acks: BTreeMap<u64, Signature>,
}

impl ChannelSession {
    /// Attach a session to a channel whose counterparty signs with `peer_key`.
    pub fn new(channel_id: impl Into<ChannelId>, peer: NodeId, peer_key: PublicKey) -> Self {
        Self {
            channel_id: channel_id.into(),
            peer,
            peer_key,
            pending: None,
            acks: BTreeMap::new(),
        }
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn peer(&self) -> &NodeId {
        &self.peer
    }

    pub fn pending(&self) -> Option<&PendingTransfer> {
        self.pending.as_ref()
    }

    pub fn acks(&self) -> &BTreeMap<u64, Signature> {
        &self.acks
    }

    /// Record a send and build the signed request announcing it.
    pub fn initiate(
        &mut self,
        tracker: &mut Tracker,
        keypair: &Keypair,
        asset_type: &str,
        amount: u64,
    ) -> Result<TransferRequest> {
        if let Some(pending) = &self.pending {
            return Err(SyncError::TransferOutstanding {
                channel: self.channel_id.clone(),
                seq: pending.seq,
            });
        }

        let seq = tracker.send(self.channel_id.as_str(), asset_type, amount)?;
        let chain_hash = self.chain_hash(tracker)?;
        self.pending = Some(PendingTransfer { seq, chain_hash });

        Ok(TransferRequest {
            channel_id: self.channel_id.clone(),
            seq,
            asset_type: asset_type.to_string(),
            amount,
            chain_hash,
            signature: keypair.sign(&statement(&self.channel_id, seq, &chain_hash)),
        })
    }

    /// Validate a counterparty request and record it as a receive.
    ///
    /// Nothing is recorded unless every check passes. A request accepted
    /// while our own send is pending can only have been built on top of
    /// that send, so it acknowledges it implicitly.
    pub fn accept(
        &mut self,
        tracker: &mut Tracker,
        keypair: &Keypair,
        request: &TransferRequest,
    ) -> Result<TransferAck> {
        let channel = tracker
            .channel(self.channel_id.as_str())
            .ok_or_else(|| TrackerError::ChannelNotFound(self.channel_id.clone()))?;

        let expected = channel.seq_number().saturating_add(1);
        if request.seq < expected {
            return Err(SyncError::Stale {
                expected,
                got: request.seq,
            });
        }
        if request.seq > expected {
            return Err(SyncError::OutOfOrder {
                expected,
                got: request.seq,
            });
        }

        self.peer_key
            .verify(
                &statement(&self.channel_id, request.seq, &request.chain_hash),
                &request.signature,
            )
            .map_err(|_| SyncError::BadSignature { seq: request.seq })?;

        let predicted = channel.next_chain_hash(
            tracker.party(),
            Direction::Incoming,
            &request.asset_type,
            request.amount,
        )?;
        if predicted != request.chain_hash {
            return Err(SyncError::ChainMismatch { seq: request.seq });
        }

        let seq = tracker.receive(
            self.channel_id.as_str(),
            &request.asset_type,
            request.amount,
            request.signature.to_receipt(),
        )?;

        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                channel = %self.channel_id,
                seq = pending.seq,
                "pending transfer acknowledged by counterparty request"
            );
        }

        Ok(TransferAck {
            channel_id: self.channel_id.clone(),
            seq,
            chain_hash: predicted,
            signature: keypair.sign(&statement(&self.channel_id, seq, &predicted)),
        })
    }

    /// Settle the pending send with the counterparty's acknowledgment.
    pub fn acknowledge(&mut self, ack: &TransferAck) -> Result<u64> {
        let pending = match self.pending {
            Some(p) if p.seq == ack.seq => p,
            _ => {
                return Err(SyncError::UnexpectedAck {
                    channel: self.channel_id.clone(),
                    seq: ack.seq,
                })
            }
        };
        if pending.chain_hash != ack.chain_hash {
            return Err(SyncError::ChainMismatch { seq: ack.seq });
        }
        self.peer_key
            .verify(
                &statement(&self.channel_id, ack.seq, &ack.chain_hash),
                &ack.signature,
            )
            .map_err(|_| SyncError::BadSignature { seq: ack.seq })?;

        self.pending = None;
        self.acks.insert(ack.seq, ack.signature);
        Ok(ack.seq)
    }

    /// Drop the pending send the counterparty refused.
    ///
    /// The local record of the send stays: the channel has diverged from the
    /// counterparty's and must be reconciled out of band.
    pub fn rejected(&mut self, reject: &TransferReject) -> Result<()> {
        match self.pending {
            Some(p) if p.seq == reject.seq => {
                self.pending = None;
                tracing::warn!(
                    channel = %self.channel_id,
                    seq = reject.seq,
                    code = ?reject.code,
                    "counterparty rejected transfer, channel diverged"
                );
                Ok(())
            }
            _ => Err(SyncError::UnexpectedAck {
                channel: self.channel_id.clone(),
                seq: reject.seq,
            }),
        }
    }

    fn chain_hash(&self, tracker: &Tracker) -> Result<ChainHash> {
        tracker
            .channel(self.channel_id.as_str())
            .map(|c| c.chain_hash())
            .ok_or_else(|| TrackerError::ChannelNotFound(self.channel_id.clone()).into())
    }
}
