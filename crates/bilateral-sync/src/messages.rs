//! Sync protocol message types.
//!
//! Three messages drive a transfer between the two ends of a channel:
//!
//! ```text
//! Sender                               Receiver
//!   |-------- Transfer(seq, hash) ------>|   sender already recorded seq
//!   |<------- Ack(seq, hash) ------------|   receiver recorded seq
//!   |<------- Reject(seq, code) ---------|   ... or refused it
//! ```
//!
//! Every signature covers a [`statement`] binding the channel id, the
//! sequence number and the chain hash reached at that sequence number, so
//! one signature commits to the whole history up to that point.

use std::io::Cursor;

use bilateral_core::canonical::canonical_text;
use bilateral_core::{ChainHash, ChannelId, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Domain prefix of signed channel statements.
pub const STATEMENT_DOMAIN: &[u8] = b"bilateral/statement/v1";

/// Address of a node on the transport. Derived from its signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The node id owned by the holder of `key`.
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self(*key.as_bytes())
    }
}

/// Message size limits.
pub mod limits {
    /// Max bytes in a channel id.
    pub const MAX_CHANNEL_ID_LEN: usize = 256;
    /// Max bytes in an asset type.
    pub const MAX_ASSET_TYPE_LEN: usize = 64;
    /// Max bytes in a reject message.
    pub const MAX_REJECT_MESSAGE_LEN: usize = 1024;
    /// Max encoded message size accepted by `decode_message`.
    pub const MAX_MESSAGE_SIZE: usize = 4096;
}

/// Request to record a transfer the sender has already recorded as `seq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub channel_id: ChannelId,
    pub seq: u64,
    pub asset_type: String,
    pub amount: u64,
    /// Chain hash after the sender recorded this transfer.
    pub chain_hash: ChainHash,
    /// Sender's signature over `statement(channel_id, seq, chain_hash)`.
    pub signature: Signature,
}

/// Acknowledgment that the receiver recorded `seq` and reached `chain_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAck {
    pub channel_id: ChannelId,
    pub seq: u64,
    pub chain_hash: ChainHash,
    pub signature: Signature,
}

/// Refusal of a transfer request. Nothing was recorded by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReject {
    pub channel_id: ChannelId,
    pub seq: u64,
    pub code: RejectCode,
    pub message: String,
}

/// Sync protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    Transfer(TransferRequest),
    Ack(TransferAck),
    Reject(TransferReject),
}

impl SyncMessage {
    /// The channel this message belongs to.
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            SyncMessage::Transfer(m) => &m.channel_id,
            SyncMessage::Ack(m) => &m.channel_id,
            SyncMessage::Reject(m) => &m.channel_id,
        }
    }

    /// The sequence number this message refers to.
    pub fn seq(&self) -> u64 {
        match self {
            SyncMessage::Transfer(m) => m.seq,
            SyncMessage::Ack(m) => m.seq,
            SyncMessage::Reject(m) => m.seq,
        }
    }

    /// Check if this message respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        if self.channel_id().as_str().len() > limits::MAX_CHANNEL_ID_LEN {
            return Err("channel id too long");
        }
        match self {
            SyncMessage::Transfer(m) if m.asset_type.len() > limits::MAX_ASSET_TYPE_LEN => {
                Err("asset type too long")
            }
            SyncMessage::Reject(m) if m.message.len() > limits::MAX_REJECT_MESSAGE_LEN => {
                Err("reject message too long")
            }
            _ => Ok(()),
        }
    }
}

/// Why a transfer request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum RejectCode {
    /// Sequence number already used on the receiver's side.
    Stale = 1,
    /// Sequence number skips ahead of the receiver.
    OutOfOrder = 2,
    /// The receiver would reach a different chain hash.
    ChainMismatch = 3,
    /// Signature does not verify under the sender's key.
    BadSignature = 4,
    /// The receiver has no such channel.
    ChannelNotFound = 5,
    /// Malformed message or local failure on the receiver.
    Internal = 6,
}

/// The bytes a party signs to vouch for a channel state.
pub fn statement(channel_id: &ChannelId, seq: u64, chain_hash: &ChainHash) -> Vec<u8> {
    let id = canonical_text(channel_id.as_str());
    let mut buf = Vec::with_capacity(STATEMENT_DOMAIN.len() + id.len() + 8 + 32);
    buf.extend_from_slice(STATEMENT_DOMAIN);
    buf.extend_from_slice(&id);
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(chain_hash.as_bytes());
    buf
}

/// Encode a message for the wire (CBOR).
pub fn encode_message(message: &SyncMessage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| SyncError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a message from the wire, enforcing size limits.
pub fn decode_message(bytes: &[u8]) -> Result<SyncMessage> {
    if bytes.len() > limits::MAX_MESSAGE_SIZE {
        return Err(SyncError::InvalidMessage(format!(
            "message of {} bytes exceeds limit",
            bytes.len()
        )));
    }
    let message: SyncMessage = ciborium::from_reader(Cursor::new(bytes))
        .map_err(|e| SyncError::Decoding(e.to_string()))?;
    message
        .validate_limits()
        .map_err(|e| SyncError::InvalidMessage(e.into()))?;
    Ok(message)
}
