//! Error types for the sync module.

use bilateral_core::{ChannelId, CoreError};
use bilateral_tracker::TrackerError;
use thiserror::Error;

use crate::messages::RejectCode;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request reuses a sequence number the receiver already has.
    #[error("stale transfer: expected seq {expected}, got {got}")]
    Stale { expected: u64, got: u64 },

    /// The request skips sequence numbers.
    #[error("out-of-order transfer: expected seq {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    /// Local and remote chain hashes disagree at `seq`.
    #[error("chain hash mismatch at seq {seq}")]
    ChainMismatch { seq: u64 },

    /// Signature does not verify under the counterparty's key.
    #[error("bad signature at seq {seq}")]
    BadSignature { seq: u64 },

    /// A send on this channel is still waiting for its acknowledgment.
    #[error("channel '{channel}' has an unacknowledged transfer at seq {seq}")]
    TransferOutstanding { channel: ChannelId, seq: u64 },

    /// An acknowledgment arrived with nothing pending, or for another seq.
    #[error("unexpected acknowledgment for seq {seq} on channel '{channel}'")]
    UnexpectedAck { channel: ChannelId, seq: u64 },

    /// No session is attached for this channel.
    #[error("no session for channel '{0}'")]
    NoSession(ChannelId),

    /// The counterparty refused our transfer.
    #[error("transfer rejected ({code:?}): {message}")]
    Rejected { code: RejectCode, message: String },

    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Timeout waiting for peer.
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl SyncError {
    /// The code sent to the peer when this error refuses its request.
    pub fn reject_code(&self) -> RejectCode {
        match self {
            SyncError::Stale { .. } => RejectCode::Stale,
            SyncError::OutOfOrder { .. } => RejectCode::OutOfOrder,
            SyncError::ChainMismatch { .. } => RejectCode::ChainMismatch,
            SyncError::BadSignature { .. } => RejectCode::BadSignature,
            SyncError::NoSession(_) | SyncError::Tracker(TrackerError::ChannelNotFound(_)) => {
                RejectCode::ChannelNotFound
            }
            _ => RejectCode::Internal,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
