//! Error types for the node facade.

use bilateral_core::{ChannelId, CoreError, PartyId};
use bilateral_sync::SyncError;
use bilateral_tracker::TrackerError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Tracker error (unknown channel, duplicate open, ...).
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Protocol or transport error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No key is registered for this counterparty.
    #[error("unknown peer: {0}")]
    UnknownPeer(PartyId),

    /// The channel's history does not reproduce its chain hash or balances.
    #[error("channel '{0}' failed history verification")]
    HistoryMismatch(ChannelId),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
