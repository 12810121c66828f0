//! Error types for the tracker.

use bilateral_core::{ChannelId, CoreError};
use thiserror::Error;

/// Errors that can occur during tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Open on an id that already exists.
    #[error("channel with ID `{0}` is already open")]
    ChannelAlreadyOpen(ChannelId),

    /// Any operation on an absent id.
    #[error("there is no open channel with ID '{0}'")]
    ChannelNotFound(ChannelId),

    /// The channel did not come from `open` (zero-valued or malformed snapshot).
    #[error("channel with ID '{0}' is not initialized properly")]
    ChannelNotInitialized(ChannelId),

    /// Canonical encoding of a transfer record failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The amount does not fit the balance domain of the channel.
    #[error("channel '{channel}': {source}")]
    AmountOutOfRange {
        channel: ChannelId,
        #[source]
        source: CoreError,
    },

    /// Any other core failure.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl TrackerError {
    /// Attach the channel id to a core error.
    pub(crate) fn from_core(channel: &str, err: CoreError) -> Self {
        match err {
            CoreError::Uninitialized => TrackerError::ChannelNotInitialized(channel.into()),
            CoreError::Encoding(msg) => TrackerError::Encoding(msg),
            e @ (CoreError::AmountOutOfRange { .. }
            | CoreError::BalanceOverflow { .. }
            | CoreError::SequenceOverflow) => TrackerError::AmountOutOfRange {
                channel: channel.into(),
                source: e,
            },
            other => TrackerError::Core(other),
        }
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
