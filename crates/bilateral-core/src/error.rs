//! Error types for bilateral core primitives.

use thiserror::Error;

/// Errors raised by channel primitives and the canonical encoder.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("amount {amount} of `{asset}` exceeds the signed balance range")]
    AmountOutOfRange { asset: String, amount: u64 },

    #[error("balance of `{asset}` would overflow")]
    BalanceOverflow { asset: String },

    #[error("sequence number exhausted")]
    SequenceOverflow,

    #[error("channel is not initialized")]
    Uninitialized,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
