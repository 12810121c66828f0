//! # Bilateral Core
//!
//! Pure primitives for bilateral off-chain exchange: transfers, canonical
//! encoding, and hash-chained channels.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Channel`] - The per-counterparty ledger and unit of tamper-evidence
//! - [`Transfer`] - A directed value movement, hashed into the chain
//! - [`ExchangeInfo`] - One history entry (signed delta per asset)
//! - [`ChainHash`] - Blake3 digest linking a channel's history
//!
//! ## Canonicalization
//!
//! Transfers are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod chain;
pub mod channel;
pub mod crypto;
pub mod error;
pub mod transfer;
pub mod types;

pub use canonical::{canonical_transfer_bytes, decode_transfer};
pub use channel::Channel;
pub use crypto::{ChainHash, Keypair, PublicKey, Signature};
pub use error::{CoreError, Result};
pub use transfer::{Direction, ExchangeInfo, Transfer};
pub use types::{ChannelId, PartyId};
