//! Transfers and history entries.
//!
//! A [`Transfer`] is never stored. It is rebuilt from the channel's point of
//! view whenever a history entry has to be hashed or a settlement
//! instruction has to be produced.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_transfer_bytes;
use crate::error::Result;
use crate::types::PartyId;

/// Which side of the channel moved value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The local party sent value to the counterparty.
    #[default]
    Outgoing,
    /// The counterparty sent value to the local party.
    Incoming,
}

/// A directed value movement between two parties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: PartyId,
    pub receiver: PartyId,
    pub asset_type: String,
    pub amount: u64,
}

impl Transfer {
    /// Build the transfer seen from `local` for a movement in `direction`.
    pub fn directed(
        local: &PartyId,
        counterparty: &PartyId,
        direction: Direction,
        asset_type: &str,
        amount: u64,
    ) -> Self {
        let (sender, receiver) = match direction {
            Direction::Outgoing => (local.clone(), counterparty.clone()),
            Direction::Incoming => (counterparty.clone(), local.clone()),
        };
        Self {
            sender,
            receiver,
            asset_type: asset_type.to_string(),
            amount,
        }
    }

    /// Deterministic encoding folded into the hash chain.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical_transfer_bytes(self)
    }
}

/// One history entry, appended per send or receive.
///
/// `signed_delta` is negative for sends and positive for receives. The
/// explicit `direction` keeps zero-amount entries replayable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub asset_type: String,
    pub signed_delta: i64,
    #[serde(default)]
    pub direction: Direction,
}

impl ExchangeInfo {
    /// Magnitude of the movement.
    pub fn amount(&self) -> u64 {
        self.signed_delta.unsigned_abs()
    }

    /// Reconstruct the transfer this entry recorded.
    pub fn to_transfer(&self, local: &PartyId, counterparty: &PartyId) -> Transfer {
        Transfer::directed(
            local,
            counterparty,
            self.direction,
            &self.asset_type,
            self.amount(),
        )
    }
}
