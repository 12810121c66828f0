//! Channel: the bilateral ledger kept for one counterparty.
//!
//! A channel holds net balances per asset, the ordered history of every
//! send and receive, the head of the hash chain over that history, a
//! sequence counter and the receipts (counterparty signatures) collected on
//! receive.
//!
//! The only constructor is [`Channel::open`]. A channel can still be
//! produced by deserializing a caller-supplied snapshot; missing fields fall
//! back to zero values, and such a channel reports
//! [`is_initialized`](Channel::is_initialized) `== false` and refuses
//! mutation.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::chain;
use crate::crypto::ChainHash;
use crate::error::{CoreError, Result};
use crate::transfer::{Direction, ExchangeInfo, Transfer};
use crate::types::{ChannelId, PartyId};

/// Per-counterparty ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    id: ChannelId,

    #[serde(default)]
    counterparty: PartyId,

    /// Net balance per asset type. Negative: the local party owes.
    #[serde(default)]
    balances: BTreeMap<String, i64>,

    #[serde(default)]
    history: Vec<ExchangeInfo>,

    #[serde(default)]
    chain_hash: ChainHash,

    #[serde(default)]
    seq_number: u64,

    /// Counterparty signatures keyed by the sequence number they acknowledge.
    #[serde(default)]
    receipts: BTreeMap<u64, Bytes>,
}

impl Channel {
    /// Open a fresh channel between `local` and `counterparty`.
    pub fn open(id: ChannelId, local: &PartyId, counterparty: PartyId) -> Self {
        let chain_hash = chain::seed(&id, local, &counterparty);
        Self {
            id,
            counterparty,
            balances: BTreeMap::new(),
            history: Vec::new(),
            chain_hash,
            seq_number: 0,
            receipts: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn counterparty(&self) -> &PartyId {
        &self.counterparty
    }

    pub fn balances(&self) -> &BTreeMap<String, i64> {
        &self.balances
    }

    /// Net balance for one asset (zero if never touched).
    pub fn balance(&self, asset_type: &str) -> i64 {
        self.balances.get(asset_type).copied().unwrap_or(0)
    }

    pub fn history(&self) -> &[ExchangeInfo] {
        &self.history
    }

    pub fn chain_hash(&self) -> ChainHash {
        self.chain_hash
    }

    pub fn seq_number(&self) -> u64 {
        self.seq_number
    }

    pub fn receipts(&self) -> &BTreeMap<u64, Bytes> {
        &self.receipts
    }

    /// The receipt stored when sequence number `seq` was received.
    pub fn receipt(&self, seq: u64) -> Option<&Bytes> {
        self.receipts.get(&seq)
    }

    /// Whether this channel has the structure `open` gives it.
    ///
    /// Seeds are never zero, every sequence step appends one history entry,
    /// and receipts can only exist for sequence numbers already reached.
    pub fn is_initialized(&self) -> bool {
        !self.chain_hash.is_zero()
            && self.history.len() as u64 == self.seq_number
            && self
                .receipts
                .keys()
                .next_back()
                .map_or(true, |&last| last <= self.seq_number)
    }

    /// The chain value a transfer would produce, without recording it.
    pub fn next_chain_hash(
        &self,
        local: &PartyId,
        direction: Direction,
        asset_type: &str,
        amount: u64,
    ) -> Result<ChainHash> {
        let transfer = Transfer::directed(local, &self.counterparty, direction, asset_type, amount);
        chain::link(&self.chain_hash, &transfer)
    }

    /// Record value sent to the counterparty. Returns the new sequence number.
    pub fn record_send(&mut self, local: &PartyId, asset_type: &str, amount: u64) -> Result<u64> {
        self.record(local, Direction::Outgoing, asset_type, amount, None)
    }

    /// Record value received from the counterparty along with its signature.
    /// Returns the new sequence number.
    pub fn record_receive(
        &mut self,
        local: &PartyId,
        asset_type: &str,
        amount: u64,
        signature: Bytes,
    ) -> Result<u64> {
        self.record(local, Direction::Incoming, asset_type, amount, Some(signature))
    }

    /// Apply one movement. Everything that can fail is computed before the
    /// first field is written, so an error leaves the channel untouched.
    fn record(
        &mut self,
        local: &PartyId,
        direction: Direction,
        asset_type: &str,
        amount: u64,
        receipt: Option<Bytes>,
    ) -> Result<u64> {
        if !self.is_initialized() {
            return Err(CoreError::Uninitialized);
        }

        let magnitude = i64::try_from(amount).map_err(|_| CoreError::AmountOutOfRange {
            asset: asset_type.to_string(),
            amount,
        })?;
        let delta = match direction {
            Direction::Outgoing => -magnitude,
            Direction::Incoming => magnitude,
        };
        let balance = self
            .balance(asset_type)
            .checked_add(delta)
            .ok_or_else(|| CoreError::BalanceOverflow {
                asset: asset_type.to_string(),
            })?;
        let seq = self
            .seq_number
            .checked_add(1)
            .ok_or(CoreError::SequenceOverflow)?;
        let chain_hash = self.next_chain_hash(local, direction, asset_type, amount)?;

        self.balances.insert(asset_type.to_string(), balance);
        self.history.push(ExchangeInfo {
            asset_type: asset_type.to_string(),
            signed_delta: delta,
            direction,
        });
        self.chain_hash = chain_hash;
        self.seq_number = seq;
        if let Some(signature) = receipt {
            self.receipts.insert(seq, signature);
        }
        Ok(seq)
    }

    /// Recompute the chain value after every history entry.
    pub fn chain_trail(&self, local: &PartyId) -> Result<Vec<ChainHash>> {
        let transfers: Vec<Transfer> = self
            .history
            .iter()
            .map(|entry| entry.to_transfer(local, &self.counterparty))
            .collect();
        chain::replay(chain::seed(&self.id, local, &self.counterparty), &transfers)
    }

    /// Check that replaying the history reproduces the stored chain head.
    pub fn verify_history(&self, local: &PartyId) -> Result<bool> {
        let head = self
            .chain_trail(local)?
            .last()
            .copied()
            .unwrap_or_else(|| chain::seed(&self.id, local, &self.counterparty));
        Ok(head == self.chain_hash)
    }

    /// Check that balances equal the running sum of the history.
    pub fn verify_balances(&self) -> bool {
        let mut sums: BTreeMap<&str, i128> = BTreeMap::new();
        for entry in &self.history {
            *sums.entry(entry.asset_type.as_str()).or_insert(0) += i128::from(entry.signed_delta);
        }
        let assets_match = self
            .balances
            .iter()
            .all(|(asset, &b)| sums.get(asset.as_str()).copied().unwrap_or(0) == i128::from(b));
        let history_covered = sums
            .iter()
            .all(|(asset, &s)| i128::from(self.balance(asset)) == s);
        assets_match && history_covered
    }
}
