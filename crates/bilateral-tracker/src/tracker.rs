//! Tracker: the registry of channels owned by one local party.
//!
//! Every channel is created by [`Tracker::open`], mutated by
//! [`Tracker::send`] / [`Tracker::receive`], read through [`Tracker::net`]
//! and removed by [`Tracker::delete`]. The tracker exclusively owns its
//! channels; readers get borrows that live only as long as the call.
//!
//! There is no internal locking. `&mut self` already serializes mutations
//! on one tracker; callers sharing it across tasks wrap it themselves.

use std::collections::HashMap;

use bilateral_core::{Channel, ChannelId, PartyId, Transfer};
use bytes::Bytes;

use crate::error::{Result, TrackerError};
use crate::net::net_transfers;

/// Registry of bilateral channels for one local party.
#[derive(Debug, Clone)]
pub struct Tracker {
    party: PartyId,
    channels: HashMap<ChannelId, Channel>,
}

impl Tracker {
    /// Create an empty tracker for `party`.
    pub fn new(party: impl Into<PartyId>) -> Self {
        Self {
            party: party.into(),
            channels: HashMap::new(),
        }
    }

    /// The local party.
    pub fn party(&self) -> &PartyId {
        &self.party
    }

    /// Open a channel with `counterparty`.
    ///
    /// Fails with [`TrackerError::ChannelAlreadyOpen`] if `id` exists.
    pub fn open(
        &mut self,
        id: impl Into<ChannelId>,
        counterparty: impl Into<PartyId>,
    ) -> Result<&Channel> {
        let id = id.into();
        if self.channels.contains_key(&id) {
            return Err(TrackerError::ChannelAlreadyOpen(id));
        }

        let channel = Channel::open(id.clone(), &self.party, counterparty.into());
        tracing::debug!(
            channel = %id,
            counterparty = %channel.counterparty(),
            seed = %channel.chain_hash(),
            "opened channel"
        );
        Ok(self.channels.entry(id).or_insert(channel))
    }

    /// Record value sent to the counterparty. Returns the new sequence number.
    ///
    /// No receipt is stored: receipts are counterparty acknowledgments and
    /// only arrive with [`receive`](Self::receive).
    pub fn send(&mut self, id: &str, asset_type: &str, amount: u64) -> Result<u64> {
        let party = &self.party;
        let channel = Self::initialized_mut(&mut self.channels, id)?;

        let seq = channel
            .record_send(party, asset_type, amount)
            .map_err(|e| TrackerError::from_core(id, e))?;
        tracing::debug!(channel = id, seq, asset = asset_type, amount, "recorded send");
        Ok(seq)
    }

    /// Record value received from the counterparty together with its
    /// signature, stored under the new sequence number.
    ///
    /// The signature is opaque here; verification happens before this call.
    pub fn receive(
        &mut self,
        id: &str,
        asset_type: &str,
        amount: u64,
        signature: impl Into<Bytes>,
    ) -> Result<u64> {
        let party = &self.party;
        let channel = Self::initialized_mut(&mut self.channels, id)?;

        let seq = channel
            .record_receive(party, asset_type, amount, signature.into())
            .map_err(|e| TrackerError::from_core(id, e))?;
        tracing::debug!(channel = id, seq, asset = asset_type, amount, "recorded receive");
        Ok(seq)
    }

    /// Settlement instructions for a channel, one per asset with a non-zero
    /// balance.
    pub fn net(&self, id: &str) -> Result<Vec<Transfer>> {
        let channel = self.get(id)?;
        Ok(net_transfers(&self.party, channel))
    }

    /// Remove a channel. Deleting an absent id is a no-op.
    ///
    /// The removed channel is handed back so the caller can archive it.
    pub fn delete(&mut self, id: &str) -> Option<Channel> {
        let removed = self.channels.remove(id);
        if removed.is_some() {
            tracing::debug!(channel = id, "deleted channel");
        }
        removed
    }

    /// Borrow a channel for reading (sequence number, receipts, history).
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// Iterate over all channels, e.g. to snapshot them.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Whether a channel with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.channels.contains_key(id)
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the tracker holds no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Re-insert a channel the caller persisted earlier.
    ///
    /// The channel is not validated here; a malformed snapshot is caught by
    /// the next mutation as [`TrackerError::ChannelNotInitialized`].
    pub fn restore(&mut self, channel: Channel) -> Result<()> {
        let id = channel.id().clone();
        if self.channels.contains_key(&id) {
            return Err(TrackerError::ChannelAlreadyOpen(id));
        }
        tracing::debug!(channel = %id, seq = channel.seq_number(), "restored channel");
        self.channels.insert(id, channel);
        Ok(())
    }

    /// Audit a channel: the history must replay to the stored chain head and
    /// sum to the stored balances.
    pub fn verify(&self, id: &str) -> Result<bool> {
        let channel = self.get(id)?;
        let chain_ok = channel
            .verify_history(&self.party)
            .map_err(|e| TrackerError::from_core(id, e))?;
        Ok(chain_ok && channel.verify_balances())
    }

    fn get(&self, id: &str) -> Result<&Channel> {
        self.channels
            .get(id)
            .ok_or_else(|| TrackerError::ChannelNotFound(id.into()))
    }

    fn initialized_mut<'a>(
        channels: &'a mut HashMap<ChannelId, Channel>,
        id: &str,
    ) -> Result<&'a mut Channel> {
        let channel = channels
            .get_mut(id)
            .ok_or_else(|| TrackerError::ChannelNotFound(id.into()))?;
        if !channel.is_initialized() {
            tracing::error!(channel = id, "refusing to mutate uninitialized channel");
            return Err(TrackerError::ChannelNotInitialized(id.into()));
        }
        Ok(channel)
    }
}
