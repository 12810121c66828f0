//! Test fixtures and helpers.
//!
//! A [`ChannelPair`] holds both ends of one channel so a test can drive
//! them in lockstep without a transport.

use bilateral_core::{ChannelId, Keypair, PartyId};
use bilateral_sync::{statement, ChannelSession, NodeId};
use bilateral_tracker::{Tracker, TrackerError};

use crate::generators::{Op, Side};

/// Both ends of one channel, with signing keys.
pub struct ChannelPair {
    pub channel_id: ChannelId,
    pub alice: Tracker,
    pub bob: Tracker,
    pub alice_key: Keypair,
    pub bob_key: Keypair,
}

impl ChannelPair {
    /// Open `channel_id` between "alice" and "bob" with deterministic keys.
    pub fn new(channel_id: &str) -> Self {
        Self::between(channel_id, "alice", "bob")
    }

    /// Open `channel_id` between two named parties.
    pub fn between(channel_id: &str, a: &str, b: &str) -> Self {
        let mut alice = Tracker::new(a);
        let mut bob = Tracker::new(b);
        if let Err(e) = alice.open(channel_id, b).and(bob.open(channel_id, a)) {
            panic!("fresh trackers refused to open '{}': {}", channel_id, e);
        }
        Self {
            channel_id: ChannelId::from(channel_id),
            alice,
            bob,
            alice_key: Keypair::from_seed(&[0xA1; 32]),
            bob_key: Keypair::from_seed(&[0xB2; 32]),
        }
    }

    /// Record one movement on both ends: a send on the sender's side, and a
    /// receive carrying the sender's signature on the other.
    pub fn apply(&mut self, op: &Op) -> Result<u64, TrackerError> {
        let id = self.channel_id.as_str();
        let (sender, receiver, key) = match op.from {
            Side::Alice => (&mut self.alice, &mut self.bob, &self.alice_key),
            Side::Bob => (&mut self.bob, &mut self.alice, &self.bob_key),
        };

        let seq = sender.send(id, &op.asset_type, op.amount)?;
        let head = sender
            .channel(id)
            .map(|c| c.chain_hash())
            .ok_or_else(|| TrackerError::ChannelNotFound(self.channel_id.clone()))?;
        let signature = key.sign(&statement(&self.channel_id, seq, &head));
        receiver.receive(id, &op.asset_type, op.amount, signature.to_receipt())
    }

    /// Protocol sessions for both ends, keyed to each other.
    pub fn sessions(&self) -> (ChannelSession, ChannelSession) {
        let a = self.alice_key.public_key();
        let b = self.bob_key.public_key();
        (
            ChannelSession::new(self.channel_id.clone(), NodeId::from_public_key(&b), b),
            ChannelSession::new(self.channel_id.clone(), NodeId::from_public_key(&a), a),
        )
    }

    /// Whether both ends hold the same chain and opposite balances.
    pub fn is_mirrored(&self) -> bool {
        let id = self.channel_id.as_str();
        match (self.alice.channel(id), self.bob.channel(id)) {
            (Some(a), Some(b)) => {
                a.chain_hash() == b.chain_hash()
                    && a.seq_number() == b.seq_number()
                    && a.balances()
                        .keys()
                        .chain(b.balances().keys())
                        .all(|asset| a.balance(asset) == -b.balance(asset))
            }
            _ => false,
        }
    }
}

/// Trackers for `count` distinct parties, "party-0", "party-1", ...
pub fn multi_party_trackers(count: usize) -> Vec<Tracker> {
    (0..count)
        .map(|i| Tracker::new(PartyId::new(format!("party-{}", i))))
        .collect()
}
