//! The per-channel hash chain.
//!
//! ```text
//! pair   = H("bilateral/pair/v1"  || text(min(a, b)) || text(max(a, b)))
//! seed   = H("bilateral/seed/v1"  || text(channel_id) || pair)
//! link_n = H("bilateral/chain/v1" || link_{n-1} || canonical(transfer_n))
//! ```
//!
//! `text` is the CBOR text encoding, so field boundaries are unambiguous.
//! The party pair is ordered lexicographically: both sides derive the same
//! seed no matter who opened the channel.

use crate::canonical::canonical_text;
use crate::crypto::ChainHash;
use crate::error::Result;
use crate::transfer::Transfer;
use crate::types::{ChannelId, PartyId};

/// Domain prefix for the party-pair digest.
pub const PAIR_DOMAIN: &[u8] = b"bilateral/pair/v1";

/// Domain prefix for the channel seed.
pub const SEED_DOMAIN: &[u8] = b"bilateral/seed/v1";

/// Domain prefix for chain links.
pub const LINK_DOMAIN: &[u8] = b"bilateral/chain/v1";

/// Order-independent digest of the two channel parties.
pub fn pair_digest(a: &PartyId, b: &PartyId) -> ChainHash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    ChainHash::hash_parts(&[
        PAIR_DOMAIN,
        &canonical_text(lo.as_str()),
        &canonical_text(hi.as_str()),
    ])
}

/// Initial chain value of a channel.
pub fn seed(id: &ChannelId, local: &PartyId, counterparty: &PartyId) -> ChainHash {
    let pair = pair_digest(local, counterparty);
    ChainHash::hash_parts(&[SEED_DOMAIN, &canonical_text(id.as_str()), pair.as_bytes()])
}

/// Fold one transfer into the chain.
pub fn link(prev: &ChainHash, transfer: &Transfer) -> Result<ChainHash> {
    let record = transfer.canonical_bytes()?;
    Ok(ChainHash::hash_parts(&[LINK_DOMAIN, prev.as_bytes(), &record]))
}

/// Recompute every chain value after `seed`, one per transfer.
///
/// The last element is the head. An empty input yields an empty trail.
pub fn replay<'a, I>(seed: ChainHash, transfers: I) -> Result<Vec<ChainHash>>
where
    I: IntoIterator<Item = &'a Transfer>,
{
    let mut trail = Vec::new();
    let mut current = seed;
    for transfer in transfers {
        current = link(&current, transfer)?;
        trail.push(current);
    }
    Ok(trail)
}

/// First position (0-based) where two trails disagree.
pub fn first_divergence(a: &[ChainHash], b: &[ChainHash]) -> Option<usize> {
    a.iter()
        .zip(b.iter())
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(sender: &str, receiver: &str, asset: &str, amount: u64) -> Transfer {
        Transfer {
            sender: PartyId::from(sender),
            receiver: PartyId::from(receiver),
            asset_type: asset.into(),
            amount,
        }
    }

    #[test]
    fn test_seed_is_symmetric() {
        let id = ChannelId::from("C1");
        let alice = PartyId::from("alice");
        let bob = PartyId::from("bob");
        assert_eq!(seed(&id, &alice, &bob), seed(&id, &bob, &alice));
    }

    #[test]
    fn test_seed_depends_on_channel_and_parties() {
        let alice = PartyId::from("alice");
        let bob = PartyId::from("bob");
        let carol = PartyId::from("carol");

        let s1 = seed(&ChannelId::from("C1"), &alice, &bob);
        assert_ne!(s1, seed(&ChannelId::from("C2"), &alice, &bob));
        assert_ne!(s1, seed(&ChannelId::from("C1"), &alice, &carol));
        assert!(!s1.is_zero());
    }

    #[test]
    fn test_pair_digest_not_concatenation() {
        let a = pair_digest(&PartyId::from("ab"), &PartyId::from("c"));
        let b = pair_digest(&PartyId::from("a"), &PartyId::from("bc"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_link_is_order_sensitive() {
        let s = seed(&ChannelId::from("C1"), &"alice".into(), &"bob".into());
        let t1 = transfer("alice", "bob", "USD", 10);
        let t2 = transfer("bob", "alice", "USD", 4);

        let forward = replay(s, [&t1, &t2]).unwrap();
        let reversed = replay(s, [&t2, &t1]).unwrap();
        assert_eq!(forward.len(), 2);
        assert_ne!(forward[1], reversed[1]);
    }

    #[test]
    fn test_replay_matches_incremental_links() {
        let s = seed(&ChannelId::from("C1"), &"alice".into(), &"bob".into());
        let transfers = vec![
            transfer("alice", "bob", "USD", 1),
            transfer("bob", "alice", "EUR", 2),
            transfer("alice", "bob", "USD", 3),
        ];

        let mut head = s;
        for t in &transfers {
            head = link(&head, t).unwrap();
        }
        let trail = replay(s, &transfers).unwrap();
        assert_eq!(trail.last(), Some(&head));
    }

    #[test]
    fn test_replay_of_empty_history() {
        let s = ChainHash::hash(b"x");
        assert!(replay(s, std::iter::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_first_divergence() {
        let a = [ChainHash::hash(b"1"), ChainHash::hash(b"2")];
        let b = [ChainHash::hash(b"1"), ChainHash::hash(b"3")];
        assert_eq!(first_divergence(&a, &a), None);
        assert_eq!(first_divergence(&a, &b), Some(1));
        assert_eq!(first_divergence(&a, &a[..1]), Some(1));
    }
}
