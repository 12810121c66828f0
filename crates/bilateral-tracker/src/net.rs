//! Net settlement view.
//!
//! A stateless projection of a channel's balances into directional
//! settlement instructions. Recomputed on every call; history is never
//! replayed.

use bilateral_core::{Channel, Direction, PartyId, Transfer};

/// One transfer per asset with a non-zero balance, ordered by asset type.
///
/// A negative balance means the local party owes the counterparty; a
/// positive one means the counterparty owes the local party.
pub fn net_transfers(local: &PartyId, channel: &Channel) -> Vec<Transfer> {
    channel
        .balances()
        .iter()
        .filter(|(_, &balance)| balance != 0)
        .map(|(asset, &balance)| {
            let direction = if balance < 0 {
                Direction::Outgoing
            } else {
                Direction::Incoming
            };
            Transfer::directed(
                local,
                channel.counterparty(),
                direction,
                asset,
                balance.unsigned_abs(),
            )
        })
        .collect()
}

/// The instructions the local party has to execute (it is the sender).
pub fn obligations<'a>(local: &PartyId, transfers: &'a [Transfer]) -> Vec<&'a Transfer> {
    transfers.iter().filter(|t| &t.sender == local).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilateral_core::ChannelId;
    use bytes::Bytes;

    fn channel() -> (PartyId, Channel) {
        let local = PartyId::from("alice");
        let ch = Channel::open(ChannelId::from("C1"), &local, PartyId::from("bob"));
        (local, ch)
    }

    #[test]
    fn test_empty_channel_nets_to_nothing() {
        let (local, ch) = channel();
        assert!(net_transfers(&local, &ch).is_empty());
    }

    #[test]
    fn test_net_direction_per_asset() {
        let (local, mut ch) = channel();
        ch.record_send(&local, "USD", 80).unwrap();
        ch.record_receive(&local, "EUR", 30, Bytes::new()).unwrap();
        ch.record_send(&local, "GBP", 5).unwrap();
        ch.record_receive(&local, "GBP", 5, Bytes::new()).unwrap();

        let net = net_transfers(&local, &ch);
        assert_eq!(net.len(), 2);

        let eur = &net[0];
        assert_eq!(eur.asset_type, "EUR");
        assert_eq!(eur.sender, PartyId::from("bob"));
        assert_eq!(eur.receiver, local);
        assert_eq!(eur.amount, 30);

        let usd = &net[1];
        assert_eq!(usd.asset_type, "USD");
        assert_eq!(usd.sender, local);
        assert_eq!(usd.amount, 80);

        let owed = obligations(&local, &net);
        assert_eq!(owed.len(), 1);
        assert_eq!(owed[0].asset_type, "USD");
    }

    #[test]
    fn test_net_is_pure() {
        let (local, mut ch) = channel();
        ch.record_send(&local, "USD", 1).unwrap();
        let before = ch.clone();
        let first = net_transfers(&local, &ch);
        let second = net_transfers(&local, &ch);
        assert_eq!(first, second);
        assert_eq!(ch, before);
    }
}
