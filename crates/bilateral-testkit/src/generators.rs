//! Proptest generators for property-based testing.

use proptest::prelude::*;

use bilateral_core::{PartyId, Transfer};

/// Which end of a [`ChannelPair`](crate::ChannelPair) sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Alice,
    Bob,
}

/// One movement on a channel.
#[derive(Debug, Clone)]
pub struct Op {
    pub from: Side,
    pub asset_type: String,
    pub amount: u64,
}

/// Upper bound for generated amounts. Fifty of them cannot overflow `i64`.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// Generate a side.
pub fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Alice), Just(Side::Bob)]
}

/// Generate an asset type from a small set, so assets repeat.
pub fn asset_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("USD".to_string()),
        Just("EUR".to_string()),
        Just("XAU".to_string()),
        "[A-Z]{3}".prop_map(String::from),
    ]
}

/// Generate an amount, zero included.
pub fn amount() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), 1u64..=MAX_AMOUNT]
}

/// Generate a party identifier.
pub fn party_id() -> impl Strategy<Value = PartyId> {
    "([a-z][a-z0-9-]{0,15})?".prop_map(PartyId::new)
}

/// Generate a sequence of up to `max_len` operations.
pub fn ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=max_len)
}

impl Arbitrary for Op {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (side(), asset_type(), amount())
            .prop_map(|(from, asset_type, amount)| Op {
                from,
                asset_type,
                amount,
            })
            .boxed()
    }
}

/// Generate a transfer between two distinct parties.
pub fn transfer() -> impl Strategy<Value = Transfer> {
    (party_id(), party_id(), asset_type(), any::<u64>())
        .prop_filter("sender and receiver differ", |(s, r, _, _)| s != r)
        .prop_map(|(sender, receiver, asset_type, amount)| Transfer {
            sender,
            receiver,
            asset_type,
            amount,
        })
}
