//! Golden chain vectors.
//!
//! Each vector fixes a channel, a sequence of movements, and the exact
//! record bytes and chain hashes they must produce. Any change to the
//! canonical encoding or the chain construction breaks them.

use bilateral_core::{chain, ChainHash, Channel, ChannelId, Direction, PartyId, Transfer};

/// One movement in a vector, seen from the vector's local party.
#[derive(Debug, Clone)]
pub struct VectorStep {
    pub direction: Direction,
    pub asset_type: &'static str,
    pub amount: u64,
    /// Canonical transfer bytes (hex).
    pub expected_record: &'static str,
    /// Chain hash after this step (hex).
    pub expected_chain_hash: &'static str,
}

/// A golden chain vector.
#[derive(Debug, Clone)]
pub struct ChainVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub channel_id: &'static str,
    pub local: &'static str,
    pub counterparty: &'static str,
    /// Expected seed (hex).
    pub expected_seed: &'static str,
    pub steps: Vec<VectorStep>,
}

const C1_SEED: &str = "d0a7ce244ba34104ab0f40b4f9e988b7271aef37c064ce5be3a48f64e4c7ec35";
const C1_SEND_100: &str = "a766b9c4b945a2cc080317a844757d1c2868ead809276142d6bbc2536a8d66e8";
const C1_RECV_50: &str = "25377bef638248c0fb5009a37e15ce21310ced49a7c1db95b19e6d0ba9e9f842";
const ALICE_TO_BOB_USD_100: &str = "a40065616c6963650163626f620263555344031864";
const BOB_TO_ALICE_USD_50: &str = "a40063626f620165616c6963650263555344031832";

/// Get all golden chain vectors.
pub fn all_vectors() -> Vec<ChainVector> {
    vec![
        ChainVector {
            name: "send then receive, alice's view",
            channel_id: "C1",
            local: "alice",
            counterparty: "bob",
            expected_seed: C1_SEED,
            steps: vec![
                VectorStep {
                    direction: Direction::Outgoing,
                    asset_type: "USD",
                    amount: 100,
                    expected_record: ALICE_TO_BOB_USD_100,
                    expected_chain_hash: C1_SEND_100,
                },
                VectorStep {
                    direction: Direction::Incoming,
                    asset_type: "USD",
                    amount: 50,
                    expected_record: BOB_TO_ALICE_USD_50,
                    expected_chain_hash: C1_RECV_50,
                },
            ],
        },
        ChainVector {
            name: "send then receive, bob's view",
            channel_id: "C1",
            local: "bob",
            counterparty: "alice",
            expected_seed: C1_SEED,
            steps: vec![
                VectorStep {
                    direction: Direction::Incoming,
                    asset_type: "USD",
                    amount: 100,
                    expected_record: ALICE_TO_BOB_USD_100,
                    expected_chain_hash: C1_SEND_100,
                },
                VectorStep {
                    direction: Direction::Outgoing,
                    asset_type: "USD",
                    amount: 50,
                    expected_record: BOB_TO_ALICE_USD_50,
                    expected_chain_hash: C1_RECV_50,
                },
            ],
        },
        ChainVector {
            name: "zero amount, wide amounts, two assets",
            channel_id: "settle-7",
            local: "bank-a",
            counterparty: "bank-b",
            expected_seed: "d050cfaf5d14d1e50df956fbb0efec32807456974435c04617eb4d434e59419e",
            steps: vec![
                VectorStep {
                    direction: Direction::Outgoing,
                    asset_type: "EUR",
                    amount: 0,
                    expected_record: "a4006662616e6b2d61016662616e6b2d6202634555520300",
                    expected_chain_hash:
                        "7372eef397f334dc3997a448fd83031d0883e8d3155b99b3a29747a5cedf3c12",
                },
                VectorStep {
                    direction: Direction::Incoming,
                    asset_type: "XAU",
                    amount: 1_000_000,
                    expected_record: "a4006662616e6b2d62016662616e6b2d610263584155031a000f4240",
                    expected_chain_hash:
                        "dc45e7677422623b68bfd94cdcce7684d5e61e89678ad2629d6059c0a747e73a",
                },
                VectorStep {
                    direction: Direction::Outgoing,
                    asset_type: "EUR",
                    amount: i64::MAX as u64,
                    expected_record:
                        "a4006662616e6b2d61016662616e6b2d620263455552031b7fffffffffffffff",
                    expected_chain_hash:
                        "39a2adf7b2fc3b4d1ab7a524dd762d2030473685bb98dde8c609cae688470eb4",
                },
            ],
        },
        ChainVector {
            name: "empty channel id, same party twice",
            channel_id: "",
            local: "x",
            counterparty: "x",
            expected_seed: "488706a8694ffb117306e0b6a9c2e75cf885f16f7d07283c12c5c5c8738705a5",
            steps: vec![],
        },
    ]
}

/// Play a vector through a channel, returning the channel and every
/// intermediate chain hash (seed first).
pub fn replay_vector(vector: &ChainVector) -> (Channel, Vec<ChainHash>) {
    let local = PartyId::from(vector.local);
    let mut channel = Channel::open(
        ChannelId::from(vector.channel_id),
        &local,
        PartyId::from(vector.counterparty),
    );
    let mut hashes = vec![channel.chain_hash()];
    for step in &vector.steps {
        let recorded = match step.direction {
            Direction::Outgoing => channel.record_send(&local, step.asset_type, step.amount),
            Direction::Incoming => {
                channel.record_receive(&local, step.asset_type, step.amount, Default::default())
            }
        };
        if let Err(e) = recorded {
            panic!("vector '{}' failed to record: {}", vector.name, e);
        }
        hashes.push(channel.chain_hash());
    }
    (channel, hashes)
}

/// Canonical record bytes of one step, as hex.
pub fn step_record_hex(vector: &ChainVector, step: &VectorStep) -> String {
    let transfer = Transfer::directed(
        &PartyId::from(vector.local),
        &PartyId::from(vector.counterparty),
        step.direction,
        step.asset_type,
        step.amount,
    );
    match transfer.canonical_bytes() {
        Ok(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        Err(e) => panic!("vector '{}' failed to encode: {}", vector.name, e),
    }
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, computed head hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let (_, hashes) = replay_vector(v);
            let seed_ok = hashes[0].to_hex() == v.expected_seed;
            let steps_ok = v.steps.iter().zip(&hashes[1..]).all(|(step, hash)| {
                hash.to_hex() == step.expected_chain_hash
                    && step_record_hex(v, step) == step.expected_record
            });
            let head = hashes.last().copied().unwrap_or(ChainHash::ZERO);
            (v.name.to_string(), seed_ok && steps_ok, head.to_hex())
        })
        .collect()
}

/// The seed a vector's channel starts from, computed directly.
pub fn vector_seed(vector: &ChainVector) -> ChainHash {
    chain::seed(
        &ChannelId::from(vector.channel_id),
        &PartyId::from(vector.local),
        &PartyId::from(vector.counterparty),
    )
}
