//! # Bilateral
//!
//! Bilateral off-chain exchange: each pair of parties keeps a hash-chained
//! ledger of the value they move between each other, and nets it out on
//! demand.
//!
//! ## Overview
//!
//! - **Channels**: per-counterparty balances, history and chain hash
//! - **Tracker**: the registry of one party's channels
//! - **Sync**: signed, acknowledged transfers that keep both ends in lockstep
//! - **Node**: all of the above behind one async API
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bilateral::{Keypair, Node, NodeConfig, NodeId, Peer};
//! use bilateral::sync::MemoryNetwork;
//!
//! async fn example(bob_key: bilateral::PublicKey) -> bilateral::Result<()> {
//!     let keypair = Keypair::generate();
//!     let network = MemoryNetwork::new();
//!     let transport = network
//!         .create_transport(NodeId::from_public_key(&keypair.public_key()))
//!         .await;
//!
//!     let alice = Node::new(keypair, transport, NodeConfig::new("alice"));
//!     alice
//!         .register_peer("bob", Peer { node_id: NodeId::from_public_key(&bob_key), public_key: bob_key })
//!         .await;
//!     alice.open_channel("C1", "bob").await?;
//!
//!     // Waits for bob's acknowledgment.
//!     alice.transfer("C1", "USD", 100).await?;
//!     let net = alice.net("C1").await?;
//!     println!("{:?}", net);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `bilateral::core` - Channels, transfers, hashing and keys
//! - `bilateral::tracker` - The channel registry
//! - `bilateral::sync` - Protocol messages, sessions and transports

pub mod error;
pub mod node;

// Re-export component crates
pub use bilateral_core as core;
pub use bilateral_sync as sync;
pub use bilateral_tracker as tracker;

// Re-export main types for convenience
pub use error::{NodeError, Result};
pub use node::{Node, NodeConfig, Peer};

// Re-export commonly used types
pub use bilateral_core::{
    ChainHash, Channel, ChannelId, Direction, ExchangeInfo, Keypair, PartyId, PublicKey,
    Transfer,
};
pub use bilateral_sync::{ConvergenceResult, Event, NodeId, SyncConfig};
pub use bilateral_tracker::{Tracker, TrackerError};
