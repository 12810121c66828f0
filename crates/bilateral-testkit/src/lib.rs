//! # Bilateral Testkit
//!
//! Testing utilities for bilateral channels.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed channels and movements with their expected
//!   record bytes and chain hashes
//! - **Generators**: Proptest strategies for operation sequences
//! - **Fixtures**: both ends of a channel, driven in lockstep
//!
//! ## Golden Vectors
//!
//! ```rust
//! use bilateral_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, head) in verify_all_vectors() {
//!     assert!(matches, "{} diverged at head {}", name, head);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use bilateral_testkit::{ops, ChannelPair};
//!
//! proptest! {
//!     #[test]
//!     fn stays_mirrored(ops in ops(30)) {
//!         let mut pair = ChannelPair::new("C1");
//!         for op in &ops {
//!             pair.apply(op).unwrap();
//!         }
//!         prop_assert!(pair.is_mirrored());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_trackers, ChannelPair};
pub use generators::{ops, Op, Side};
pub use vectors::{all_vectors, replay_vector, verify_all_vectors, ChainVector};
