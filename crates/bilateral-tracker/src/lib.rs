//! # Bilateral Tracker
//!
//! The registry of bilateral channels owned by one local party, and the
//! net settlement view derived from their balances.
//!
//! ## Key Types
//!
//! - [`Tracker`] - Routes open/send/receive/net/delete to channels by id
//! - [`TrackerError`] - The error kinds surfaced to callers
//!
//! ## Usage
//!
//! ```rust
//! use bilateral_tracker::Tracker;
//!
//! let mut tracker = Tracker::new("alice");
//! tracker.open("C1", "bob").unwrap();
//! tracker.send("C1", "USD", 100).unwrap();
//! tracker.receive("C1", "USD", 50, &b"sig"[..]).unwrap();
//!
//! let net = tracker.net("C1").unwrap();
//! assert_eq!(net[0].amount, 50);
//! ```
//!
//! ## Design Notes
//!
//! - **No persistence**: channels serialize with serde; storing them is the
//!   caller's job. [`Tracker::restore`] re-inserts a snapshot.
//! - **No locking**: concurrent use of one tracker must be serialized by the
//!   caller. Distinct trackers share nothing.
//! - **No ordering rules**: the acknowledgment and sequence-gap rules live in
//!   the sync layer, not here.

pub mod error;
pub mod net;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use net::{net_transfers, obligations};
pub use tracker::Tracker;
