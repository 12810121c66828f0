//! # Bilateral Sync
//!
//! Acknowledged transfers between the two ends of a channel.
//!
//! ## Overview
//!
//! The tracker records whatever it is told. This crate adds the rules that
//! keep two trackers in lockstep: a sender records a transfer and announces
//! it with a signature over the resulting chain hash; the receiver checks
//! sequence, signature and chain hash before recording it, then answers
//! with its own signature. A sender has at most one unacknowledged transfer
//! per channel.
//!
//! ## Key Properties
//!
//! - **Ordered**: a request must carry exactly the receiver's next seq
//! - **Verified before recorded**: a refused request changes nothing
//! - **Tamper-evident**: every signature commits to the whole history
//!
//! ## Message Flow
//!
//! ```text
//! Node A                              Node B
//!   |-------- Transfer(seq, hash) ---->|
//!   |<------- Ack(seq, hash) ----------|
//! ```
//!
//! If both sides send at the same time, each refuses the other's request as
//! stale and the channel has forked. [`verify_convergence`] reports it.

pub mod convergence;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod transport;

pub use convergence::{verify_convergence, ConvergenceResult};
pub use error::{Result, SyncError};
pub use messages::{
    decode_message, encode_message, limits, statement, NodeId, RejectCode, SyncMessage,
    TransferAck, TransferReject, TransferRequest, STATEMENT_DOMAIN,
};
pub use protocol::{Event, Exchange, SyncConfig};
pub use session::{ChannelSession, PendingTransfer};
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, Transport};
