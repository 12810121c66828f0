//! Convergence verification between the two ends of a channel.
//!
//! Given both sides' channel snapshots, decide whether they agree, whether
//! one side is simply behind (a transfer still in flight), or whether the
//! histories forked.

use bilateral_core::chain::first_divergence;
use bilateral_core::{ChainHash, Channel, PartyId};

use crate::error::Result;

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Same history, same chain head, mirrored balances.
    Converged,
    /// Not (yet) in agreement; one side may be behind.
    NotConverged { reason: String },
    /// The histories disagree at `at_seq`.
    Forked {
        at_seq: u64,
        local_hash: ChainHash,
        remote_hash: ChainHash,
    },
}

impl ConvergenceResult {
    /// Check if both sides have converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }

    /// Check if a fork was detected.
    pub fn is_forked(&self) -> bool {
        matches!(self, ConvergenceResult::Forked { .. })
    }
}

/// Compare the local and remote views of one channel.
pub fn verify_convergence(
    local_party: &PartyId,
    local: &Channel,
    remote_party: &PartyId,
    remote: &Channel,
) -> Result<ConvergenceResult> {
    if local.id() != remote.id() {
        return Ok(ConvergenceResult::NotConverged {
            reason: format!("channel mismatch: local={}, remote={}", local.id(), remote.id()),
        });
    }
    if local.counterparty() != remote_party || remote.counterparty() != local_party {
        return Ok(ConvergenceResult::NotConverged {
            reason: "channels are not between the same two parties".into(),
        });
    }

    let local_trail = local.chain_trail(local_party)?;
    let remote_trail = remote.chain_trail(remote_party)?;

    if let Some(i) = first_divergence(&local_trail, &remote_trail) {
        if i < local_trail.len() && i < remote_trail.len() {
            return Ok(ConvergenceResult::Forked {
                at_seq: i as u64 + 1,
                local_hash: local_trail[i],
                remote_hash: remote_trail[i],
            });
        }
        return Ok(ConvergenceResult::NotConverged {
            reason: format!(
                "seq mismatch: local={}, remote={}",
                local_trail.len(),
                remote_trail.len()
            ),
        });
    }

    if !local.verify_history(local_party)? || !remote.verify_history(remote_party)? {
        return Ok(ConvergenceResult::NotConverged {
            reason: "stored chain hash does not match history".into(),
        });
    }

    let mirrored = local
        .balances()
        .keys()
        .chain(remote.balances().keys())
        .all(|asset| i128::from(local.balance(asset)) == -i128::from(remote.balance(asset)));
    if !mirrored {
        return Ok(ConvergenceResult::NotConverged {
            reason: "balances are not mirrored".into(),
        });
    }

    Ok(ConvergenceResult::Converged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilateral_core::ChannelId;
    use bytes::Bytes;

    fn alice() -> PartyId {
        PartyId::from("alice")
    }

    fn bob() -> PartyId {
        PartyId::from("bob")
    }

    fn open_pair() -> (Channel, Channel) {
        (
            Channel::open(ChannelId::from("C1"), &alice(), bob()),
            Channel::open(ChannelId::from("C1"), &bob(), alice()),
        )
    }

    #[test]
    fn test_mirrored_channels_converge() {
        let (mut a, mut b) = open_pair();
        a.record_send(&alice(), "USD", 10).unwrap();
        b.record_receive(&bob(), "USD", 10, Bytes::new()).unwrap();

        let result = verify_convergence(&alice(), &a, &bob(), &b).unwrap();
        assert!(result.is_converged());
    }

    #[test]
    fn test_in_flight_transfer_is_not_converged() {
        let (mut a, b) = open_pair();
        a.record_send(&alice(), "USD", 10).unwrap();

        let result = verify_convergence(&alice(), &a, &bob(), &b).unwrap();
        assert!(!result.is_converged());
        assert!(!result.is_forked());
    }

    #[test]
    fn test_simultaneous_sends_fork() {
        let (mut a, mut b) = open_pair();
        a.record_send(&alice(), "USD", 10).unwrap();
        b.record_send(&bob(), "USD", 3).unwrap();

        let result = verify_convergence(&alice(), &a, &bob(), &b).unwrap();
        assert!(matches!(result, ConvergenceResult::Forked { at_seq: 1, .. }));
    }

    #[test]
    fn test_wrong_counterparty_is_not_converged() {
        let (a, _) = open_pair();
        let c = Channel::open(ChannelId::from("C1"), &PartyId::from("carol"), alice());
        let result = verify_convergence(&alice(), &a, &PartyId::from("carol"), &c).unwrap();
        assert!(!result.is_converged());
    }
}
