//! Outbound withdrawal model.
//!
//! `Requested → Paid` (operator approval with proof of off-platform
//! payment) or `Requested → Cancelled` (requester abort). PAID and
//! CANCELLED are terminal; a withdrawal transitions to PAID at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DepositProvider, UserId, WithdrawalId};

/// Lifecycle status of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Requested,
    Paid,
    Cancelled,
}

impl WithdrawalStatus {
    /// Can this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Requested, Self::Paid | Self::Cancelled)
        )
    }

    /// Whether this status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "REQUESTED"),
            Self::Paid => write!(f, "PAID"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// An outbound payout request, settled off-platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub provider: DepositProvider,
    /// Destination address for the off-platform transfer.
    pub address: String,
    /// Requested WT amount.
    pub amount_wt: i64,
    /// External-currency snapshot at request time, in micro-units.
    pub amount_micro: i64,
    pub status: WithdrawalStatus,
    /// Proof-of-payment hash, set on approval. Instant-mode payouts carry
    /// `None` until reconciled.
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_can_pay_or_cancel() {
        assert!(WithdrawalStatus::Requested.can_transition_to(WithdrawalStatus::Paid));
        assert!(WithdrawalStatus::Requested.can_transition_to(WithdrawalStatus::Cancelled));
    }

    #[test]
    fn terminal_states_frozen() {
        for terminal in [WithdrawalStatus::Paid, WithdrawalStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for target in [
                WithdrawalStatus::Requested,
                WithdrawalStatus::Paid,
                WithdrawalStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn status_display() {
        assert_eq!(format!("{}", WithdrawalStatus::Requested), "REQUESTED");
        assert_eq!(format!("{}", WithdrawalStatus::Paid), "PAID");
    }
}
