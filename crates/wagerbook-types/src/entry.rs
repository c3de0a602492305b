//! Append-only audit entries for every balance-affecting operation.
//!
//! One entry per causal event. `delta` is the signed change to the user's
//! **total custody** (available + locked): deposits and payouts are
//! positive, withdrawals and consumed escrow negative, lock/unlock zero
//! (balance-neutral transfers between the two fields of one account).
//!
//! Entries double as idempotency guards: re-entrant flows check
//! "does an entry with this kind + ref already exist?" before repeating an
//! effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EntryId, UserId};

/// Fixed taxonomy of audit entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// External funds credited (delta +).
    Deposit,
    /// Instant withdrawal debit (delta -).
    Withdrawal,
    /// Stake moved available → locked on match join (delta 0).
    EscrowLock,
    /// Stake moved locked → available on leave/cancel/refund (delta 0).
    EscrowUnlock,
    /// Winner's share credited at settlement (delta +).
    EscrowPayout,
    /// Loser's stake consumed at settlement (delta -).
    EscrowLost,
    /// Winner's own stake consumed at settlement (delta -).
    EscrowConsumed,
    /// Platform fee credited to the house account (delta +).
    HouseFee,
    /// Manual owner adjustment (delta + or -).
    Adjustment,
    /// Off-platform winnings credited (delta +).
    Winnings,
    /// Withdrawal amount moved available → locked on request (delta 0).
    WithdrawLock,
    /// Locked withdrawal consumed on approval (delta -).
    WithdrawPayout,
    /// Locked withdrawal returned on cancellation (delta 0).
    WithdrawCancelUnlock,
}

impl EntryKind {
    /// Whether this kind represents external value entering custody.
    /// Used by the conservation tracker; escrow kinds are internal
    /// redistribution and count for neither side.
    #[must_use]
    pub fn is_external_inflow(&self) -> bool {
        matches!(self, Self::Deposit | Self::Adjustment | Self::Winnings)
    }

    /// Whether this kind represents value leaving custody for good.
    #[must_use]
    pub fn is_external_outflow(&self) -> bool {
        matches!(
            self,
            Self::Withdrawal | Self::WithdrawPayout | Self::Adjustment
        )
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::EscrowLock => write!(f, "ESCROW_LOCK"),
            Self::EscrowUnlock => write!(f, "ESCROW_UNLOCK"),
            Self::EscrowPayout => write!(f, "ESCROW_PAYOUT"),
            Self::EscrowLost => write!(f, "ESCROW_LOST"),
            Self::EscrowConsumed => write!(f, "ESCROW_CONSUMED"),
            Self::HouseFee => write!(f, "HOUSE_FEE"),
            Self::Adjustment => write!(f, "ADJUSTMENT"),
            Self::Winnings => write!(f, "WINNINGS"),
            Self::WithdrawLock => write!(f, "WITHDRAW_LOCK"),
            Self::WithdrawPayout => write!(f, "WITHDRAW_PAYOUT"),
            Self::WithdrawCancelUnlock => write!(f, "WITHDRAW_CANCEL_UNLOCK"),
        }
    }
}

/// One immutable audit record. Never mutated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    /// Signed change to the user's total custody. Zero for lock/unlock.
    pub delta: i64,
    pub kind: EntryKind,
    /// Optional correlation id (match id, deposit id, withdrawal id, ticket).
    pub ref_id: Option<String>,
    /// Free-form structured detail. Shape varies by kind; display/audit
    /// only, never parsed for control flow.
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(
        user_id: UserId,
        delta: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        meta: Value,
    ) -> Self {
        Self {
            id: EntryId::new(),
            user_id,
            delta,
            kind,
            ref_id,
            meta,
            created_at: Utc::now(),
        }
    }
}
