//! Deposit models: pending intents and realized credits.
//!
//! A [`DepositIntent`] is the promise of an external payment: the user is
//! handed a payment target + unique reference, and the on-chain oracle later
//! resolves it. A [`Deposit`] is the realized inbound transfer; its unique
//! transaction hash is the system's primary duplicate-credit defense.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DepositId, IntentId, UserId};

/// Payment provider tag, as reported by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositProvider {
    Solflare,
    Coinbase,
    Phantom,
    Other,
}

impl std::fmt::Display for DepositProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solflare => write!(f, "solflare"),
            Self::Coinbase => write!(f, "coinbase"),
            Self::Phantom => write!(f, "phantom"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Lifecycle status of a deposit intent.
///
/// `Pending → Credited` (payment confirmed) or `Pending → Expired`
/// (deadline passed). `Expired → Credited` exists only for the explicit
/// operator-override path. CREDITED is terminal; the deposit link and
/// hash are immutable once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
    Pending,
    Credited,
    Expired,
}

impl IntentStatus {
    /// Can this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Credited | Self::Expired) | (Self::Expired, Self::Credited)
        )
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Credited => write!(f, "CREDITED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A pending promise of an external payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositIntent {
    pub id: IntentId,
    pub user_id: UserId,
    /// Requested USD amount, in integer cents.
    pub amount_usd_cents: i64,
    /// Requested WT amount.
    pub amount_wt: i64,
    /// Unique external correlation reference handed to the payer.
    pub reference: String,
    pub status: IntentStatus,
    /// Set once CREDITED; immutable thereafter.
    pub credited_deposit_id: Option<DepositId>,
    /// External transaction hash, set once CREDITED.
    pub tx_hash: Option<String>,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DepositIntent {
    /// Whether this intent's payment deadline has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A realized, credited inbound transfer. Created exactly once per unique
/// transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub user_id: UserId,
    pub provider: DepositProvider,
    /// Unique on-chain/processor transaction id — global idempotency key.
    pub tx_hash: String,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    /// External amount actually received, in micro-units of stablecoin.
    pub amount_micro: i64,
    /// WT amount credited to the ledger.
    pub amount_wt: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_status_transitions() {
        assert!(IntentStatus::Pending.can_transition_to(IntentStatus::Credited));
        assert!(IntentStatus::Pending.can_transition_to(IntentStatus::Expired));
        assert!(!IntentStatus::Credited.can_transition_to(IntentStatus::Expired));
        assert!(!IntentStatus::Credited.can_transition_to(IntentStatus::Pending));
        // Override-only path.
        assert!(IntentStatus::Expired.can_transition_to(IntentStatus::Credited));
    }

    #[test]
    fn provider_display_lowercase() {
        assert_eq!(format!("{}", DepositProvider::Solflare), "solflare");
        assert_eq!(format!("{}", DepositProvider::Other), "other");
    }

    #[test]
    fn intent_expiry_check() {
        let now = Utc::now();
        let intent = DepositIntent {
            id: IntentId::new(),
            user_id: UserId::new(),
            amount_usd_cents: 500,
            amount_wt: 50,
            reference: "ref".into(),
            status: IntentStatus::Pending,
            credited_deposit_id: None,
            tx_hash: None,
            meta: Value::Null,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(15),
        };
        assert!(!intent.is_expired(now));
        assert!(intent.is_expired(now + chrono::Duration::minutes(16)));
        // Boundary: expiry instant itself counts as expired.
        assert!(intent.is_expired(intent.expires_at));
    }
}
