//! Withdrawal processing.
//!
//! Canonical mode is **two-phase**: `request` moves the amount
//! available → locked and records REQUESTED; a privileged `approve` with
//! proof of off-platform payment consumes the lock and marks PAID.
//! `cancel` from REQUESTED releases the lock. Total value ever marked
//! PAID can therefore never exceed what left `available`, and a
//! withdrawal reaches PAID at most once: a retried approval carrying the
//! same proof hash is an idempotent echo, a different hash on a PAID
//! record is a conflict for manual review.
//!
//! **Instant** mode (single-phase debit, PAID immediately, hash reconciled
//! later) is only reachable behind `WithdrawalPolicy::Instant` with an
//! explicit amount cap.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use wagerbook_ledger::Ledger;
use wagerbook_types::{
    ConversionRate, DepositProvider, EntryKind, Result, User, UserId, WagerbookError, Withdrawal,
    WithdrawalId, WithdrawalPolicy, WithdrawalStatus, constants,
};

/// Result of an approve/cancel operation.
#[derive(Debug, Clone)]
pub struct WithdrawOutcome {
    pub withdrawal: Withdrawal,
    /// `true` when the operation recognized prior completion and no-opped.
    pub idempotent: bool,
}

/// Outbound payout requests and their proof-hash index.
#[derive(Debug)]
pub struct WithdrawalDesk {
    policy: WithdrawalPolicy,
    rate: ConversionRate,
    withdrawals: HashMap<WithdrawalId, Withdrawal>,
    by_tx_hash: HashMap<String, WithdrawalId>,
}

impl WithdrawalDesk {
    /// Create a desk with the canonical two-phase policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(WithdrawalPolicy::TwoPhase)
    }

    /// Create a desk with an explicit policy.
    #[must_use]
    pub fn with_policy(policy: WithdrawalPolicy) -> Self {
        Self {
            policy,
            rate: ConversionRate::default(),
            withdrawals: HashMap::new(),
            by_tx_hash: HashMap::new(),
        }
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> WithdrawalPolicy {
        self.policy
    }

    /// File a withdrawal request.
    ///
    /// Two-phase: locks the amount and records REQUESTED. Instant: debits
    /// immediately and records PAID with no proof hash yet.
    ///
    /// # Errors
    /// - `InvalidAmount` for bad amounts or addresses
    /// - `InsufficientFunds` if available < amount
    /// - `InstantLimitExceeded` above the instant-mode cap
    pub fn request(
        &mut self,
        user_id: UserId,
        provider: DepositProvider,
        address: &str,
        amount_wt: i64,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal> {
        if amount_wt <= 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("amount_wt must be a positive integer, got {amount_wt}"),
            });
        }
        let address = address.trim();
        if address.len() < constants::MIN_ADDRESS_LEN {
            return Err(WagerbookError::InvalidAmount {
                reason: "invalid destination address".into(),
            });
        }

        let id = WithdrawalId::new();
        let status = match self.policy {
            WithdrawalPolicy::TwoPhase => {
                ledger.lock(
                    user_id,
                    amount_wt,
                    EntryKind::WithdrawLock,
                    Some(id.to_string()),
                    json!({
                        "provider": provider.to_string(),
                        "address": address,
                        "amount_wt": amount_wt,
                    }),
                )?;
                WithdrawalStatus::Requested
            }
            WithdrawalPolicy::Instant { max_amount_wt } => {
                if amount_wt > max_amount_wt {
                    return Err(WagerbookError::InstantLimitExceeded {
                        amount_wt,
                        max_wt: max_amount_wt,
                    });
                }
                ledger.debit(
                    user_id,
                    amount_wt,
                    EntryKind::Withdrawal,
                    Some(id.to_string()),
                    json!({
                        "provider": provider.to_string(),
                        "address": address,
                        "amount_wt": amount_wt,
                    }),
                )?;
                WithdrawalStatus::Paid
            }
        };

        let withdrawal = Withdrawal {
            id,
            user_id,
            provider,
            address: address.to_string(),
            amount_wt,
            amount_micro: self.rate.micro_from_wt(amount_wt),
            status,
            tx_hash: None,
            created_at: now,
        };
        tracing::info!(
            withdrawal = %id,
            user = %user_id,
            amount_wt,
            status = %withdrawal.status,
            "withdrawal requested"
        );
        self.withdrawals.insert(id, withdrawal.clone());
        Ok(withdrawal)
    }

    /// Approve a REQUESTED withdrawal with proof of off-platform payment.
    ///
    /// # Errors
    /// - `WithdrawalNotFound` / `ProofRequired`
    /// - `ProofMismatch` if PAID under a different hash
    /// - `NotApprovable` if CANCELLED
    /// - `TxHashAlreadyUsed` if the proof settles another withdrawal
    /// - `LockedMismatch` if locked funds no longer cover the amount
    pub fn approve(
        &mut self,
        id: WithdrawalId,
        tx_hash: &str,
        ledger: &mut Ledger,
    ) -> Result<WithdrawOutcome> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(WagerbookError::ProofRequired);
        }

        let wd = self
            .withdrawals
            .get(&id)
            .ok_or(WagerbookError::WithdrawalNotFound)?;

        match wd.status {
            WithdrawalStatus::Paid => {
                // Retried approval with the same proof: echo. Anything
                // else on a PAID record is a manual-review conflict.
                return if wd.tx_hash.as_deref() == Some(tx_hash) {
                    Ok(WithdrawOutcome {
                        withdrawal: wd.clone(),
                        idempotent: true,
                    })
                } else {
                    Err(WagerbookError::ProofMismatch)
                };
            }
            WithdrawalStatus::Cancelled => {
                return Err(WagerbookError::NotApprovable {
                    status: wd.status,
                });
            }
            WithdrawalStatus::Requested => {}
        }

        if let Some(other) = self.by_tx_hash.get(tx_hash) {
            if *other != id {
                return Err(WagerbookError::TxHashAlreadyUsed);
            }
        }

        let (user_id, amount_wt) = (wd.user_id, wd.amount_wt);
        if ledger.balance(user_id).locked < amount_wt {
            return Err(WagerbookError::LockedMismatch(user_id));
        }

        ledger.consume_locked(
            user_id,
            amount_wt,
            EntryKind::WithdrawPayout,
            Some(id.to_string()),
            json!({
                "tx_hash": tx_hash,
                "amount_wt": amount_wt,
            }),
        )?;

        let wd = self
            .withdrawals
            .get_mut(&id)
            .ok_or(WagerbookError::WithdrawalNotFound)?;
        wd.status = WithdrawalStatus::Paid;
        wd.tx_hash = Some(tx_hash.to_string());
        self.by_tx_hash.insert(tx_hash.to_string(), id);

        tracing::info!(withdrawal = %id, user = %user_id, amount_wt, "withdrawal paid");
        Ok(WithdrawOutcome {
            withdrawal: self.withdrawals[&id].clone(),
            idempotent: false,
        })
    }

    /// Cancel a REQUESTED withdrawal and release its lock. Only the
    /// requester or an owner may cancel.
    ///
    /// # Errors
    /// - `WithdrawalNotFound` / `Forbidden`
    /// - `AlreadyPaid` if PAID
    pub fn cancel(
        &mut self,
        id: WithdrawalId,
        actor: &User,
        ledger: &mut Ledger,
    ) -> Result<WithdrawOutcome> {
        let wd = self
            .withdrawals
            .get(&id)
            .ok_or(WagerbookError::WithdrawalNotFound)?;
        if wd.user_id != actor.id && !actor.is_owner {
            return Err(WagerbookError::Forbidden);
        }

        match wd.status {
            WithdrawalStatus::Cancelled => {
                return Ok(WithdrawOutcome {
                    withdrawal: wd.clone(),
                    idempotent: true,
                });
            }
            WithdrawalStatus::Paid => return Err(WagerbookError::AlreadyPaid),
            WithdrawalStatus::Requested => {}
        }

        let (user_id, amount_wt) = (wd.user_id, wd.amount_wt);
        ledger.unlock_clamped(
            user_id,
            amount_wt,
            EntryKind::WithdrawCancelUnlock,
            Some(id.to_string()),
            json!({ "amount_wt": amount_wt }),
        )?;

        let wd = self
            .withdrawals
            .get_mut(&id)
            .ok_or(WagerbookError::WithdrawalNotFound)?;
        wd.status = WithdrawalStatus::Cancelled;

        tracing::info!(withdrawal = %id, user = %user_id, amount_wt, "withdrawal cancelled");
        Ok(WithdrawOutcome {
            withdrawal: self.withdrawals[&id].clone(),
            idempotent: false,
        })
    }

    /// Look up a withdrawal by id.
    #[must_use]
    pub fn get(&self, id: WithdrawalId) -> Option<&Withdrawal> {
        self.withdrawals.get(&id)
    }

    /// All withdrawals for a user, unordered.
    pub fn for_user(&self, user_id: UserId) -> impl Iterator<Item = &Withdrawal> {
        self.withdrawals
            .values()
            .filter(move |w| w.user_id == user_id)
    }

    /// Number of withdrawals on record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.withdrawals.len()
    }

    /// Whether no withdrawal has been filed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.withdrawals.is_empty()
    }
}

impl Default for WithdrawalDesk {
    fn default() -> Self {
        Self::new()
    }
}
