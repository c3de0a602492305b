//! The ledger facade: one call, one primitive, one audit entry.
//!
//! Callers never touch the [`AccountBook`] directly for mutations — every
//! balance change goes through this facade so the pairing "primitive +
//! entry in the same step" can never be skipped. The facade also routes
//! external-money kinds into the [`ConservationTracker`]; escrow kinds are
//! internal redistribution and bypass it, which is what makes
//! [`Ledger::verify_conservation`] a meaningful settlement check.

use serde_json::{Value, json};
use wagerbook_types::{AccountBalance, EntryKind, LedgerEntry, Result, UserId, WagerbookError};

use crate::{AccountBook, ConservationTracker, EntryLog};

/// Account store + entry log + conservation tracker, mutated in lock-step.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: AccountBook,
    log: EntryLog,
    conservation: ConservationTracker,
}

impl Ledger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: AccountBook::new(),
            log: EntryLog::new(),
            conservation: ConservationTracker::new(),
        }
    }

    /// Credit available balance. Entry delta is `+amount`.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount <= 0`.
    pub fn credit(
        &mut self,
        user_id: UserId,
        amount: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        meta: Value,
    ) -> Result<AccountBalance> {
        let balance = self.accounts.credit(user_id, amount)?;
        if kind.is_external_inflow() {
            self.conservation.record_inflow(amount);
        }
        self.log
            .append(LedgerEntry::new(user_id, amount, kind, ref_id, meta));
        tracing::debug!(user = %user_id, amount, kind = %kind, "ledger credit");
        Ok(balance)
    }

    /// Debit available balance. Entry delta is `-amount`.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn debit(
        &mut self,
        user_id: UserId,
        amount: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        meta: Value,
    ) -> Result<AccountBalance> {
        let balance = self.accounts.debit(user_id, amount)?;
        if kind.is_external_outflow() {
            self.conservation.record_outflow(amount);
        }
        self.log
            .append(LedgerEntry::new(user_id, -amount, kind, ref_id, meta));
        tracing::debug!(user = %user_id, amount, kind = %kind, "ledger debit");
        Ok(balance)
    }

    /// Lock funds (available → locked). Entry delta is 0: custody is
    /// unchanged, only its shape.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn lock(
        &mut self,
        user_id: UserId,
        amount: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        meta: Value,
    ) -> Result<AccountBalance> {
        let balance = self.accounts.lock(user_id, amount)?;
        self.log
            .append(LedgerEntry::new(user_id, 0, kind, ref_id, meta));
        tracing::debug!(user = %user_id, amount, kind = %kind, "ledger lock");
        Ok(balance)
    }

    /// Unlock funds (locked → available). Entry delta is 0.
    ///
    /// # Errors
    /// Returns `InsufficientLocked` if locked < amount.
    pub fn unlock(
        &mut self,
        user_id: UserId,
        amount: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        meta: Value,
    ) -> Result<AccountBalance> {
        let balance = self.accounts.unlock(user_id, amount)?;
        self.log
            .append(LedgerEntry::new(user_id, 0, kind, ref_id, meta));
        tracing::debug!(user = %user_id, amount, kind = %kind, "ledger unlock");
        Ok(balance)
    }

    /// Drift-tolerant unlock for refund paths: credits the full amount,
    /// removes `min(locked, amount)` from locked. When the removed amount
    /// falls short, the shortfall is external inflow (the books held less
    /// than they owed) and is recorded as such so conservation still holds.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount <= 0`.
    pub fn unlock_clamped(
        &mut self,
        user_id: UserId,
        amount: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        mut meta: Value,
    ) -> Result<AccountBalance> {
        let (balance, removed) = self.accounts.unlock_clamped(user_id, amount)?;
        let shortfall = amount - removed;
        if shortfall > 0 {
            self.conservation.record_inflow(shortfall);
            if let Some(map) = meta.as_object_mut() {
                map.insert("drift_wt".into(), json!(shortfall));
            }
            tracing::warn!(
                user = %user_id,
                amount,
                removed,
                "clamped unlock hit locked-balance drift"
            );
        }
        self.log
            .append(LedgerEntry::new(user_id, shortfall, kind, ref_id, meta));
        Ok(balance)
    }

    /// Consume locked funds: custody decreases by `amount` with no credit
    /// back to this account. Entry delta is `-amount`.
    ///
    /// # Errors
    /// Returns `InsufficientLocked` if locked < amount.
    pub fn consume_locked(
        &mut self,
        user_id: UserId,
        amount: i64,
        kind: EntryKind,
        ref_id: Option<String>,
        meta: Value,
    ) -> Result<AccountBalance> {
        let balance = self.accounts.consume_locked(user_id, amount)?;
        if kind.is_external_outflow() {
            self.conservation.record_outflow(amount);
        }
        self.log
            .append(LedgerEntry::new(user_id, -amount, kind, ref_id, meta));
        tracing::debug!(user = %user_id, amount, kind = %kind, "ledger consume");
        Ok(balance)
    }

    /// Owner adjustment: positive delta credits, negative debits. With
    /// `clamp` a debit beyond available is reduced to what the account
    /// holds instead of rejected. Returns the balance and the delta
    /// actually applied.
    ///
    /// # Errors
    /// - `InvalidAmount` if `delta == 0`
    /// - `InsufficientFunds` if debiting beyond available without `clamp`,
    ///   or if clamping leaves nothing to apply
    pub fn adjust(
        &mut self,
        user_id: UserId,
        delta: i64,
        ref_id: Option<String>,
        note: Option<String>,
        clamp: bool,
    ) -> Result<(AccountBalance, i64)> {
        if delta == 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: "adjustment delta must be non-zero".into(),
            });
        }
        let meta = json!({ "note": note });
        if delta > 0 {
            let balance = self.credit(user_id, delta, EntryKind::Adjustment, ref_id, meta)?;
            return Ok((balance, delta));
        }

        let mut applied = -delta;
        let available = self.accounts.balance(user_id).available;
        if available < applied {
            if !clamp {
                return Err(WagerbookError::InsufficientFunds {
                    needed: applied,
                    available,
                });
            }
            applied = available;
            if applied == 0 {
                return Err(WagerbookError::InsufficientFunds {
                    needed: -delta,
                    available: 0,
                });
            }
        }
        let balance = self.debit(user_id, applied, EntryKind::Adjustment, ref_id, meta)?;
        Ok((balance, -applied))
    }

    /// Read a user's balance. Missing accounts read as zero.
    #[must_use]
    pub fn balance(&self, user_id: UserId) -> AccountBalance {
        self.accounts.balance(user_id)
    }

    /// The append-only audit log.
    #[must_use]
    pub fn log(&self) -> &EntryLog {
        &self.log
    }

    /// The underlying account book (read-only).
    #[must_use]
    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    /// Verify the conservation invariant against actual custody.
    ///
    /// # Errors
    /// Returns `ConservationViolation` if the books don't balance.
    pub fn verify_conservation(&self) -> Result<()> {
        self.conservation.verify(self.accounts.total_custody())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_writes_one_entry() {
        let mut ledger = Ledger::new();
        let user = UserId::new();

        ledger
            .credit(user, 1_000, EntryKind::Deposit, None, json!({}))
            .unwrap();
        ledger
            .lock(user, 400, EntryKind::EscrowLock, Some("m:1".into()), json!({}))
            .unwrap();
        ledger
            .unlock(user, 400, EntryKind::EscrowUnlock, Some("m:1".into()), json!({}))
            .unwrap();
        ledger
            .debit(user, 100, EntryKind::Withdrawal, None, json!({}))
            .unwrap();

        assert_eq!(ledger.log().len(), 4);
    }

    #[test]
    fn failed_operation_writes_nothing() {
        let mut ledger = Ledger::new();
        let user = UserId::new();
        let err = ledger
            .debit(user, 100, EntryKind::Withdrawal, None, json!({}))
            .unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientFunds { .. }));
        assert!(ledger.log().is_empty());
        assert!(ledger.verify_conservation().is_ok());
    }

    #[test]
    fn deltas_follow_custody_semantics() {
        let mut ledger = Ledger::new();
        let user = UserId::new();

        ledger
            .credit(user, 500, EntryKind::Deposit, None, json!({}))
            .unwrap();
        ledger
            .lock(user, 200, EntryKind::EscrowLock, Some("m:1".into()), json!({}))
            .unwrap();
        ledger
            .consume_locked(user, 200, EntryKind::EscrowLost, Some("m:1".into()), json!({}))
            .unwrap();

        let deltas: Vec<i64> = ledger.log().entries_for(user).map(|e| e.delta).collect();
        assert_eq!(deltas, vec![500, 0, -200]);
        assert_eq!(ledger.log().net_delta_for(user), ledger.balance(user).total());
    }

    #[test]
    fn conservation_tracks_external_flows_only() {
        let mut ledger = Ledger::new();
        let alice = UserId::new();
        let bob = UserId::new();

        ledger
            .credit(alice, 1_000, EntryKind::Deposit, None, json!({}))
            .unwrap();
        ledger
            .lock(alice, 300, EntryKind::EscrowLock, Some("m:1".into()), json!({}))
            .unwrap();
        // Internal redistribution: consume alice's stake, pay bob.
        ledger
            .consume_locked(alice, 300, EntryKind::EscrowLost, Some("m:1".into()), json!({}))
            .unwrap();
        ledger
            .credit(bob, 300, EntryKind::EscrowPayout, Some("m:1".into()), json!({}))
            .unwrap();

        ledger.verify_conservation().unwrap();

        // External outflow changes the expectation.
        ledger
            .debit(bob, 100, EntryKind::Withdrawal, None, json!({}))
            .unwrap();
        ledger.verify_conservation().unwrap();
    }

    #[test]
    fn leaked_settlement_breaks_conservation() {
        let mut ledger = Ledger::new();
        let alice = UserId::new();

        ledger
            .credit(alice, 200, EntryKind::Deposit, None, json!({}))
            .unwrap();
        ledger
            .lock(alice, 200, EntryKind::EscrowLock, Some("m:1".into()), json!({}))
            .unwrap();
        // Consume without paying anyone: 200 WT vanished from custody.
        ledger
            .consume_locked(alice, 200, EntryKind::EscrowLost, Some("m:1".into()), json!({}))
            .unwrap();

        let err = ledger.verify_conservation().unwrap_err();
        assert!(matches!(err, WagerbookError::ConservationViolation { .. }));
    }

    #[test]
    fn unlock_clamped_records_drift_as_inflow() {
        let mut ledger = Ledger::new();
        let user = UserId::new();
        ledger
            .credit(user, 100, EntryKind::Deposit, None, json!({}))
            .unwrap();
        ledger
            .lock(user, 30, EntryKind::EscrowLock, Some("m:1".into()), json!({}))
            .unwrap();

        // Refund 50 against 30 locked: 20 WT of drift credited.
        ledger
            .unlock_clamped(user, 50, EntryKind::EscrowUnlock, Some("m:1".into()), json!({}))
            .unwrap();

        assert_eq!(ledger.balance(user).available, 120);
        assert_eq!(ledger.balance(user).locked, 0);
        ledger.verify_conservation().unwrap();

        let entry = ledger
            .log()
            .entries_for_ref("m:1")
            .find(|e| e.kind == EntryKind::EscrowUnlock)
            .unwrap();
        assert_eq!(entry.delta, 20);
        assert_eq!(entry.meta["drift_wt"], json!(20));
    }

    #[test]
    fn adjust_credit_and_debit() {
        let mut ledger = Ledger::new();
        let user = UserId::new();

        let (bal, applied) = ledger.adjust(user, 500, None, Some("seed".into()), false).unwrap();
        assert_eq!(applied, 500);
        assert_eq!(bal.available, 500);

        let (bal, applied) = ledger.adjust(user, -200, None, None, false).unwrap();
        assert_eq!(applied, -200);
        assert_eq!(bal.available, 300);

        ledger.verify_conservation().unwrap();
    }

    #[test]
    fn adjust_debit_clamps_when_asked() {
        let mut ledger = Ledger::new();
        let user = UserId::new();
        ledger.adjust(user, 100, None, None, false).unwrap();

        let err = ledger.adjust(user, -500, None, None, false).unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientFunds { .. }));

        let (bal, applied) = ledger.adjust(user, -500, None, None, true).unwrap();
        assert_eq!(applied, -100);
        assert_eq!(bal.available, 0);

        // Clamping an empty account still fails.
        let err = ledger.adjust(user, -500, None, None, true).unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientFunds { .. }));
    }

    #[test]
    fn zero_adjustment_rejected() {
        let mut ledger = Ledger::new();
        let err = ledger.adjust(UserId::new(), 0, None, None, false).unwrap_err();
        assert!(matches!(err, WagerbookError::InvalidAmount { .. }));
    }

    #[test]
    fn winnings_credit_counts_as_inflow() {
        let mut ledger = Ledger::new();
        let user = UserId::new();
        ledger
            .credit(
                user,
                250,
                EntryKind::Winnings,
                Some("event:offplatform".into()),
                json!({ "source": "tournament" }),
            )
            .unwrap();
        assert_eq!(ledger.balance(user).available, 250);
        ledger.verify_conservation().unwrap();
    }
}
