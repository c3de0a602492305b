//! Per-user balance store with available/locked accounting.
//!
//! The AccountBook is the source of truth for all balance state. All
//! mutations are atomic: either the full operation succeeds or the balance
//! is unchanged. Amounts are strictly positive; a missing account is an
//! implicit zero-balance account, upserted on first touch rather than
//! treated as an error — operations that legitimately require pre-existing
//! funds (debit, lock) fail with `InsufficientFunds` instead.

use std::collections::HashMap;

use wagerbook_types::{AccountBalance, Result, UserId, WagerbookError};

/// Manages user balances with available/locked accounting.
#[derive(Debug, Default)]
pub struct AccountBook {
    accounts: HashMap<UserId, AccountBalance>,
}

impl AccountBook {
    /// Create a new empty account book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    fn check_amount(amount: i64) -> Result<()> {
        if amount <= 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("amount must be positive, got {amount}"),
            });
        }
        Ok(())
    }

    /// Fetch or lazily create the account for a user. Every higher-level
    /// operation can assume an account record exists with zero defaults.
    pub fn get_or_create(&mut self, user_id: UserId) -> &mut AccountBalance {
        self.accounts.entry(user_id).or_default()
    }

    /// Credit available balance.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount <= 0`.
    pub fn credit(&mut self, user_id: UserId, amount: i64) -> Result<AccountBalance> {
        Self::check_amount(amount)?;
        let entry = self.get_or_create(user_id);
        entry.available += amount;
        Ok(*entry)
    }

    /// Debit available balance. Used by instant withdrawals.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn debit(&mut self, user_id: UserId, amount: i64) -> Result<AccountBalance> {
        Self::check_amount(amount)?;
        let entry = self.get_or_create(user_id);
        if entry.available < amount {
            return Err(WagerbookError::InsufficientFunds {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        Ok(*entry)
    }

    /// Lock funds (available → locked). Used on match join and two-phase
    /// withdrawal request.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn lock(&mut self, user_id: UserId, amount: i64) -> Result<AccountBalance> {
        Self::check_amount(amount)?;
        let entry = self.get_or_create(user_id);
        if entry.available < amount {
            return Err(WagerbookError::InsufficientFunds {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        entry.locked += amount;
        Ok(*entry)
    }

    /// Unlock funds (locked → available). Used on leave/cancel.
    ///
    /// # Errors
    /// Returns `InsufficientLocked` if locked < amount.
    pub fn unlock(&mut self, user_id: UserId, amount: i64) -> Result<AccountBalance> {
        Self::check_amount(amount)?;
        let entry = self.get_or_create(user_id);
        if entry.locked < amount {
            return Err(WagerbookError::InsufficientLocked);
        }
        entry.locked -= amount;
        entry.available += amount;
        Ok(*entry)
    }

    /// Drift-tolerant unlock used by refund paths: always credits the full
    /// `amount` to available, but only removes `min(locked, amount)` from
    /// locked. Returns the balance and the amount actually removed from
    /// locked.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount <= 0`.
    pub fn unlock_clamped(
        &mut self,
        user_id: UserId,
        amount: i64,
    ) -> Result<(AccountBalance, i64)> {
        Self::check_amount(amount)?;
        let entry = self.get_or_create(user_id);
        let removed = entry.locked.min(amount);
        entry.locked -= removed;
        entry.available += amount;
        Ok((*entry, removed))
    }

    /// Consume locked funds: locked decreases with no corresponding
    /// available increase. The value is transferred out of this account —
    /// settlement credits the winner separately.
    ///
    /// # Errors
    /// Returns `InsufficientLocked` if locked < amount.
    pub fn consume_locked(&mut self, user_id: UserId, amount: i64) -> Result<AccountBalance> {
        Self::check_amount(amount)?;
        let entry = self.get_or_create(user_id);
        if entry.locked < amount {
            return Err(WagerbookError::InsufficientLocked);
        }
        entry.locked -= amount;
        Ok(*entry)
    }

    /// Read a user's balance. Missing accounts read as zero.
    #[must_use]
    pub fn balance(&self, user_id: UserId) -> AccountBalance {
        self.accounts.get(&user_id).copied().unwrap_or_default()
    }

    /// Total custodied value across all accounts: Σ(available + locked).
    #[must_use]
    pub fn total_custody(&self) -> i64 {
        self.accounts.values().map(AccountBalance::total).sum()
    }

    /// Number of materialized accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account has been materialized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_increases_available() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 1_000).unwrap();
        let bal = book.balance(user);
        assert_eq!(bal.available, 1_000);
        assert_eq!(bal.locked, 0);
    }

    #[test]
    fn missing_account_reads_zero() {
        let book = AccountBook::new();
        assert!(book.balance(UserId::new()).is_zero());
        assert_eq!(book.total_custody(), 0);
    }

    #[test]
    fn debit_requires_funds() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 100).unwrap();
        let err = book.debit(user, 200).unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientFunds { .. }));
        // Balance unchanged
        assert_eq!(book.balance(user).available, 100);
    }

    #[test]
    fn debit_on_missing_account_fails() {
        let mut book = AccountBook::new();
        let err = book.debit(UserId::new(), 1).unwrap_err();
        assert!(matches!(
            err,
            WagerbookError::InsufficientFunds {
                needed: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn lock_moves_to_locked() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 1_000).unwrap();
        book.lock(user, 400).unwrap();
        let bal = book.balance(user);
        assert_eq!(bal.available, 600);
        assert_eq!(bal.locked, 400);
        assert_eq!(bal.total(), 1_000);
    }

    #[test]
    fn lock_insufficient_fails() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 100).unwrap();
        let err = book.lock(user, 200).unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientFunds { .. }));
    }

    #[test]
    fn unlock_restores_available() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 1_000).unwrap();
        book.lock(user, 400).unwrap();
        book.unlock(user, 400).unwrap();
        let bal = book.balance(user);
        assert_eq!(bal.available, 1_000);
        assert_eq!(bal.locked, 0);
    }

    #[test]
    fn unlock_beyond_locked_fails() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 1_000).unwrap();
        book.lock(user, 100).unwrap();
        let err = book.unlock(user, 200).unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientLocked));
    }

    #[test]
    fn unlock_clamped_tolerates_drift() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 100).unwrap();
        book.lock(user, 30).unwrap();

        // Refund of 50 against only 30 locked: full 50 credited, 30 removed.
        let (bal, removed) = book.unlock_clamped(user, 50).unwrap();
        assert_eq!(removed, 30);
        assert_eq!(bal.locked, 0);
        assert_eq!(bal.available, 120);
    }

    #[test]
    fn consume_locked_reduces_custody() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 1_000).unwrap();
        book.lock(user, 500).unwrap();
        book.consume_locked(user, 500).unwrap();
        let bal = book.balance(user);
        assert_eq!(bal.available, 500);
        assert_eq!(bal.locked, 0);
        assert_eq!(book.total_custody(), 500);
    }

    #[test]
    fn consume_beyond_locked_fails() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        book.credit(user, 100).unwrap();
        book.lock(user, 50).unwrap();
        let err = book.consume_locked(user, 51).unwrap_err();
        assert!(matches!(err, WagerbookError::InsufficientLocked));
    }

    #[test]
    fn zero_and_negative_amounts_rejected() {
        let mut book = AccountBook::new();
        let user = UserId::new();
        for amount in [0, -1] {
            assert!(matches!(
                book.credit(user, amount).unwrap_err(),
                WagerbookError::InvalidAmount { .. }
            ));
            assert!(matches!(
                book.lock(user, amount).unwrap_err(),
                WagerbookError::InvalidAmount { .. }
            ));
        }
    }

    #[test]
    fn total_custody_sums_all_users() {
        let mut book = AccountBook::new();
        let u1 = UserId::new();
        let u2 = UserId::new();
        book.credit(u1, 1_000).unwrap();
        book.credit(u2, 500).unwrap();
        book.lock(u1, 300).unwrap();
        assert_eq!(book.total_custody(), 1_500);
    }

    #[test]
    fn non_negativity_over_random_operations() {
        let mut book = AccountBook::new();
        let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        for user in &users {
            book.credit(*user, 1_000).unwrap();
        }

        for i in 0..500_u32 {
            let user = users[(rand::random::<u32>() % 4) as usize];
            let amount = i64::from(rand::random::<u16>() % 400) + 1;
            // Outcomes don't matter — the invariant must hold regardless.
            let _ = match i % 5 {
                0 => book.credit(user, amount).map(|_| ()),
                1 => book.debit(user, amount).map(|_| ()),
                2 => book.lock(user, amount).map(|_| ()),
                3 => book.unlock(user, amount).map(|_| ()),
                _ => book.consume_locked(user, amount).map(|_| ()),
            };
            for user in &users {
                let bal = book.balance(*user);
                assert!(bal.available >= 0, "available went negative");
                assert!(bal.locked >= 0, "locked went negative");
            }
        }
    }
}
