//! Balance tracking types for the Wagerbook escrow model.
//!
//! Every user has an `available` balance (spendable, withdrawable) and a
//! `locked` balance (escrowed by an active match stake or a pending
//! withdrawal). Both are non-negative integer WT amounts; `available +
//! locked` is the user's total custodied value.

use serde::{Deserialize, Serialize};

/// A single user's ledger account balance, in integer WT.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountBalance {
    /// Spendable: usable for stakes and withdrawals.
    pub available: i64,
    /// Escrowed: reserved for an active match stake or pending withdrawal.
    pub locked: i64,
}

impl AccountBalance {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: 0,
            locked: 0,
        }
    }

    /// Total custodied value (available + locked).
    #[must_use]
    pub fn total(&self) -> i64 {
        self.available + self.locked
    }

    /// Whether this account holds no value at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.locked == 0
    }
}

impl Default for AccountBalance {
    fn default() -> Self {
        Self::new()
    }
}
