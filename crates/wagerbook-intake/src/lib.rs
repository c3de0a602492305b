//! # wagerbook-intake
//!
//! **Money in/out plane**: converts external payment confirmations into
//! ledger credits and processes outbound withdrawals.
//!
//! ## Architecture
//!
//! 1. **`DepositDesk`**: deposit intents (PENDING → CREDITED | EXPIRED),
//!    oracle confirmations keyed by unique transaction hash, dev/admin
//!    direct credits, and intent expiry
//! 2. **`WithdrawalDesk`**: two-phase request/approve/cancel (canonical) or
//!    instant single-phase behind a low-amount policy cap
//!
//! ## Deposit Flow
//!
//! ```text
//! create_intent → (user pays externally) → oracle → confirm
//!              → Deposit row + Ledger.credit (same step)
//! ```
//!
//! The oracle is an at-least-once producer: `confirm` with an already-seen
//! transaction hash is an idempotent echo, never a second credit.

pub mod deposit_desk;
pub mod withdrawal_desk;

pub use deposit_desk::{DepositConfirmation, DepositDesk, DepositOutcome, IntentAmount};
pub use withdrawal_desk::{WithdrawOutcome, WithdrawalDesk};
