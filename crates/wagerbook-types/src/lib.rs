//! # wagerbook-types
//!
//! Shared types, errors, and configuration for the **Wagerbook** wagering
//! ledger.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`MatchId`], [`EntryId`], [`DepositId`], [`IntentId`], [`WithdrawalId`]
//! - **Balance model**: [`AccountBalance`]
//! - **Audit model**: [`LedgerEntry`], [`EntryKind`]
//! - **User model**: [`User`]
//! - **Match model**: [`Match`], [`MatchState`], [`GameMode`], [`Team`], [`MatchParticipant`]
//! - **Deposit model**: [`Deposit`], [`DepositIntent`], [`IntentStatus`], [`DepositProvider`]
//! - **Withdrawal model**: [`Withdrawal`], [`WithdrawalStatus`]
//! - **Configuration**: [`FeeConfig`], [`ConversionRate`], [`IntentConfig`], [`SweepConfig`], [`WithdrawalPolicy`]
//! - **Errors**: [`WagerbookError`] with `WB_ERR_` prefix codes
//! - **Constants**: system-wide defaults and conversion factors

pub mod balance;
pub mod config;
pub mod constants;
pub mod deposit;
pub mod entry;
pub mod error;
pub mod ids;
pub mod matches;
pub mod user;
pub mod withdrawal;

// Re-export all primary types at crate root for ergonomic imports:
//   use wagerbook_types::{Match, MatchState, LedgerEntry, ...};

pub use balance::*;
pub use config::*;
pub use deposit::*;
pub use entry::*;
pub use error::*;
pub use ids::*;
pub use matches::*;
pub use user::*;
pub use withdrawal::*;

// Constants are accessed via `wagerbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
