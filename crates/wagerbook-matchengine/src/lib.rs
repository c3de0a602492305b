//! # wagerbook-matchengine
//!
//! **Escrow/match engine**: the match lifecycle state machine that locks
//! stakes on join and, on settlement, consumes escrow and distributes
//! payouts minus the platform fee.
//!
//! ## Architecture
//!
//! 1. **`MatchEngine`**: create / join / leave / cancel / settle, driving
//!    the ledger primitives — every stake movement goes through
//!    [`wagerbook_ledger::Ledger`], never around it
//! 2. **`Sweeper`**: externally-triggered reconciliation that force-cancels
//!    idle OPEN/FULL matches and refunds escrow, safe to re-run
//!
//! ## Settlement Flow
//!
//! ```text
//! settle(winner) → validate (auth, state, winner, locked balances)
//!               → ConsumeLocked(stake) for every participant
//!               → Credit winners (floor split, remainder to first)
//!               → Credit house fee
//!               → state COMPLETE + stored payout summary
//! ```
//!
//! Validation happens in full before the first mutation, so a rejected
//! settlement leaves the books untouched, and a replayed settlement
//! echoes the stored summary instead of re-applying effects.

pub mod engine;
pub mod sweeper;

pub use engine::{CancelOutcome, JoinOutcome, LeaveOutcome, MatchEngine, PayoutSummary, SettleOutcome};
pub use sweeper::{SweepReport, SweepResult, Sweeper};
