//! # wagerbook-ledger
//!
//! **Ledger core**: the source of truth for all custodied value.
//!
//! ## Architecture
//!
//! 1. **`AccountBook`**: per-user available/locked balances and the five
//!    primitive transitions (credit, debit, lock, unlock, consume-locked)
//! 2. **`EntryLog`**: append-only audit trail; every primitive is paired
//!    with exactly one entry, and entries double as idempotency guards
//! 3. **`ConservationTracker`**: external inflow/outflow totals, verified
//!    against actual custody after settlement cycles
//! 4. **`Ledger`**: the facade that binds the three together — one call,
//!    one primitive, one entry
//! 5. **`UserDirectory`**: registration and role grants
//!
//! ## Mutation Flow
//!
//! ```text
//! caller → Ledger.{credit,debit,lock,unlock,consume_locked}(kind, ref, meta)
//!        → AccountBook primitive (validate, then mutate)
//!        → EntryLog.append (same call — never skipped)
//!        → ConservationTracker (external kinds only)
//! ```
//!
//! A validation failure leaves every store untouched: no partial
//! application, ever.

pub mod account_book;
pub mod conservation;
pub mod directory;
pub mod entry_log;
pub mod ledger;

pub use account_book::AccountBook;
pub use conservation::ConservationTracker;
pub use directory::UserDirectory;
pub use entry_log::EntryLog;
pub use ledger::Ledger;
