//! Append-only audit trail.
//!
//! Every balance-affecting (or balance-neutral-but-notable) operation
//! writes one immutable entry. Besides audit, the log is the system's
//! idempotency guard: re-entrant flows (sweeper retries, settlement
//! replays) check for an existing kind + ref entry before repeating an
//! effect.

use wagerbook_types::{EntryKind, LedgerEntry, UserId};

/// Append-only store of [`LedgerEntry`] records.
#[derive(Debug, Default)]
pub struct EntryLog {
    entries: Vec<LedgerEntry>,
}

impl EntryLog {
    /// Create a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry. Entries are never mutated or removed.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Idempotency guard: does an entry with this user + kind + ref exist?
    #[must_use]
    pub fn has_entry(&self, user_id: UserId, kind: EntryKind, ref_id: &str) -> bool {
        self.count_entries(user_id, kind, ref_id) > 0
    }

    /// Number of entries with this user + kind + ref. Refund paths compare
    /// lock and unlock counts so a leave-then-rejoin never masks a refund.
    #[must_use]
    pub fn count_entries(&self, user_id: UserId, kind: EntryKind, ref_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                e.user_id == user_id && e.kind == kind && e.ref_id.as_deref() == Some(ref_id)
            })
            .count()
    }

    /// All entries for a user, in append order.
    pub fn entries_for(&self, user_id: UserId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.user_id == user_id)
    }

    /// All entries correlated to a reference, in append order.
    pub fn entries_for_ref<'a>(&'a self, ref_id: &'a str) -> impl Iterator<Item = &'a LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| e.ref_id.as_deref() == Some(ref_id))
    }

    /// Sum of deltas for a user — the user's net custody change according
    /// to the log alone.
    #[must_use]
    pub fn net_delta_for(&self, user_id: UserId) -> i64 {
        self.entries_for(user_id).map(|e| e.delta).sum()
    }

    /// Number of entries recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the full log in append order.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }
}
