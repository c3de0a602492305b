//! Idle/expiry sweeper — time-triggered reconciliation.
//!
//! Invoked externally (cron, admin endpoint), never self-scheduling. Scans
//! OPEN and FULL matches whose last update is older than the per-state
//! idle threshold and force-cancels them through the engine's system
//! path, refunding escrow. The per-participant unlock-entry guard inside
//! the cancel path makes re-entry safe: a retried sweep never refunds
//! twice.
//!
//! Individual match failures are logged and skipped — the batch always
//! runs to completion and reports what happened per match.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use wagerbook_ledger::Ledger;
use wagerbook_types::{MatchId, MatchState, SweepConfig};

use crate::MatchEngine;

/// What happened to one candidate match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub match_id: MatchId,
    /// WT returned to participants by this sweep.
    pub refunded_wt: i64,
    pub participants: usize,
    /// Action tags, e.g. `CANCELLED`, `SKIP:ALREADY_CANCELLED`.
    pub actions: Vec<String>,
}

/// Batch report: best-effort counts, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Candidates considered this run.
    pub scanned: usize,
    /// Matches actually transitioned to CANCELLED.
    pub cancelled: usize,
    /// Total WT refunded across all matches.
    pub refunded_wt: i64,
    pub results: Vec<SweepResult>,
}

/// The idle-expiry sweeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sweeper {
    cfg: SweepConfig,
}

impl Sweeper {
    /// Create a sweeper with explicit thresholds.
    #[must_use]
    pub fn new(cfg: SweepConfig) -> Self {
        Self { cfg }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> SweepConfig {
        self.cfg
    }

    /// Collect candidate match ids without touching anything — the
    /// dry-run preview. OPEN candidates first, then FULL, each oldest
    /// first, capped at `max_per_run` overall.
    #[must_use]
    pub fn candidates(&self, engine: &MatchEngine, now: DateTime<Utc>) -> Vec<MatchId> {
        let open_cutoff = now - Duration::minutes(self.cfg.idle_open_mins);
        let full_cutoff = now - Duration::minutes(self.cfg.idle_full_mins);

        let mut open: Vec<(DateTime<Utc>, MatchId)> = engine
            .iter()
            .filter(|m| m.state == MatchState::Open && m.updated_at < open_cutoff)
            .map(|m| (m.updated_at, m.id))
            .collect();
        open.sort();

        let mut full: Vec<(DateTime<Utc>, MatchId)> = engine
            .iter()
            .filter(|m| m.state == MatchState::Full && m.updated_at < full_cutoff)
            .map(|m| (m.updated_at, m.id))
            .collect();
        full.sort();

        open.into_iter()
            .chain(full)
            .map(|(_, id)| id)
            .take(self.cfg.max_per_run)
            .collect()
    }

    /// Force-cancel every candidate, refunding escrow. Per-match failures
    /// are logged and reported, never propagated.
    pub fn sweep(
        &self,
        engine: &mut MatchEngine,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let candidates = self.candidates(engine, now);
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for match_id in candidates {
            let participants = engine
                .participants(match_id)
                .map(|parts| parts.len())
                .unwrap_or_default();
            let mut result = SweepResult {
                match_id,
                refunded_wt: 0,
                participants,
                actions: Vec::new(),
            };

            match engine.system_cancel(match_id, "MATCH_EXPIRE_CANCEL", ledger) {
                Ok(outcome) if outcome.idempotent => {
                    result.actions.push("SKIP:ALREADY_CANCELLED".into());
                }
                Ok(outcome) => {
                    report.cancelled += 1;
                    report.refunded_wt += outcome.refunded_wt;
                    result.refunded_wt = outcome.refunded_wt;
                    result.actions.push("CANCELLED".into());
                    if outcome.skipped_refunds > 0 {
                        result
                            .actions
                            .push(format!("SKIP_UNLOCK:{}", outcome.skipped_refunds));
                    }
                }
                Err(err) => {
                    tracing::warn!(match_id = %match_id, %err, "sweep skipped match");
                    result.actions.push(format!("SKIP:{err}"));
                }
            }
            report.results.push(result);
        }

        tracing::info!(
            scanned = report.scanned,
            cancelled = report.cancelled,
            refunded_wt = report.refunded_wt,
            "idle sweep complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wagerbook_types::{EntryKind, FeeConfig, GameMode, User, UserId};

    use super::*;

    struct Rig {
        sweeper: Sweeper,
        engine: MatchEngine,
        ledger: Ledger,
        referee: User,
    }

    fn rig() -> Rig {
        Rig {
            sweeper: Sweeper::default(),
            engine: MatchEngine::with_fee(UserId::new(), FeeConfig::default()),
            ledger: Ledger::new(),
            referee: User::dummy_referee(),
        }
    }

    fn funded_player(ledger: &mut Ledger, amount: i64) -> User {
        let user = User::dummy_player();
        ledger
            .credit(user.id, amount, EntryKind::Deposit, None, json!({}))
            .unwrap();
        user
    }

    #[test]
    fn fresh_matches_are_not_candidates() {
        let mut r = rig();
        r.engine.create(&r.referee, GameMode::OneVOne, 100).unwrap();
        assert!(r.sweeper.candidates(&r.engine, Utc::now()).is_empty());
    }

    #[test]
    fn stale_open_match_is_cancelled_and_refunded() {
        let mut r = rig();
        let now = Utc::now();
        let id = r.engine.create(&r.referee, GameMode::OneVOne, 100).unwrap();
        let p1 = funded_player(&mut r.ledger, 500);
        r.engine.join(id, &p1, &mut r.ledger).unwrap();
        r.engine.backdate(id, now - Duration::minutes(31));

        let report = r.sweeper.sweep(&mut r.engine, &mut r.ledger, now);
        assert_eq!(report.scanned, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.refunded_wt, 100);
        assert_eq!(report.results[0].actions, vec!["CANCELLED"]);

        assert_eq!(r.engine.get(id).unwrap().state, MatchState::Cancelled);
        let bal = r.ledger.balance(p1.id);
        assert_eq!(bal.available, 500);
        assert_eq!(bal.locked, 0);
        r.ledger.verify_conservation().unwrap();
    }

    #[test]
    fn thresholds_differ_per_state() {
        let mut r = rig();
        let now = Utc::now();

        // A FULL match 20 minutes idle: past the 15-minute FULL
        // threshold, but the same age would not expire an OPEN match.
        let full_match = r.engine.create(&r.referee, GameMode::OneVOne, 50).unwrap();
        let p1 = funded_player(&mut r.ledger, 100);
        let p2 = funded_player(&mut r.ledger, 100);
        r.engine.join(full_match, &p1, &mut r.ledger).unwrap();
        r.engine.join(full_match, &p2, &mut r.ledger).unwrap();
        r.engine.backdate(full_match, now - Duration::minutes(20));

        let open_match = r.engine.create(&r.referee, GameMode::OneVOne, 50).unwrap();
        r.engine.backdate(open_match, now - Duration::minutes(20));

        let candidates = r.sweeper.candidates(&r.engine, now);
        assert_eq!(candidates, vec![full_match]);
    }

    #[test]
    fn sweep_respects_cap_oldest_first() {
        let mut r = rig();
        let now = Utc::now();
        let cfg = SweepConfig {
            max_per_run: 1,
            ..SweepConfig::default()
        };
        let sweeper = Sweeper::new(cfg);

        let older = r.engine.create(&r.referee, GameMode::OneVOne, 50).unwrap();
        r.engine.backdate(older, now - Duration::hours(2));
        let newer = r.engine.create(&r.referee, GameMode::OneVOne, 50).unwrap();
        r.engine.backdate(newer, now - Duration::hours(1));

        let report = sweeper.sweep(&mut r.engine, &mut r.ledger, now);
        assert_eq!(report.scanned, 1);
        assert_eq!(r.engine.get(older).unwrap().state, MatchState::Cancelled);
        assert_eq!(r.engine.get(newer).unwrap().state, MatchState::Open);
    }

    #[test]
    fn sweep_reentry_never_double_refunds() {
        let mut r = rig();
        let now = Utc::now();
        let id = r.engine.create(&r.referee, GameMode::OneVOne, 100).unwrap();
        let p1 = funded_player(&mut r.ledger, 500);
        r.engine.join(id, &p1, &mut r.ledger).unwrap();
        r.engine.backdate(id, now - Duration::hours(1));

        let first = r.sweeper.sweep(&mut r.engine, &mut r.ledger, now);
        assert_eq!(first.refunded_wt, 100);

        // Cancelled matches never re-enter the candidate set.
        let second = r.sweeper.sweep(&mut r.engine, &mut r.ledger, now);
        assert_eq!(second.scanned, 0);
        assert_eq!(r.ledger.balance(p1.id).available, 500);
    }

    #[test]
    fn refund_guard_skips_already_unlocked_participant() {
        let mut r = rig();
        let now = Utc::now();
        let id = r.engine.create(&r.referee, GameMode::OneVOne, 100).unwrap();
        let p1 = funded_player(&mut r.ledger, 500);
        let p2 = funded_player(&mut r.ledger, 500);
        r.engine.join(id, &p1, &mut r.ledger).unwrap();
        r.engine.join(id, &p2, &mut r.ledger).unwrap();

        // Simulate an earlier partial refund: p1 already has an unlock
        // entry for this match.
        r.ledger
            .unlock(
                p1.id,
                100,
                EntryKind::EscrowUnlock,
                Some(id.to_string()),
                json!({ "reason": "PARTIAL" }),
            )
            .unwrap();

        r.engine.backdate(id, now - Duration::hours(1));
        let report = r.sweeper.sweep(&mut r.engine, &mut r.ledger, now);

        // Only p2 was refunded by the sweep.
        assert_eq!(report.refunded_wt, 100);
        assert!(
            report.results[0]
                .actions
                .contains(&"SKIP_UNLOCK:1".to_string())
        );
        assert_eq!(r.ledger.balance(p1.id).available, 500);
        assert_eq!(r.ledger.balance(p2.id).available, 500);
        r.ledger.verify_conservation().unwrap();
    }

    #[test]
    fn dry_run_preview_changes_nothing() {
        let mut r = rig();
        let now = Utc::now();
        let id = r.engine.create(&r.referee, GameMode::OneVOne, 100).unwrap();
        r.engine.backdate(id, now - Duration::hours(1));

        let preview = r.sweeper.candidates(&r.engine, now);
        assert_eq!(preview, vec![id]);
        assert_eq!(r.engine.get(id).unwrap().state, MatchState::Open);
    }
}
