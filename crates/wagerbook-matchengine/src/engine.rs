//! The match lifecycle state machine.
//!
//! Every stake movement goes through the ledger facade so the pairing of
//! primitive + audit entry can never be skipped. Public operations
//! validate everything before the first mutation: a rejected call leaves
//! both the engine and the ledger untouched, and replays of terminal
//! operations (cancel on CANCELLED, settle with the recorded winner) are
//! idempotent echoes, never re-applied effects.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use wagerbook_ledger::Ledger;
use wagerbook_types::{
    AccountBalance, EntryKind, FeeConfig, GameMode, Match, MatchId, MatchParticipant, MatchState,
    Result, Team, User, UserId, WagerbookError,
};

/// Recorded outcome of a settlement, echoed verbatim on replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSummary {
    /// Total stake collected: `stake × participant count`.
    pub pot: i64,
    pub fee_bps: u32,
    /// `floor(pot × fee_bps / 10_000)`, credited to the house account.
    pub fee_to_house: i64,
    /// Winning user ids, in join order. The first carries the remainder.
    pub winners: Vec<UserId>,
    pub per_winner: i64,
    /// Rounding remainder allocated to the first winner.
    pub remainder: i64,
}

/// Result of a join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub match_id: MatchId,
    pub state: MatchState,
    pub team: Team,
    pub balance: AccountBalance,
    pub idempotent: bool,
}

/// Result of a leave.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub match_id: MatchId,
    pub state: MatchState,
    pub idempotent: bool,
}

/// Result of a cancel (user-initiated or sweeper-initiated).
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub match_id: MatchId,
    pub state: MatchState,
    /// Total WT returned to participants by this call.
    pub refunded_wt: i64,
    /// Participants skipped because a refund entry already existed.
    pub skipped_refunds: usize,
    pub idempotent: bool,
}

/// Result of a settlement.
#[derive(Debug, Clone)]
pub struct SettleOutcome {
    pub match_id: MatchId,
    pub state: MatchState,
    pub winner_user_id: UserId,
    pub payout: PayoutSummary,
    pub idempotent: bool,
}

/// The escrow/match engine. Owns all match state — there is no other
/// registry of lobbies, in dev or otherwise.
#[derive(Debug)]
pub struct MatchEngine {
    fee: FeeConfig,
    /// Ledger account receiving settlement fees.
    house_user: UserId,
    matches: HashMap<MatchId, Match>,
    participants: HashMap<MatchId, Vec<MatchParticipant>>,
    settlements: HashMap<MatchId, PayoutSummary>,
}

impl MatchEngine {
    /// Create an engine with the default fee configuration.
    #[must_use]
    pub fn new(house_user: UserId) -> Self {
        Self::with_fee(house_user, FeeConfig::default())
    }

    /// Create an engine with an explicit fee configuration.
    #[must_use]
    pub fn with_fee(house_user: UserId, fee: FeeConfig) -> Self {
        Self {
            fee,
            house_user,
            matches: HashMap::new(),
            participants: HashMap::new(),
            settlements: HashMap::new(),
        }
    }

    /// The account receiving settlement fees.
    #[must_use]
    pub fn house_user(&self) -> UserId {
        self.house_user
    }

    /// Create a new OPEN match refereed by the caller.
    ///
    /// # Errors
    /// - `Forbidden` unless the caller is a referee or owner
    /// - `InvalidStake` for non-positive stakes
    pub fn create(&mut self, actor: &User, mode: GameMode, stake_wt: i64) -> Result<MatchId> {
        if !actor.can_referee() {
            return Err(WagerbookError::Forbidden);
        }
        if stake_wt <= 0 {
            return Err(WagerbookError::InvalidStake {
                reason: format!("stake must be positive, got {stake_wt}"),
            });
        }

        let m = Match::new(actor.id, mode, stake_wt);
        let id = m.id;
        tracing::info!(match_id = %id, referee = %actor.id, %mode, stake_wt, "match created");
        self.participants.insert(id, Vec::new());
        self.matches.insert(id, m);
        Ok(id)
    }

    /// Join a match, locking the stake into escrow.
    ///
    /// Repeat joins are idempotent echoes — no double-lock. The joining
    /// side is the smaller team for balance.
    ///
    /// # Errors
    /// `MatchNotFound`, `MatchClosed`, `RefereeCannotJoin`,
    /// `GameTagRequired`, `MatchFull`, `InsufficientFunds`
    pub fn join(&mut self, match_id: MatchId, actor: &User, ledger: &mut Ledger) -> Result<JoinOutcome> {
        let m = self
            .matches
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if m.state.is_terminal() {
            return Err(WagerbookError::MatchClosed);
        }
        if m.ref_id == actor.id {
            return Err(WagerbookError::RefereeCannotJoin);
        }
        if actor.game_tag.is_none() {
            return Err(WagerbookError::GameTagRequired);
        }

        let parts = self
            .participants
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if let Some(existing) = parts.iter().find(|p| p.user_id == actor.id) {
            return Ok(JoinOutcome {
                match_id,
                state: m.state,
                team: existing.team,
                balance: ledger.balance(actor.id),
                idempotent: true,
            });
        }
        if parts.len() >= m.capacity() {
            return Err(WagerbookError::MatchFull);
        }

        let a_count = parts.iter().filter(|p| p.team == Team::A).count();
        let b_count = parts.iter().filter(|p| p.team == Team::B).count();
        let team = if a_count <= b_count { Team::A } else { Team::B };
        let stake = m.stake_wt;
        let capacity = m.capacity();

        let balance = ledger.lock(
            actor.id,
            stake,
            EntryKind::EscrowLock,
            Some(match_id.to_string()),
            json!({ "team": team.to_string(), "stake_wt": stake }),
        )?;

        let parts = self
            .participants
            .get_mut(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        parts.push(MatchParticipant::player(actor.id, team));
        let full = parts.len() >= capacity;

        let m = self
            .matches
            .get_mut(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if full {
            m.state = MatchState::Full;
        }
        m.updated_at = Utc::now();

        tracing::info!(
            match_id = %match_id,
            user = %actor.id,
            %team,
            state = %m.state,
            "player joined"
        );
        Ok(JoinOutcome {
            match_id,
            state: m.state,
            team,
            balance,
            idempotent: false,
        })
    }

    /// Leave a non-terminal match, releasing the stake. Leaving a match
    /// one never joined is an idempotent success.
    ///
    /// # Errors
    /// `MatchNotFound`, `MatchClosed`
    pub fn leave(
        &mut self,
        match_id: MatchId,
        user_id: UserId,
        ledger: &mut Ledger,
    ) -> Result<LeaveOutcome> {
        let m = self
            .matches
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if m.state.is_terminal() {
            return Err(WagerbookError::MatchClosed);
        }
        let stake = m.stake_wt;

        let parts = self
            .participants
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if !parts.iter().any(|p| p.user_id == user_id) {
            return Ok(LeaveOutcome {
                match_id,
                state: m.state,
                idempotent: true,
            });
        }

        ledger.unlock_clamped(
            user_id,
            stake,
            EntryKind::EscrowUnlock,
            Some(match_id.to_string()),
            json!({ "reason": "LEAVE", "stake_wt": stake }),
        )?;

        let parts = self
            .participants
            .get_mut(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        parts.retain(|p| p.user_id != user_id);

        let m = self
            .matches
            .get_mut(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if m.state == MatchState::Full {
            m.state = MatchState::Open;
        }
        m.updated_at = Utc::now();

        tracing::info!(match_id = %match_id, user = %user_id, "player left");
        Ok(LeaveOutcome {
            match_id,
            state: m.state,
            idempotent: false,
        })
    }

    /// Cancel a non-terminal match, refunding every participant.
    /// Re-cancelling is an idempotent echo; cancelling a COMPLETE match is
    /// a hard conflict.
    ///
    /// # Errors
    /// `MatchNotFound`, `Forbidden`, `MatchFinal`
    pub fn cancel(
        &mut self,
        match_id: MatchId,
        actor: &User,
        ledger: &mut Ledger,
    ) -> Result<CancelOutcome> {
        let m = self
            .matches
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if !actor.is_owner && m.ref_id != actor.id {
            return Err(WagerbookError::Forbidden);
        }
        self.cancel_inner(match_id, "MATCH_CANCELLED", ledger)
    }

    /// Auth-free cancel used by the idle-expiry sweeper.
    ///
    /// # Errors
    /// `MatchNotFound`, `MatchFinal`
    pub fn system_cancel(
        &mut self,
        match_id: MatchId,
        reason: &str,
        ledger: &mut Ledger,
    ) -> Result<CancelOutcome> {
        self.cancel_inner(match_id, reason, ledger)
    }

    fn cancel_inner(
        &mut self,
        match_id: MatchId,
        reason: &str,
        ledger: &mut Ledger,
    ) -> Result<CancelOutcome> {
        let m = self
            .matches
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        match m.state {
            MatchState::Cancelled => {
                return Ok(CancelOutcome {
                    match_id,
                    state: MatchState::Cancelled,
                    refunded_wt: 0,
                    skipped_refunds: 0,
                    idempotent: true,
                });
            }
            MatchState::Complete => {
                return Err(WagerbookError::MatchFinal {
                    state: MatchState::Complete,
                });
            }
            MatchState::Open | MatchState::Full => {}
        }

        let stake = m.stake_wt;
        let ref_str = match_id.to_string();
        let users: Vec<UserId> = self
            .participants
            .get(&match_id)
            .map(|parts| parts.iter().map(|p| p.user_id).collect())
            .unwrap_or_default();

        // Refund each participant, guarded against double-refund: refund
        // only while this match still has a lock entry unmatched by an
        // unlock entry (a leave-then-rejoin leaves one of each, and still
        // gets its refund).
        let mut refunded_wt = 0;
        let mut skipped_refunds = 0;
        for user_id in users {
            let locks = ledger
                .log()
                .count_entries(user_id, EntryKind::EscrowLock, &ref_str);
            let unlocks = ledger
                .log()
                .count_entries(user_id, EntryKind::EscrowUnlock, &ref_str);
            if unlocks >= locks {
                tracing::warn!(
                    match_id = %match_id,
                    user = %user_id,
                    "refund skipped: unlock entry already present"
                );
                skipped_refunds += 1;
                continue;
            }
            ledger.unlock_clamped(
                user_id,
                stake,
                EntryKind::EscrowUnlock,
                Some(ref_str.clone()),
                json!({ "reason": reason, "stake_wt": stake }),
            )?;
            refunded_wt += stake;
        }

        let m = self
            .matches
            .get_mut(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        m.state = MatchState::Cancelled;
        m.winner_user_id = None;
        m.updated_at = Utc::now();

        tracing::info!(match_id = %match_id, refunded_wt, reason, "match cancelled");
        Ok(CancelOutcome {
            match_id,
            state: MatchState::Cancelled,
            refunded_wt,
            skipped_refunds,
            idempotent: false,
        })
    }

    /// Settle a match: consume every participant's escrow and distribute
    /// the pot minus the platform fee to the winner's team.
    ///
    /// Replaying with the recorded winner echoes the stored payout; a
    /// different winner is a hard conflict.
    ///
    /// # Errors
    /// `MatchNotFound`, `Forbidden`, `MatchFinal`, `AlreadySettled`,
    /// `WinnerNotParticipant`, `LockedMismatch`, `NoWinnersResolved`
    #[allow(clippy::cast_possible_wrap)]
    pub fn settle(
        &mut self,
        match_id: MatchId,
        actor: &User,
        winner_user_id: UserId,
        ledger: &mut Ledger,
    ) -> Result<SettleOutcome> {
        let m = self
            .matches
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        if !actor.is_owner && m.ref_id != actor.id {
            return Err(WagerbookError::Forbidden);
        }
        match m.state {
            MatchState::Cancelled => {
                return Err(WagerbookError::MatchFinal {
                    state: MatchState::Cancelled,
                });
            }
            MatchState::Complete => {
                if m.winner_user_id == Some(winner_user_id) {
                    let payout = self
                        .settlements
                        .get(&match_id)
                        .cloned()
                        .ok_or_else(|| {
                            WagerbookError::Internal(format!(
                                "settled match {match_id} has no payout summary"
                            ))
                        })?;
                    return Ok(SettleOutcome {
                        match_id,
                        state: MatchState::Complete,
                        winner_user_id,
                        payout,
                        idempotent: true,
                    });
                }
                return Err(WagerbookError::AlreadySettled(match_id));
            }
            MatchState::Open | MatchState::Full => {}
        }

        let stake = m.stake_wt;
        let ref_str = match_id.to_string();
        let parts = self
            .participants
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?
            .clone();

        let winner_team = parts
            .iter()
            .find(|p| p.user_id == winner_user_id)
            .map(|p| p.team)
            .ok_or(WagerbookError::WinnerNotParticipant)?;
        // Winners share the declared winner's team, in join order.
        let winners: Vec<UserId> = parts
            .iter()
            .filter(|p| p.team == winner_team)
            .map(|p| p.user_id)
            .collect();
        if winners.is_empty() {
            // Fail closed rather than silently dropping the pot.
            return Err(WagerbookError::NoWinnersResolved);
        }

        // Escrow must fully cover every participant before anything moves.
        for p in &parts {
            if ledger.balance(p.user_id).locked < stake {
                return Err(WagerbookError::LockedMismatch(p.user_id));
            }
        }

        let pot = stake * parts.len() as i64;
        let fee_to_house = self.fee.fee_for_pot(pot);
        let distributable = pot - fee_to_house;
        let per_winner = distributable / winners.len() as i64;
        let remainder = distributable - per_winner * winners.len() as i64;

        // All validation passed — apply effects.
        for p in &parts {
            let kind = if winners.contains(&p.user_id) {
                EntryKind::EscrowConsumed
            } else {
                EntryKind::EscrowLost
            };
            ledger.consume_locked(
                p.user_id,
                stake,
                kind,
                Some(ref_str.clone()),
                json!({ "stake_wt": stake }),
            )?;
        }
        for (i, user_id) in winners.iter().enumerate() {
            let portion = per_winner + if i == 0 { remainder } else { 0 };
            if portion > 0 {
                ledger.credit(
                    *user_id,
                    portion,
                    EntryKind::EscrowPayout,
                    Some(ref_str.clone()),
                    json!({
                        "pot_wt": pot,
                        "fee_wt": fee_to_house,
                        "portion_wt": portion,
                    }),
                )?;
            }
        }
        if fee_to_house > 0 {
            ledger.credit(
                self.house_user,
                fee_to_house,
                EntryKind::HouseFee,
                Some(ref_str),
                json!({ "pot_wt": pot, "fee_bps": self.fee.fee_bps() }),
            )?;
        }

        let payout = PayoutSummary {
            pot,
            fee_bps: self.fee.fee_bps(),
            fee_to_house,
            winners,
            per_winner,
            remainder,
        };
        let m = self
            .matches
            .get_mut(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))?;
        m.state = MatchState::Complete;
        m.winner_user_id = Some(winner_user_id);
        m.updated_at = Utc::now();
        self.settlements.insert(match_id, payout.clone());

        tracing::info!(
            match_id = %match_id,
            winner = %winner_user_id,
            pot,
            fee = fee_to_house,
            per_winner,
            "match settled"
        );
        Ok(SettleOutcome {
            match_id,
            state: MatchState::Complete,
            winner_user_id,
            payout,
            idempotent: false,
        })
    }

    /// Look up a match by id.
    ///
    /// # Errors
    /// Returns `MatchNotFound` if the match does not exist.
    pub fn get(&self, match_id: MatchId) -> Result<&Match> {
        self.matches
            .get(&match_id)
            .ok_or(WagerbookError::MatchNotFound(match_id))
    }

    /// Participants of a match, in join order.
    ///
    /// # Errors
    /// Returns `MatchNotFound` if the match does not exist.
    pub fn participants(&self, match_id: MatchId) -> Result<&[MatchParticipant]> {
        self.participants
            .get(&match_id)
            .map(Vec::as_slice)
            .ok_or(WagerbookError::MatchNotFound(match_id))
    }

    /// Iterate over all matches, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    /// Number of matches ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether no match exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Test helpers. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl MatchEngine {
    /// Backdate a match's last-update time so sweeper tests can simulate
    /// idleness without waiting.
    pub fn backdate(&mut self, match_id: MatchId, updated_at: chrono::DateTime<Utc>) {
        if let Some(m) = self.matches.get_mut(&match_id) {
            m.updated_at = updated_at;
        }
    }
}
