//! Match lobby model and its lifecycle state machine.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  capacity reached  ┌──────┐  settle  ┌──────────┐
//!   │ OPEN ├───────────────────▶│ FULL ├─────────▶│ COMPLETE │
//!   └──┬───┘◀───────────────────└──┬───┘          └──────────┘
//!      │        player leaves      │
//!      │ cancel/expire             │ cancel/expire
//!      ▼                          ▼
//!   ┌───────────┐◀────────────────┘
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Transitions into COMPLETE and CANCELLED are terminal: once a match is
//! final, no further financial mutation is permitted for that match id
//! except idempotent replays that detect the same terminal state and no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MatchId, UserId};

/// Match format, fixing lobby capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    OneVOne,
    TwoVTwo,
    ThreeVThree,
}

impl GameMode {
    /// Total player capacity for this mode.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            Self::OneVOne => 2,
            Self::TwoVTwo => 4,
            Self::ThreeVThree => 6,
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneVOne => write!(f, "ONE_V_ONE"),
            Self::TwoVTwo => write!(f, "TWO_V_TWO"),
            Self::ThreeVThree => write!(f, "THREE_V_THREE"),
        }
    }
}

/// Team assignment. Joins balance A/B by current head-count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Role of a participant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantRole {
    Player,
    Referee,
}

/// Lifecycle state of a match.
///
/// Transitions are **monotonic** (never leave a terminal state):
/// - `Open → Full` (capacity reached)
/// - `Full → Open` (a player left before settlement)
/// - `Open | Full → Complete` (settled)
/// - `Open | Full → Cancelled` (aborted or expired)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    /// Accepting joins.
    Open,
    /// At capacity, awaiting settlement.
    Full,
    /// Settled with a recorded winner. **Terminal.**
    Complete,
    /// Aborted; all stakes refunded. **Terminal.**
    Cancelled,
}

impl MatchState {
    /// Can this state transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Full | Self::Complete | Self::Cancelled)
                | (Self::Full, Self::Open | Self::Complete | Self::Cancelled)
        )
    }

    /// Whether this state is terminal (COMPLETE or CANCELLED).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Full => write!(f, "FULL"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A stake lobby. The referee creates it, players join by locking the
/// per-player stake into escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub mode: GameMode,
    /// The assigned referee; may not join as a player.
    pub ref_id: UserId,
    /// Stake per player, in whole WT. Positive — validated at creation.
    pub stake_wt: i64,
    pub state: MatchState,
    /// Set only on COMPLETE.
    pub winner_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    /// Last lifecycle change; drives idle-expiry sweeping.
    pub updated_at: DateTime<Utc>,
}

impl Match {
    #[must_use]
    pub fn new(ref_id: UserId, mode: GameMode, stake_wt: i64) -> Self {
        let now = Utc::now();
        Self {
            id: MatchId::new(),
            mode,
            ref_id,
            stake_wt,
            state: MatchState::Open,
            winner_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total player capacity (from the mode).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.mode.capacity()
    }
}

/// Join row: one per (match, user). Created on join, removed on voluntary
/// leave while the match is non-terminal, never mutated otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchParticipant {
    pub user_id: UserId,
    pub team: Team,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
}

impl MatchParticipant {
    #[must_use]
    pub fn player(user_id: UserId, team: Team) -> Self {
        Self {
            user_id,
            team,
            role: ParticipantRole::Player,
            joined_at: Utc::now(),
        }
    }
}
