//! Error types for the Wagerbook ledger.
//!
//! All errors use the `WB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Account / amount errors
//! - 2xx: Identity / authorization errors
//! - 3xx: Deposit intake errors
//! - 4xx: Match / escrow errors
//! - 5xx: Withdrawal errors
//! - 8xx: Invariant errors
//! - 9xx: General / internal errors
//!
//! Idempotent-echo paths ("already processed") are **not** errors: they are
//! surfaced as success values carrying an `idempotent: true` marker on the
//! operation's outcome struct.

use thiserror::Error;

use crate::{MatchId, MatchState, UserId, WithdrawalStatus};

/// Central error enum for all Wagerbook operations.
#[derive(Debug, Error)]
pub enum WagerbookError {
    // =================================================================
    // Account / Amount Errors (1xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("WB_ERR_100: Insufficient funds: need {needed} WT, have {available} WT")]
    InsufficientFunds { needed: i64, available: i64 },

    /// Not enough locked balance to unlock or consume.
    #[error("WB_ERR_101: Insufficient locked balance")]
    InsufficientLocked,

    /// A malformed or non-positive amount was supplied.
    #[error("WB_ERR_102: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    // =================================================================
    // Identity / Authorization Errors (2xx)
    // =================================================================
    /// The referenced user does not exist.
    #[error("WB_ERR_200: User not found: {0}")]
    UserNotFound(UserId),

    /// The requested handle is already registered.
    #[error("WB_ERR_201: Handle already taken: {0}")]
    HandleTaken(String),

    /// The requested game identity tag is already registered.
    #[error("WB_ERR_202: Game tag already taken: {0}")]
    GameTagTaken(String),

    /// The user must link a game identity tag before joining matches.
    #[error("WB_ERR_203: Game tag required")]
    GameTagRequired,

    /// The caller lacks authorization for a state-mutating action.
    #[error("WB_ERR_204: Forbidden")]
    Forbidden,

    // =================================================================
    // Deposit Intake Errors (3xx)
    // =================================================================
    /// No deposit intent matches the supplied reference.
    #[error("WB_ERR_300: Deposit intent not found")]
    IntentNotFound,

    /// The deposit intent expired before the payment was confirmed.
    #[error("WB_ERR_301: Deposit intent expired")]
    IntentExpired,

    /// The observed paid amount differs from the intent beyond tolerance.
    #[error(
        "WB_ERR_302: Amount mismatch: intent {intent_wt} WT, credited {credited_wt} WT \
         (diff {diff_wt})"
    )]
    AmountMismatch {
        intent_wt: i64,
        credited_wt: i64,
        diff_wt: i64,
    },

    /// The paid amount converts to zero whole WT.
    #[error("WB_ERR_303: Amount too small to credit")]
    AmountTooSmall,

    /// The requested intent amount is outside the configured bounds.
    #[error("WB_ERR_304: Deposit bounds violation: {reason}")]
    DepositBoundsViolation { reason: String },

    // =================================================================
    // Match / Escrow Errors (4xx)
    // =================================================================
    /// The requested match was not found.
    #[error("WB_ERR_400: Match not found: {0}")]
    MatchNotFound(MatchId),

    /// The match is in a terminal state and cannot accept joins or leaves.
    #[error("WB_ERR_401: Match closed")]
    MatchClosed,

    /// The match is at capacity.
    #[error("WB_ERR_402: Match full")]
    MatchFull,

    /// The assigned referee cannot join their own match as a player.
    #[error("WB_ERR_403: Referee cannot join own match")]
    RefereeCannotJoin,

    /// The stake is zero, negative, or otherwise invalid.
    #[error("WB_ERR_404: Invalid stake: {reason}")]
    InvalidStake { reason: String },

    /// The requested transition is blocked by an opposing terminal state.
    #[error("WB_ERR_405: Match already final: {state}")]
    MatchFinal { state: MatchState },

    /// Settle replayed against a COMPLETE match with a different winner.
    #[error("WB_ERR_406: Match already settled: {0}")]
    AlreadySettled(MatchId),

    /// The declared winner is not a participant of the match.
    #[error("WB_ERR_407: Winner is not a participant")]
    WinnerNotParticipant,

    /// A participant's locked balance does not cover the stake.
    #[error("WB_ERR_408: Locked balance mismatch for {0}")]
    LockedMismatch(UserId),

    /// The computed winner set is empty — settlement fails closed.
    #[error("WB_ERR_409: No winners resolved")]
    NoWinnersResolved,

    // =================================================================
    // Withdrawal Errors (5xx)
    // =================================================================
    /// The requested withdrawal was not found.
    #[error("WB_ERR_500: Withdrawal not found")]
    WithdrawalNotFound,

    /// The withdrawal has already been paid out.
    #[error("WB_ERR_501: Withdrawal already paid")]
    AlreadyPaid,

    /// Only REQUESTED withdrawals can be cancelled.
    #[error("WB_ERR_502: Withdrawal not cancellable in current state")]
    NotCancellable,

    /// A PAID withdrawal was re-approved with a different proof hash.
    #[error("WB_ERR_503: Proof-of-payment hash conflicts with recorded hash")]
    ProofMismatch,

    /// The supplied proof hash already settles another withdrawal.
    #[error("WB_ERR_504: Transaction hash already used")]
    TxHashAlreadyUsed,

    /// Instant-mode withdrawal above the configured cap.
    #[error("WB_ERR_505: Instant withdrawal limit exceeded: {amount_wt} > {max_wt} WT")]
    InstantLimitExceeded { amount_wt: i64, max_wt: i64 },

    /// Approval without a proof-of-payment hash.
    #[error("WB_ERR_506: Proof-of-payment hash required")]
    ProofRequired,

    /// Approval attempted against a terminal non-PAID withdrawal.
    #[error("WB_ERR_507: Withdrawal not approvable in state {status}")]
    NotApprovable { status: WithdrawalStatus },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Conservation invariant violated — critical safety alert.
    #[error("WB_ERR_800: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("WB_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, WagerbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = WagerbookError::MatchNotFound(MatchId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("WB_ERR_400"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = WagerbookError::InsufficientFunds {
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("WB_ERR_100"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn match_final_display() {
        let err = WagerbookError::MatchFinal {
            state: MatchState::Complete,
        };
        let msg = format!("{err}");
        assert!(msg.contains("WB_ERR_405"));
        assert!(msg.contains("COMPLETE"));
    }

    #[test]
    fn all_errors_have_wb_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(WagerbookError::InsufficientLocked),
            Box::new(WagerbookError::IntentExpired),
            Box::new(WagerbookError::MatchFull),
            Box::new(WagerbookError::AlreadyPaid),
            Box::new(WagerbookError::Internal("test".into())),
            Box::new(WagerbookError::AmountMismatch {
                intent_wt: 10,
                credited_wt: 20,
                diff_wt: 10,
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("WB_ERR_"),
                "Error missing WB_ERR_ prefix: {msg}"
            );
        }
    }
}
