//! Configuration types for the Wagerbook ledger and engine.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Platform fee configuration. Basis points are clamped to 0..=10,000 at
/// construction so a misconfigured value can never take more than the pot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeConfig {
    fee_bps: u32,
}

impl FeeConfig {
    #[must_use]
    pub fn new(fee_bps: u32) -> Self {
        Self {
            fee_bps: fee_bps.min(10_000),
        }
    }

    #[must_use]
    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    /// Fee taken from a pot: `floor(pot * fee_bps / 10_000)`.
    #[must_use]
    pub fn fee_for_pot(&self, pot: i64) -> i64 {
        pot * i64::from(self.fee_bps) / constants::BPS_DENOMINATOR
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self::new(constants::DEFAULT_FEE_BPS)
    }
}

/// Fixed conversion rate between external stablecoin micro-units and WT.
///
/// Rounding always floors on the side that benefits the system of record:
/// inbound micro → WT floors the credit, outbound WT → micro floors the
/// payout snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConversionRate {
    /// Micro-units per WT.
    pub micro_per_wt: i64,
}

impl ConversionRate {
    /// Whole WT credited for an observed micro-unit amount (floor).
    #[must_use]
    pub fn wt_from_micro(&self, amount_micro: i64) -> i64 {
        amount_micro / self.micro_per_wt
    }

    /// Micro-unit snapshot for a WT amount (floor; exact for whole WT).
    #[must_use]
    pub fn micro_from_wt(&self, amount_wt: i64) -> i64 {
        amount_wt * self.micro_per_wt
    }

    /// WT for a USD cent amount (10 WT = $1 at the default rate).
    #[must_use]
    pub fn wt_from_usd_cents(&self, cents: i64) -> i64 {
        cents * constants::WT_PER_USD / 100
    }

    /// USD cents for a WT amount (floor).
    #[must_use]
    pub fn usd_cents_from_wt(&self, amount_wt: i64) -> i64 {
        amount_wt * 100 / constants::WT_PER_USD
    }
}

impl Default for ConversionRate {
    fn default() -> Self {
        Self {
            micro_per_wt: constants::MICRO_PER_WT,
        }
    }
}

/// Deposit-intent creation bounds and tolerances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Intent time-to-live in minutes.
    pub ttl_min: i64,
    /// Minimum per-intent amount, USD cents.
    pub min_usd_cents: i64,
    /// Maximum per-intent amount, USD cents.
    pub max_usd_cents: i64,
    /// Tolerated |paid - requested| difference, whole WT.
    pub amount_tolerance_wt: i64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            ttl_min: constants::DEFAULT_INTENT_TTL_MIN,
            min_usd_cents: constants::MIN_INTENT_USD_CENTS,
            max_usd_cents: constants::MAX_INTENT_USD_CENTS,
            amount_tolerance_wt: constants::DEPOSIT_AMOUNT_TOLERANCE_WT,
        }
    }
}

/// Idle-expiry sweeper thresholds. Distinct thresholds per state: a FULL
/// match going idle means a settlement stalled, which is caught sooner
/// than an OPEN lobby nobody joined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweepConfig {
    /// OPEN matches idle longer than this are force-cancelled, minutes.
    pub idle_open_mins: i64,
    /// FULL matches idle longer than this are force-cancelled, minutes.
    pub idle_full_mins: i64,
    /// Maximum matches processed per run.
    pub max_per_run: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            idle_open_mins: constants::DEFAULT_IDLE_OPEN_MINS,
            idle_full_mins: constants::DEFAULT_IDLE_FULL_MINS,
            max_per_run: constants::DEFAULT_SWEEP_MAX,
        }
    }
}

/// Withdrawal processing policy.
///
/// Two-phase is the canonical mode: `request` locks, `approve` debits and
/// pays, keeping an operator checkpoint before funds leave the books.
/// Instant mode is only available behind an explicit low-amount cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalPolicy {
    /// Request locks funds; a privileged approve step debits and pays.
    TwoPhase,
    /// Request debits and pays immediately, up to the cap.
    Instant { max_amount_wt: i64 },
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self::TwoPhase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_bps_clamped() {
        assert_eq!(FeeConfig::new(25_000).fee_bps(), 10_000);
        assert_eq!(FeeConfig::new(1_000).fee_bps(), 1_000);
    }

    #[test]
    fn fee_floors() {
        let fee = FeeConfig::new(1_000); // 10%
        assert_eq!(fee.fee_for_pot(200), 20);
        assert_eq!(fee.fee_for_pot(199), 19); // floor(19.9)
        assert_eq!(fee.fee_for_pot(0), 0);
    }

    #[test]
    fn full_fee_takes_whole_pot() {
        let fee = FeeConfig::new(10_000);
        assert_eq!(fee.fee_for_pot(500), 500);
    }

    #[test]
    fn conversion_floors_inbound() {
        let rate = ConversionRate::default();
        // 1,050,000 micro = $1.05 = 10.5 WT → floor 10
        assert_eq!(rate.wt_from_micro(1_050_000), 10);
        assert_eq!(rate.wt_from_micro(99_999), 0);
        assert_eq!(rate.wt_from_micro(100_000), 1);
    }

    #[test]
    fn conversion_usd_cents() {
        let rate = ConversionRate::default();
        assert_eq!(rate.wt_from_usd_cents(100), 10); // $1 → 10 WT
        assert_eq!(rate.usd_cents_from_wt(25), 250); // 25 WT → $2.50
    }

    #[test]
    fn default_policy_is_two_phase() {
        assert_eq!(WithdrawalPolicy::default(), WithdrawalPolicy::TwoPhase);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = SweepConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SweepConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.idle_open_mins, back.idle_open_mins);
        assert_eq!(cfg.max_per_run, back.max_per_run);
    }
}
