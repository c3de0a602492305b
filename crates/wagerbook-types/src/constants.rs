//! System-wide constants for the Wagerbook ledger.

/// WT per US dollar (10 WT = $1).
pub const WT_PER_USD: i64 = 10;

/// Micro-units per whole stablecoin unit (6 decimals).
pub const MICRO_PER_USD: i64 = 1_000_000;

/// Micro-units per WT (derived: 1 WT = $0.10 = 100,000 micro).
pub const MICRO_PER_WT: i64 = MICRO_PER_USD / WT_PER_USD;

/// Default platform fee at settlement, in basis points (10% of the pot).
pub const DEFAULT_FEE_BPS: u32 = 1_000;

/// Basis-point denominator (10,000 bps = 100%).
pub const BPS_DENOMINATOR: i64 = 10_000;

/// Default deposit-intent time-to-live in minutes.
pub const DEFAULT_INTENT_TTL_MIN: i64 = 15;

/// Minimum deposit per intent, in USD cents ($1).
pub const MIN_INTENT_USD_CENTS: i64 = 100;

/// Maximum deposit per intent, in USD cents ($5,000).
pub const MAX_INTENT_USD_CENTS: i64 = 500_000;

/// Tolerated difference between intent amount and observed paid amount,
/// in whole WT. Beyond this the credit requires an explicit override.
pub const DEPOSIT_AMOUNT_TOLERANCE_WT: i64 = 1;

/// Minimum destination address length accepted for withdrawals.
pub const MIN_ADDRESS_LEN: usize = 20;

/// Default idle threshold for OPEN matches before force-cancel, minutes.
pub const DEFAULT_IDLE_OPEN_MINS: i64 = 30;

/// Default idle threshold for FULL matches before force-cancel, minutes.
pub const DEFAULT_IDLE_FULL_MINS: i64 = 15;

/// Default cap on matches processed per sweep run.
pub const DEFAULT_SWEEP_MAX: usize = 50;

/// Default cap on deposit intents expired per sweep run.
pub const DEFAULT_INTENT_SWEEP_MAX: usize = 250;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Wagerbook";
