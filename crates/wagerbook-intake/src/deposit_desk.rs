//! Deposit intake — intents, oracle confirmations, direct credits.
//!
//! The desk enforces the two idempotency layers that keep duplicate oracle
//! deliveries harmless:
//!
//! 1. **Transaction hash**: at most one [`Deposit`] per unique external
//!    transaction id; a repeat confirmation echoes the existing record.
//! 2. **Intent link**: at most one successful credit per intent; once
//!    CREDITED the link and hash are immutable.
//!
//! Amount policy: the credited WT is derived from the amount *actually
//! paid* (floor conversion, so the books never credit more than was
//! received). If it differs from the intent by more than the configured
//! tolerance, the credit is rejected unless explicitly overridden — a
//! partial payment must never be silently accepted as a full credit.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use wagerbook_ledger::Ledger;
use wagerbook_types::{
    ConversionRate, Deposit, DepositId, DepositIntent, DepositProvider, EntryKind, IntentConfig,
    IntentId, IntentStatus, Result, UserId, WagerbookError, constants,
};

/// Requested intent amount, in either denomination.
#[derive(Debug, Clone, Copy)]
pub enum IntentAmount {
    /// USD, integer cents.
    UsdCents(i64),
    /// Whole WT.
    Wt(i64),
}

/// An external payment confirmation, as delivered by the oracle.
#[derive(Debug, Clone)]
pub struct DepositConfirmation {
    /// The intent reference the payer attached.
    pub reference: String,
    /// Unique on-chain/processor transaction id.
    pub tx_hash: String,
    pub provider: DepositProvider,
    pub from_addr: String,
    pub to_addr: String,
    /// Micro-units of stablecoin actually received.
    pub amount_micro: i64,
    /// Credit even if the intent deadline has passed.
    pub override_expired: bool,
    /// Credit even if the paid amount differs from the intent beyond
    /// tolerance.
    pub override_amount: bool,
    pub meta: Value,
}

/// Result of a credit operation.
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub deposit: Deposit,
    /// The intent this deposit resolved, when one was involved.
    pub intent_id: Option<IntentId>,
    /// `true` when the operation recognized prior completion and no-opped.
    pub idempotent: bool,
}

/// Deposit intents and realized deposits, keyed for idempotency.
#[derive(Debug, Default)]
pub struct DepositDesk {
    cfg: IntentConfig,
    rate: ConversionRate,
    intents: HashMap<IntentId, DepositIntent>,
    by_reference: HashMap<String, IntentId>,
    deposits: HashMap<DepositId, Deposit>,
    by_tx_hash: HashMap<String, DepositId>,
    /// Monotonic counter feeding synthetic dev transaction hashes.
    direct_credit_seq: u64,
}

impl DepositDesk {
    /// Create a desk with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IntentConfig::default(), ConversionRate::default())
    }

    /// Create a desk with explicit bounds and conversion rate.
    #[must_use]
    pub fn with_config(cfg: IntentConfig, rate: ConversionRate) -> Self {
        Self {
            cfg,
            rate,
            intents: HashMap::new(),
            by_reference: HashMap::new(),
            deposits: HashMap::new(),
            by_tx_hash: HashMap::new(),
            direct_credit_seq: 0,
        }
    }

    /// Create a PENDING intent and hand back its payment reference.
    ///
    /// # Errors
    /// - `InvalidAmount` for non-positive amounts
    /// - `DepositBoundsViolation` outside the configured min/max
    pub fn create_intent(
        &mut self,
        user_id: UserId,
        amount: IntentAmount,
        meta: Value,
        now: DateTime<Utc>,
    ) -> Result<DepositIntent> {
        let (amount_usd_cents, amount_wt) = match amount {
            IntentAmount::UsdCents(cents) => {
                if cents <= 0 {
                    return Err(WagerbookError::InvalidAmount {
                        reason: format!("usd cents must be positive, got {cents}"),
                    });
                }
                (cents, self.rate.wt_from_usd_cents(cents))
            }
            IntentAmount::Wt(wt) => {
                if wt <= 0 {
                    return Err(WagerbookError::InvalidAmount {
                        reason: format!("wt must be positive, got {wt}"),
                    });
                }
                (self.rate.usd_cents_from_wt(wt), wt)
            }
        };

        if amount_usd_cents < self.cfg.min_usd_cents {
            return Err(WagerbookError::DepositBoundsViolation {
                reason: format!(
                    "minimum deposit is {} cents, got {amount_usd_cents}",
                    self.cfg.min_usd_cents
                ),
            });
        }
        if amount_usd_cents > self.cfg.max_usd_cents {
            return Err(WagerbookError::DepositBoundsViolation {
                reason: format!(
                    "maximum per intent is {} cents, got {amount_usd_cents}",
                    self.cfg.max_usd_cents
                ),
            });
        }

        let reference = hex::encode(rand::random::<[u8; 32]>());
        let intent = DepositIntent {
            id: IntentId::new(),
            user_id,
            amount_usd_cents,
            amount_wt,
            reference: reference.clone(),
            status: IntentStatus::Pending,
            credited_deposit_id: None,
            tx_hash: None,
            meta,
            created_at: now,
            expires_at: now + Duration::minutes(self.cfg.ttl_min),
        };
        tracing::info!(
            intent = %intent.id,
            user = %user_id,
            amount_wt,
            "deposit intent created"
        );
        self.by_reference.insert(reference, intent.id);
        self.intents.insert(intent.id, intent.clone());
        Ok(intent)
    }

    /// Resolve a confirmation into a ledger credit.
    ///
    /// # Errors
    /// - `InvalidAmount` for malformed fields
    /// - `IntentNotFound` / `IntentExpired` / `AmountTooSmall` /
    ///   `AmountMismatch` per the guards described on the module
    pub fn confirm(
        &mut self,
        confirmation: DepositConfirmation,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome> {
        let c = confirmation;
        if c.tx_hash.trim().is_empty() {
            return Err(WagerbookError::InvalidAmount {
                reason: "tx_hash required".into(),
            });
        }
        if c.from_addr.len() < constants::MIN_ADDRESS_LEN
            || c.to_addr.len() < constants::MIN_ADDRESS_LEN
        {
            return Err(WagerbookError::InvalidAmount {
                reason: "invalid from/to address".into(),
            });
        }
        if c.amount_micro <= 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("amount_micro must be positive, got {}", c.amount_micro),
            });
        }

        // Idempotency layer 1: transaction hash.
        if let Some(existing_id) = self.by_tx_hash.get(&c.tx_hash) {
            let deposit = self.deposits[existing_id].clone();
            let intent_id = self
                .intents
                .values()
                .find(|i| i.credited_deposit_id == Some(deposit.id))
                .map(|i| i.id);
            tracing::info!(tx_hash = %c.tx_hash, "duplicate confirmation ignored");
            return Ok(DepositOutcome {
                deposit,
                intent_id,
                idempotent: true,
            });
        }

        let intent_id = *self
            .by_reference
            .get(&c.reference)
            .ok_or(WagerbookError::IntentNotFound)?;
        let intent = &self.intents[&intent_id];

        // Idempotency layer 2: intent already resolved.
        if intent.status == IntentStatus::Credited {
            if let Some(dep_id) = intent.credited_deposit_id {
                return Ok(DepositOutcome {
                    deposit: self.deposits[&dep_id].clone(),
                    intent_id: Some(intent_id),
                    idempotent: true,
                });
            }
        }

        let expired = intent.status == IntentStatus::Expired || intent.is_expired(now);
        if expired && !c.override_expired {
            return Err(WagerbookError::IntentExpired);
        }

        // Derive the credit from what was actually paid, never the intent.
        let credited_wt = self.rate.wt_from_micro(c.amount_micro);
        if credited_wt <= 0 {
            return Err(WagerbookError::AmountTooSmall);
        }
        let diff_wt = credited_wt - intent.amount_wt;
        if diff_wt.abs() > self.cfg.amount_tolerance_wt && !c.override_amount {
            return Err(WagerbookError::AmountMismatch {
                intent_wt: intent.amount_wt,
                credited_wt,
                diff_wt,
            });
        }

        let user_id = intent.user_id;
        let deposit = Deposit {
            id: DepositId::new(),
            user_id,
            provider: c.provider,
            tx_hash: c.tx_hash.clone(),
            from_addr: Some(c.from_addr.clone()),
            to_addr: Some(c.to_addr.clone()),
            amount_micro: c.amount_micro,
            amount_wt: credited_wt,
            created_at: now,
        };

        ledger.credit(
            user_id,
            credited_wt,
            EntryKind::Deposit,
            Some(deposit.id.to_string()),
            json!({
                "reference": c.reference,
                "intent_id": intent_id.to_string(),
                "provider": c.provider.to_string(),
                "tx_hash": c.tx_hash,
                "from_addr": c.from_addr,
                "to_addr": c.to_addr,
                "amount_micro": c.amount_micro,
                "credited_wt": credited_wt,
                "intent_wt": intent.amount_wt,
                "diff_wt": diff_wt,
                "extra": c.meta,
            }),
        )?;

        self.by_tx_hash.insert(c.tx_hash.clone(), deposit.id);
        self.deposits.insert(deposit.id, deposit.clone());

        let intent = self
            .intents
            .get_mut(&intent_id)
            .ok_or(WagerbookError::IntentNotFound)?;
        intent.status = IntentStatus::Credited;
        intent.credited_deposit_id = Some(deposit.id);
        intent.tx_hash = Some(c.tx_hash.clone());
        if let Some(map) = intent.meta.as_object_mut() {
            map.insert(
                "confirmation".into(),
                json!({
                    "provider": c.provider.to_string(),
                    "tx_hash": c.tx_hash,
                    "amount_micro": c.amount_micro,
                    "credited_wt": credited_wt,
                    "at": now.to_rfc3339(),
                }),
            );
        }

        tracing::info!(
            deposit = %deposit.id,
            user = %user_id,
            credited_wt,
            tx_hash = %deposit.tx_hash,
            "deposit credited"
        );
        Ok(DepositOutcome {
            deposit,
            intent_id: Some(intent_id),
            idempotent: false,
        })
    }

    /// Instantly credit a deposit with a synthetic transaction hash —
    /// the dev/admin path that skips the intent flow.
    ///
    /// # Errors
    /// Returns `InvalidAmount` for non-positive amounts.
    pub fn direct_credit(
        &mut self,
        user_id: UserId,
        provider: DepositProvider,
        amount_wt: i64,
        note: Option<String>,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome> {
        if amount_wt <= 0 {
            return Err(WagerbookError::InvalidAmount {
                reason: format!("amount_wt must be positive, got {amount_wt}"),
            });
        }

        self.direct_credit_seq += 1;
        let tx_hash = Self::synthetic_tx_hash(user_id, self.direct_credit_seq, now);
        let deposit = Deposit {
            id: DepositId::new(),
            user_id,
            provider,
            tx_hash: tx_hash.clone(),
            from_addr: None,
            to_addr: None,
            amount_micro: self.rate.micro_from_wt(amount_wt),
            amount_wt,
            created_at: now,
        };

        ledger.credit(
            user_id,
            amount_wt,
            EntryKind::Deposit,
            Some(deposit.id.to_string()),
            json!({
                "provider": provider.to_string(),
                "tx_hash": tx_hash,
                "note": note,
            }),
        )?;

        self.by_tx_hash.insert(tx_hash, deposit.id);
        self.deposits.insert(deposit.id, deposit.clone());
        tracing::info!(deposit = %deposit.id, user = %user_id, amount_wt, "direct credit");
        Ok(DepositOutcome {
            deposit,
            intent_id: None,
            idempotent: false,
        })
    }

    /// Flip stale PENDING intents past their deadline to EXPIRED, oldest
    /// first, capped at `max`. Pure status transition — no funds ever
    /// moved for a PENDING intent.
    pub fn expire_intents(&mut self, now: DateTime<Utc>, max: usize) -> Vec<IntentId> {
        let mut stale: Vec<(DateTime<Utc>, IntentId)> = self
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::Pending && i.is_expired(now))
            .map(|i| (i.expires_at, i.id))
            .collect();
        stale.sort();
        stale.truncate(max);

        let expired: Vec<IntentId> = stale.into_iter().map(|(_, id)| id).collect();
        for id in &expired {
            if let Some(intent) = self.intents.get_mut(id) {
                intent.status = IntentStatus::Expired;
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "deposit intents expired");
        }
        expired
    }

    /// Look up an intent by id.
    #[must_use]
    pub fn intent(&self, id: IntentId) -> Option<&DepositIntent> {
        self.intents.get(&id)
    }

    /// Look up an intent by its payment reference.
    #[must_use]
    pub fn intent_by_reference(&self, reference: &str) -> Option<&DepositIntent> {
        self.by_reference
            .get(reference)
            .and_then(|id| self.intents.get(id))
    }

    /// Look up a deposit by id.
    #[must_use]
    pub fn deposit(&self, id: DepositId) -> Option<&Deposit> {
        self.deposits.get(&id)
    }

    /// Look up a deposit by its external transaction hash.
    #[must_use]
    pub fn deposit_by_tx_hash(&self, tx_hash: &str) -> Option<&Deposit> {
        self.by_tx_hash
            .get(tx_hash)
            .and_then(|id| self.deposits.get(id))
    }

    /// Number of realized deposits.
    #[must_use]
    pub fn deposit_count(&self) -> usize {
        self.deposits.len()
    }

    /// Deterministic synthetic hash for direct credits.
    fn synthetic_tx_hash(user_id: UserId, seq: u64, now: DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"wagerbook:dev_deposit:v1:");
        hasher.update(user_id.0.as_bytes());
        hasher.update(seq.to_le_bytes());
        hasher.update(now.timestamp_millis().to_le_bytes());
        format!("dev_{}", hex::encode(&hasher.finalize()[..16]))
    }
}
