//! Commitment gate: maps locked deposits to mining access tiers
//!
//! Deposits live in an external ledger reached through [`CommitmentSource`].
//! The gate only reads from it. [`InMemoryCommitmentLedger`] is a reference
//! implementation of that external ledger, enforcing the maturity window the
//! way an on-chain deposit contract would.

use crate::crypto::Address;
use crate::error::{MatrixError, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Smallest deposit that grants any access.
pub const MINIMUM_COMMITMENT: f64 = 13.01;
/// Minimum holding period before a deposit may be released.
pub const MATURITY_DAYS: i64 = 30;
/// Default monthly vault growth rate.
pub const VAULT_GROWTH_RATE: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierName {
    Insufficient,
    Entry,
    Moderate,
    Significant,
    Institutional,
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TierName::Insufficient => "Insufficient",
            TierName::Entry => "Entry",
            TierName::Moderate => "Moderate",
            TierName::Significant => "Significant",
            TierName::Institutional => "Institutional",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommitmentTier {
    pub name: TierName,
    /// Deepest depth this tier may mine at.
    pub access_depth: u64,
    pub multiplier: f64,
}

impl CommitmentTier {
    const INSUFFICIENT: CommitmentTier = CommitmentTier {
        name: TierName::Insufficient,
        access_depth: 0,
        multiplier: 0.0,
    };

    pub fn is_rejected(&self) -> bool {
        self.name == TierName::Insufficient
    }
}

/// Tier for a deposit amount. Ranges are half-open and the lowest
/// qualifying tier wins; anything below the floor, negative or NaN is
/// `Insufficient`.
pub fn tier_for(amount: f64) -> CommitmentTier {
    if amount.is_nan() || amount < MINIMUM_COMMITMENT {
        return CommitmentTier::INSUFFICIENT;
    }
    let (name, access_depth, multiplier) = if amount < 100.0 {
        (TierName::Entry, 5, 1.00)
    } else if amount < 1_000.0 {
        (TierName::Moderate, 10, 1.15)
    } else if amount < 10_000.0 {
        (TierName::Significant, 15, 1.35)
    } else {
        (TierName::Institutional, 20, 1.60)
    };
    CommitmentTier {
        name,
        access_depth,
        multiplier,
    }
}

/// Projected vault value: `V(t) = V0 * (1 + alpha)^months`
pub fn vault_growth(initial_vault: f64, months: u32, alpha: f64) -> f64 {
    initial_vault * (1.0 + alpha).powf(months as f64)
}

/// What the external deposit ledger reports for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommitmentStatus {
    pub amount: f64,
    pub commitment_time: DateTime<Utc>,
    pub active: bool,
}

/// Read-only view of the external deposit ledger.
pub trait CommitmentSource: Send + Sync {
    fn commitment(&self, identity: &Address) -> Option<CommitmentStatus>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub identity: Address,
    pub amount: f64,
    pub commitment_time: DateTime<Utc>,
    pub active: bool,
    pub access_depth: u64,
}

impl CommitmentRecord {
    pub fn matures_at(&self) -> DateTime<Utc> {
        self.commitment_time + Duration::days(MATURITY_DAYS)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCommitmentLedger {
    records: RwLock<HashMap<Address, CommitmentRecord>>,
}

impl InMemoryCommitmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks `amount` for `identity`. A top-up adds to the existing deposit
    /// and restarts its maturity window.
    pub fn deposit(
        &self,
        identity: Address,
        amount: f64,
        at: DateTime<Utc>,
    ) -> Result<CommitmentRecord> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(MatrixError::InsufficientCommitment(format!(
                "Deposit amount must be positive, got {}",
                amount
            )));
        }

        let mut records = self.records.write();
        let total = records.get(&identity).map_or(0.0, |r| r.amount) + amount;
        let record = CommitmentRecord {
            identity,
            amount: total,
            commitment_time: at,
            active: true,
            access_depth: tier_for(total).access_depth,
        };
        records.insert(identity, record.clone());
        Ok(record)
    }

    /// Releases the deposit once the maturity window has elapsed.
    pub fn release(&self, identity: &Address, now: DateTime<Utc>) -> Result<CommitmentRecord> {
        let mut records = self.records.write();
        let record = records.get(identity).ok_or_else(|| {
            MatrixError::InsufficientCommitment(format!(
                "No commitment held by {}",
                hex::encode(identity)
            ))
        })?;

        if now < record.matures_at() {
            return Err(MatrixError::CommitmentLocked(format!(
                "Commitment of {} matures at {}",
                hex::encode(identity),
                record.matures_at().to_rfc3339()
            )));
        }

        records.remove(identity).ok_or_else(|| {
            MatrixError::InsufficientCommitment(format!(
                "No commitment held by {}",
                hex::encode(identity)
            ))
        })
    }

    pub fn record(&self, identity: &Address) -> Option<CommitmentRecord> {
        self.records.read().get(identity).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommitmentSource for InMemoryCommitmentLedger {
    fn commitment(&self, identity: &Address) -> Option<CommitmentStatus> {
        self.records.read().get(identity).map(|r| CommitmentStatus {
            amount: r.amount,
            commitment_time: r.commitment_time,
            active: r.active,
        })
    }
}

/// Permission to mine at one depth, with the reward multiplier that applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub identity: Address,
    pub depth: u64,
    pub tier: CommitmentTier,
}

impl AccessGrant {
    pub fn multiplier(&self) -> f64 {
        self.tier.multiplier
    }
}

#[derive(Clone)]
pub struct CommitmentGate {
    source: Arc<dyn CommitmentSource>,
}

impl fmt::Debug for CommitmentGate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CommitmentGate").finish_non_exhaustive()
    }
}

impl CommitmentGate {
    pub fn new(source: Arc<dyn CommitmentSource>) -> Self {
        CommitmentGate { source }
    }

    /// Tier of the identity's active commitment.
    pub fn tier_for_identity(&self, identity: &Address) -> Result<CommitmentTier> {
        let status = self
            .source
            .commitment(identity)
            .filter(|s| s.active)
            .ok_or_else(|| {
                MatrixError::InsufficientCommitment(format!(
                    "No active commitment for {}",
                    hex::encode(identity)
                ))
            })?;

        let tier = tier_for(status.amount);
        if tier.is_rejected() {
            return Err(MatrixError::InsufficientCommitment(format!(
                "Commitment of {} is below the {} minimum",
                status.amount, MINIMUM_COMMITMENT
            )));
        }
        Ok(tier)
    }

    pub fn can_mine_at_depth(&self, identity: &Address, depth: u64) -> Result<AccessGrant> {
        let tier = self.tier_for_identity(identity).map_err(|e| {
            MatrixError::AccessDenied(format!(
                "{} cannot mine at depth {}: {}",
                hex::encode(identity),
                depth,
                e
            ))
        })?;

        if tier.access_depth < depth {
            return Err(MatrixError::AccessDenied(format!(
                "{} tier reaches depth {}, requested {}",
                tier.name, tier.access_depth, depth
            )));
        }

        Ok(AccessGrant {
            identity: *identity,
            depth,
            tier,
        })
    }
}
