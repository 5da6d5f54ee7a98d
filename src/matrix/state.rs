use crate::crypto::Address;
use crate::economics::{depth_tax_burn, transaction_burn, EconomicParams, Tokenomics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate economic counters owned by one matrix instance.
///
/// Starts at the genesis supply with nothing burned. Only the commit path of
/// `submit_solution` mutates it; rebuilding from a snapshot restores it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicState {
    pub total_supply: f64,
    pub total_burned: f64,
    pub transaction_burned: f64,
    pub depth_tax_burned: f64,
    pub rewards_issued: f64,
    /// Set once burns have driven the supply to the zero clamp.
    pub supply_exhausted: bool,
    pub deepest_depth: u64,
    /// `S(deepest_depth)` from the tokenomics schedule
    pub scheduled_supply: f64,
    pub sealed_per_depth: BTreeMap<u64, u64>,
    /// Rewards credited per miner, keyed by hex address
    pub miner_rewards: BTreeMap<String, f64>,
}

/// Burns applied by one seal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SealEffects {
    pub transaction_burn: f64,
    pub depth_tax: f64,
    /// Burn owed beyond the remaining supply, never recorded as burned
    pub unburned: f64,
    pub supply_clamped: bool,
}

impl EconomicState {
    pub fn genesis(tokenomics: &Tokenomics) -> Self {
        let mut sealed_per_depth = BTreeMap::new();
        sealed_per_depth.insert(0, 1);
        EconomicState {
            total_supply: tokenomics.genesis_supply,
            total_burned: 0.0,
            transaction_burned: 0.0,
            depth_tax_burned: 0.0,
            rewards_issued: 0.0,
            supply_exhausted: false,
            deepest_depth: 0,
            scheduled_supply: tokenomics.supply(0),
            sealed_per_depth,
            miner_rewards: BTreeMap::new(),
        }
    }

    /// Applies the burns and reward of one newly sealed triad. The depth tax
    /// is charged exactly once per call. Only what the remaining supply
    /// covers is burned; when both burns exceed it they are scaled down in
    /// proportion, so `total_supply + total_burned` stays at the genesis
    /// supply.
    pub fn apply_seal(
        &mut self,
        tokenomics: &Tokenomics,
        depth: u64,
        amounts: &[f64],
        reward: f64,
        miner: &Address,
    ) -> SealEffects {
        let tx_owed: f64 = amounts.iter().map(|a| transaction_burn(*a)).sum();
        let tax_owed = depth_tax_burn(depth);
        let owed = tx_owed + tax_owed;

        let supply_clamped = self.total_supply - owed <= 0.0;
        let applied = owed.min(self.total_supply).max(0.0);
        let (tx_burn, depth_tax) = if owed > 0.0 {
            let scale = applied / owed;
            (tx_owed * scale, tax_owed * scale)
        } else {
            (0.0, 0.0)
        };

        self.transaction_burned += tx_burn;
        self.depth_tax_burned += depth_tax;
        self.total_burned += applied;
        if supply_clamped {
            self.total_supply = 0.0;
            self.supply_exhausted = true;
        } else {
            self.total_supply -= applied;
        }

        self.rewards_issued += reward;
        *self.miner_rewards.entry(hex::encode(miner)).or_insert(0.0) += reward;
        *self.sealed_per_depth.entry(depth).or_insert(0) += 1;
        if depth > self.deepest_depth {
            self.deepest_depth = depth;
            self.scheduled_supply = tokenomics.supply(depth);
        }

        SealEffects {
            transaction_burn: tx_burn,
            depth_tax,
            unburned: owed - applied,
            supply_clamped,
        }
    }

    pub fn sealed_total(&self) -> u64 {
        self.sealed_per_depth.values().sum()
    }

    pub fn report(&self, params: &EconomicParams) -> EconomicReport {
        let depths = (0..=self.deepest_depth)
            .map(|depth| DepthReport {
                depth,
                mining_units: params.tokenomics.mining_units(depth),
                sealed: self.sealed_per_depth.get(&depth).copied().unwrap_or(0),
                supply: params.tokenomics.supply(depth),
                density: params.tokenomics.density(depth),
                scarcity_index: params.tokenomics.scarcity_index(depth),
                difficulty: params.difficulty.difficulty(depth),
            })
            .collect();

        EconomicReport {
            total_supply: self.total_supply,
            total_burned: self.total_burned,
            transaction_burned: self.transaction_burned,
            depth_tax_burned: self.depth_tax_burned,
            rewards_issued: self.rewards_issued,
            supply_exhausted: self.supply_exhausted,
            deepest_depth: self.deepest_depth,
            scheduled_supply: self.scheduled_supply,
            depths,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthReport {
    pub depth: u64,
    /// Capacity at this depth, `3^depth`
    pub mining_units: u128,
    pub sealed: u64,
    pub supply: f64,
    pub density: f64,
    pub scarcity_index: f64,
    pub difficulty: f64,
}

/// Snapshot of the aggregate economy for display and visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicReport {
    pub total_supply: f64,
    pub total_burned: f64,
    pub transaction_burned: f64,
    pub depth_tax_burned: f64,
    pub rewards_issued: f64,
    pub supply_exhausted: bool,
    pub deepest_depth: u64,
    pub scheduled_supply: f64,
    pub depths: Vec<DepthReport>,
}
