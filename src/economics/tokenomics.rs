/// Token supply and per-unit density as functions of depth
use serde::{Deserialize, Serialize};

pub const GENESIS_SUPPLY: f64 = 21_000_000.0;
/// Fraction of supply shed at every depth step.
pub const BETA: f64 = 0.30;

/// A formula result together with whether the clamp policy was applied.
///
/// Results that would be negative, NaN or smaller than the smallest normal
/// `f64` are reported as `0.0` with `clamped = true`. This is a boundary
/// condition callers may surface, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounded {
    pub value: f64,
    pub clamped: bool,
}

impl Bounded {
    pub fn clamp(raw: f64) -> Self {
        if raw.is_nan() || raw < f64::MIN_POSITIVE {
            Bounded {
                value: 0.0,
                clamped: true,
            }
        } else {
            Bounded {
                value: raw,
                clamped: false,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tokenomics {
    pub genesis_supply: f64,
    pub beta: f64,
}

impl Default for Tokenomics {
    fn default() -> Self {
        Tokenomics {
            genesis_supply: GENESIS_SUPPLY,
            beta: BETA,
        }
    }
}

impl Tokenomics {
    pub fn new(genesis_supply: f64, beta: f64) -> Self {
        Tokenomics {
            genesis_supply,
            beta,
        }
    }

    /// `S(n) = S0 * (1 - beta)^n`
    pub fn supply(&self, depth: u64) -> f64 {
        self.supply_bounded(depth).value
    }

    pub fn supply_bounded(&self, depth: u64) -> Bounded {
        Bounded::clamp(self.genesis_supply * decay(1.0 - self.beta, depth))
    }

    /// `T(n) = 3^n`, saturating at `u128::MAX`.
    pub fn mining_units(&self, depth: u64) -> u128 {
        mining_units(depth)
    }

    /// Reward per mining unit: `rho(n) = S0 * ((1 - beta) / 3)^n`
    pub fn density(&self, depth: u64) -> f64 {
        self.density_bounded(depth).value
    }

    pub fn density_bounded(&self, depth: u64) -> Bounded {
        Bounded::clamp(self.genesis_supply * decay((1.0 - self.beta) / 3.0, depth))
    }

    /// `S0 / S(n)`. Infinite once the supply has clamped to zero.
    pub fn scarcity_index(&self, depth: u64) -> f64 {
        let supply = self.supply(depth);
        if supply == 0.0 {
            f64::INFINITY
        } else {
            self.genesis_supply / supply
        }
    }
}

/// `3^n` with saturation.
pub fn mining_units(depth: u64) -> u128 {
    u32::try_from(depth)
        .ok()
        .and_then(|exp| 3u128.checked_pow(exp))
        .unwrap_or(u128::MAX)
}

fn decay(ratio: f64, depth: u64) -> f64 {
    match i32::try_from(depth) {
        Ok(exp) => ratio.powi(exp),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_values() {
        let t = Tokenomics::default();
        assert_eq!(t.supply(0), GENESIS_SUPPLY);
        assert_eq!(t.density(0), GENESIS_SUPPLY);
        assert_eq!(t.mining_units(0), 1);
        assert_eq!(t.scarcity_index(0), 1.0);
    }

    #[test]
    fn test_supply_strictly_decreasing() {
        let t = Tokenomics::default();
        for n in 0..200 {
            assert!(t.supply(n + 1) < t.supply(n), "supply not decreasing at {}", n);
            assert!(t.density(n + 1) < t.density(n), "density not decreasing at {}", n);
        }
    }

    #[test]
    fn test_mining_units_triple() {
        for n in 1..60 {
            assert_eq!(mining_units(n), 3 * mining_units(n - 1));
        }
        assert_eq!(mining_units(5), 243);
        assert_eq!(mining_units(500), u128::MAX);
    }

    #[test]
    fn test_density_equals_supply_over_units() {
        let t = Tokenomics::default();
        for n in 0..20 {
            let expected = t.supply(n) / mining_units(n) as f64;
            assert!((t.density(n) - expected).abs() <= expected * 1e-12);
        }
    }

    #[test]
    fn test_underflow_is_clamped() {
        let t = Tokenomics::default();
        let deep = t.density_bounded(5_000);
        assert_eq!(deep.value, 0.0);
        assert!(deep.clamped);
        assert!(!t.supply_bounded(10).clamped);
        assert_eq!(t.scarcity_index(u64::MAX), f64::INFINITY);
    }
}
