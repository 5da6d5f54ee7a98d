/// Depth-dependent proof-of-work difficulty
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const BASE_DIFFICULTY: f64 = 100.0;
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyEngine {
    pub base: f64,
}

impl Default for DifficultyEngine {
    fn default() -> Self {
        DifficultyEngine {
            base: BASE_DIFFICULTY,
        }
    }
}

impl DifficultyEngine {
    pub fn new(base: f64) -> Self {
        DifficultyEngine { base }
    }

    /// `D(n) = D0 * phi^n * sin(pi/3) * (1 + n^2/100)`
    pub fn difficulty(&self, depth: u64) -> f64 {
        let n = depth as f64;
        self.base * GOLDEN_RATIO.powf(n) * (PI / 3.0).sin() * (1.0 + n * n / 100.0)
    }

    pub fn target(&self, depth: u64) -> Target {
        Target::from_difficulty(self.difficulty(depth))
    }
}

/// 256-bit big-endian threshold a header hash must not exceed.
///
/// The target for difficulty `d` is `2^256 / d`, so a header needs about `d`
/// attempts on average and a larger difficulty never yields a larger target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Target(pub [u8; 32]);

impl Target {
    pub const MAX: Target = Target([0xFF; 32]);

    pub fn from_difficulty(difficulty: f64) -> Self {
        if difficulty.is_nan() || difficulty <= 1.0 {
            return Target::MAX;
        }
        let bits = difficulty.log2();
        let whole = bits.floor();
        if whole >= 256.0 {
            return Target([0u8; 32]);
        }
        // 2^(256 - bits) = mantissa * 2^(192 - whole), mantissa in (2^63, 2^64]
        let mantissa = 2f64.powf(64.0 - (bits - whole)).min(u64::MAX as f64) as u64;
        let shift = 192 - whole as i64;

        // little-endian limbs
        let mut limbs = [0u64; 4];
        if shift >= 0 {
            let limb = (shift / 64) as usize;
            let offset = (shift % 64) as u32;
            limbs[limb] |= mantissa << offset;
            if offset > 0 && limb + 1 < limbs.len() {
                limbs[limb + 1] |= mantissa >> (64 - offset);
            }
        } else {
            let right = (-shift) as u32;
            limbs[0] = if right >= 64 { 0 } else { mantissa >> right };
        }

        let mut bytes = [0u8; 32];
        for (i, limb) in limbs.iter().rev().enumerate() {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_be_bytes());
        }
        Target(bytes)
    }

    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        hash <= &self.0
    }

    /// Number of leading zero bits every qualifying hash must carry.
    pub fn leading_zero_bits(&self) -> u32 {
        let mut zeros = 0;
        for byte in self.0 {
            if byte == 0 {
                zeros += 8;
            } else {
                zeros += byte.leading_zeros();
                break;
            }
        }
        zeros
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_strictly_increasing() {
        let engine = DifficultyEngine::default();
        for n in 0..100 {
            assert!(engine.difficulty(n + 1) > engine.difficulty(n));
        }
    }

    #[test]
    fn test_difficulty_formula() {
        let engine = DifficultyEngine::default();
        let expected_zero = 100.0 * (PI / 3.0).sin();
        assert!((engine.difficulty(0) - expected_zero).abs() < 1e-9);

        let expected_two = 100.0 * GOLDEN_RATIO.powi(2) * (PI / 3.0).sin() * 1.04;
        assert!((engine.difficulty(2) - expected_two).abs() < 1e-9);
    }

    #[test]
    fn test_target_monotonic_in_depth() {
        let engine = DifficultyEngine::default();
        for n in 0..40 {
            assert!(engine.target(n + 1) <= engine.target(n));
        }
        assert!(engine.target(20) < engine.target(1));
    }

    #[test]
    fn test_target_boundaries() {
        assert_eq!(Target::from_difficulty(0.5), Target::MAX);
        assert_eq!(Target::from_difficulty(f64::NAN), Target::MAX);
        assert_eq!(Target::from_difficulty(1e100), Target([0u8; 32]));
    }

    #[test]
    fn test_target_for_power_of_two() {
        // 2^256 / 256 = 2^248: one zero byte then all ones (rounded down)
        let target = Target::from_difficulty(256.0);
        assert_eq!(target.0[0], 0);
        assert_eq!(target.0[1], 0xFF);
        assert_eq!(target.leading_zero_bits(), 8);
    }

    #[test]
    fn test_is_met_by() {
        let target = Target::from_difficulty(256.0);
        let mut low = [0xFFu8; 32];
        low[0] = 0;
        assert!(target.is_met_by(&low));
        let mut high = [0u8; 32];
        high[0] = 1;
        assert!(!target.is_met_by(&high));
    }
}
