/// Burn rules: per-transaction fee burn and progressive depth tax
use std::f64::consts::E;

/// Depth up to which no depth tax is charged.
pub const DEPTH_TAX_FREE_DEPTH: u64 = 10;
pub const DEPTH_TAX_COEFFICIENT: u64 = 42;

/// Burn taken from every transaction: `amount * e / 100` (about 2.718%).
pub fn transaction_burn(amount: f64) -> f64 {
    amount * (E / 100.0)
}

/// `Tax(n) = 0` for `n <= 10`, else `(n - 10)^2 * 42`, saturating.
pub fn depth_tax_burn(depth: u64) -> f64 {
    if depth <= DEPTH_TAX_FREE_DEPTH {
        return 0.0;
    }
    let excess = depth - DEPTH_TAX_FREE_DEPTH;
    excess
        .checked_mul(excess)
        .and_then(|sq| sq.checked_mul(DEPTH_TAX_COEFFICIENT))
        .map(|tax| tax as f64)
        .unwrap_or(f64::MAX)
}
