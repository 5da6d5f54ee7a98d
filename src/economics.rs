//! Economics module: depth-indexed supply, difficulty and burn rules
//!
//! Everything here is pure. The matrix is the only component that applies
//! the results to its aggregate counters.

pub mod burn;
pub mod difficulty;
pub mod tokenomics;

pub use burn::*;
pub use difficulty::*;
pub use tokenomics::*;

use serde::{Deserialize, Serialize};

/// Engine parameters a matrix is constructed with and validated against.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EconomicParams {
    pub tokenomics: Tokenomics,
    pub difficulty: DifficultyEngine,
}
