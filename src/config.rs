//! Configuration management for the Triad Matrix

use crate::crypto::HashScheme;
use crate::economics::{
    DifficultyEngine, EconomicParams, Tokenomics, BASE_DIFFICULTY, BETA, GENESIS_SUPPLY,
};
use crate::error::{MatrixError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tokenomics: TokenomicsConfig,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenomicsConfig {
    #[serde(default = "default_genesis_supply")]
    pub genesis_supply: f64,
    #[serde(default = "default_beta")]
    pub beta: f64,
}

impl Default for TokenomicsConfig {
    fn default() -> Self {
        Self {
            genesis_supply: default_genesis_supply(),
            beta: default_beta(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    #[serde(default = "default_base_difficulty")]
    pub base: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            base: default_base_difficulty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashingConfig {
    #[serde(default)]
    pub scheme: HashScheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Label hashed into the miner's address
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Template refreshes attempted when a found nonce is rejected
    #[serde(default = "default_max_refreshes")]
    pub max_refreshes: u32,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            identity: default_identity(),
            max_refreshes: default_max_refreshes(),
        }
    }
}

impl Config {
    /// Rejects values the engines cannot work with.
    pub fn validate(&self) -> Result<()> {
        let supply = self.tokenomics.genesis_supply;
        if !supply.is_finite() || supply <= 0.0 {
            return Err(MatrixError::ConfigError(
                "tokenomics.genesis_supply must be a positive number".to_string(),
            ));
        }
        let beta = self.tokenomics.beta;
        if !(beta > 0.0 && beta < 1.0) {
            return Err(MatrixError::ConfigError(
                "tokenomics.beta must lie strictly between 0 and 1".to_string(),
            ));
        }
        let base = self.difficulty.base;
        if !base.is_finite() || base <= 0.0 {
            return Err(MatrixError::ConfigError(
                "difficulty.base must be a positive number".to_string(),
            ));
        }
        if self.miner.workers == 0 {
            return Err(MatrixError::ConfigError(
                "miner.workers must be at least 1".to_string(),
            ));
        }
        if self.miner.identity.is_empty() {
            return Err(MatrixError::ConfigError(
                "miner.identity must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn economic_params(&self) -> EconomicParams {
        EconomicParams {
            tokenomics: Tokenomics::new(self.tokenomics.genesis_supply, self.tokenomics.beta),
            difficulty: DifficultyEngine::new(self.difficulty.base),
        }
    }
}

pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

/// Loads a TOML config, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }
    let config_str = fs::read_to_string(path)?;
    parse_config(&config_str)
}

fn default_genesis_supply() -> f64 {
    GENESIS_SUPPLY
}

fn default_beta() -> f64 {
    BETA
}

fn default_base_difficulty() -> f64 {
    BASE_DIFFICULTY
}

fn default_workers() -> usize {
    1
}

fn default_identity() -> String {
    "triad-miner".to_string()
}

fn default_max_refreshes() -> u32 {
    3
}
