//! TriadMatrix - A fractal ledger where blocks branch into a Sierpinski tree
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`matrix`] - The triad arena: slot reservation, sealing, validation, snapshots
//! - [`triad`] - Triad structure and header hashing
//! - [`transaction`] - Transaction records embedded in triads
//!
//! ## Economics
//! - [`economics`] - Tokenomics, difficulty and burn engines
//! - [`commitment`] - Deposit tiers gating mining depth
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work nonce search
//!
//! ## Cryptography
//! - [`crypto`] - Pluggable hash schemes and signatures (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod matrix;
pub mod transaction;
pub mod triad;

// ============================================================================
// Economics
// ============================================================================
pub mod commitment;
pub mod economics;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
