//! Cryptographic primitives for the Triad Matrix
//!
//! Header hashing goes through [`HashScheme`], which is chosen once when a
//! matrix is constructed and recorded in its snapshots. Transaction
//! authentication goes through [`SignatureScheme`]. Neither is referenced by
//! concrete algorithm anywhere in the ledger logic, so a replacement primitive
//! is a new variant or a new trait implementation rather than a redesign.

use crate::error::{MatrixError, Result};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Shared secp256k1 context, created on first use.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// 32-byte output of every supported hash scheme.
pub type Digest = [u8; 32];

/// Identity of a sender, receiver or miner: a 32-byte hash.
pub type Address = [u8; 32];

/// Hash primitive used for triad headers, transaction hashes and ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// SHA-256, the scheme in use today.
    #[default]
    Sha256,
    /// BLAKE3, the migration target for post-quantum preparedness.
    Blake3,
}

impl HashScheme {
    pub fn digest(&self, data: &[u8]) -> Digest {
        match self {
            HashScheme::Sha256 => Sha256::digest(data).into(),
            HashScheme::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashScheme::Sha256 => "sha256",
            HashScheme::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashScheme {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashScheme::Sha256),
            "blake3" => Ok(HashScheme::Blake3),
            other => Err(MatrixError::ConfigError(format!(
                "Unknown hash scheme '{}' (expected sha256 or blake3)",
                other
            ))),
        }
    }
}

/// Verification side of transaction authentication.
pub trait SignatureScheme: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checks `signature` over `message` for the given public key.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()>;

    /// Address that a public key of this scheme controls.
    fn address_of(&self, public_key: &[u8]) -> Address;
}

/// ECDSA over secp256k1 with SHA-256 message digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Scheme;

impl SignatureScheme for Secp256k1Scheme {
    fn name(&self) -> &'static str {
        "secp256k1"
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        verify_signature(public_key, message, signature)
    }

    fn address_of(&self, public_key: &[u8]) -> Address {
        Sha256::digest(public_key).into()
    }
}

/// Hashes a string into an address. Useful for tests and simulations.
pub fn address_from_string(s: &str) -> Address {
    Sha256::digest(s.as_bytes()).into()
}

pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

pub fn address_from_hex(hex_str: &str) -> Result<Address> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| MatrixError::CryptoError(format!("Invalid hex address: {}", e)))?;
    if bytes.len() != 32 {
        return Err(MatrixError::CryptoError(format!(
            "Address must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    bytes
        .try_into()
        .map_err(|_| MatrixError::CryptoError("Failed to convert bytes into address".to_string()))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Result<Self> {
        let secret_key = SecretKey::new(&mut OsRng);
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// SHA-256 of the compressed public key.
    pub fn address(&self) -> Address {
        Secp256k1Scheme.address_of(&self.public_key_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs the SHA-256 digest of `message`, returning a compact signature.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE]> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| MatrixError::CryptoError(format!("Failed to create message: {}", e)))?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Verifies a compact ECDSA signature against raw compressed public key bytes.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<()> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(MatrixError::CryptoError(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(MatrixError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| MatrixError::CryptoError(format!("Invalid public key: {}", e)))?;

    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| MatrixError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| MatrixError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| MatrixError::CryptoError("Signature verification failed".to_string()))
}
