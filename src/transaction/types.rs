/// Transaction records embedded in triads
use crate::crypto::{Address, Digest, HashScheme};
use serde::{Deserialize, Serialize};

/// One transfer recorded inside a triad. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionNode {
    pub sender: Address,
    pub receiver: Address,
    pub amount: f64,
    pub fee: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub hash: Digest,
    pub signature: Option<Vec<u8>>,
    pub public_key: Option<Vec<u8>>,
}

impl TransactionNode {
    pub fn new(
        scheme: HashScheme,
        sender: Address,
        receiver: Address,
        amount: f64,
        fee: f64,
        timestamp: i64,
    ) -> Self {
        let mut tx = TransactionNode {
            sender,
            receiver,
            amount,
            fee,
            timestamp,
            hash: [0u8; 32],
            signature: None,
            public_key: None,
        };
        tx.hash = tx.calculate_hash(scheme);
        tx
    }

    /// Creates a transaction stamped with the current time.
    pub fn now(scheme: HashScheme, sender: Address, receiver: Address, amount: f64, fee: f64) -> Self {
        Self::new(
            scheme,
            sender,
            receiver,
            amount,
            fee,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// Bytes covered by both the content hash and the signature.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(32 + 32 + 8 + 8 + 8);
        message.extend_from_slice(&self.sender);
        message.extend_from_slice(&self.receiver);
        message.extend_from_slice(&self.amount.to_le_bytes());
        message.extend_from_slice(&self.fee.to_le_bytes());
        message.extend_from_slice(&self.timestamp.to_le_bytes());
        message
    }

    pub fn calculate_hash(&self, scheme: HashScheme) -> Digest {
        scheme.digest(&self.signable_message())
    }

    pub fn sign(&mut self, signature: Vec<u8>, public_key: Vec<u8>) {
        self.signature = Some(signature);
        self.public_key = Some(public_key);
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some() && self.public_key.is_some()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }
}
