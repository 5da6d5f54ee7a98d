/// Validation logic for transactions separated from type definitions
use crate::crypto::{HashScheme, SignatureScheme};
use crate::error::{MatrixError, Result};
use crate::transaction::types::TransactionNode;

impl TransactionNode {
    /// Stateless checks run before a transaction is appended to a triad.
    /// Unsigned transactions are accepted; signed ones must verify.
    pub fn validate(&self, scheme: HashScheme, signatures: &dyn SignatureScheme) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(MatrixError::InvalidTransaction(format!(
                "Amount must be finite and non-negative, got {}",
                self.amount
            )));
        }
        if !self.fee.is_finite() || self.fee < 0.0 {
            return Err(MatrixError::InvalidTransaction(format!(
                "Fee must be finite and non-negative, got {}",
                self.fee
            )));
        }

        let expected = self.calculate_hash(scheme);
        if expected != self.hash {
            return Err(MatrixError::InvalidTransaction(format!(
                "Hash mismatch under {}: expected {}, got {}",
                scheme,
                hex::encode(expected),
                self.hash_str()
            )));
        }

        if self.signature.is_some() || self.public_key.is_some() {
            self.validate_signature(signatures)?;
        }
        Ok(())
    }

    /// Checks the signature and that the signing key controls the sender.
    pub fn validate_signature(&self, signatures: &dyn SignatureScheme) -> Result<()> {
        let (signature, public_key) = match (&self.signature, &self.public_key) {
            (Some(sig), Some(pk)) => (sig, pk),
            _ => {
                return Err(MatrixError::InvalidTransaction(
                    "Transaction not signed".to_string(),
                ))
            }
        };

        let signer = signatures.address_of(public_key);
        if signer != self.sender {
            return Err(MatrixError::InvalidTransaction(format!(
                "Public key controls {}, not sender {}",
                hex::encode(signer),
                hex::encode(self.sender)
            )));
        }

        signatures.verify(public_key, &self.signable_message(), signature)
    }
}
