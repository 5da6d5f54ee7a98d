//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{address_from_string, HashScheme, KeyPair, Secp256k1Scheme};
    use crate::error::MatrixError;

    fn signed_transfer(keypair: &KeyPair, amount: f64) -> TransactionNode {
        let mut tx = TransactionNode::new(
            HashScheme::Sha256,
            keypair.address(),
            address_from_string("recipient"),
            amount,
            0.5,
            1_700_000_000_000,
        );
        let message = tx.signable_message();
        let signature = keypair.sign(&message).unwrap();
        tx.sign(signature.to_vec(), keypair.public_key_bytes().to_vec());
        tx
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = TransactionNode::new(
            HashScheme::Sha256,
            address_from_string("a"),
            address_from_string("b"),
            10.0,
            0.1,
            42,
        );
        let other_amount = TransactionNode::new(
            HashScheme::Sha256,
            address_from_string("a"),
            address_from_string("b"),
            10.5,
            0.1,
            42,
        );
        let other_time = TransactionNode::new(
            HashScheme::Sha256,
            address_from_string("a"),
            address_from_string("b"),
            10.0,
            0.1,
            43,
        );
        assert_ne!(base.hash, other_amount.hash);
        assert_ne!(base.hash, other_time.hash);
        assert_ne!(base.hash, base.calculate_hash(HashScheme::Blake3));
    }

    #[test]
    fn test_unsigned_transaction_is_accepted() {
        let tx = TransactionNode::now(
            HashScheme::Sha256,
            address_from_string("a"),
            address_from_string("b"),
            1.0,
            0.0,
        );
        assert!(!tx.is_signed());
        assert!(tx.validate(HashScheme::Sha256, &Secp256k1Scheme).is_ok());
    }

    #[test]
    fn test_signed_transaction_validates() {
        let keypair = KeyPair::generate().unwrap();
        let tx = signed_transfer(&keypair, 25.0);
        assert!(tx.validate(HashScheme::Sha256, &Secp256k1Scheme).is_ok());
    }

    #[test]
    fn test_invalid_signature_fails() {
        let keypair = KeyPair::generate().unwrap();
        let mut tx = signed_transfer(&keypair, 25.0);
        tx.signature = Some(vec![0u8; 64]);
        assert!(tx.validate(HashScheme::Sha256, &Secp256k1Scheme).is_err());
    }

    #[test]
    fn test_foreign_key_is_rejected() {
        let owner = KeyPair::generate().unwrap();
        let thief = KeyPair::generate().unwrap();
        let mut tx = signed_transfer(&owner, 25.0);
        let signature = thief.sign(&tx.signable_message()).unwrap();
        tx.sign(signature.to_vec(), thief.public_key_bytes().to_vec());

        match tx.validate(HashScheme::Sha256, &Secp256k1Scheme) {
            Err(MatrixError::InvalidTransaction(msg)) => assert!(msg.contains("not sender")),
            other => panic!("Expected InvalidTransaction, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        let tx = TransactionNode::now(
            HashScheme::Sha256,
            address_from_string("a"),
            address_from_string("b"),
            -1.0,
            0.0,
        );
        assert!(tx.validate(HashScheme::Sha256, &Secp256k1Scheme).is_err());
    }

    #[test]
    fn test_hash_scheme_mismatch_rejected() {
        let tx = TransactionNode::now(
            HashScheme::Blake3,
            address_from_string("a"),
            address_from_string("b"),
            1.0,
            0.0,
        );
        assert!(tx.validate(HashScheme::Sha256, &Secp256k1Scheme).is_err());
        assert!(tx.validate(HashScheme::Blake3, &Secp256k1Scheme).is_ok());
    }
}
