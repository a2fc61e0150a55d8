//! ECDSA signing for Flow account keys.
//!
//! Flow hashes the message with the key's hash algorithm and signs the
//! digest; the signature is the raw `r || s` pair, 32 bytes each.

use super::types::AccountKey;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Signature algorithm codes used by the Access API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    EcdsaP256,
    EcdsaSecp256k1,
}

impl SignatureAlgorithm {
    pub fn from_code(code: u32) -> Result<Self, String> {
        match code {
            2 => Ok(SignatureAlgorithm::EcdsaP256),
            3 => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            _ => Err(format!("Unsupported signature algorithm code: {}", code)),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            SignatureAlgorithm::EcdsaP256 => 2,
            SignatureAlgorithm::EcdsaSecp256k1 => 3,
        }
    }
}

/// Hash algorithm codes used by the Access API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha2_256,
    Sha3_256,
}

impl HashAlgorithm {
    pub fn from_code(code: u32) -> Result<Self, String> {
        match code {
            1 => Ok(HashAlgorithm::Sha2_256),
            3 => Ok(HashAlgorithm::Sha3_256),
            _ => Err(format!("Unsupported hash algorithm code: {}", code)),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            HashAlgorithm::Sha2_256 => 1,
            HashAlgorithm::Sha3_256 => 3,
        }
    }

    pub fn digest(&self, message: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            HashAlgorithm::Sha2_256 => out.copy_from_slice(&Sha256::digest(message)),
            HashAlgorithm::Sha3_256 => out.copy_from_slice(&Sha3_256::digest(message)),
        }
        out
    }
}

enum SigningKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

/// In-memory signer bound to one account key
pub struct TransactionSigner {
    key: SigningKey,
    hash_algo: HashAlgorithm,
}

impl TransactionSigner {
    /// Load a hex-encoded private key (optional `0x` prefix)
    pub fn from_hex(
        private_key_hex: &str,
        sign_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
    ) -> Result<Self, String> {
        let trimmed = private_key_hex.trim();
        let raw = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .map_err(|e| format!("Failed to decode private key hex: {}", e))?;

        let key = match sign_algo {
            SignatureAlgorithm::EcdsaP256 => SigningKey::P256(
                p256::ecdsa::SigningKey::from_slice(&raw)
                    .map_err(|e| format!("Invalid P-256 private key: {}", e))?,
            ),
            SignatureAlgorithm::EcdsaSecp256k1 => SigningKey::Secp256k1(
                k256::ecdsa::SigningKey::from_slice(&raw)
                    .map_err(|e| format!("Invalid secp256k1 private key: {}", e))?,
            ),
        };

        Ok(Self { key, hash_algo })
    }

    /// Load the private key for `account_key`, using that key's algorithms,
    /// and check it actually matches the registered public key.
    pub fn for_account_key(private_key_hex: &str, account_key: &AccountKey) -> Result<Self, String> {
        let signer = Self::from_hex(
            private_key_hex,
            SignatureAlgorithm::from_code(account_key.sign_algo)?,
            HashAlgorithm::from_code(account_key.hash_algo)?,
        )?;

        if signer.public_key() != account_key.public_key {
            return Err(format!(
                "Private key does not match public key of account key {}",
                account_key.index
            ));
        }

        Ok(signer)
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self.key {
            SigningKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            SigningKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Uncompressed public key without the SEC1 `0x04` tag (64 bytes)
    pub fn public_key(&self) -> Vec<u8> {
        let point = match &self.key {
            SigningKey::P256(key) => key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
            SigningKey::Secp256k1(key) => {
                key.verifying_key().to_encoded_point(false).as_bytes().to_vec()
            }
        };
        point[1..].to_vec()
    }

    /// Hash `message` and sign the digest
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let digest = self.hash_algo.digest(message);
        match &self.key {
            SigningKey::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(&digest)
                    .map_err(|e| format!("P-256 signing failed: {}", e))?;
                Ok(signature.to_bytes().to_vec())
            }
            SigningKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(&digest)
                    .map_err(|e| format!("secp256k1 signing failed: {}", e))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("sign_algo", &self.signature_algorithm())
            .field("hash_algo", &self.hash_algorithm())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    const KEY: &str = "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";

    #[test]
    fn test_algorithm_codes() {
        assert_eq!(SignatureAlgorithm::from_code(2).unwrap(), SignatureAlgorithm::EcdsaP256);
        assert_eq!(SignatureAlgorithm::from_code(3).unwrap(), SignatureAlgorithm::EcdsaSecp256k1);
        assert!(SignatureAlgorithm::from_code(1).is_err());
        assert_eq!(HashAlgorithm::from_code(3).unwrap(), HashAlgorithm::Sha3_256);
        assert!(HashAlgorithm::from_code(2).is_err());
    }

    #[test]
    fn test_public_key_is_64_bytes() {
        for algo in [SignatureAlgorithm::EcdsaP256, SignatureAlgorithm::EcdsaSecp256k1] {
            let signer = TransactionSigner::from_hex(KEY, algo, HashAlgorithm::Sha3_256).unwrap();
            assert_eq!(signer.public_key().len(), 64);
        }
    }

    #[test]
    fn test_accepts_0x_prefix() {
        let plain = TransactionSigner::from_hex(KEY, SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256)
            .unwrap();
        let prefixed = TransactionSigner::from_hex(
            &format!("0x{}", KEY),
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha3_256,
        )
        .unwrap();
        assert_eq!(plain.public_key(), prefixed.public_key());
    }

    #[test]
    fn test_rejects_bad_hex() {
        assert!(TransactionSigner::from_hex("zz", SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256).is_err());
        assert!(TransactionSigner::from_hex("", SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256).is_err());
    }

    #[test]
    fn test_secp256k1_signature_verifies() {
        let signer =
            TransactionSigner::from_hex(KEY, SignatureAlgorithm::EcdsaSecp256k1, HashAlgorithm::Sha3_256)
                .unwrap();
        let message = b"FLOW-V0.0-transaction envelope";
        let raw = signer.sign(message).unwrap();
        assert_eq!(raw.len(), 64);

        let key = k256::ecdsa::SigningKey::from_slice(&hex::decode(KEY).unwrap()).unwrap();
        let signature = k256::ecdsa::Signature::from_slice(&raw).unwrap();
        let digest = HashAlgorithm::Sha3_256.digest(message);
        assert!(key.verifying_key().verify_prehash(&digest, &signature).is_ok());
    }

    #[test]
    fn test_for_account_key_checks_public_key() {
        let signer = TransactionSigner::from_hex(KEY, SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256)
            .unwrap();
        let mut account_key = AccountKey {
            index: 0,
            public_key: signer.public_key(),
            sign_algo: 2,
            hash_algo: 3,
            sequence_number: 7,
            revoked: false,
        };
        let resolved = TransactionSigner::for_account_key(KEY, &account_key).unwrap();
        assert_eq!(resolved.signature_algorithm(), SignatureAlgorithm::EcdsaP256);
        assert_eq!(resolved.hash_algorithm(), HashAlgorithm::Sha3_256);

        account_key.public_key[0] ^= 0xff;
        assert!(TransactionSigner::for_account_key(KEY, &account_key).is_err());
    }
}
