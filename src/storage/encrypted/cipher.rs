// src/storage/encrypted/cipher.rs
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use ring::rand::{SecureRandom, SystemRandom};
use sha3::{Digest, Sha3_256};

use super::errors::{Result, StorageError};

const NONCE_LEN: usize = 12;

/// AES-256-GCM over a SHA3-256 digest of the configured passphrase.
/// Ciphertexts are laid out as `nonce || sealed`.
pub struct StorageCipher {
    cipher: Aes256Gcm,
    rng: SystemRandom,
    key_id: String,
}

impl StorageCipher {
    pub fn new(passphrase: &[u8]) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(StorageError::EncryptionError(
                "encryption key must not be empty".to_string(),
            ));
        }

        let hash = Sha3_256::digest(passphrase);
        let cipher_key = Key::<Aes256Gcm>::from_slice(hash.as_slice());
        let cipher = Aes256Gcm::new(cipher_key);
        let key_id = hex::encode(&Sha3_256::digest(hash.as_slice())[..4]);

        Ok(Self {
            cipher,
            rng: SystemRandom::new(),
            key_id,
        })
    }

    /// Short fingerprint of the derived key, safe to log.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| StorageError::EncryptionError("nonce generation failed".to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, data)
            .map_err(|e| StorageError::EncryptionError(e.to_string()))?;

        let mut result = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < NONCE_LEN {
            return Err(StorageError::DecryptionError(
                "Invalid encrypted data length".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| StorageError::DecryptionError(e.to_string()))
    }
}
