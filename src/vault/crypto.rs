//! Document encryption primitives
//!
//! ChaCha20-Poly1305 authenticated encryption with versioned keys. The
//! active version produces new ciphertexts; retired versions stay in the
//! table so historical documents remain decryptable after rotation.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;

use crate::db::schemas::EncryptionMetadata;
use crate::types::{Result, SignetError};

/// Algorithm identifier recorded with every ciphertext
pub const ALGORITHM: &str = "chacha20poly1305";

/// Key length (32 bytes)
pub const KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// Versioned-key cipher for documents at rest
pub struct DocumentCipher {
    keys: HashMap<u32, [u8; KEY_LEN]>,
    active_version: u32,
}

impl DocumentCipher {
    /// Build a cipher from raw keys. The active version must be present.
    pub fn new(keys: HashMap<u32, [u8; KEY_LEN]>, active_version: u32) -> Result<Self> {
        if !keys.contains_key(&active_version) {
            return Err(SignetError::Config(format!(
                "Active document key v{} is not configured",
                active_version
            )));
        }
        Ok(Self {
            keys,
            active_version,
        })
    }

    /// Build a cipher from hex-encoded keys, as configured via env
    pub fn from_hex_table(table: &HashMap<u32, String>, active_version: u32) -> Result<Self> {
        let mut keys = HashMap::new();
        for (version, hex_key) in table {
            let decoded = hex::decode(hex_key)
                .map_err(|_| SignetError::Config(format!("Document key v{} is not hex", version)))?;
            let key: [u8; KEY_LEN] = decoded.try_into().map_err(|_| {
                SignetError::Config(format!("Document key v{} must be {} bytes", version, KEY_LEN))
            })?;
            keys.insert(*version, key);
        }
        Self::new(keys, active_version)
    }

    /// Cipher with a freshly generated key, for dev mode only. Documents
    /// encrypted with it are unreadable after restart.
    pub fn ephemeral() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self {
            keys: HashMap::from([(1, key)]),
            active_version: 1,
        }
    }

    /// Version used for new ciphertexts
    pub fn active_version(&self) -> u32 {
        self.active_version
    }

    /// Encrypt plaintext with the active key and a fresh nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, EncryptionMetadata)> {
        let key = &self.keys[&self.active_version];

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| SignetError::Storage(format!("Encryption failed: {}", e)))?;

        Ok((
            ciphertext,
            EncryptionMetadata {
                algorithm: ALGORITHM.to_string(),
                nonce: hex::encode(nonce),
                key_version: self.active_version,
            },
        ))
    }

    /// Decrypt a ciphertext using the key version named in its metadata.
    ///
    /// A failed auth tag means corrupted data or the wrong key; that is
    /// fatal and surfaced to the caller, never retried.
    pub fn decrypt(&self, ciphertext: &[u8], meta: &EncryptionMetadata) -> Result<Vec<u8>> {
        if meta.algorithm != ALGORITHM {
            return Err(SignetError::Storage(format!(
                "Unsupported encryption algorithm: {}",
                meta.algorithm
            )));
        }

        let key = self.keys.get(&meta.key_version).ok_or_else(|| {
            SignetError::Storage(format!(
                "No key configured for version {}",
                meta.key_version
            ))
        })?;

        let nonce_bytes = hex::decode(&meta.nonce)
            .map_err(|_| SignetError::Storage("Malformed nonce in encryption metadata".into()))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(SignetError::Storage(format!(
                "Invalid nonce length: expected {}, got {}",
                NONCE_LEN,
                nonce_bytes.len()
            )));
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .map_err(|_| SignetError::Storage("Decryption failed: corrupted data or wrong key".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher_with(version: u32, byte: u8) -> DocumentCipher {
        DocumentCipher::new(HashMap::from([(version, [byte; KEY_LEN])]), version).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = cipher_with(1, 7);
        let plaintext = b"%PDF-1.7 signed claims form";

        let (ciphertext, meta) = cipher.encrypt(plaintext).unwrap();
        assert_eq!(meta.algorithm, ALGORITHM);
        assert_eq!(meta.key_version, 1);
        assert_ne!(ciphertext, plaintext.to_vec());

        let decrypted = cipher.decrypt(&ciphertext, &meta).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_nonces_are_fresh_per_encryption() {
        let cipher = cipher_with(1, 7);
        let (_, meta_a) = cipher.encrypt(b"same input").unwrap();
        let (_, meta_b) = cipher.encrypt(b"same input").unwrap();
        assert_ne!(meta_a.nonce, meta_b.nonce);
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = cipher_with(1, 7);
        let (ciphertext, meta) = cipher.encrypt(b"secret").unwrap();

        let other = cipher_with(1, 8);
        assert!(other.decrypt(&ciphertext, &meta).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher_with(1, 7);
        let (mut ciphertext, meta) = cipher.encrypt(b"secret").unwrap();
        ciphertext[0] ^= 0xff;
        assert!(cipher.decrypt(&ciphertext, &meta).is_err());
    }

    #[test]
    fn test_rotation_keeps_old_documents_readable() {
        // Encrypt under v1
        let old = cipher_with(1, 7);
        let (ciphertext, meta) = old.encrypt(b"pre-rotation document").unwrap();

        // Rotate: v2 active, v1 retained
        let rotated = DocumentCipher::new(
            HashMap::from([(1, [7u8; KEY_LEN]), (2, [9u8; KEY_LEN])]),
            2,
        )
        .unwrap();

        assert_eq!(rotated.active_version(), 2);
        let decrypted = rotated.decrypt(&ciphertext, &meta).unwrap();
        assert_eq!(decrypted, b"pre-rotation document");

        // New ciphertexts carry the new version
        let (_, new_meta) = rotated.encrypt(b"post-rotation").unwrap();
        assert_eq!(new_meta.key_version, 2);
    }

    #[test]
    fn test_unknown_key_version_is_fatal() {
        let cipher = cipher_with(1, 7);
        let (ciphertext, mut meta) = cipher.encrypt(b"secret").unwrap();
        meta.key_version = 99;
        assert!(cipher.decrypt(&ciphertext, &meta).is_err());
    }

    #[test]
    fn test_active_version_must_be_configured() {
        let result = DocumentCipher::new(HashMap::from([(1, [0u8; KEY_LEN])]), 2);
        assert!(result.is_err());
    }
}
