// Vaultkeep - Crypto Provider
//
// AES-256-GCM sealing of opaque payloads under a single master key.
//
// Wire format of every sealed blob:
//   nonce (12 bytes, fresh per call) || ciphertext || tag (16 bytes)
//
// The provider holds nothing but the immutable key schedule, so one instance
// is shared by reference across every store and every concurrent caller.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use zeroize::Zeroizing;

use super::CryptoError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Master key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;

/// Authentication tag appended by GCM.
pub const TAG_LEN: usize = 16;

// ─── Master Key ──────────────────────────────────────────────────────────────

/// The 256-bit master key. Wiped from memory on drop and never Debug-printed.
pub struct MasterKey(Zeroizing<[u8; KEY_LEN]>);

impl MasterKey {
    /// Wrap raw key bytes. Anything but exactly 32 bytes is a configuration error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::KeyConfiguration(format!(
                "decoded master key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Decode a standard base64 key, as supplied through the environment.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(BASE64.decode(encoded.trim()).map_err(|e| {
            CryptoError::KeyConfiguration(format!("master key is not valid base64: {}", e))
        })?);
        Self::from_bytes(&decoded)
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(&mut key[..]);
        Self(key)
    }

    /// Base64 encoding of the key, for handing to an operator once.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64.encode(&self.0[..]))
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Symmetric AEAD over byte payloads, bound to one master key for its lifetime.
pub struct CryptoProvider {
    cipher: Aes256Gcm,
}

impl CryptoProvider {
    pub fn new(key: &MasterKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Build a provider straight from a base64-encoded key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let key = MasterKey::from_base64(encoded)?;
        Ok(Self::new(&key))
    }

    /// Seal `plaintext` under a fresh random nonce.
    ///
    /// Returns `nonce || ciphertext || tag`. Two calls with the same input never
    /// return the same bytes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::Encryption)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    /// Open a blob produced by [`CryptoProvider::encrypt`].
    ///
    /// Fails on truncated input or any authentication failure; partial
    /// plaintext is never returned.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::Decryption);
        }
        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, sealed)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decryption)
    }

    /// Convenience wrapper for text secrets.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, CryptoError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Open a blob and require the plaintext to be UTF-8.
    pub fn decrypt_string(&self, blob: &[u8]) -> Result<Zeroizing<String>, CryptoError> {
        let mut plain = self.decrypt(blob)?;
        let bytes = std::mem::take(&mut *plain);
        String::from_utf8(bytes)
            .map(Zeroizing::new)
            .map_err(|e| {
                // Wipe the rejected bytes before they are dropped.
                let _ = Zeroizing::new(e.into_bytes());
                CryptoError::Encoding
            })
    }
}

impl fmt::Debug for CryptoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoProvider")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
