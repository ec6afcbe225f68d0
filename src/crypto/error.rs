// Vaultkeep - Crypto error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Master key configuration error: {0}")]
    KeyConfiguration(String),

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed: ciphertext is truncated, tampered, or sealed under another key")]
    Decryption,

    #[error("Decrypted payload is not valid UTF-8")]
    Encoding,
}
