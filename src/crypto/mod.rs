// Vaultkeep - Crypto Module
//
// Authenticated encryption of secret fields under the process-wide master key.
// Every encrypted column in the store is the output of `CryptoProvider::encrypt`.

mod error;
mod provider;

pub use error::CryptoError;
pub use provider::{CryptoProvider, MasterKey, KEY_LEN, NONCE_LEN, TAG_LEN};
