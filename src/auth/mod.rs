// Vaultkeep - Auth Module
//
// Caller identity, the ownership gate, and password hashing for login.
// Identities arrive already verified by the transport; this module only
// decides what a verified identity may touch.

mod gate;
mod identity;
pub mod password;

pub use gate::AuthorizationGate;
pub use identity::Identity;
pub use password::{authenticate, hash_password, verify_password};
