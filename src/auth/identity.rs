// Vaultkeep - Caller identity

use std::fmt;

use uuid::Uuid;

/// An authenticated caller identity, as delivered by the transport layer.
///
/// Operations take `Option<&Identity>`; `None` is the explicit "no identity"
/// signal and is rejected with `StoreError::MissingIdentity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Accept a verified identity string. Blank input counts as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Convenience for transports that hand over an optional header value.
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for Identity {
    fn from(user_id: Uuid) -> Self {
        Self(user_id.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
