//! Session identifier generation.

use crate::errors::SessionError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Number of random bytes in a session id.
pub const ID_BYTES: usize = 16;

/// Length of the hex rendering of a session id.
pub const ID_LEN: usize = ID_BYTES * 2;

/// Opaque handle for a registered session.
///
/// Always `ID_LEN` lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh id from the operating system CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parses an externally supplied id.
    ///
    /// Upper-case hex is accepted and normalised.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        if raw.len() != ID_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SessionError::invalid_id(raw));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}
