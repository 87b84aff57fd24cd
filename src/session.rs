// Session identifiers
//
// The cookie layer owns issuing and reading the per-browser token; this
// module only gives it a type. A `SessionId` is always safe to embed in a
// file name.

use std::fmt;
use std::str::FromStr;

use crate::constants::MAX_SESSION_ID_LEN;
use crate::watermark::WatermarkError;

/// Opaque per-browser session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier (32 lowercase hex characters).
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validate an identifier received from a client.
    ///
    /// Accepts 1 to 64 ASCII letters, digits, `-` or `_`.
    pub fn parse(value: &str) -> Result<Self, WatermarkError> {
        if value.is_empty() {
            return Err(WatermarkError::InvalidSession("empty".to_string()));
        }

        if value.len() > MAX_SESSION_ID_LEN {
            return Err(WatermarkError::InvalidSession(format!(
                "longer than {} characters",
                MAX_SESSION_ID_LEN
            )));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(WatermarkError::InvalidSession(format!(
                "'{}' contains unsupported characters",
                value
            )));
        }

        Ok(SessionId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionId::parse(s)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
