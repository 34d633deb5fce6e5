//! Unguessable public reservation tokens.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Random bytes behind each generated token.
const TOKEN_BYTES: usize = 24;
const TOKEN_MIN_LEN: usize = 16;
const TOKEN_MAX_LEN: usize = 64;

/// Validation errors for [`PublicToken`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublicTokenError {
    #[error("reservation token must be between {min} and {max} characters")]
    Length { min: usize, max: usize },
    #[error("reservation token may only contain URL-safe base64 characters")]
    InvalidCharacters,
}

/// Opaque identifier handed to guests; possession grants read access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicToken(String);

impl PublicToken {
    /// Draw a fresh token from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Validate a token received from a client.
    pub fn parse(raw: impl Into<String>) -> Result<Self, PublicTokenError> {
        let raw = raw.into();
        if !(TOKEN_MIN_LEN..=TOKEN_MAX_LEN).contains(&raw.len()) {
            return Err(PublicTokenError::Length {
                min: TOKEN_MIN_LEN,
                max: TOKEN_MAX_LEN,
            });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(PublicTokenError::InvalidCharacters);
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for PublicToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PublicToken> for String {
    fn from(value: PublicToken) -> Self {
        value.0
    }
}

impl TryFrom<String> for PublicToken {
    type Error = PublicTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn generated_tokens_are_distinct_and_valid() {
        let first = PublicToken::generate();
        let second = PublicToken::generate();
        assert_ne!(first, second);
        assert_eq!(PublicToken::parse(first.to_string()), Ok(first));
    }

    #[rstest]
    #[case("short")]
    #[case("contains spaces and is long enough")]
    #[case("slash/is/not/allowed/here")]
    fn rejects_malformed_tokens(#[case] raw: &str) {
        assert!(PublicToken::parse(raw).is_err());
    }
}
