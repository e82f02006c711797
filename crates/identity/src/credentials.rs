//! Validated value objects held by a `User`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use steward_core::ValueObject;

/// Why a credential value was rejected. Used as the per-field reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("must not be empty")]
    Empty,

    #[error("must be at least {0} characters")]
    TooShort(usize),

    #[error("must be at most {0} characters")]
    TooLong(usize),

    #[error("contains disallowed character {0:?}")]
    DisallowedCharacter(char),

    #[error("is reserved")]
    Reserved,

    #[error("is not a valid email address")]
    MalformedEmail,

    #[error("must be 64 hexadecimal characters")]
    MalformedDigest,
}

/// Length and charset rules for usernames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    /// Accept any non-whitespace character (legacy imports).
    pub legacy_charset: bool,
}

fn check_length(value: &str, min: usize, max: usize) -> Result<(), CredentialError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(CredentialError::Empty);
    }
    if len < min {
        return Err(CredentialError::TooShort(min));
    }
    if len > max {
        return Err(CredentialError::TooLong(max));
    }
    Ok(())
}

/// Login name. Trimmed, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str, rules: UsernameRules) -> Result<Self, CredentialError> {
        let value = raw.trim();
        check_length(value, rules.min_length, rules.max_length)?;

        let allowed = |c: char| {
            if rules.legacy_charset {
                !c.is_whitespace() && !c.is_control()
            } else {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
            }
        };
        if let Some(bad) = value.chars().find(|c| !allowed(*c)) {
            return Err(CredentialError::DisallowedCharacter(bad));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Username {}

/// Display name shown to other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    pub const MAX_LENGTH: usize = 64;

    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let value = raw.trim();
        check_length(value, 1, Self::MAX_LENGTH)?;
        if let Some(bad) = value.chars().find(|c| c.is_control()) {
            return Err(CredentialError::DisallowedCharacter(bad));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Nickname {}

/// Email address, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let value = raw.trim().to_lowercase();
        let Some((local, domain)) = value.split_once('@') else {
            return Err(CredentialError::MalformedEmail);
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || value.chars().any(char::is_whitespace)
        {
            return Err(CredentialError::MalformedEmail);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Email {}

/// Unsalted SHA-256 digest of a password. The clear text is never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Validate a clear-text password against `min_length` and digest it.
    pub fn from_plaintext(password: &str, min_length: usize) -> Result<Self, CredentialError> {
        check_length(password, min_length.max(1), usize::MAX)?;
        Ok(Self::digest(password))
    }

    /// Accept an existing lowercase-or-uppercase hex digest.
    pub fn from_hex(hex: &str) -> Result<Self, CredentialError> {
        let hex = hex.trim();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CredentialError::MalformedDigest);
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    fn digest(password: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(password.as_bytes())))
    }

    pub fn matches(&self, password: &str) -> bool {
        Self::digest(password) == *self
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

impl ValueObject for PasswordDigest {}
