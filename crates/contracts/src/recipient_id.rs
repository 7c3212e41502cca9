//! RecipientId - normalized, cheap-to-clone contact identity
//!
//! Uses `Arc<str>` internally so ledger maps and outbound messages can share it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Why a raw contact string cannot be used as a recipient identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Nothing left after trimming
    #[error("identity is empty")]
    Empty,

    /// Neither a phone number nor an e-mail address
    #[error("identity '{raw}' is malformed: {reason}")]
    Malformed { raw: String, reason: String },
}

impl IdentityError {
    fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

/// Kind of contact channel an identity points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Phone,
    Email,
}

/// Normalized recipient identity.
///
/// Phone numbers keep an optional leading `+` followed by digits only;
/// e-mail addresses are lowercased. Two raw spellings of the same contact
/// therefore compare equal once parsed.
///
/// # Examples
/// ```
/// use contracts::RecipientId;
///
/// let a = RecipientId::parse("+351 912-345-678").unwrap();
/// let b = RecipientId::parse("+351912345678").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "+351912345678");
/// ```
#[derive(Clone, Default)]
pub struct RecipientId(Arc<str>);

impl RecipientId {
    /// Parse and normalize a raw contact string.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }

        if trimmed.contains('@') {
            normalize_email(trimmed).map(Self::from)
        } else {
            normalize_phone(trimmed).map(Self::from)
        }
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Contact channel of this identity
    pub fn kind(&self) -> IdentityKind {
        if self.0.contains('@') {
            IdentityKind::Email
        } else {
            IdentityKind::Phone
        }
    }
}

fn normalize_phone(raw: &str) -> Result<String, IdentityError> {
    let mut normalized = String::with_capacity(raw.len());
    for (idx, ch) in raw.chars().enumerate() {
        match ch {
            '+' if idx == 0 => normalized.push('+'),
            '0'..='9' => normalized.push(ch),
            ' ' | '-' | '.' | '(' | ')' => {}
            other => {
                return Err(IdentityError::malformed(
                    raw,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }

    let digits = normalized.trim_start_matches('+').len();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(IdentityError::malformed(
            raw,
            format!("phone number must have {MIN_PHONE_DIGITS}-{MAX_PHONE_DIGITS} digits, got {digits}"),
        ));
    }
    Ok(normalized)
}

fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    if raw.chars().any(char::is_whitespace) {
        return Err(IdentityError::malformed(raw, "e-mail contains whitespace"));
    }

    let mut parts = raw.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(IdentityError::malformed(raw, "expected exactly one '@'")),
    };

    if local.is_empty() {
        return Err(IdentityError::malformed(raw, "empty local part"));
    }
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(IdentityError::malformed(raw, "invalid domain"));
    }

    Ok(raw.to_lowercase())
}

impl Deref for RecipientId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for RecipientId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecipientId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Already-normalized values only; use `parse` for raw input.
impl From<String> for RecipientId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for RecipientId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientId({:?})", self.0)
    }
}

impl PartialEq for RecipientId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for RecipientId {}

impl PartialEq<str> for RecipientId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for RecipientId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Same as str hash so HashMap<RecipientId, _> can be queried with &str
impl Hash for RecipientId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for RecipientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecipientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
