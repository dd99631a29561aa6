//! Core type definitions for GeoTxn.

use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a transaction.
///
/// Assigned at construction and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random transaction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a transaction ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// An opaque key compared by identity.
///
/// Every call to [`KeyToken::new`] yields a token equal only to itself and
/// its copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyToken(Uuid);

impl KeyToken {
    /// Creates a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token:{}", self.0)
    }
}

/// Key used to register states and store properties.
///
/// `Name` keys use value equality, so two feature sources that agree on a
/// name (a JDBC URL, say) share one registration. `Token` keys use identity
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Compared by value.
    Name(String),
    /// Compared by identity.
    Token(KeyToken),
}

impl Key {
    /// Creates a name key.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a key from a fresh identity token.
    #[must_use]
    pub fn token() -> Self {
        Self::Token(KeyToken::new())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name:?}"),
            Self::Token(token) => token.fmt(f),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<KeyToken> for Key {
    fn from(token: KeyToken) -> Self {
        Self::Token(token)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

/// A type-erased property value.
pub struct PropertyValue(Box<dyn Any + Send + Sync>);

impl PropertyValue {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Returns the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns true if the value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Unwraps the value, or gives it back if it is not a `T`.
    pub fn into_inner<T: Any>(self) -> Result<T, Self> {
        self.0.downcast::<T>().map(|value| *value).map_err(Self)
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValue").finish_non_exhaustive()
    }
}
