//! Newtypes for type-safe domain values
//!
//! - [`EntityId`] - identifier of a file or folder in the source account
//! - [`ChangeCursor`] - opaque change-feed position
//! - [`StorageKey`] - destination key in the object sink
//! - [`RunId`] - identifier of one reconciliation run

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Stored value meaning "no checkpoint has been established yet"
pub const UNINITIALIZED_CURSOR: &str = "INIT";

// ============================================================================
// EntityId
// ============================================================================

/// Identifier of a file, folder or shortcut in the source account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Create a new EntityId
    ///
    /// # Errors
    /// Returns error if the identifier is empty or contains whitespace
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidEntityId(
                "Entity ID cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidEntityId(format!(
                "Entity ID cannot contain whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for EntityId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

// ============================================================================
// ChangeCursor
// ============================================================================

/// Opaque change-feed position
///
/// Resuming the feed from a cursor yields only changes recorded after it.
/// The empty string and [`UNINITIALIZED_CURSOR`] are never valid cursors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeCursor(String);

impl ChangeCursor {
    /// Create a new ChangeCursor
    ///
    /// # Errors
    /// Returns error if the cursor is empty or equals the uninitialized sentinel
    pub fn new(cursor: String) -> Result<Self, DomainError> {
        let trimmed = cursor.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidCursor(
                "Change cursor cannot be empty".to_string(),
            ));
        }
        if trimmed == UNINITIALIZED_CURSOR {
            return Err(DomainError::InvalidCursor(format!(
                "{UNINITIALIZED_CURSOR} is reserved for an uninitialized checkpoint"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Interpret a raw stored checkpoint value
    ///
    /// Absent, blank and sentinel values all mean "uninitialized".
    #[must_use]
    pub fn from_stored(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| Self::new(value.to_string()).ok())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChangeCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangeCursor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ChangeCursor {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ChangeCursor> for String {
    fn from(cursor: ChangeCursor) -> Self {
        cursor.0
    }
}

// ============================================================================
// StorageKey
// ============================================================================

/// Destination key of one object in the sink
///
/// Keys are relative, `/`-separated and never contain empty, `.` or `..`
/// components. Values produced by [`crate::domain::build_key`] always pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Create a new validated StorageKey
    ///
    /// # Errors
    /// Returns error if the key is empty, absolute, or has a bad component
    pub fn new(key: String) -> Result<Self, DomainError> {
        if key.is_empty() {
            return Err(DomainError::InvalidStorageKey(
                "Storage key cannot be empty".to_string(),
            ));
        }
        if key.starts_with('/') {
            return Err(DomainError::InvalidStorageKey(format!(
                "Storage key must be relative: {key}"
            )));
        }
        if key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(DomainError::InvalidStorageKey(format!(
                "Storage key has an empty or relative component: {key}"
            )));
        }
        Ok(Self(key))
    }

    /// Wrap a key assembled from sanitized components
    pub(crate) fn from_sanitized(key: String) -> Self {
        debug_assert!(Self::new(key.clone()).is_ok(), "unsanitized key: {key}");
        Self(key)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated components
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StorageKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for StorageKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

// ============================================================================
// RunId
// ============================================================================

/// Unique identifier of one reconciliation run, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::ValidationFailed(format!("Invalid run ID: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_valid() {
        let id = EntityId::new("1AbC-dEf_9".to_string()).unwrap();
        assert_eq!(id.as_str(), "1AbC-dEf_9");
        assert_eq!(id.to_string(), "1AbC-dEf_9");
    }

    #[test]
    fn test_entity_id_rejects_empty_and_whitespace() {
        assert!(EntityId::new(String::new()).is_err());
        assert!(EntityId::new("a b".to_string()).is_err());
    }

    #[test]
    fn test_change_cursor_rejects_sentinel() {
        assert!(ChangeCursor::new("INIT".to_string()).is_err());
        assert!(ChangeCursor::new("  ".to_string()).is_err());
        assert_eq!(ChangeCursor::new(" 123 ".to_string()).unwrap().as_str(), "123");
    }

    #[test]
    fn test_change_cursor_from_stored() {
        assert_eq!(ChangeCursor::from_stored(None), None);
        assert_eq!(ChangeCursor::from_stored(Some("")), None);
        assert_eq!(ChangeCursor::from_stored(Some("INIT")), None);
        assert_eq!(
            ChangeCursor::from_stored(Some("9001")).map(String::from),
            Some("9001".to_string())
        );
    }

    #[test]
    fn test_change_cursor_serde_roundtrip() {
        let cursor = ChangeCursor::new("55".to_string()).unwrap();
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"55\"");
        assert!(serde_json::from_str::<ChangeCursor>("\"INIT\"").is_err());
    }

    #[test]
    fn test_storage_key_validation() {
        assert!(StorageKey::new("drivesync/My Drive/a.txt".to_string()).is_ok());
        assert!(StorageKey::new(String::new()).is_err());
        assert!(StorageKey::new("/abs/key".to_string()).is_err());
        assert!(StorageKey::new("a//b".to_string()).is_err());
        assert!(StorageKey::new("a/../b".to_string()).is_err());
        assert!(StorageKey::new("a/./b".to_string()).is_err());
    }

    #[test]
    fn test_storage_key_components() {
        let key = StorageKey::new("p/My Drive/x.pdf".to_string()).unwrap();
        let parts: Vec<_> = key.components().collect();
        assert_eq!(parts, vec!["p", "My Drive", "x.pdf"]);
    }

    #[test]
    fn test_run_id_unique_and_parse() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
        let parsed: RunId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
        assert!("not-a-uuid".parse::<RunId>().is_err());
    }
}
