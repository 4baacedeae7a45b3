//! Identity and ordering types for marksync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Number of random bytes in a [`CollectionId`].
pub const COLLECTION_ID_LEN: usize = 16;

/// A unique identifier for a bookmark collection.
///
/// 16 bytes from the OS CSPRNG, displayed as 32 lowercase hex characters.
/// The id is the only thing a client needs to read or write a collection,
/// so it must never be derived from anything predictable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId([u8; COLLECTION_ID_LEN]);

impl CollectionId {
    /// Create a new random CollectionId.
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system RNG is unavailable.
    pub fn random() -> Result<Self, TypesError> {
        let mut bytes = [0u8; COLLECTION_ID_LEN];
        getrandom::getrandom(&mut bytes).map_err(|e| TypesError::Entropy(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Create a CollectionId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == COLLECTION_ID_LEN {
            let mut arr = [0u8; COLLECTION_ID_LEN];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this CollectionId.
    pub fn as_bytes(&self) -> &[u8; COLLECTION_ID_LEN] {
        &self.0
    }
}

impl FromStr for CollectionId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the canonical lowercase form is accepted so that one collection
        // has exactly one textual key.
        if s.len() != COLLECTION_ID_LEN * 2 || s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(TypesError::InvalidId(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| TypesError::InvalidId(s.to_string()))?;
        Self::from_bytes(&bytes).ok_or_else(|| TypesError::InvalidId(s.to_string()))
    }
}

impl TryFrom<String> for CollectionId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ids are capabilities; only a prefix goes into logs.
        write!(f, "CollectionId({})", &self.to_string()[..8])
    }
}

/// A strictly increasing marker of a collection's write history.
///
/// Assigned by the server, never by clients. A freshly created collection
/// starts at [`Version::INITIAL`] and every successful update moves it to
/// [`Version::next`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version assigned to a newly created collection.
    pub const INITIAL: Version = Version(1);

    /// Create a Version with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Version.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The version that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_id_hex_display() {
        let id = CollectionId::random().unwrap();
        let display = id.to_string();
        assert_eq!(display.len(), 32);
        assert!(display.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn collection_id_parses_own_display() {
        let id = CollectionId::random().unwrap();
        let parsed: CollectionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn collection_id_rejects_bad_text() {
        assert!("".parse::<CollectionId>().is_err());
        assert!("abc".parse::<CollectionId>().is_err());
        assert!("zz".repeat(16).parse::<CollectionId>().is_err());
        assert!("AB".repeat(16).parse::<CollectionId>().is_err());
        assert!("ab".repeat(17).parse::<CollectionId>().is_err());
    }

    #[test]
    fn collection_id_from_invalid_length_fails() {
        assert!(CollectionId::from_bytes(&[0u8; 8]).is_none());
        assert!(CollectionId::from_bytes(&[0u8; 32]).is_none());
    }

    #[test]
    fn random_ids_differ() {
        let a = CollectionId::random().unwrap();
        let b = CollectionId::random().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn collection_id_serializes_as_string() {
        let id = CollectionId::from_bytes(&[0xab; 16]).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(16)));
        let back: CollectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CollectionId>("\"nope\"").is_err());
    }

    #[test]
    fn debug_shows_only_prefix() {
        let id = CollectionId::from_bytes(&[0x12; 16]).unwrap();
        assert_eq!(format!("{:?}", id), "CollectionId(12121212)");
    }

    #[test]
    fn version_starts_at_one() {
        assert_eq!(Version::INITIAL.value(), 1);
        assert_eq!(Version::default(), Version::INITIAL);
    }

    #[test]
    fn version_next_is_strictly_greater() {
        let v = Version::new(41);
        assert_eq!(v.next().value(), 42);
        assert!(v.next() > v);
    }

    #[test]
    fn version_saturating_add() {
        let v = Version::new(u64::MAX);
        assert_eq!(v.next().value(), u64::MAX);
    }

    #[test]
    fn version_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Version::new(7)).unwrap(), "7");
    }
}
