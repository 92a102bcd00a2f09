//! Key abstraction shared by the buffer/catalog layer and the B+-tree index.
//!
//! Defines the key types that can be used in an index, providing comparison,
//! fixed-width serialization, and deserialization.

use std::cmp::Ordering;

/// The type of key stored in an index. All keys in one tree share a single
/// type, established at tree creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Fixed-width 64-bit signed integer key.
    Integer,
    /// Fixed-width (padded) UTF-8 string key with a declared maximum length.
    Varchar { max_length: u32 },
}

impl KeyType {
    /// Returns the maximum serialized size for this key type in bytes.
    pub fn max_size(&self) -> usize {
        match self {
            KeyType::Integer => 8,
            KeyType::Varchar { max_length } => 4 + (*max_length as usize),
        }
    }
}

/// A key value that can be stored in a B+-tree index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// An integer key value.
    Integer(i64),
    /// A variable-length string key value.
    String(String),
}

impl Key {
    /// Compares this key with another key of the same variant.
    ///
    /// # Panics
    /// Panics if comparing keys of different variants; callers are expected
    /// to validate a key's type against the tree's declared `KeyType` before
    /// calling this.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Integer(a), Key::Integer(b)) => a.cmp(b),
            (Key::String(a), Key::String(b)) => a.cmp(b),
            _ => panic!("cannot compare keys of different types"),
        }
    }

    /// Returns true if this key's runtime variant matches `key_type`.
    pub fn matches_type(&self, key_type: &KeyType) -> bool {
        matches!(
            (self, key_type),
            (Key::Integer(_), KeyType::Integer) | (Key::String(_), KeyType::Varchar { .. })
        )
    }

    /// Serializes the key to bytes (big-endian for integers, so that byte
    /// comparison and key comparison agree, should a caller ever need it).
    ///
    /// Format:
    /// - Integer: 8 bytes (i64, big-endian)
    /// - String: 4 bytes (length as u32, little-endian) + UTF-8 bytes
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Key::Integer(val) => val.to_be_bytes().to_vec(),
            Key::String(val) => {
                let len = val.len() as u32;
                let mut bytes = Vec::with_capacity(4 + val.len());
                bytes.extend_from_slice(&len.to_le_bytes());
                bytes.extend_from_slice(val.as_bytes());
                bytes
            }
        }
    }

    /// Deserializes a key from bytes based on the key type.
    ///
    /// # Panics
    /// Panics if the bytes are invalid for the given key type.
    pub fn deserialize(bytes: &[u8], key_type: &KeyType) -> Self {
        match key_type {
            KeyType::Integer => {
                assert!(bytes.len() >= 8, "invalid integer key bytes");
                Key::Integer(i64::from_be_bytes(bytes[0..8].try_into().unwrap()))
            }
            KeyType::Varchar { .. } => {
                assert!(bytes.len() >= 4, "invalid varchar key bytes");
                let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
                assert!(bytes.len() >= 4 + len, "invalid varchar key bytes: length mismatch");
                let val = String::from_utf8(bytes[4..4 + len].to_vec())
                    .expect("invalid UTF-8 in varchar key");
                Key::String(val)
            }
        }
    }

    /// Returns the serialized size of this key in bytes.
    pub fn serialized_size(&self) -> usize {
        match self {
            Key::Integer(_) => 8,
            Key::String(val) => 4 + val.len(),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Computes the maximum fan-out for leaf and internal nodes given the key
/// type and the fixed size of the payload stored alongside each key in a
/// leaf (a `RecordId`-shaped payload).
///
/// - Leaf entry: key + payload.
/// - Internal entry: key + one child `PageId` (8 bytes).
pub fn compute_fanout(key_type: &KeyType, leaf_payload_size: usize, header_size: usize) -> (u16, u16) {
    const PAGE_ID_SIZE: usize = 8;
    let max_key_size = key_type.max_size();

    let leaf_entry_size = max_key_size + leaf_payload_size;
    let leaf_max_size = (super::api::PAGE_SIZE - header_size) / leaf_entry_size;

    let internal_entry_size = max_key_size + PAGE_ID_SIZE;
    let internal_max_size = (super::api::PAGE_SIZE - header_size) / internal_entry_size;

    (leaf_max_size as u16, internal_max_size as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_key_serialization_roundtrip() {
        let key = Key::Integer(42);
        let bytes = key.serialize();
        assert_eq!(bytes.len(), 8);
        assert_eq!(Key::deserialize(&bytes, &KeyType::Integer), key);
    }

    #[test]
    fn test_varchar_key_serialization_roundtrip() {
        let key = Key::String("hello".to_string());
        let bytes = key.serialize();
        assert_eq!(bytes.len(), 4 + 5);
        let deserialized = Key::deserialize(&bytes, &KeyType::Varchar { max_length: 100 });
        assert_eq!(key, deserialized);
    }

    #[test]
    fn test_integer_key_comparison() {
        assert_eq!(Key::Integer(10).compare(&Key::Integer(20)), Ordering::Less);
        assert_eq!(Key::Integer(20).compare(&Key::Integer(10)), Ordering::Greater);
        assert_eq!(Key::Integer(10).compare(&Key::Integer(10)), Ordering::Equal);
    }

    #[test]
    fn test_matches_type() {
        assert!(Key::Integer(1).matches_type(&KeyType::Integer));
        assert!(!Key::Integer(1).matches_type(&KeyType::Varchar { max_length: 10 }));
        assert!(Key::String("x".into()).matches_type(&KeyType::Varchar { max_length: 10 }));
    }

    #[test]
    #[should_panic(expected = "cannot compare keys of different types")]
    fn test_compare_mismatched_types_panics() {
        let _ = Key::Integer(1).compare(&Key::String("a".into()));
    }
}
