//! Crate-level error type, following the ecosystem convention of a
//! hand-written `Display` + `std::error::Error` impl and `From`
//! conversions at the boundary, rather than `thiserror`/`anyhow`.

use std::fmt;

use common::api::BpmError;

/// Errors produced by the B+-tree index.
#[derive(Debug)]
pub enum IndexError {
    /// A key's serialized size exceeds the tree's declared maximum.
    KeyTooLong,
    /// A key's runtime variant does not match the tree's declared `KeyType`.
    KeyTypeMismatch,
    /// A page was read where a different node type was expected. This is a
    /// structural bug, not a recoverable condition.
    NodeTypeInvalid,
    /// `Tree::open` was called against a catalog entry that does not exist.
    MissingFile,
    /// Propagated from the buffer pool manager.
    Bpm(BpmError),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::KeyTooLong => write!(f, "key exceeds the tree's maximum key size"),
            IndexError::KeyTypeMismatch => write!(f, "key does not match the tree's declared key type"),
            IndexError::NodeTypeInvalid => write!(f, "page does not contain the expected node type"),
            IndexError::MissingFile => write!(f, "no catalog entry for the requested index file"),
            IndexError::Bpm(e) => write!(f, "buffer pool error: {e}"),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Bpm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BpmError> for IndexError {
    fn from(e: BpmError) -> Self {
        IndexError::Bpm(e)
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
