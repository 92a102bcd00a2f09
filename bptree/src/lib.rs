//! A disk-resident B+-tree index built on a pluggable buffer pool manager.
//!
//! A [`Tree`] stores `(Key, RecordId)` pairs in sorted order across fixed
//! size pages, split into leaf pages (which hold the entries and form a
//! doubly-linked sibling chain for range scans) and index pages (which hold
//! separators over child pages). Deletion follows one of two policies: a
//! naive scan-and-remove with no rebalancing, or a full policy that
//! redistributes or merges with a sibling and propagates a deletion notice
//! up to the parent, matching the reverse of insert's promotion-entry
//! propagation on split.

pub mod delete;
pub mod error;
pub mod insert;
pub mod page;
pub mod scan;
pub mod trace;
pub mod tree;

pub use delete::DeletePolicy;
pub use error::{IndexError, Result};
pub use page::RecordId;
pub use scan::Scan;
pub use trace::{NoopTraceSink, TraceSink};
pub use tree::Tree;

pub use common::key::{Key, KeyType};
