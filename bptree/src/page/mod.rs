//! Page-kind contracts: the header/metadata page, the leaf page, and the
//! index page. Each is a thin view over a raw `PAGE_SIZE` byte buffer
//! borrowed from a `PageGuard`, one type per node kind rather than one type
//! dispatching on `is_leaf`.

pub mod header;
pub mod index;
pub mod leaf;

use common::api::PageId;

/// The kind of node a page holds, tagged at byte offset 0 of every
/// non-header page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Index,
    Leaf,
}

impl NodeType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(NodeType::Index),
            1 => Some(NodeType::Leaf),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            NodeType::Index => 0,
            NodeType::Leaf => 1,
        }
    }
}

/// Identifies a tuple stored outside the index; the payload of a leaf entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_index: u16,
}

impl RecordId {
    pub const ENCODED_SIZE: usize = 10;

    pub fn encode(&self, buf: &mut [u8]) {
        buf[0..8].copy_from_slice(&(self.page_id as u64).to_le_bytes());
        buf[8..10].copy_from_slice(&self.slot_index.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> Self {
        let page_id = u64::from_le_bytes(buf[0..8].try_into().unwrap()) as PageId;
        let slot_index = u16::from_le_bytes(buf[8..10].try_into().unwrap());
        RecordId { page_id, slot_index }
    }
}

/// Default maximum slot count for an index page under the fixed-width
/// integer-key configuration. Kept as a named constant (rather than
/// derived purely from `PAGE_SIZE` arithmetic) because the end-to-end test
/// scenarios assert this exact fan-out.
pub const MAX_INDEX_PAGE_CAPACITY: u16 = 82;

/// Default maximum slot count for a leaf page under the fixed-width
/// integer-key configuration.
pub const MAX_LEAF_PAGE_CAPACITY: u16 = 62;

pub(crate) fn encode_page_id(buf: &mut [u8], id: PageId) {
    buf.copy_from_slice(&(id as u64).to_le_bytes());
}

pub(crate) fn decode_page_id(buf: &[u8]) -> PageId {
    u64::from_le_bytes(buf.try_into().unwrap()) as PageId
}

/// Node-type tag offset shared by leaf and index pages (byte 8, right after
/// the 8-byte `page_id` field that opens every non-header page).
const NODE_TYPE_TAG_OFFSET: usize = 8;

/// Reads the node-type tag off a raw page buffer without committing to a
/// `LeafPage`/`IndexPage` view. Used when descending the tree, where the
/// caller doesn't yet know which kind of node lives at a given page id.
pub fn read_node_type(data: &[u8]) -> Option<NodeType> {
    NodeType::from_byte(data[NODE_TYPE_TAG_OFFSET])
}
