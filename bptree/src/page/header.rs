//! The single metadata/header page: magic number, root page-id, key type,
//! max key size, and delete policy. Laid out as a fixed-width header read
//! and written directly against a page buffer, rather than through a
//! separate serialize/deserialize `Vec<u8>` round-trip.

use common::api::{PageId, INVALID_PAGE_ID};
use common::key::KeyType;

use crate::delete::DeletePolicy;

/// Identifies this crate's header pages so `open` can refuse to treat an
/// arbitrary page as tree metadata.
pub const HEADER_MAGIC: u32 = 1989;

const MAGIC_OFFSET: usize = 0;
const ROOT_PAGE_ID_OFFSET: usize = 4;
const KEY_TYPE_TAG_OFFSET: usize = 12;
const VARCHAR_MAX_LENGTH_OFFSET: usize = 13;
const DELETE_POLICY_OFFSET: usize = 17;
const LEAF_MAX_SIZE_OFFSET: usize = 18;
const INTERNAL_MAX_SIZE_OFFSET: usize = 20;
const MAX_KEY_SIZE_OFFSET: usize = 22;

/// Total header size in bytes; the remainder of the page is unused.
pub const HEADER_LAYOUT_SIZE: usize = 24;

const KEY_TYPE_INTEGER: u8 = 0;
const KEY_TYPE_VARCHAR: u8 = 1;

const DELETE_POLICY_NAIVE: u8 = 0;
const DELETE_POLICY_FULL: u8 = 1;

pub struct HeaderPage<'a> {
    data: &'a mut [u8],
}

impl<'a> HeaderPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    pub fn initialize(&mut self, key_type: KeyType, max_key_size: u16, delete_policy: DeletePolicy, leaf_max_size: u16, internal_max_size: u16) {
        self.data[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&HEADER_MAGIC.to_le_bytes());
        self.set_root_page_id(INVALID_PAGE_ID);
        match key_type {
            KeyType::Integer => {
                self.data[KEY_TYPE_TAG_OFFSET] = KEY_TYPE_INTEGER;
                self.data[VARCHAR_MAX_LENGTH_OFFSET..VARCHAR_MAX_LENGTH_OFFSET + 4].copy_from_slice(&0u32.to_le_bytes());
            }
            KeyType::Varchar { max_length } => {
                self.data[KEY_TYPE_TAG_OFFSET] = KEY_TYPE_VARCHAR;
                self.data[VARCHAR_MAX_LENGTH_OFFSET..VARCHAR_MAX_LENGTH_OFFSET + 4].copy_from_slice(&max_length.to_le_bytes());
            }
        }
        self.set_delete_policy(delete_policy);
        self.data[LEAF_MAX_SIZE_OFFSET..LEAF_MAX_SIZE_OFFSET + 2].copy_from_slice(&leaf_max_size.to_le_bytes());
        self.data[INTERNAL_MAX_SIZE_OFFSET..INTERNAL_MAX_SIZE_OFFSET + 2].copy_from_slice(&internal_max_size.to_le_bytes());
        self.data[MAX_KEY_SIZE_OFFSET..MAX_KEY_SIZE_OFFSET + 2].copy_from_slice(&max_key_size.to_le_bytes());
    }

    pub fn is_valid(&self) -> bool {
        u32::from_le_bytes(self.data[MAGIC_OFFSET..MAGIC_OFFSET + 4].try_into().unwrap()) == HEADER_MAGIC
    }

    pub fn root_page_id(&self) -> PageId {
        u64::from_le_bytes(self.data[ROOT_PAGE_ID_OFFSET..ROOT_PAGE_ID_OFFSET + 8].try_into().unwrap()) as PageId
    }

    pub fn set_root_page_id(&mut self, id: PageId) {
        self.data[ROOT_PAGE_ID_OFFSET..ROOT_PAGE_ID_OFFSET + 8].copy_from_slice(&(id as u64).to_le_bytes());
    }

    pub fn key_type(&self) -> KeyType {
        match self.data[KEY_TYPE_TAG_OFFSET] {
            KEY_TYPE_INTEGER => KeyType::Integer,
            KEY_TYPE_VARCHAR => {
                let max_length = u32::from_le_bytes(
                    self.data[VARCHAR_MAX_LENGTH_OFFSET..VARCHAR_MAX_LENGTH_OFFSET + 4].try_into().unwrap(),
                );
                KeyType::Varchar { max_length }
            }
            other => panic!("corrupt header page: unknown key type tag {other}"),
        }
    }

    pub fn max_key_size(&self) -> u16 {
        u16::from_le_bytes(self.data[MAX_KEY_SIZE_OFFSET..MAX_KEY_SIZE_OFFSET + 2].try_into().unwrap())
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        match self.data[DELETE_POLICY_OFFSET] {
            DELETE_POLICY_NAIVE => DeletePolicy::Naive,
            DELETE_POLICY_FULL => DeletePolicy::Full,
            other => panic!("corrupt header page: unknown delete policy tag {other}"),
        }
    }

    pub fn set_delete_policy(&mut self, policy: DeletePolicy) {
        self.data[DELETE_POLICY_OFFSET] = match policy {
            DeletePolicy::Naive => DELETE_POLICY_NAIVE,
            DeletePolicy::Full => DELETE_POLICY_FULL,
        };
    }

    pub fn leaf_max_size(&self) -> u16 {
        u16::from_le_bytes(self.data[LEAF_MAX_SIZE_OFFSET..LEAF_MAX_SIZE_OFFSET + 2].try_into().unwrap())
    }

    pub fn internal_max_size(&self) -> u16 {
        u16::from_le_bytes(self.data[INTERNAL_MAX_SIZE_OFFSET..INTERNAL_MAX_SIZE_OFFSET + 2].try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::api::PAGE_SIZE;

    #[test]
    fn test_initialize_and_read_back() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut header = HeaderPage::new(&mut buf);
        header.initialize(KeyType::Integer, 8, DeletePolicy::Full, 62, 82);

        assert!(header.is_valid());
        assert_eq!(header.root_page_id(), INVALID_PAGE_ID);
        assert_eq!(header.key_type(), KeyType::Integer);
        assert_eq!(header.max_key_size(), 8);
        assert_eq!(header.delete_policy(), DeletePolicy::Full);
        assert_eq!(header.leaf_max_size(), 62);
        assert_eq!(header.internal_max_size(), 82);
    }

    #[test]
    fn test_root_page_id_roundtrip() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut header = HeaderPage::new(&mut buf);
        header.initialize(KeyType::Varchar { max_length: 40 }, 44, DeletePolicy::Naive, 50, 70);

        header.set_root_page_id(7);
        assert_eq!(header.root_page_id(), 7);
        assert_eq!(header.key_type(), KeyType::Varchar { max_length: 40 });
    }
}
