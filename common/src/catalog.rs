//! Maps index file names to their metadata page id.
use crate::api::PageId;
use std::collections::HashMap;
use std::sync::RwLock;

/// A small directory from index-file name to the page id of its metadata page.
///
/// Mirrors the locking discipline of a table catalog: reads and writes take
/// their own critical section and no lock is held across a fallible page
/// operation.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: RwLock<HashMap<String, PageId>>,
}

impl Catalog {
    /// Creates a new, empty catalog.
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Looks up the metadata page id registered for `name`.
    pub fn get_file_entry(&self, name: &str) -> Option<PageId> {
        self.entries.read().unwrap().get(name).copied()
    }

    /// Registers `name` as pointing to metadata page `id`.
    ///
    /// Overwrites any previous entry for the same name.
    pub fn add_file_entry(&self, name: &str, id: PageId) {
        self.entries.write().unwrap().insert(name.to_string(), id);
    }

    /// Removes the entry for `name`, returning its page id if one existed.
    pub fn delete_file_entry(&self, name: &str) -> Option<PageId> {
        self.entries.write().unwrap().remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_add_and_get() {
        let catalog = Catalog::new();
        assert_eq!(catalog.get_file_entry("orders_idx"), None);

        catalog.add_file_entry("orders_idx", 7);
        assert_eq!(catalog.get_file_entry("orders_idx"), Some(7));
    }

    #[test]
    fn test_catalog_delete() {
        let catalog = Catalog::new();
        catalog.add_file_entry("orders_idx", 7);

        assert_eq!(catalog.delete_file_entry("orders_idx"), Some(7));
        assert_eq!(catalog.get_file_entry("orders_idx"), None);
        assert_eq!(catalog.delete_file_entry("orders_idx"), None);
    }

    #[test]
    fn test_catalog_overwrite() {
        let catalog = Catalog::new();
        catalog.add_file_entry("orders_idx", 7);
        catalog.add_file_entry("orders_idx", 9);
        assert_eq!(catalog.get_file_entry("orders_idx"), Some(9));
    }
}
