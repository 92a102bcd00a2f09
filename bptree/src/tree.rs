//! The public `Tree` handle: construction, teardown, and the thin
//! delegating methods that forward to the insert/delete/scan engines.

use std::sync::Arc;

use common::api::{BufferPoolManager, PageId, INVALID_PAGE_ID};
use common::catalog::Catalog;
use common::key::{compute_fanout, Key, KeyType};

use crate::delete::{self, DeletePolicy};
use crate::error::{IndexError, Result};
use crate::insert;
use crate::page::header::{HeaderPage, HEADER_LAYOUT_SIZE};
use crate::page::index::IndexPage;
use crate::page::{read_node_type, NodeType, RecordId, MAX_INDEX_PAGE_CAPACITY, MAX_LEAF_PAGE_CAPACITY};
use crate::scan::{find_run_start, Scan};
use crate::trace::{NoopTraceSink, TraceSink};

/// A single B+-tree index over a fixed-size page file, addressed by a
/// catalog entry's name.
pub struct Tree {
    pub(crate) bpm: Arc<dyn BufferPoolManager>,
    pub(crate) metadata_page_id: PageId,
    pub(crate) key_type: KeyType,
    pub(crate) max_key_size: u16,
    pub(crate) leaf_max_size: u16,
    pub(crate) internal_max_size: u16,
    pub(crate) delete_policy: DeletePolicy,
    pub(crate) trace: Arc<dyn TraceSink>,
    catalog: Arc<Catalog>,
    name: String,
}

impl Tree {
    /// Opens an existing tree registered under `name` in `catalog`.
    ///
    /// # Errors
    /// Returns `IndexError::MissingFile` if no such catalog entry exists.
    pub fn open(catalog: Arc<Catalog>, bpm: Arc<dyn BufferPoolManager>, name: &str) -> Result<Self> {
        let metadata_page_id = catalog.get_file_entry(name).ok_or(IndexError::MissingFile)?;

        let (key_type, max_key_size, leaf_max_size, internal_max_size, delete_policy) = {
            let mut guard = bpm.fetch_page(metadata_page_id)?;
            let header = HeaderPage::new(&mut guard[..]);
            assert!(header.is_valid(), "catalog points at a page that is not a valid index header");
            (header.key_type(), header.max_key_size(), header.leaf_max_size(), header.internal_max_size(), header.delete_policy())
        };

        Ok(Self {
            bpm,
            metadata_page_id,
            key_type,
            max_key_size,
            leaf_max_size,
            internal_max_size,
            delete_policy,
            trace: Arc::new(NoopTraceSink),
            catalog,
            name: name.to_string(),
        })
    }

    /// Opens the tree registered under `name`, or creates and registers a
    /// fresh one with the given configuration if none exists.
    ///
    /// The default fan-out for `KeyType::Integer` is the fixed slot-count
    /// cap (`MAX_LEAF_PAGE_CAPACITY`/`MAX_INDEX_PAGE_CAPACITY`); for
    /// `KeyType::Varchar` the fan-out is computed from the page size and key
    /// width via `compute_fanout`, since a fixed cap independent of key
    /// width would waste or overrun space.
    pub fn create_or_open(
        catalog: Arc<Catalog>,
        bpm: Arc<dyn BufferPoolManager>,
        name: &str,
        key_type: KeyType,
        delete_policy: DeletePolicy,
    ) -> Result<Self> {
        if catalog.get_file_entry(name).is_some() {
            return Self::open(catalog, bpm, name);
        }

        let max_key_size = key_type.max_size() as u16;
        let (leaf_max_size, internal_max_size) = match key_type {
            KeyType::Integer => (MAX_LEAF_PAGE_CAPACITY, MAX_INDEX_PAGE_CAPACITY),
            KeyType::Varchar { .. } => {
                let (leaf, _) = compute_fanout(&key_type, RecordId::ENCODED_SIZE, crate::page::leaf::LEAF_DATA_OFFSET);
                let (_, internal) = compute_fanout(&key_type, RecordId::ENCODED_SIZE, crate::page::index::INDEX_DATA_OFFSET);
                (leaf, internal)
            }
        };

        let mut guard = bpm.new_page()?;
        let metadata_page_id = guard.page_id();
        assert!(guard.len() >= HEADER_LAYOUT_SIZE, "page too small for a header");
        HeaderPage::new(&mut guard[..]).initialize(key_type, max_key_size, delete_policy, leaf_max_size, internal_max_size);
        drop(guard);

        catalog.add_file_entry(name, metadata_page_id);

        Ok(Self {
            bpm,
            metadata_page_id,
            key_type,
            max_key_size,
            leaf_max_size,
            internal_max_size,
            delete_policy,
            trace: Arc::new(NoopTraceSink),
            catalog,
            name: name.to_string(),
        })
    }

    /// Replaces the tree's trace sink (default is `NoopTraceSink`).
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Flushes all dirty pages belonging to this tree's buffer pool.
    pub fn close(self) -> Result<()> {
        self.bpm.flush_all_pages()?;
        Ok(())
    }

    /// Frees every page owned by this tree and removes its catalog entry.
    pub fn destroy(self) -> Result<()> {
        let root_id = {
            let mut guard = self.bpm.fetch_page(self.metadata_page_id)?;
            HeaderPage::new(&mut guard[..]).root_page_id()
        };
        if root_id != INVALID_PAGE_ID {
            free_subtree(&self, root_id)?;
        }
        self.bpm.free_page(self.metadata_page_id)?;
        self.catalog.delete_file_entry(&self.name);
        Ok(())
    }

    pub fn insert(&self, key: Key, rid: RecordId) -> Result<()> {
        insert::insert(self, key, rid)
    }

    pub fn delete(&self, key: Key, rid: RecordId) -> Result<bool> {
        delete::delete(self, key, rid)
    }

    /// Opens a range scan over `[lo_key, hi_key]` (either bound may be
    /// `None` to mean unbounded).
    pub fn new_scan(&self, lo_key: Option<Key>, hi_key: Option<Key>) -> Result<Scan<'_>> {
        let root_id = {
            let mut guard = self.bpm.fetch_page(self.metadata_page_id)?;
            HeaderPage::new(&mut guard[..]).root_page_id()
        };
        let start = find_run_start(self, root_id, lo_key.as_ref())?;
        Ok(Scan::new(self, start, hi_key))
    }
}

/// Recursively frees every page in the subtree rooted at `page_id`.
fn free_subtree(tree: &Tree, page_id: PageId) -> Result<()> {
    let node_type = {
        let mut guard = tree.bpm.fetch_page(page_id)?;
        read_node_type(&guard[..]).ok_or(IndexError::NodeTypeInvalid)?
    };

    if let NodeType::Index = node_type {
        let (left_link, children) = {
            let mut guard = tree.bpm.fetch_page(page_id)?;
            let page = IndexPage::new(&mut guard[..], tree.key_type);
            (page.left_link(), (0..page.key_count() as usize).map(|i| page.get_child(i)).collect::<Vec<_>>())
        };
        free_subtree(tree, left_link)?;
        for child in children {
            free_subtree(tree, child)?;
        }
    }

    tree.bpm.free_page(page_id)?;
    Ok(())
}
