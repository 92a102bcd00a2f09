//! `find_run_start` and the `Scan` cursor built on top of it.
//!
//! `find_run_start` locates the leftmost leaf/slot whose key is `>= lo_key`
//! (or the very first leaf when `lo_key` is `None`). It is used both by
//! range scans and by the full-delete path to locate the leaf a key
//! nominally belongs to.

use common::api::{PageId, INVALID_PAGE_ID};
use common::key::Key;

use crate::error::Result;
use crate::page::{read_node_type, NodeType};
use crate::page::index::IndexPage;
use crate::page::leaf::LeafPage;
use crate::tree::Tree;

/// Descends from `root_id` to the leaf/slot holding the first entry with
/// key `>= lo_key`. Returns `None` if the tree is empty or no such entry
/// exists. Does not leave any page pinned; callers that need the leaf
/// pinned re-fetch it by id.
pub fn find_run_start(tree: &Tree, root_id: PageId, lo_key: Option<&Key>) -> Result<Option<(PageId, usize)>> {
    if root_id == INVALID_PAGE_ID {
        return Ok(None);
    }

    let mut current_id = root_id;
    let leaf_id = loop {
        let mut guard = tree.bpm.fetch_page(current_id)?;
        let node_type = read_node_type(&guard[..]).expect("corrupt page: unknown node type");
        match node_type {
            NodeType::Leaf => break current_id,
            NodeType::Index => {
                let page = IndexPage::new(&mut guard[..], tree.key_type);
                current_id = match lo_key {
                    None => page.left_link(),
                    Some(lo) => {
                        let lb = page.lower_bound(lo);
                        if lb == 0 {
                            page.left_link()
                        } else {
                            page.get_child(lb - 1)
                        }
                    }
                };
            }
        }
    };

    let mut current_id = leaf_id;
    loop {
        let mut guard = tree.bpm.fetch_page(current_id)?;
        let page = LeafPage::new(&mut guard[..], tree.key_type);
        if !page.is_empty() {
            let slot = match lo_key {
                None => 0,
                Some(lo) => match page.find_slot(lo) {
                    Ok(idx) => idx,
                    Err(idx) => idx,
                },
            };
            if slot < page.key_count() as usize {
                return Ok(Some((current_id, slot)));
            }
        }
        let next = page.next();
        if next == INVALID_PAGE_ID {
            return Ok(None);
        }
        current_id = next;
    }
}

/// A pinned cursor over a range of leaf entries, advancing across the leaf
/// sibling chain. Holds the current leaf pinned; dropping the cursor (or
/// exhausting it) releases the pin.
pub struct Scan<'a> {
    tree: &'a Tree,
    leaf_id: PageId,
    slot: usize,
    hi_key: Option<Key>,
    done: bool,
}

impl<'a> Scan<'a> {
    pub(crate) fn new(tree: &'a Tree, start: Option<(PageId, usize)>, hi_key: Option<Key>) -> Self {
        match start {
            Some((leaf_id, slot)) => Scan { tree, leaf_id, slot, hi_key, done: false },
            None => Scan { tree, leaf_id: INVALID_PAGE_ID, slot: 0, hi_key, done: true },
        }
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = Result<(Key, crate::page::RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut guard = match self.tree.bpm.fetch_page(self.leaf_id) {
                Ok(g) => g,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            let page = LeafPage::new(&mut guard[..], self.tree.key_type);
            if self.slot < page.key_count() as usize {
                let key = page.get_key(self.slot);
                if let Some(hi) = &self.hi_key {
                    if key.compare(hi) == std::cmp::Ordering::Greater {
                        self.done = true;
                        return None;
                    }
                }
                let rid = page.get_rid(self.slot);
                self.slot += 1;
                return Some(Ok((key, rid)));
            }
            let next = page.next();
            if next == INVALID_PAGE_ID {
                self.done = true;
                return None;
            }
            self.leaf_id = next;
            self.slot = 0;
        }
    }
}
