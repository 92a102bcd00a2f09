//! The insert engine: recursive descent that returns an optional
//! *promotion entry* upward when a split occurs.

use common::api::{PageId, INVALID_PAGE_ID};
use common::key::Key;

use crate::error::{IndexError, Result};
use crate::page::header::HeaderPage;
use crate::page::index::IndexPage;
use crate::page::leaf::LeafPage;
use crate::page::{read_node_type, NodeType, RecordId};
use crate::tree::Tree;

type PromotionEntry = (Key, PageId);

pub fn insert(tree: &Tree, key: Key, rid: RecordId) -> Result<()> {
    if !key.matches_type(&tree.key_type) {
        return Err(IndexError::KeyTypeMismatch);
    }
    if key.serialized_size() > tree.max_key_size as usize {
        return Err(IndexError::KeyTooLong);
    }

    let root_id = {
        let mut header_guard = tree.bpm.fetch_page(tree.metadata_page_id)?;
        HeaderPage::new(&mut header_guard[..]).root_page_id()
    };

    if root_id == INVALID_PAGE_ID {
        let mut leaf_guard = tree.bpm.new_page()?;
        let leaf_id = leaf_guard.page_id();
        let mut leaf = LeafPage::new(&mut leaf_guard[..], tree.key_type);
        leaf.initialize(leaf_id);
        leaf.insert_at(0, &key, rid);
        drop(leaf_guard);

        let mut header_guard = tree.bpm.fetch_page(tree.metadata_page_id)?;
        HeaderPage::new(&mut header_guard[..]).set_root_page_id(leaf_id);
        tree.trace.trace("insert: created first leaf as root");
        return Ok(());
    }

    if let Some((sep_key, new_child_id)) = insert_rec(tree, &key, rid, root_id)? {
        let mut new_root_guard = tree.bpm.new_page()?;
        let new_root_id = new_root_guard.page_id();
        let mut new_root = IndexPage::new(&mut new_root_guard[..], tree.key_type);
        new_root.initialize(new_root_id, root_id);
        new_root.insert_key_child(0, &sep_key, new_child_id);
        drop(new_root_guard);

        let mut header_guard = tree.bpm.fetch_page(tree.metadata_page_id)?;
        HeaderPage::new(&mut header_guard[..]).set_root_page_id(new_root_id);
        tree.trace.trace("insert: root split, new root allocated");
    }

    Ok(())
}

fn insert_rec(tree: &Tree, key: &Key, rid: RecordId, current_id: PageId) -> Result<Option<PromotionEntry>> {
    let mut guard = tree.bpm.fetch_page(current_id)?;
    let node_type = read_node_type(&guard[..]).ok_or(IndexError::NodeTypeInvalid)?;

    match node_type {
        NodeType::Index => {
            let page = IndexPage::new(&mut guard[..], tree.key_type);
            let child_id = page.page_no_by_key(key);
            drop(guard);

            let promoted = match insert_rec(tree, key, rid, child_id)? {
                Some(p) => p,
                None => return Ok(None),
            };
            let (sep_key, new_child_id) = promoted;

            let mut guard = tree.bpm.fetch_page(current_id)?;
            let mut page = IndexPage::new(&mut guard[..], tree.key_type);
            if !page.is_full(tree.internal_max_size) {
                let idx = page.lower_bound(&sep_key);
                page.insert_key_child(idx, &sep_key, new_child_id);
                return Ok(None);
            }

            split_index(tree, &mut page, sep_key, new_child_id)
        }
        NodeType::Leaf => {
            let mut page = LeafPage::new(&mut guard[..], tree.key_type);
            if !page.is_full(tree.leaf_max_size) {
                let idx = page.find_slot(key).unwrap_or_else(|idx| idx);
                page.insert_at(idx, key, rid);
                return Ok(None);
            }

            split_leaf(tree, &mut page, current_id, key.clone(), rid)
        }
    }
}

fn split_index(
    tree: &Tree,
    current: &mut IndexPage<'_>,
    incoming_key: Key,
    incoming_child: PageId,
) -> Result<Option<PromotionEntry>> {
    let entries = current.all_entries();
    let total = entries.len();
    let left_count = (total - 1) / 2;
    let (left_entries, right_entries) = entries.split_at(left_count);

    let mut new_guard = tree.bpm.new_page()?;
    let new_id = new_guard.page_id();
    let mut new_page = IndexPage::new(&mut new_guard[..], tree.key_type);
    let left_link = current.left_link();
    new_page.replace_entries(INVALID_PAGE_ID, right_entries);
    current.replace_entries(left_link, left_entries);

    let first_of_new = new_page.get_key(0);
    if incoming_key.compare(&first_of_new) == std::cmp::Ordering::Greater {
        let idx = new_page.lower_bound(&incoming_key);
        new_page.insert_key_child(idx, &incoming_key, incoming_child);
    } else {
        let idx = current.lower_bound(&incoming_key);
        current.insert_key_child(idx, &incoming_key, incoming_child);
    }

    let separator = new_page.get_key(0);
    let new_left_link = new_page.get_child(0);
    new_page.set_left_link(new_left_link);
    new_page.delete_at(0);

    drop(new_guard);

    tree.trace.trace("insert: index page split");
    Ok(Some((separator, new_id)))
}

fn split_leaf(
    tree: &Tree,
    current: &mut LeafPage<'_>,
    current_id: PageId,
    incoming_key: Key,
    incoming_rid: RecordId,
) -> Result<Option<PromotionEntry>> {
    let entries = current.all_entries();
    let total = entries.len();
    let left_count = (total + 1) / 2;
    let (left_entries, right_entries) = entries.split_at(left_count);

    let old_next = current.next();

    let mut new_guard = tree.bpm.new_page()?;
    let new_id = new_guard.page_id();
    let mut new_page = LeafPage::new(&mut new_guard[..], tree.key_type);
    new_page.initialize(new_id);
    new_page.replace_entries(right_entries);
    new_page.set_next(old_next);
    new_page.set_prev(current_id);

    current.replace_entries(left_entries);
    current.set_next(new_id);

    if incoming_key.compare(&new_page.get_key(0)) == std::cmp::Ordering::Greater {
        let idx = new_page.find_slot(&incoming_key).unwrap_or_else(|idx| idx);
        new_page.insert_at(idx, &incoming_key, incoming_rid);
    } else {
        let idx = current.find_slot(&incoming_key).unwrap_or_else(|idx| idx);
        current.insert_at(idx, &incoming_key, incoming_rid);
    }

    let separator = new_page.get_key(0);
    drop(new_guard);

    if old_next != INVALID_PAGE_ID {
        let mut old_next_guard = tree.bpm.fetch_page(old_next)?;
        let mut old_next_page = LeafPage::new(&mut old_next_guard[..], tree.key_type);
        old_next_page.set_prev(new_id);
    }

    tree.trace.trace("insert: leaf page split");
    Ok(Some((separator, new_id)))
}
