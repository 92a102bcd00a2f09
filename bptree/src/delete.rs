//! The delete engine: naive (scan-and-remove, no rebalancing) and full
//! (redistribute-from-sibling or merge-with-sibling, propagating a
//! *deletion notice* upward on merge) delete policies.

use common::api::{PageId, INVALID_PAGE_ID};
use common::key::Key;

use crate::error::{IndexError, Result};
use crate::page::header::HeaderPage;
use crate::page::index::IndexPage;
use crate::page::leaf::LeafPage;
use crate::page::{read_node_type, NodeType, RecordId};
use crate::scan::find_run_start;
use crate::tree::Tree;

/// Which rebalancing strategy a tree uses after a delete underflows a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Scan-and-remove; pages never merge or redistribute.
    Naive,
    /// Redistribute from a sibling, or merge with one, propagating a
    /// deletion notice up to the parent.
    Full,
}

/// `(separator_key, freed_page_id)`, returned upward when a merge occurs.
/// The merge itself has already removed the corresponding parent entry (or
/// reassigned the left-link); the notice's role from here up is purely to
/// signal "the parent was structurally touched, check its occupancy too".
type DeletionNotice = (Key, PageId);

pub fn delete(tree: &Tree, key: Key, rid: RecordId) -> Result<bool> {
    if !key.matches_type(&tree.key_type) {
        return Err(IndexError::KeyTypeMismatch);
    }

    let root_id = read_root(tree)?;
    if root_id == INVALID_PAGE_ID {
        return Ok(false);
    }

    match tree.delete_policy {
        DeletePolicy::Naive => naive_delete(tree, &key, rid, root_id),
        DeletePolicy::Full => {
            let (removed, _notice) = full_delete(tree, &key, rid, root_id, None)?;
            Ok(removed)
        }
    }
}

fn read_root(tree: &Tree) -> Result<PageId> {
    let mut header_guard = tree.bpm.fetch_page(tree.metadata_page_id)?;
    Ok(HeaderPage::new(&mut header_guard[..]).root_page_id())
}

fn naive_delete(tree: &Tree, key: &Key, rid: RecordId, root_id: PageId) -> Result<bool> {
    let start = match find_run_start(tree, root_id, Some(key))? {
        Some(s) => s,
        None => return Ok(false),
    };

    let mut current_id = start.0;
    loop {
        let mut guard = tree.bpm.fetch_page(current_id)?;
        let mut page = LeafPage::new(&mut guard[..], tree.key_type);
        if page.delete_exact(key, rid) {
            return Ok(true);
        }
        let count = page.key_count() as usize;
        if count > 0 && page.get_key(count - 1).compare(key) == std::cmp::Ordering::Greater {
            return Ok(false);
        }
        let next = page.next();
        if next == INVALID_PAGE_ID {
            return Ok(false);
        }
        current_id = next;
    }
}

fn full_delete(
    tree: &Tree,
    key: &Key,
    rid: RecordId,
    current_id: PageId,
    parent: Option<PageId>,
) -> Result<(bool, Option<DeletionNotice>)> {
    let mut guard = tree.bpm.fetch_page(current_id)?;
    let node_type = read_node_type(&guard[..]).ok_or(IndexError::NodeTypeInvalid)?;

    match node_type {
        NodeType::Index => {
            let page = IndexPage::new(&mut guard[..], tree.key_type);
            let child_id = page.page_no_by_key(key);
            drop(guard);

            let (removed, child_notice) = full_delete(tree, key, rid, child_id, Some(current_id))?;
            if child_notice.is_none() {
                return Ok((removed, None));
            }

            // The child's merge already mutated this page (removed an
            // entry or reassigned the left-link); check whether that
            // pushed this page below half capacity in turn.
            let still_underflowing = {
                let mut g = tree.bpm.fetch_page(current_id)?;
                IndexPage::new(&mut g[..], tree.key_type).is_underflow(tree.internal_max_size)
            };
            if !still_underflowing {
                return Ok((removed, None));
            }

            if parent.is_none() {
                root_collapse(tree, current_id)?;
                return Ok((removed, None));
            }

            let notice = rebalance_index(tree, current_id, parent.unwrap())?;
            Ok((removed, notice))
        }
        NodeType::Leaf => {
            let mut page = LeafPage::new(&mut guard[..], tree.key_type);
            let removed = page.delete_exact(key, rid);
            if !removed {
                return Ok((false, None));
            }
            let underflowing = page.is_underflow(tree.leaf_max_size);
            let is_empty = page.is_empty();
            drop(guard);

            let parent_id = match parent {
                Some(p) => p,
                None => {
                    // This leaf is the root. A non-root leaf tolerates
                    // underflow until a sibling operation fixes it up, but a
                    // root with no parent has no sibling to call on; once it
                    // empties out, the tree itself is empty.
                    if is_empty {
                        let mut header_guard = tree.bpm.fetch_page(tree.metadata_page_id)?;
                        HeaderPage::new(&mut header_guard[..]).set_root_page_id(INVALID_PAGE_ID);
                        drop(header_guard);
                        tree.bpm.free_page(current_id)?;
                        tree.trace.trace("delete: emptied leaf root freed");
                    }
                    return Ok((true, None));
                }
            };

            if !underflowing {
                return Ok((true, None));
            }

            let notice = rebalance_leaf(tree, current_id, parent_id)?;
            Ok((true, notice))
        }
    }
}

/// Returns `(left_sibling, right_sibling)` of `current_id` as seen from
/// `parent_id`, determined by scanning the parent's separators rather than
/// comparing page-id magnitudes.
fn siblings_of(tree: &Tree, parent_id: PageId, current_id: PageId) -> Result<(Option<PageId>, Option<PageId>)> {
    let mut guard = tree.bpm.fetch_page(parent_id)?;
    let parent = IndexPage::new(&mut guard[..], tree.key_type);

    if parent.left_link() == current_id {
        let right = if parent.key_count() > 0 { Some(parent.get_child(0)) } else { None };
        return Ok((None, right));
    }
    if let Some(idx) = parent.find_child_index(current_id) {
        let left = if idx == 0 { Some(parent.left_link()) } else { Some(parent.get_child(idx - 1)) };
        let right = if idx + 1 < parent.key_count() as usize { Some(parent.get_child(idx + 1)) } else { None };
        return Ok((left, right));
    }
    Ok((None, None))
}

fn root_collapse(tree: &Tree, root_id: PageId) -> Result<()> {
    let mut guard = tree.bpm.fetch_page(root_id)?;
    let root_page = IndexPage::new(&mut guard[..], tree.key_type);
    if !root_page.is_empty() {
        return Ok(());
    }
    let only_child = root_page.left_link();
    drop(guard);

    let child_is_empty_leaf = {
        let mut child_guard = tree.bpm.fetch_page(only_child)?;
        matches!(read_node_type(&child_guard[..]), Some(NodeType::Leaf))
            && LeafPage::new(&mut child_guard[..], tree.key_type).is_empty()
    };

    let mut header_guard = tree.bpm.fetch_page(tree.metadata_page_id)?;
    let mut header = HeaderPage::new(&mut header_guard[..]);
    if child_is_empty_leaf {
        header.set_root_page_id(INVALID_PAGE_ID);
        drop(header_guard);
        tree.bpm.free_page(only_child)?;
    } else {
        header.set_root_page_id(only_child);
    }
    tree.bpm.free_page(root_id)?;
    tree.trace.trace("delete: root collapsed");
    Ok(())
}

/// Attempts the four sibling operations for an underflowed leaf, in order:
/// redistribute-left, redistribute-right, merge-left, merge-right.
fn rebalance_leaf(tree: &Tree, current_id: PageId, parent_id: PageId) -> Result<Option<DeletionNotice>> {
    let (left_id, right_id) = siblings_of(tree, parent_id, current_id)?;
    let half = tree.leaf_max_size.div_ceil(2);

    if let Some(left_id) = left_id {
        let count = {
            let mut g = tree.bpm.fetch_page(left_id)?;
            LeafPage::new(&mut g[..], tree.key_type).key_count()
        };
        if count > half {
            redistribute_leaves(tree, left_id, current_id, parent_id, true)?;
            return Ok(None);
        }
    }

    if let Some(right_id) = right_id {
        let count = {
            let mut g = tree.bpm.fetch_page(right_id)?;
            LeafPage::new(&mut g[..], tree.key_type).key_count()
        };
        if count > half {
            redistribute_leaves(tree, current_id, right_id, parent_id, false)?;
            return Ok(None);
        }
    }

    if let Some(left_id) = left_id {
        Ok(Some(merge_leaf_into_left(tree, left_id, current_id, parent_id)?))
    } else if let Some(right_id) = right_id {
        Ok(Some(merge_leaf_into_right(tree, current_id, right_id, parent_id)?))
    } else {
        Ok(None)
    }
}

/// Rebalances `left_id`/`right_id` by moving entries so both hold
/// `floor(total/2)` and the remainder, with `left_id` keeping the smaller
/// keys, then adjusts the parent's separator.
fn redistribute_leaves(tree: &Tree, left_id: PageId, right_id: PageId, parent_id: PageId, donor_is_left: bool) -> Result<()> {
    let left_entries = {
        let mut g = tree.bpm.fetch_page(left_id)?;
        LeafPage::new(&mut g[..], tree.key_type).all_entries()
    };
    let right_entries = {
        let mut g = tree.bpm.fetch_page(right_id)?;
        LeafPage::new(&mut g[..], tree.key_type).all_entries()
    };

    let left_original_len = left_entries.len();
    let mut combined = left_entries;
    combined.extend(right_entries);

    let old_right_first = combined[left_original_len].0.clone();
    let total = combined.len();
    let donor_count = total / 2;
    let left_count = if donor_is_left { donor_count } else { total - donor_count };
    let (new_left, new_right) = combined.split_at(left_count);

    {
        let mut g = tree.bpm.fetch_page(left_id)?;
        LeafPage::new(&mut g[..], tree.key_type).replace_entries(new_left);
    }
    let new_right_first = {
        let mut g = tree.bpm.fetch_page(right_id)?;
        let mut right = LeafPage::new(&mut g[..], tree.key_type);
        right.replace_entries(new_right);
        right.get_key(0)
    };

    let mut parent_guard = tree.bpm.fetch_page(parent_id)?;
    IndexPage::new(&mut parent_guard[..], tree.key_type).adjust_key(&old_right_first, &new_right_first);

    tree.trace.trace("delete: redistributed leaf entries between siblings");
    Ok(())
}

/// Merges `current_id` into its left sibling `left_id`; `current_id` is
/// freed and the parent's separator for it removed.
fn merge_leaf_into_left(tree: &Tree, left_id: PageId, current_id: PageId, parent_id: PageId) -> Result<DeletionNotice> {
    let (current_entries, current_next) = {
        let mut g = tree.bpm.fetch_page(current_id)?;
        let page = LeafPage::new(&mut g[..], tree.key_type);
        (page.all_entries(), page.next())
    };

    {
        let mut g = tree.bpm.fetch_page(left_id)?;
        let mut left = LeafPage::new(&mut g[..], tree.key_type);
        let mut combined = left.all_entries();
        combined.extend(current_entries);
        left.replace_entries(&combined);
        left.set_next(current_next);
    }

    if current_next != INVALID_PAGE_ID {
        let mut g = tree.bpm.fetch_page(current_next)?;
        LeafPage::new(&mut g[..], tree.key_type).set_prev(left_id);
    }

    let removed_key = {
        let mut g = tree.bpm.fetch_page(parent_id)?;
        let mut parent = IndexPage::new(&mut g[..], tree.key_type);
        let idx = parent.find_child_index(current_id).expect("current must be a keyed child when a left sibling exists");
        let key = parent.get_key(idx);
        parent.delete_at(idx);
        key
    };

    tree.bpm.free_page(current_id)?;
    tree.trace.trace("delete: merged leaf into left sibling");
    Ok((removed_key, current_id))
}

/// Merges `current_id` into its right sibling `right_id`; `current_id` is
/// freed. If `current_id` was the parent's left-link, the left-link is
/// reassigned to `right_id`; otherwise the parent's separator for
/// `right_id` is adjusted to current's old separator before current's own
/// entry is removed.
fn merge_leaf_into_right(tree: &Tree, current_id: PageId, right_id: PageId, parent_id: PageId) -> Result<DeletionNotice> {
    let (current_entries, current_prev) = {
        let mut g = tree.bpm.fetch_page(current_id)?;
        let page = LeafPage::new(&mut g[..], tree.key_type);
        (page.all_entries(), page.prev())
    };

    let old_right_first = {
        let mut g = tree.bpm.fetch_page(right_id)?;
        let mut right = LeafPage::new(&mut g[..], tree.key_type);
        let old_first = right.get_key(0);
        let mut combined = current_entries;
        combined.extend(right.all_entries());
        right.replace_entries(&combined);
        right.set_prev(current_prev);
        old_first
    };

    if current_prev != INVALID_PAGE_ID {
        let mut g = tree.bpm.fetch_page(current_prev)?;
        LeafPage::new(&mut g[..], tree.key_type).set_next(right_id);
    }

    let removed_key = {
        let mut g = tree.bpm.fetch_page(parent_id)?;
        let mut parent = IndexPage::new(&mut g[..], tree.key_type);
        if parent.left_link() == current_id {
            parent.set_left_link(right_id);
            let idx = parent.find_child_index(right_id).expect("right sibling must be a keyed child");
            let key = parent.get_key(idx);
            parent.delete_at(idx);
            key
        } else {
            let idx = parent.find_child_index(current_id).expect("current must be a keyed child when no left sibling exists");
            let key = parent.get_key(idx);
            parent.adjust_key(&old_right_first, &key);
            parent.delete_at(idx);
            key
        }
    };

    tree.bpm.free_page(current_id)?;
    tree.trace.trace("delete: merged leaf into right sibling");
    Ok((removed_key, current_id))
}

fn rebalance_index(tree: &Tree, current_id: PageId, parent_id: PageId) -> Result<Option<DeletionNotice>> {
    let (left_id, right_id) = siblings_of(tree, parent_id, current_id)?;
    let half = tree.internal_max_size.div_ceil(2);

    if let Some(left_id) = left_id {
        let count = {
            let mut g = tree.bpm.fetch_page(left_id)?;
            IndexPage::new(&mut g[..], tree.key_type).key_count()
        };
        if count > half {
            redistribute_index(tree, left_id, current_id, parent_id, true)?;
            return Ok(None);
        }
    }

    if let Some(right_id) = right_id {
        let count = {
            let mut g = tree.bpm.fetch_page(right_id)?;
            IndexPage::new(&mut g[..], tree.key_type).key_count()
        };
        if count > half {
            redistribute_index(tree, current_id, right_id, parent_id, false)?;
            return Ok(None);
        }
    }

    if let Some(left_id) = left_id {
        Ok(Some(merge_index_into_left(tree, left_id, current_id, parent_id)?))
    } else if let Some(right_id) = right_id {
        Ok(Some(merge_index_into_right(tree, current_id, right_id, parent_id)?))
    } else {
        Ok(None)
    }
}

/// Separator key the parent uses for `child_id`. `child_id` must be a
/// normal keyed child here, never the left-link (callers only use this for
/// children reached via `siblings_of` in a role that guarantees that).
fn parent_separator_for(tree: &Tree, parent_id: PageId, child_id: PageId) -> Result<Key> {
    let mut guard = tree.bpm.fetch_page(parent_id)?;
    let parent = IndexPage::new(&mut guard[..], tree.key_type);
    let idx = parent.find_child_index(child_id).expect("child must have a parent separator");
    Ok(parent.get_key(idx))
}

/// Rebalances index siblings `left_id`/`right_id` (sharing `parent_id`) by
/// moving entries so both hold `floor(total/2)` and the remainder. The
/// parent separator between them is folded into the flat entry list as the
/// key attached to `right`'s left-link (the left-link subtlety: moving a
/// left-link subtree across a merge/redistribute boundary requires
/// inserting it as an explicit `(key, child)` pair), then a new
/// separator/left-link pair is derived from whichever entry ends up first
/// on the right after the move.
fn redistribute_index(tree: &Tree, left_id: PageId, right_id: PageId, parent_id: PageId, donor_is_left: bool) -> Result<()> {
    let old_separator = parent_separator_for(tree, parent_id, right_id)?;

    let (left_entries, left_link) = {
        let mut g = tree.bpm.fetch_page(left_id)?;
        let page = IndexPage::new(&mut g[..], tree.key_type);
        (page.all_entries(), page.left_link())
    };
    let (right_entries, right_left_link) = {
        let mut g = tree.bpm.fetch_page(right_id)?;
        let page = IndexPage::new(&mut g[..], tree.key_type);
        (page.all_entries(), page.left_link())
    };

    let mut combined = left_entries;
    combined.push((old_separator.clone(), right_left_link));
    combined.extend(right_entries);

    let total = combined.len();
    let donor_count = total / 2;
    let left_count = if donor_is_left { donor_count } else { total - donor_count };
    let (new_left, rest) = combined.split_at(left_count);
    let new_left_link_for_right = rest[0].1;
    let new_separator = rest[0].0.clone();

    {
        let mut g = tree.bpm.fetch_page(left_id)?;
        IndexPage::new(&mut g[..], tree.key_type).replace_entries(left_link, new_left);
    }
    {
        let mut g = tree.bpm.fetch_page(right_id)?;
        IndexPage::new(&mut g[..], tree.key_type).replace_entries(new_left_link_for_right, &rest[1..]);
    }

    let mut parent_guard = tree.bpm.fetch_page(parent_id)?;
    IndexPage::new(&mut parent_guard[..], tree.key_type).adjust_key(&old_separator, &new_separator);

    tree.trace.trace("delete: redistributed index entries between siblings");
    Ok(())
}

/// Merges `current_id` into its left sibling `left_id`; current's entries
/// (and its left-link, folded in as an explicit entry keyed by the parent's
/// old separator for current) are appended to left. `current_id` is freed
/// and the parent's separator for it removed.
fn merge_index_into_left(tree: &Tree, left_id: PageId, current_id: PageId, parent_id: PageId) -> Result<DeletionNotice> {
    let (current_left_link, current_entries) = {
        let mut g = tree.bpm.fetch_page(current_id)?;
        let page = IndexPage::new(&mut g[..], tree.key_type);
        (page.left_link(), page.all_entries())
    };

    let removed_key = {
        let mut g = tree.bpm.fetch_page(parent_id)?;
        let parent = IndexPage::new(&mut g[..], tree.key_type);
        let idx = parent.find_child_index(current_id).expect("current must be a keyed child when a left sibling exists");
        parent.get_key(idx)
    };

    {
        let mut g = tree.bpm.fetch_page(left_id)?;
        let mut left = IndexPage::new(&mut g[..], tree.key_type);
        let left_link = left.left_link();
        let mut combined = left.all_entries();
        combined.push((removed_key.clone(), current_left_link));
        combined.extend(current_entries);
        left.replace_entries(left_link, &combined);
    }

    {
        let mut g = tree.bpm.fetch_page(parent_id)?;
        let mut parent = IndexPage::new(&mut g[..], tree.key_type);
        let idx = parent.find_child_index(current_id).expect("current must still be a keyed child");
        parent.delete_at(idx);
    }

    tree.bpm.free_page(current_id)?;
    tree.trace.trace("delete: merged index page into left sibling");
    Ok((removed_key, current_id))
}

/// Merges `current_id` into its right sibling `right_id`; current's
/// entries and left-link precede right's own content (with the parent's
/// old separator for `right_id` folded in as an explicit entry keyed to
/// right's old left-link). If `current_id` was the parent's left-link, the
/// left-link is reassigned to `right_id`; otherwise the parent's separator
/// for `right_id` is adjusted to current's old separator before current's
/// own entry is removed.
fn merge_index_into_right(tree: &Tree, current_id: PageId, right_id: PageId, parent_id: PageId) -> Result<DeletionNotice> {
    let (current_left_link, current_entries) = {
        let mut g = tree.bpm.fetch_page(current_id)?;
        let page = IndexPage::new(&mut g[..], tree.key_type);
        (page.left_link(), page.all_entries())
    };

    let old_right_sep = parent_separator_for(tree, parent_id, right_id)?;

    {
        let mut g = tree.bpm.fetch_page(right_id)?;
        let mut right = IndexPage::new(&mut g[..], tree.key_type);
        let right_left_link = right.left_link();
        let mut combined = current_entries;
        combined.push((old_right_sep.clone(), right_left_link));
        combined.extend(right.all_entries());
        right.replace_entries(current_left_link, &combined);
    }

    let removed_key = {
        let mut g = tree.bpm.fetch_page(parent_id)?;
        let mut parent = IndexPage::new(&mut g[..], tree.key_type);
        if parent.left_link() == current_id {
            parent.set_left_link(right_id);
            let idx = parent.find_child_index(right_id).expect("right sibling must be a keyed child");
            let key = parent.get_key(idx);
            parent.delete_at(idx);
            key
        } else {
            let idx = parent.find_child_index(current_id).expect("current must be a keyed child when no left sibling exists");
            let key = parent.get_key(idx);
            parent.adjust_key(&old_right_sep, &key);
            parent.delete_at(idx);
            key
        }
    };

    tree.bpm.free_page(current_id)?;
    tree.trace.trace("delete: merged index page into right sibling");
    Ok((removed_key, current_id))
}
