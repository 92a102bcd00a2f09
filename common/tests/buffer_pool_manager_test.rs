use std::sync::Arc;

use common::api::BufferPoolManager;
use common::buffer_pool::ClockBufferPoolManager;
use common::disk_manager::DiskManager;
use tempfile::NamedTempFile;

const TEST_POOL_SIZE: usize = 3;

fn make_bpm(pool_size: usize) -> (NamedTempFile, Arc<ClockBufferPoolManager>) {
    let file = NamedTempFile::new().unwrap();
    let disk_manager = Arc::new(DiskManager::new(file.path().to_str().unwrap(), true).unwrap());
    let bpm = Arc::new(ClockBufferPoolManager::new(pool_size, disk_manager));
    (file, bpm)
}

#[test]
fn test_new_page() {
    let (_file, bpm) = make_bpm(TEST_POOL_SIZE);
    let page = bpm.new_page().unwrap();
    assert_eq!(page.page_id(), 0);
}

#[test]
fn test_fetch_page_returns_same_contents() {
    let (_file, bpm) = make_bpm(TEST_POOL_SIZE);
    let mut page = bpm.new_page().unwrap();
    let page_id = page.page_id();
    page[0] = 0xAB;
    drop(page); // unpin; dirty page is written back on eviction/flush

    bpm.flush_page(page_id).unwrap();

    let fetched = bpm.fetch_page(page_id).unwrap();
    assert_eq!(fetched.page_id(), page_id);
    assert_eq!(fetched[0], 0xAB);
}

#[test]
fn test_pinned_pages_are_not_evicted() {
    let (_file, bpm) = make_bpm(TEST_POOL_SIZE);

    let pinned = bpm.new_page().unwrap();
    let pinned_id = pinned.page_id();

    let mut others = Vec::new();
    for _ in 0..(TEST_POOL_SIZE - 1) {
        others.push(bpm.new_page().unwrap());
    }

    // Pool is full and `pinned` can't be evicted: one more new_page should fail.
    assert!(bpm.new_page().is_err());

    drop(pinned);
    for o in others {
        drop(o);
    }
    assert_eq!(pinned_id, 0);
}

#[test]
fn test_free_page_allows_reuse() {
    let (_file, bpm) = make_bpm(TEST_POOL_SIZE);

    let page = bpm.new_page().unwrap();
    let page_id = page.page_id();
    drop(page);

    bpm.free_page(page_id).unwrap();

    let reused = bpm.new_page().unwrap();
    assert_eq!(reused.page_id(), page_id);
}
