use common::api::PAGE_SIZE;
use common::disk_manager::DiskManager;
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_allocate() {
    let file = NamedTempFile::new().unwrap();
    let disk_manager = DiskManager::new(file.path().to_str().unwrap(), true).unwrap();
    assert_eq!(disk_manager.allocate_page(), 0);
    assert_eq!(disk_manager.allocate_page(), 1);
}

#[test]
fn test_disk_manager_read_write() {
    let file = NamedTempFile::new().unwrap();
    let disk_manager = DiskManager::new(file.path().to_str().unwrap(), true).unwrap();
    let page_id = disk_manager.allocate_page();

    let mut data = [0u8; PAGE_SIZE];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = i as u8;
    }

    disk_manager.write_page(page_id, &data).unwrap();

    let mut read_data = [0u8; PAGE_SIZE];
    disk_manager.read_page(page_id, &mut read_data).unwrap();

    assert_eq!(data, read_data);
}

#[test]
fn test_disk_manager_reuses_freed_pages() {
    let file = NamedTempFile::new().unwrap();
    let disk_manager = DiskManager::new(file.path().to_str().unwrap(), true).unwrap();

    let a = disk_manager.allocate_page();
    let b = disk_manager.allocate_page();
    disk_manager.free_page(a);

    // The freed page should come back before the allocator grows the file.
    assert_eq!(disk_manager.allocate_page(), a);
    assert_eq!(disk_manager.allocate_page(), b + 1);
}
