//! Reads and writes fixed-size pages to a single database file on disk.
use super::api::{PageId, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt; // positioned I/O allows concurrent reads/writes without a file-wide lock
use std::sync::Mutex;

/// Manages reading and writing pages to a file on disk.
///
/// This implementation uses positioned I/O (`read_at`, `write_at`) so callers
/// don't need to serialize on a single file cursor. Page allocation and the
/// free list are the only pieces of shared mutable state and are kept behind
/// a `Mutex`.
#[derive(Debug)]
pub struct DiskManager {
    db_file: File,
    allocator: Mutex<Allocator>,
}

#[derive(Debug)]
struct Allocator {
    next_page_id: PageId,
    free_list: Vec<PageId>,
}

impl DiskManager {
    /// Opens (or creates) a database file.
    ///
    /// If `truncate` is set, any existing contents are discarded and
    /// allocation restarts at page 0; otherwise `next_page_id` resumes from
    /// the file's current length.
    pub fn new(db_file_path: &str, truncate: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(db_file_path)?;
        let metadata = file.metadata()?;
        let next_page_id = (metadata.len() / PAGE_SIZE as u64) as PageId;

        Ok(Self {
            db_file: file,
            allocator: Mutex::new(Allocator {
                next_page_id,
                free_list: Vec::new(),
            }),
        })
    }

    /// Reads a page from the database file into the provided buffer using positioned I/O.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> io::Result<()> {
        let offset = (page_id * PAGE_SIZE) as u64;
        self.db_file.read_exact_at(data, offset)
    }

    /// Writes a page from the buffer into the database file using positioned I/O.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> io::Result<()> {
        let offset = (page_id * PAGE_SIZE) as u64;
        self.db_file.write_all_at(data, offset)
    }

    /// Allocates a page id, preferring a previously freed page over growing the file.
    pub fn allocate_page(&self) -> PageId {
        let mut allocator = self.allocator.lock().unwrap();
        if let Some(reused) = allocator.free_list.pop() {
            return reused;
        }
        let page_id = allocator.next_page_id;
        allocator.next_page_id += 1;
        page_id
    }

    /// Returns a page id to the free list so a future `allocate_page` can reuse it.
    pub fn free_page(&self, page_id: PageId) {
        let mut allocator = self.allocator.lock().unwrap();
        allocator.free_list.push(page_id);
    }
}
