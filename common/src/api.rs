//! Defines the common API for all buffer pool manager implementations.
use std::ops::{Deref, DerefMut};

/// A unique identifier for a page in the database.
pub type PageId = usize;

/// A constant to represent an invalid page ID.
///
/// The disk manager allocates real page ids starting at 0, so the sentinel
/// has to live outside that range rather than colliding with the first page.
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

/// The size of a single page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// A specialized error type for buffer pool manager operations.
#[derive(Debug)]
pub enum BpmError {
    /// Returned when the pool is full and no pages can be evicted.
    NoFreeFrames,
    /// Represents an I/O error from the disk manager.
    IoError(std::io::Error),
}

impl std::fmt::Display for BpmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BpmError::NoFreeFrames => write!(f, "buffer pool has no free frames to evict"),
            BpmError::IoError(err) => write!(f, "disk I/O error: {}", err),
        }
    }
}

impl std::error::Error for BpmError {}

impl From<std::io::Error> for BpmError {
    fn from(err: std::io::Error) -> Self {
        BpmError::IoError(err)
    }
}

/// A smart pointer representing a pinned page.
///
/// This guard provides mutable access to the page's byte data. When the guard
/// is dropped, it automatically informs the buffer pool manager to unpin the page,
/// allowing it to be considered for eviction.
pub trait PageGuard: Deref<Target = [u8]> + DerefMut {
    /// Returns the ID of the page being held.
    fn page_id(&self) -> PageId;
}

/// The main trait defining the behavior of a Buffer Pool Manager.
///
/// This trait is designed to be object-safe, so it can be used with
/// trait objects (`Arc<dyn BufferPoolManager>`).
pub trait BufferPoolManager: Send + Sync {
    /// Fetches a page from the buffer pool, reading from disk if necessary.
    ///
    /// This method pins the page and returns a `PageGuard`. The page remains
    /// pinned until the `PageGuard` is dropped.
    fn fetch_page(&self, page_id: PageId) -> Result<Box<dyn PageGuard + '_>, BpmError>;

    /// Allocates and pins a new page.
    fn new_page(&self) -> Result<Box<dyn PageGuard + '_>, BpmError>;

    /// Unpins a page from the buffer pool.
    ///
    /// This is normally invoked by a `PageGuard`'s drop implementation; callers
    /// should prefer dropping the guard over calling this directly.
    fn unpin_page(&self, page_id: PageId) -> Result<(), BpmError>;

    /// Frees a page: evicts it from the pool (if resident) without writing it
    /// back, and returns its id to the disk manager's free list for reuse.
    ///
    /// # Panics
    /// Implementations may panic or return an error if the page is still pinned.
    fn free_page(&self, page_id: PageId) -> Result<(), BpmError>;

    /// Flushes a specific page to disk if it is dirty.
    fn flush_page(&self, page_id: PageId) -> Result<(), BpmError>;

    /// Flushes all dirty pages in the buffer pool to disk.
    fn flush_all_pages(&self) -> Result<(), BpmError>;
}
