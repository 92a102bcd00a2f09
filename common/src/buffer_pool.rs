//! A CLOCK-replacement buffer pool manager.
use crate::api::{BpmError, BufferPoolManager, PageGuard, PageId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::disk_manager::DiskManager;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, RwLock};

type FrameId = usize;

/// Represents a single frame in the buffer pool.
#[derive(Debug)]
struct Frame {
    page_id: PageId,
    data: [u8; PAGE_SIZE],
    pin_count: usize,
    is_dirty: bool,
    is_referenced: bool, // for the CLOCK replacer
}

/// A buffer pool manager backed by a fixed set of frames and the CLOCK
/// second-chance replacement policy.
#[derive(Debug)]
pub struct ClockBufferPoolManager {
    frames: Vec<RwLock<Frame>>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    free_list: Mutex<Vec<FrameId>>,
    disk_manager: Arc<DiskManager>,
    pool_size: usize,
    clock_hand: Mutex<usize>,
}

/// A page guard for the clock-replacement BPM.
///
/// Holds a write lock on the frame for its entire lifetime. When dropped, it
/// automatically unpins the page in the BPM.
pub struct ClockPageGuard<'a> {
    bpm: &'a ClockBufferPoolManager,
    page_id: PageId,
    frame_id: FrameId,
}

impl<'a> PageGuard for ClockPageGuard<'a> {
    fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<'a> Deref for ClockPageGuard<'a> {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        let frame_guard = self.bpm.frames[self.frame_id].read().unwrap();
        // Safe: the pin held by this guard guarantees the frame isn't evicted
        // or reused for the lifetime of the returned reference.
        unsafe { &*(&frame_guard.data as *const _) }
    }
}

impl<'a> DerefMut for ClockPageGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let mut frame_guard = self.bpm.frames[self.frame_id].write().unwrap();
        frame_guard.is_dirty = true;
        // Safe for the same reason as `deref`.
        unsafe { &mut *(&mut frame_guard.data as *mut _) }
    }
}

impl<'a> Drop for ClockPageGuard<'a> {
    fn drop(&mut self) {
        self.bpm.unpin_page(self.page_id).unwrap();
    }
}

impl BufferPoolManager for ClockBufferPoolManager {
    fn fetch_page(&self, page_id: PageId) -> Result<Box<dyn PageGuard + '_>, BpmError> {
        let pt_read_lock = self.page_table.read().unwrap();
        if let Some(&frame_id) = pt_read_lock.get(&page_id) {
            let mut frame = self.frames[frame_id].write().unwrap();
            frame.pin_count += 1;
            frame.is_referenced = true;
            return Ok(Box::new(ClockPageGuard { bpm: self, page_id, frame_id }));
        }
        drop(pt_read_lock);

        let frame_id = self.find_victim_frame()?;
        let mut frame = self.frames[frame_id].write().unwrap();

        if frame.is_dirty {
            self.disk_manager.write_page(frame.page_id, &frame.data)?;
        }

        let old_page_id = frame.page_id;
        self.disk_manager.read_page(page_id, &mut frame.data)?;
        frame.page_id = page_id;
        frame.pin_count = 1;
        frame.is_dirty = false;
        frame.is_referenced = true;

        let mut pt_write_lock = self.page_table.write().unwrap();
        pt_write_lock.remove(&old_page_id);
        pt_write_lock.insert(page_id, frame_id);

        Ok(Box::new(ClockPageGuard { bpm: self, page_id, frame_id }))
    }

    fn new_page(&self) -> Result<Box<dyn PageGuard + '_>, BpmError> {
        let frame_id = self.find_victim_frame()?;
        let mut frame = self.frames[frame_id].write().unwrap();

        if frame.is_dirty {
            self.disk_manager.write_page(frame.page_id, &frame.data)?;
        }

        let old_page_id = frame.page_id;
        let new_page_id = self.disk_manager.allocate_page();

        frame.page_id = new_page_id;
        frame.pin_count = 1;
        frame.is_dirty = true; // a freshly allocated page is dirty until flushed
        frame.is_referenced = true;
        frame.data = [0; PAGE_SIZE];

        let mut pt_write_lock = self.page_table.write().unwrap();
        pt_write_lock.remove(&old_page_id);
        pt_write_lock.insert(new_page_id, frame_id);

        Ok(Box::new(ClockPageGuard { bpm: self, page_id: new_page_id, frame_id }))
    }

    fn unpin_page(&self, page_id: PageId) -> Result<(), BpmError> {
        let pt_read_lock = self.page_table.read().unwrap();
        if let Some(&frame_id) = pt_read_lock.get(&page_id) {
            let mut frame = self.frames[frame_id].write().unwrap();
            if frame.pin_count > 0 {
                frame.pin_count -= 1;
            }
        }
        Ok(())
    }

    fn free_page(&self, page_id: PageId) -> Result<(), BpmError> {
        let mut pt_write_lock = self.page_table.write().unwrap();
        if let Some(&frame_id) = pt_write_lock.get(&page_id) {
            let mut frame = self.frames[frame_id].write().unwrap();
            assert_eq!(frame.pin_count, 0, "cannot free a pinned page");
            pt_write_lock.remove(&page_id);
            frame.page_id = INVALID_PAGE_ID;
            frame.is_dirty = false;
            drop(frame);
            self.free_list.lock().unwrap().push(frame_id);
        }
        self.disk_manager.free_page(page_id);
        Ok(())
    }

    fn flush_page(&self, page_id: PageId) -> Result<(), BpmError> {
        let pt_read_lock = self.page_table.read().unwrap();
        if let Some(&frame_id) = pt_read_lock.get(&page_id) {
            let mut frame = self.frames[frame_id].write().unwrap();
            if frame.is_dirty {
                self.disk_manager.write_page(page_id, &frame.data)?;
                frame.is_dirty = false;
            }
        }
        Ok(())
    }

    fn flush_all_pages(&self) -> Result<(), BpmError> {
        let pt_read_lock = self.page_table.read().unwrap();
        for (&page_id, &frame_id) in pt_read_lock.iter() {
            let mut frame = self.frames[frame_id].write().unwrap();
            if frame.is_dirty {
                self.disk_manager.write_page(page_id, &frame.data)?;
                frame.is_dirty = false;
            }
        }
        Ok(())
    }
}

impl ClockBufferPoolManager {
    /// Creates a new `ClockBufferPoolManager` with `pool_size` frames.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            frames.push(RwLock::new(Frame {
                page_id: INVALID_PAGE_ID,
                data: [0; PAGE_SIZE],
                pin_count: 0,
                is_dirty: false,
                is_referenced: false,
            }));
            free_list.push(i);
        }

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            disk_manager,
            pool_size,
            clock_hand: Mutex::new(0),
        }
    }

    /// Finds a victim frame using the free list or the CLOCK algorithm.
    fn find_victim_frame(&self) -> Result<FrameId, BpmError> {
        let mut free_list = self.free_list.lock().unwrap();
        if let Some(frame_id) = free_list.pop() {
            return Ok(frame_id);
        }
        drop(free_list);

        let mut clock_hand = self.clock_hand.lock().unwrap();
        for _ in 0..(2 * self.pool_size) {
            let frame_id = *clock_hand;

            if let Ok(mut frame) = self.frames[frame_id].try_write() {
                if frame.pin_count == 0 {
                    if frame.is_referenced {
                        frame.is_referenced = false;
                    } else {
                        *clock_hand = (*clock_hand + 1) % self.pool_size;
                        return Ok(frame_id);
                    }
                }
            }
            *clock_hand = (*clock_hand + 1) % self.pool_size;
        }

        Err(BpmError::NoFreeFrames)
    }
}
