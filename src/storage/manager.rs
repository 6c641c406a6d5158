use std::path::Path;
use std::sync::Arc;
use logly::Logger;
use crate::core::error::VmError;
use crate::storage::bitmap;
use crate::storage::frames::FrameTable;
use crate::storage::layout;
use crate::storage::page::{split_index, Frame, PageRecord, PAGE_ELEMENTS};
use crate::storage::swap::SwapStore;

/// Returned by the sentinel surface for any failed access.
pub const SENTINEL: i32 = -1;

#[derive(Debug, Clone, Copy)]
pub struct PagingOptions {
    /// Resident frames kept before eviction starts.
    pub frame_limit: usize,
    /// Reload a page's persisted occupancy bitmap instead of starting from empty.
    pub restore_bitmap: bool,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            frame_limit: 3,
            restore_bitmap: false,
        }
    }
}

pub struct PagingManager {
    store: SwapStore,
    table: FrameTable,
    size: usize,
    page_count: u32,
    restore_bitmap: bool,
    logger: Option<Arc<Logger>>,
}

impl PagingManager {
    pub fn open(path: &Path, size: usize, options: PagingOptions) -> Result<Self, VmError> {
        let page_count = layout::page_count(size)?;
        let store = SwapStore::open(path, page_count)?;

        Ok(Self {
            store,
            table: FrameTable::new(options.frame_limit),
            size,
            page_count,
            restore_bitmap: options.restore_bitmap,
            logger: None,
        })
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    fn log(&self, message: String) {
        if let Some(logger) = &self.logger {
            let _ = logger.info(message);
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of addressable elements: every element of every page.
    pub fn capacity(&self) -> usize {
        self.page_count as usize * PAGE_ELEMENTS
    }

    pub fn frame_limit(&self) -> usize {
        self.table.limit()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.table.get(index)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.table.iter()
    }

    pub fn resident_pages(&self) -> Vec<u32> {
        self.table.resident_pages()
    }

    pub fn is_resident(&self, page_number: u32) -> bool {
        self.table.position(page_number).is_some()
    }

    pub fn store(&self) -> &SwapStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SwapStore {
        &mut self.store
    }

    /// Resolve the frame holding `element_index`, loading its page on a miss.
    /// Every successful locate refreshes the frame's timestamp and marks it clean.
    pub fn locate(&mut self, element_index: usize) -> Result<usize, VmError> {
        let limit = self.capacity();
        if element_index >= limit {
            return Err(VmError::OutOfRange { index: element_index, limit });
        }

        let (page_number, _) = split_index(element_index);
        let frame_index = match self.table.position(page_number) {
            Some(i) => i,
            None => self.evict_and_load(page_number)?,
        };

        self.table.touch(frame_index);
        self.table[frame_index].dirty = false;
        Ok(frame_index)
    }

    /// Bring `page_number` into memory. Grows the table while it is below the
    /// frame limit, otherwise repurposes the least recently touched frame.
    pub fn evict_and_load(&mut self, page_number: u32) -> Result<usize, VmError> {
        let victim = match self.table.victim() {
            Some(v) if self.table.is_full() => v,
            _ => {
                let record = self.load_record(page_number)?;
                let index = self.table.push(page_number, record);
                self.log(format!("Loaded page {} into frame {}", page_number, index));
                return Ok(index);
            }
        };

        let evicted = self.table[victim].page_number;
        let flushed = self.table[victim].dirty;
        if flushed {
            self.flush_frame(victim)?;
        }

        let record = self.load_record(page_number)?;
        let tick = self.table.tick();
        self.table[victim].load(page_number, record, tick);

        self.log(format!(
            "Evicted page {} from frame {} (flushed: {}), loaded page {}",
            evicted, victim, flushed, page_number
        ));
        Ok(victim)
    }

    fn load_record(&mut self, page_number: u32) -> Result<PageRecord, VmError> {
        let mut record = self.store.read_page(page_number)?;
        if self.restore_bitmap {
            record.bitmap = self.store.read_bitmap(page_number)?;
        }
        Ok(record)
    }

    fn flush_frame(&mut self, index: usize) -> Result<(), VmError> {
        let frame = &self.table[index];
        self.store.write_page(frame.page_number, &frame.to_record())
    }

    /// Load a page ahead of its first access. No-op if already resident.
    pub fn preload(&mut self, page_number: u32) -> Result<usize, VmError> {
        if page_number >= self.page_count {
            return Err(VmError::PageOutOfRange {
                page: page_number,
                page_count: self.page_count,
            });
        }
        match self.table.position(page_number) {
            Some(i) => Ok(i),
            None => self.evict_and_load(page_number),
        }
    }

    /// Store `value` and write the whole frame through to the swap file.
    pub fn write(&mut self, element_index: usize, value: i32) -> Result<(), VmError> {
        let frame_index = self.locate(element_index)?;
        let (_, offset) = split_index(element_index);
        let tick = self.table.tick();

        let frame = &mut self.table[frame_index];
        frame.data[offset] = value;
        frame.dirty = true;
        frame.touch(tick);
        bitmap::update_pair(&mut frame.bitmap, &frame.data, bitmap::pair_base(offset));

        self.flush_frame(frame_index)
    }

    pub fn read(&mut self, element_index: usize) -> Result<i32, VmError> {
        let frame_index = self.locate(element_index)?;
        if frame_index > self.page_count as usize {
            return Err(VmError::OutOfRange {
                index: element_index,
                limit: self.capacity(),
            });
        }

        let (_, offset) = split_index(element_index);
        Ok(self.table[frame_index].data[offset])
    }

    /// Write returning 0 on success and `SENTINEL` on failure.
    pub fn write_element(&mut self, element_index: usize, value: i32) -> i32 {
        match self.write(element_index, value) {
            Ok(()) => 0,
            Err(e) => {
                self.report(&e);
                SENTINEL
            }
        }
    }

    /// Read returning `SENTINEL` on failure, indistinguishable from a stored -1.
    pub fn read_element(&mut self, element_index: usize) -> i32 {
        match self.read(element_index) {
            Ok(value) => value,
            Err(e) => {
                self.report(&e);
                SENTINEL
            }
        }
    }

    fn report(&self, error: &VmError) {
        if let Some(logger) = &self.logger {
            let _ = logger.error(error.to_string());
        }
    }

    /// Write every dirty frame back and mark it clean.
    pub fn flush_all(&mut self) -> Result<(), VmError> {
        for index in 0..self.table.len() {
            if self.table[index].dirty {
                self.flush_frame(index)?;
                self.table[index].dirty = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::bitmap::{FIRST_OF_PAIR, SECOND_OF_PAIR};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    fn open_manager(dir: &TempDir, size: usize, frame_limit: usize) -> PagingManager {
        let options = PagingOptions {
            frame_limit,
            ..PagingOptions::default()
        };
        PagingManager::open(&dir.path().join("file.bin"), size, options).unwrap()
    }

    #[test]
    fn test_page_count_from_size() {
        let temp_dir = TempDir::new().unwrap();
        let manager = open_manager(&temp_dir, 10000, 3);
        assert_eq!(manager.page_count(), 79);
        assert_eq!(manager.capacity(), 10112);
        assert_eq!(
            std::fs::metadata(temp_dir.path().join("file.bin")).unwrap().len(),
            2 + 79 * 576
        );
    }

    #[test]
    fn test_scripted_writes_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 10000, 3);

        for index in [522, 523, 555, 530] {
            assert_eq!(manager.write_element(index, 120), 0);
        }
        for index in [522, 523, 555, 530] {
            assert_eq!(manager.read_element(index), 120);
        }
        assert_eq!(manager.write_element(10500, 120), SENTINEL);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 10000, 3);

        assert_eq!(manager.write_element(10111, 5), 0);
        assert_eq!(manager.read_element(10111), 5);

        assert!(matches!(
            manager.write(10112, 5),
            Err(VmError::OutOfRange { index: 10112, limit: 10112 })
        ));
        assert_eq!(manager.read_element(10112), SENTINEL);
        assert_eq!(manager.write_element(10112, 5), SENTINEL);
    }

    #[test]
    fn test_random_write_read_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 2000, 2);
        let mut rng = StdRng::seed_from_u64(7);
        let mut expected = std::collections::HashMap::new();

        for _ in 0..300 {
            let index = rng.random_range(0..2000);
            let value: i32 = rng.random();
            manager.write(index, value).unwrap();
            expected.insert(index, value);
            assert_eq!(manager.read(index).unwrap(), value);
        }
        for (index, value) in expected {
            assert_eq!(manager.read(index).unwrap(), value);
        }
    }

    #[test]
    fn test_table_grows_to_limit_before_evicting() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 3);

        manager.read(0).unwrap();
        manager.read(128).unwrap();
        assert_eq!(manager.resident_pages(), vec![0, 1]);

        manager.read(256).unwrap();
        assert_eq!(manager.resident_pages(), vec![0, 1, 2]);

        manager.read(384).unwrap();
        assert_eq!(manager.resident_pages().len(), 3);
        assert!(!manager.is_resident(0));
        assert!(manager.is_resident(3));
    }

    #[test]
    fn test_eviction_picks_least_recently_touched() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 2);

        manager.read(0).unwrap(); // page 0
        manager.read(128).unwrap(); // page 1
        manager.read(5).unwrap(); // page 0 touched again

        manager.read(256).unwrap(); // page 2 evicts page 1
        assert!(manager.is_resident(0));
        assert!(!manager.is_resident(1));
        assert!(manager.is_resident(2));

        let oldest = manager
            .frames()
            .min_by_key(|f| f.last_touched)
            .map(|f| f.page_number);
        assert_eq!(oldest, Some(0));

        manager.read(384).unwrap(); // page 3 evicts page 0
        assert_eq!(manager.resident_pages(), vec![3, 2]);
    }

    #[test]
    fn test_locate_marks_frame_clean() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 2);

        manager.write(3, 9).unwrap();
        assert!(manager.frame(0).unwrap().dirty);

        // A plain locate clears the flag even though nothing was flushed since
        let frame_index = manager.locate(3).unwrap();
        assert_eq!(frame_index, 0);
        assert!(!manager.frame(0).unwrap().dirty);
    }

    #[test]
    fn test_dirty_victim_is_flushed_on_eviction() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 1);

        let frame_index = manager.locate(10).unwrap();
        manager.table[frame_index].data[10] = 77;
        manager.table[frame_index].dirty = true;

        manager.read(200).unwrap();
        assert!(!manager.is_resident(0));
        assert_eq!(manager.store_mut().read_page(0).unwrap().data[10], 77);
        assert_eq!(manager.read(10).unwrap(), 77);
    }

    #[test]
    fn test_clean_victim_is_not_flushed() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 1);

        let frame_index = manager.locate(10).unwrap();
        manager.table[frame_index].data[10] = 77;

        manager.read(200).unwrap();
        assert_eq!(manager.read(10).unwrap(), 0);
    }

    #[test]
    fn test_write_is_written_through() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 3);

        manager.write(130, -42).unwrap();
        let record = manager.store_mut().read_record(1).unwrap();
        assert_eq!(record.data[2], -42);
        assert_eq!(record.bitmap[1], FIRST_OF_PAIR);
    }

    #[test]
    fn test_occupancy_is_monotonic() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 3);

        manager.write(5, 9).unwrap();
        manager.write(5, 0).unwrap();

        let frame_index = manager.locate(5).unwrap();
        let frame = manager.frame(frame_index).unwrap();
        assert_eq!(frame.data[5], 0);
        assert_eq!(frame.bitmap[2], SECOND_OF_PAIR);
        assert!(bitmap::is_occupied(&frame.bitmap, 5));
        assert!(!bitmap::is_occupied(&frame.bitmap, 4));
        assert_eq!(manager.store_mut().read_bitmap(0).unwrap()[2], SECOND_OF_PAIR);
    }

    #[test]
    fn test_reload_starts_with_empty_bitmap() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 1);

        manager.write(0, 5).unwrap();
        assert_eq!(manager.store_mut().read_bitmap(0).unwrap()[0], FIRST_OF_PAIR);

        manager.read(300).unwrap();
        let frame_index = manager.locate(0).unwrap();
        assert_eq!(manager.frame(frame_index).unwrap().bitmap[0], 0);
        assert_eq!(manager.read(0).unwrap(), 5);

        // The next write-through persists the reset bitmap
        manager.write(2, 0).unwrap();
        assert_eq!(manager.store_mut().read_bitmap(0).unwrap()[0], 0);
    }

    #[test]
    fn test_restore_bitmap_option() {
        let temp_dir = TempDir::new().unwrap();
        let options = PagingOptions {
            frame_limit: 1,
            restore_bitmap: true,
        };
        let mut manager =
            PagingManager::open(&temp_dir.path().join("file.bin"), 1280, options).unwrap();

        manager.write(1, 5).unwrap();
        manager.read(300).unwrap();
        let frame_index = manager.locate(1).unwrap();
        assert_eq!(manager.frame(frame_index).unwrap().bitmap[0], SECOND_OF_PAIR);
    }

    #[test]
    fn test_page_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let values: Vec<i32> = (0..128).map(|i| i * 7 - 300).collect();

        {
            let mut manager = open_manager(&temp_dir, 10000, 3);
            for (offset, &value) in values.iter().enumerate() {
                manager.write(5 * 128 + offset, value).unwrap();
            }
            manager.flush_all().unwrap();
        }

        let mut manager = open_manager(&temp_dir, 10000, 3);
        assert!(!manager.store().created());
        assert!(!manager.is_resident(5));
        manager.preload(5).unwrap();
        for (offset, &value) in values.iter().enumerate() {
            assert_eq!(manager.read(5 * 128 + offset).unwrap(), value);
        }
    }

    #[test]
    fn test_stored_minus_one_matches_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 10000, 3);

        assert_eq!(manager.write_element(42, -1), 0);
        let stored = manager.read_element(42);
        let out_of_range = manager.read_element(10500);

        assert_eq!(stored, SENTINEL);
        assert_eq!(stored, out_of_range);
        // Only the Result surface tells them apart
        assert_eq!(manager.read(42).unwrap(), -1);
        assert!(matches!(manager.read(10500), Err(VmError::OutOfRange { .. })));
    }

    #[test]
    fn test_reopen_with_larger_size_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.bin");
        {
            let mut manager = PagingManager::open(&path, 256, PagingOptions::default()).unwrap();
            manager.write(100, 3).unwrap();
        }

        let err = PagingManager::open(&path, 10000, PagingOptions::default()).err().unwrap();
        assert!(matches!(
            err,
            VmError::SizeMismatch { expected, found, .. }
                if expected == layout::file_len(79) && found == layout::file_len(2)
        ));

        let mut manager = PagingManager::open(&path, 256, PagingOptions::default()).unwrap();
        assert_eq!(manager.read(100).unwrap(), 3);
    }

    #[test]
    fn test_oversized_address_space_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.bin");

        let err = PagingManager::open(&path, 1 << 39, PagingOptions::default()).err().unwrap();
        assert!(matches!(err, VmError::AddressSpaceTooLarge { size } if size == 1 << 39));
        assert!(!path.exists());
    }

    #[test]
    fn test_preload() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 10000, 3);

        let first = manager.preload(40).unwrap();
        assert_eq!(manager.preload(40).unwrap(), first);
        assert_eq!(manager.resident_pages(), vec![40]);

        assert!(matches!(
            manager.preload(79),
            Err(VmError::PageOutOfRange { page: 79, page_count: 79 })
        ));
    }

    #[test]
    fn test_flush_all_clears_dirty() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = open_manager(&temp_dir, 1280, 3);

        manager.write(0, 1).unwrap();
        manager.write(200, 2).unwrap();
        assert!(manager.frames().all(|f| f.dirty));

        manager.flush_all().unwrap();
        assert!(manager.frames().all(|f| !f.dirty));
    }
}
