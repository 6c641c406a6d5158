pub const PAGE_ELEMENTS: usize = 128;
pub const ELEMENT_SIZE: usize = 4;
pub const PAGE_DATA_SIZE: usize = PAGE_ELEMENTS * ELEMENT_SIZE;
// One bitmap byte per adjacent pair of elements
pub const BITMAP_SIZE: usize = PAGE_ELEMENTS / 2;
pub const RECORD_SIZE: usize = BITMAP_SIZE + PAGE_DATA_SIZE;

/// The persisted unit of the swap file: occupancy bitmap followed by data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRecord {
    pub bitmap: [u8; BITMAP_SIZE],
    pub data: [i32; PAGE_ELEMENTS],
}

impl PageRecord {
    pub fn zeroed() -> Self {
        Self {
            bitmap: [0; BITMAP_SIZE],
            data: [0; PAGE_ELEMENTS],
        }
    }
}

impl Default for PageRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// A resident page held in memory.
#[derive(Clone, Debug)]
pub struct Frame {
    pub page_number: u32,
    pub last_touched: u64,
    pub dirty: bool,
    pub bitmap: [u8; BITMAP_SIZE],
    pub data: [i32; PAGE_ELEMENTS],
}

impl Frame {
    pub fn from_record(page_number: u32, record: PageRecord, tick: u64) -> Self {
        Self {
            page_number,
            last_touched: tick,
            dirty: false,
            bitmap: record.bitmap,
            data: record.data,
        }
    }

    /// Repurpose this slot for another page. Previous contents are discarded.
    pub fn load(&mut self, page_number: u32, record: PageRecord, tick: u64) {
        self.page_number = page_number;
        self.bitmap = record.bitmap;
        self.data = record.data;
        self.last_touched = tick;
        self.dirty = false;
    }

    pub fn touch(&mut self, tick: u64) {
        self.last_touched = tick;
    }

    pub fn to_record(&self) -> PageRecord {
        PageRecord {
            bitmap: self.bitmap,
            data: self.data,
        }
    }
}

/// Page that owns a logical element, and the element's offset inside it.
pub fn split_index(element_index: usize) -> (u32, usize) {
    (
        (element_index / PAGE_ELEMENTS) as u32,
        element_index % PAGE_ELEMENTS,
    )
}
