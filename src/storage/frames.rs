use std::ops::{Index, IndexMut};
use crate::storage::page::{Frame, PageRecord};

/// The resident set. Frames are appended until `limit` is reached, after
/// which slots are only ever repurposed.
pub struct FrameTable {
    frames: Vec<Frame>,
    limit: usize,
    clock: u64,
}

impl FrameTable {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            frames: Vec::with_capacity(limit),
            limit,
            clock: 0,
        }
    }

    /// Next logical timestamp. Strictly increasing.
    pub fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.limit
    }

    /// Linear scan for the frame holding `page_number`.
    pub fn position(&self, page_number: u32) -> Option<usize> {
        self.frames.iter().position(|f| f.page_number == page_number)
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    #[allow(dead_code)]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Least recently touched frame; the lowest index wins ties.
    pub fn victim(&self) -> Option<usize> {
        self.frames
            .iter()
            .enumerate()
            .min_by_key(|(_, f)| f.last_touched)
            .map(|(i, _)| i)
    }

    pub fn push(&mut self, page_number: u32, record: PageRecord) -> usize {
        let tick = self.tick();
        self.frames.push(Frame::from_record(page_number, record, tick));
        self.frames.len() - 1
    }

    pub fn touch(&mut self, index: usize) {
        let tick = self.tick();
        if let Some(frame) = self.frames.get_mut(index) {
            frame.touch(tick);
        }
    }

    pub fn resident_pages(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.page_number).collect()
    }
}

impl Index<usize> for FrameTable {
    type Output = Frame;

    fn index(&self, index: usize) -> &Frame {
        &self.frames[index]
    }
}

impl IndexMut<usize> for FrameTable {
    fn index_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.frames[index]
    }
}
