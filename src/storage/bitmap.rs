use crate::storage::page::{BITMAP_SIZE, PAGE_ELEMENTS};

pub const FIRST_OF_PAIR: u8 = 1 << 0;
pub const SECOND_OF_PAIR: u8 = 1 << 4;

/// Even-aligned offset of the pair containing `offset`.
pub fn pair_base(offset: usize) -> usize {
    offset & !1
}

/// Mark the non-zero elements of the pair starting at `pair_base`.
/// Bits are only ever set: an element that has once been non-zero stays marked.
pub fn update_pair(bitmap: &mut [u8; BITMAP_SIZE], data: &[i32; PAGE_ELEMENTS], pair_base: usize) {
    debug_assert!(pair_base % 2 == 0);
    let byte = &mut bitmap[pair_base / 2];
    if data[pair_base] != 0 {
        *byte |= FIRST_OF_PAIR;
    }
    if data[pair_base + 1] != 0 {
        *byte |= SECOND_OF_PAIR;
    }
}

pub fn is_occupied(bitmap: &[u8; BITMAP_SIZE], offset: usize) -> bool {
    let mask = if offset % 2 == 0 { FIRST_OF_PAIR } else { SECOND_OF_PAIR };
    bitmap[offset / 2] & mask != 0
}

pub fn occupied_count(bitmap: &[u8; BITMAP_SIZE]) -> usize {
    (0..PAGE_ELEMENTS).filter(|&offset| is_occupied(bitmap, offset)).count()
}
