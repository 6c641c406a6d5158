use byteorder::{ByteOrder, LittleEndian};
use crate::core::error::VmError;
use crate::storage::page::{
    PageRecord, BITMAP_SIZE, ELEMENT_SIZE, PAGE_DATA_SIZE, PAGE_ELEMENTS, RECORD_SIZE,
};

pub const SIGNATURE: &[u8; 2] = b"VM";
pub const SIGNATURE_SIZE: usize = SIGNATURE.len();

/// Number of pages needed to hold `size` elements: ceil(size * 4 / 512).
pub fn page_count(size: usize) -> Result<u32, VmError> {
    let too_large = || VmError::AddressSpaceTooLarge { size };
    let bytes = (size as u64).checked_mul(ELEMENT_SIZE as u64).ok_or_else(too_large)?;
    u32::try_from(bytes.div_ceil(PAGE_DATA_SIZE as u64)).map_err(|_| too_large())
}

/// Byte offset of a page record (its bitmap) in the swap file.
pub fn record_offset(page_number: u32) -> u64 {
    SIGNATURE_SIZE as u64 + page_number as u64 * RECORD_SIZE as u64
}

/// Byte offset of a page record's data region, just past its bitmap.
pub fn data_offset(page_number: u32) -> u64 {
    record_offset(page_number) + BITMAP_SIZE as u64
}

pub fn file_len(page_count: u32) -> u64 {
    record_offset(page_count)
}

pub fn encode_record(bitmap: &[u8; BITMAP_SIZE], data: &[i32; PAGE_ELEMENTS]) -> [u8; RECORD_SIZE] {
    let mut bytes = [0u8; RECORD_SIZE];
    bytes[..BITMAP_SIZE].copy_from_slice(bitmap);
    LittleEndian::write_i32_into(data, &mut bytes[BITMAP_SIZE..]);
    bytes
}

pub fn decode_data(bytes: &[u8; PAGE_DATA_SIZE]) -> [i32; PAGE_ELEMENTS] {
    let mut data = [0i32; PAGE_ELEMENTS];
    LittleEndian::read_i32_into(bytes, &mut data);
    data
}

pub fn decode_record(bytes: &[u8; RECORD_SIZE]) -> PageRecord {
    let mut bitmap = [0u8; BITMAP_SIZE];
    bitmap.copy_from_slice(&bytes[..BITMAP_SIZE]);
    let mut data = [0i32; PAGE_ELEMENTS];
    LittleEndian::read_i32_into(&bytes[BITMAP_SIZE..], &mut data);
    PageRecord { bitmap, data }
}
