use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use crate::core::error::VmError;
use crate::storage::layout::{self, SIGNATURE, SIGNATURE_SIZE};
use crate::storage::page::{PageRecord, BITMAP_SIZE, PAGE_DATA_SIZE, RECORD_SIZE};

/// Backing file holding one fixed-size record per logical page.
pub struct SwapStore {
    path: PathBuf,
    file: File,
    page_count: u32,
    created: bool,
}

impl SwapStore {
    /// Open the swap file, creating and zero-filling it first if it does not exist.
    /// An existing file is never resized and must match the layout for `page_count`.
    pub fn open(path: &Path, page_count: u32) -> Result<Self, VmError> {
        let created = if path.exists() {
            false
        } else {
            Self::create(path, page_count)?;
            true
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let expected = layout::file_len(page_count);
        let found = file.metadata()?.len();
        if found != expected {
            return Err(VmError::SizeMismatch {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            page_count,
            created,
        })
    }

    fn create(path: &Path, page_count: u32) -> Result<(), VmError> {
        let mut file = File::create(path)?;
        zero_fill(&mut file, path, page_count)?;
        file.sync_all().map_err(|source| VmError::StorageExhausted {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this open created the file.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn len(&self) -> Result<u64, VmError> {
        Ok(self.file.metadata()?.len())
    }

    fn check_page(&self, page_number: u32) -> Result<(), VmError> {
        if page_number >= self.page_count {
            return Err(VmError::PageOutOfRange {
                page: page_number,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    /// Load a page's data. The returned bitmap is always empty; persisted
    /// occupancy is only available through `read_bitmap`.
    pub fn read_page(&mut self, page_number: u32) -> Result<PageRecord, VmError> {
        self.check_page(page_number)?;

        self.file.seek(SeekFrom::Start(layout::data_offset(page_number)))?;
        let mut buffer = [0u8; PAGE_DATA_SIZE];
        self.file.read_exact(&mut buffer)?;

        Ok(PageRecord {
            data: layout::decode_data(&buffer),
            ..PageRecord::zeroed()
        })
    }

    pub fn read_bitmap(&mut self, page_number: u32) -> Result<[u8; BITMAP_SIZE], VmError> {
        self.check_page(page_number)?;

        self.file.seek(SeekFrom::Start(layout::record_offset(page_number)))?;
        let mut bitmap = [0u8; BITMAP_SIZE];
        self.file.read_exact(&mut bitmap)?;
        Ok(bitmap)
    }

    /// Read the full persisted record, bitmap included.
    pub fn read_record(&mut self, page_number: u32) -> Result<PageRecord, VmError> {
        self.check_page(page_number)?;

        self.file.seek(SeekFrom::Start(layout::record_offset(page_number)))?;
        let mut buffer = [0u8; RECORD_SIZE];
        self.file.read_exact(&mut buffer)?;
        Ok(layout::decode_record(&buffer))
    }

    /// Overwrite a page's whole record.
    pub fn write_page(&mut self, page_number: u32, record: &PageRecord) -> Result<(), VmError> {
        self.check_page(page_number)?;

        let bytes = layout::encode_record(&record.bitmap, &record.data);
        self.file.seek(SeekFrom::Start(layout::record_offset(page_number)))?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn signature(&mut self) -> Result<[u8; SIGNATURE_SIZE], VmError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut found = [0u8; SIGNATURE_SIZE];
        self.file.read_exact(&mut found)?;
        Ok(found)
    }

    pub fn verify_signature(&mut self) -> Result<(), VmError> {
        let found = self.signature()?;
        if &found != SIGNATURE {
            return Err(VmError::InvalidSignature { found });
        }
        Ok(())
    }
}

/// Write the signature followed by `page_count` empty records. Any write
/// failure means the swap file cannot be laid out.
fn zero_fill<W: Write>(writer: &mut W, path: &Path, page_count: u32) -> Result<(), VmError> {
    let fill = |writer: &mut W| -> std::io::Result<()> {
        writer.write_all(SIGNATURE)?;
        let zeros = [0u8; RECORD_SIZE];
        for _ in 0..page_count {
            writer.write_all(&zeros)?;
        }
        writer.flush()
    };
    fill(writer).map_err(|source| VmError::StorageExhausted {
        path: path.to_path_buf(),
        source,
    })
}
