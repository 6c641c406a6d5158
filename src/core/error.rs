use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("Element index {index} out of range (addressable: {limit})")]
    OutOfRange { index: usize, limit: usize },

    #[error("Page {page} out of range (page count: {page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Not enough storage to zero-fill swap file {path:?}: {source}")]
    StorageExhausted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Swap file {path:?} is {found} bytes, expected {expected} for the configured size")]
    SizeMismatch { path: PathBuf, expected: u64, found: u64 },

    #[error("{size} elements exceed the addressable page range")]
    AddressSpaceTooLarge { size: usize },

    #[error("Invalid swap file signature {found:?}")]
    InvalidSignature { found: [u8; 2] },

    #[error("Swap file I/O error: {0}")]
    Io(#[from] std::io::Error),
}
