//! Error types for the index and the page store beneath it.

use std::path::PathBuf;

use thiserror::Error;

use super::datatype::Datatype;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the page store, the base relation and the index.
///
/// `ScanComplete` is not a defect: it is how a scan reports the end of its range.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A backing file was to be created but is already present.
    #[error("File {} already exists", .0.display())]
    FileAlreadyExists(PathBuf),

    /// A backing file was to be opened but does not exist.
    #[error("File {} not found", .0.display())]
    FileNotFound(PathBuf),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The sentinel page id was used where a real page was required.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(u32),

    /// Attempted to unpin a page that wasn't pinned.
    ///
    /// This indicates a bug - unpinning should match pinning.
    #[error("Page {0} is not pinned")]
    PageNotPinned(u32),

    /// A page read back from disk does not match its stored checksum.
    #[error("Checksum mismatch on page {0}")]
    ChecksumMismatch(u32),

    /// A tree page does not hold what the structure around it says it should.
    #[error("Corrupt index node at page {page_id}: {reason}")]
    CorruptNode { page_id: u32, reason: &'static str },

    /// An existing index file was built for a different relation or attribute.
    #[error("Index {index} does not match relation {relation} at offset {key_offset} ({key_type:?})")]
    MetadataMismatch {
        index: String,
        relation: String,
        key_offset: usize,
        key_type: Datatype,
    },

    /// Only integer attributes can be indexed.
    #[error("Unsupported key type {0:?}")]
    UnsupportedKeyType(Datatype),

    /// The indexed attribute lies (partly) outside the tuple.
    #[error("Key at offset {offset} does not fit in a {len}-byte tuple")]
    KeyOutOfBounds { offset: usize, len: usize },

    /// Key offsets are stored as 32-bit values in the metadata page.
    #[error("Key offset {0} does not fit the index metadata")]
    KeyOffsetTooLarge(usize),

    /// Relation names are stored inline in the metadata page.
    #[error("Relation name of {0} bytes exceeds the metadata limit")]
    RelationNameTooLong(usize),

    /// Rejected index or buffer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Scan bounds must be `>`/`>=` below and `<`/`<=` above.
    #[error("Invalid scan operator")]
    InvalidOperator,

    /// Lower scan bound is above the upper one.
    #[error("Invalid scan range: {low} > {high}")]
    InvalidRange { low: i32, high: i32 },

    /// Scan cursor used without a started scan.
    #[error("No scan is active")]
    ScanNotActive,

    /// The scan has produced every entry in its range.
    #[error("Index scan completed")]
    ScanComplete,

    /// Records of a relation file all share one length.
    #[error("Record of {actual} bytes does not match record length {expected}")]
    RecordSizeMismatch { expected: usize, actual: usize },

    /// No record lives at the given locator.
    #[error("No record at page {page} slot {slot}")]
    RecordNotFound { page: u32, slot: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "Page 42 not found");

        let err = Error::InvalidRange { low: 10, high: 1 };
        assert_eq!(format!("{}", err), "Invalid scan range: 10 > 1");

        let err = Error::CorruptNode {
            page_id: 7,
            reason: "expected leaf",
        };
        assert_eq!(format!("{}", err), "Corrupt index node at page 7: expected leaf");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::other("boom").into();
        assert!(err.source().is_some());
        assert!(Error::ScanComplete.source().is_none());
    }
}
