//! Error types for the paging simulator.
//!
//! Every per-record failure is recoverable: the driver reports it and skips
//! the record. Only an unusable header or an I/O failure ends a run.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimError>;

/// A bit field contained something other than `0`/`1`, or does not fit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid digit {found:?} at position {position} in bit field {literal:?}")]
    InvalidDigit {
        literal: String,
        position: usize,
        found: char,
    },

    #[error("bit field {literal:?} is too wide ({width} digits)")]
    Overflow { literal: String, width: usize },
}

/// A reference record too short to hold both address fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed record {record:?}: expected at least {expected} digits, found {found}")]
pub struct MalformedRecordError {
    pub record: String,
    pub expected: usize,
    pub found: usize,
}

/// A page number outside the active page table.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("page {page} is outside the page table (size {size})")]
pub struct AddressOutOfRangeError {
    pub page: usize,
    pub size: usize,
}

/// Why a page table lookup could not be satisfied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    #[error(transparent)]
    OutOfRange(#[from] AddressOutOfRangeError),

    #[error("physical memory has no frames to satisfy a fault on page {page}")]
    NoFrames { page: usize },
}

/// Invalid sizes in the header or a session record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field}: {value:?} is not a positive integer")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field}: {value} is not a power of two")]
    NotPowerOfTwo { field: &'static str, value: usize },

    #[error("input ended before the {field} header record")]
    MissingHeader { field: &'static str },

    #[error("{field}: {value} entries cannot be allocated")]
    TooLarge { field: &'static str, value: usize },
}

/// Umbrella error for the simulation driver
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecordError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reference record {record:?} arrived before any session was started")]
    NoActiveSession { record: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AddressOutOfRangeError> for SimError {
    fn from(err: AddressOutOfRangeError) -> Self {
        SimError::Lookup(LookupError::OutOfRange(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_converts_through_lookup() {
        let err: SimError = AddressOutOfRangeError { page: 9, size: 4 }.into();
        assert!(matches!(
            err,
            SimError::Lookup(LookupError::OutOfRange(AddressOutOfRangeError { page: 9, size: 4 }))
        ));
        assert_eq!(err.to_string(), "page 9 is outside the page table (size 4)");
    }

    #[test]
    fn test_display_messages() {
        let err = MalformedRecordError { record: "0".to_string(), expected: 3, found: 1 };
        assert_eq!(
            err.to_string(),
            "malformed record \"0\": expected at least 3 digits, found 1"
        );

        let err = ConfigError::NotPowerOfTwo { field: "vm_size", value: 6 };
        assert_eq!(err.to_string(), "vm_size: 6 is not a power of two");

        let err = ConfigError::TooLarge { field: "mm_size", value: 1 << 30 };
        assert_eq!(err.to_string(), "mm_size: 1073741824 entries cannot be allocated");
    }
}
