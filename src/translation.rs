use crate::constants::MAX_SESSION_ENTRIES;
use crate::error::{ConfigError, DecodeError, MalformedRecordError, Result};

/// Decode a literal bit field, most significant digit first (`"1011"` -> 11).
///
/// The literal must consist of `0`/`1` characters only. An empty literal is a
/// zero-width field and decodes to 0.
pub fn decode_bit_field(literal: &str) -> std::result::Result<usize, DecodeError> {
    let mut value: usize = 0;
    for (position, digit) in literal.chars().enumerate() {
        let bit = match digit {
            '0' => 0,
            '1' => 1,
            found => {
                return Err(DecodeError::InvalidDigit {
                    literal: literal.to_string(),
                    position,
                    found,
                });
            }
        };
        value = value
            .checked_mul(2)
            .and_then(|v| v.checked_add(bit))
            .ok_or_else(|| DecodeError::Overflow {
                literal: literal.to_string(),
                width: literal.chars().count(),
            })?;
    }
    Ok(value)
}

/// Slice a reference record into its page and offset fields.
///
/// Characters past `page_digits + offset_digits` are ignored.
pub fn field_split(
    record: &str,
    page_digits: usize,
    offset_digits: usize,
) -> std::result::Result<(&str, &str), MalformedRecordError> {
    let expected = page_digits + offset_digits;
    // Work on char boundaries so multi-byte garbage reports as a decode error
    let boundaries: Vec<usize> = record
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(record.len()))
        .collect();
    let found = boundaries.len() - 1;
    if found < expected {
        return Err(MalformedRecordError {
            record: record.to_string(),
            expected,
            found,
        });
    }

    let page_end = boundaries[page_digits];
    let offset_end = boundaries[expected];
    Ok((&record[..page_end], &record[page_end..offset_end]))
}

/// Exact base-2 logarithm of a power-of-two size.
pub fn log2_exact(field: &'static str, value: usize) -> std::result::Result<usize, ConfigError> {
    if !value.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { field, value });
    }
    Ok(value.trailing_zeros() as usize)
}

/// Reject table and memory sizes above [`MAX_SESSION_ENTRIES`].
pub fn check_capacity(field: &'static str, value: usize) -> std::result::Result<usize, ConfigError> {
    if value > MAX_SESSION_ENTRIES {
        return Err(ConfigError::TooLarge { field, value });
    }
    Ok(value)
}

/// Sizes of one session: page size, frames of main memory and pages of
/// virtual memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub page_size: usize,
    pub mm_size: usize,
    pub vm_size: usize,
}

impl SessionConfig {
    /// Build a session config, rejecting sizes that are not powers of two
    /// and tables or memories too large to allocate.
    pub fn new(page_size: usize, mm_size: usize, vm_size: usize) -> std::result::Result<Self, ConfigError> {
        log2_exact("page_size", page_size)?;
        log2_exact("mm_size", mm_size)?;
        log2_exact("vm_size", vm_size)?;
        check_capacity("mm_size", mm_size)?;
        check_capacity("vm_size", vm_size)?;
        Ok(SessionConfig { page_size, mm_size, vm_size })
    }

    /// Field widths used to slice reference records in this session.
    pub fn layout(&self) -> AddressLayout {
        AddressLayout {
            page_digits: self.vm_size.trailing_zeros() as usize,
            offset_digits: self.page_size.trailing_zeros() as usize,
        }
    }

    /// Number of page table entries.
    #[inline]
    pub fn page_table_size(&self) -> usize {
        self.vm_size
    }

    /// Number of physical frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.mm_size
    }
}

/// Widths, in digits, of the page and offset fields of a reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLayout {
    pub page_digits: usize,
    pub offset_digits: usize,
}

impl AddressLayout {
    #[inline]
    pub fn record_digits(&self) -> usize {
        self.page_digits + self.offset_digits
    }
}

/// A decoded reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Split and decode both fields of `record`.
    ///
    /// Both fields are validated here, so a reference that gets past this
    /// point only fails on the page table bounds check.
    pub fn parse(record: &str, layout: AddressLayout) -> Result<Self> {
        let (page_field, offset_field) =
            field_split(record, layout.page_digits, layout.offset_digits)?;
        let page = decode_bit_field(page_field)?;
        let offset = decode_bit_field(offset_field)?;
        Ok(VirtualAddress { page, offset })
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VA(page={}, offset={})", self.page, self.offset)
    }
}

/// Frame and offset a reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalAddress {
    pub frame: usize,
    pub offset: usize,
}

impl PhysicalAddress {
    /// Flat address: frame number shifted over the offset field.
    #[inline]
    pub fn raw(&self, layout: AddressLayout) -> usize {
        (self.frame << layout.offset_digits) | self.offset
    }
}
