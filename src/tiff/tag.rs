//! Normalised tag records.
//!
//! Each IFD entry is a raw 12-byte (classic TIFF) or 20-byte (BigTIFF)
//! record. Decoding restructures it into a [`Tag`] so the rest of the
//! parser never worries about memory layout or byte order again:
//!
//! - the element count is widened to u64
//! - the value is either an inline buffer or an absolute file offset,
//!   modelled as a tagged union rather than a reused offset field
//! - inline buffers are endian-normalised exactly once, at decode time;
//!   afterwards every element is little-endian regardless of the file's
//!   declared order
//!
//! ## Classic TIFF record layout (12 bytes)
//! ```text
//! Bytes 0-1:  Tag code (u16)
//! Bytes 2-3:  Data type (u16)
//! Bytes 4-7:  Element count (u32)
//! Bytes 8-11: Value or offset (u32)
//! ```
//!
//! ## BigTIFF record layout (20 bytes)
//! ```text
//! Bytes 0-1:   Tag code (u16)
//! Bytes 2-3:   Data type (u16)
//! Bytes 4-11:  Element count (u64)
//! Bytes 12-19: Value or offset (u64)
//! ```

use tracing::warn;

use crate::io::ByteOrder;

use super::tags::DataType;

/// Size of a raw tag record in classic TIFF.
pub const CLASSIC_TAG_SIZE: usize = 12;

/// Size of a raw tag record in BigTIFF.
pub const BIGTIFF_TAG_SIZE: usize = 20;

/// Inline value capacity in classic TIFF (the 4-byte value/offset field).
pub const CLASSIC_INLINE_CAPACITY: u64 = 4;

/// Inline value capacity in BigTIFF (the 8-byte value/offset field).
pub const BIGTIFF_INLINE_CAPACITY: u64 = 8;

/// Where a tag's payload lives.
///
/// Small payloads are stored directly in the record's value field; larger
/// ones live elsewhere in the file, pointed to by an absolute offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue {
    /// The payload itself, zero-padded to 8 bytes and endian-normalised
    /// (elements are little-endian after decode).
    Inline([u8; 8]),

    /// Absolute file offset of the payload.
    Offset(u64),
}

/// A normalised IFD entry.
///
/// Ephemeral: tags exist only while their IFD is being parsed.
#[derive(Debug, Clone)]
pub struct Tag {
    /// The tag code (may or may not be one this crate consumes)
    pub code: u16,

    /// Decoded data type, `None` when the raw value is unrecognised
    pub data_type: Option<DataType>,

    /// Raw data type value, kept for diagnostics
    pub data_type_raw: u16,

    /// Number of elements (not bytes)
    pub count: u64,

    /// Inline payload or absolute offset
    pub value: TagValue,
}

impl Tag {
    /// Decode a raw tag record.
    ///
    /// `record` must be exactly [`CLASSIC_TAG_SIZE`] or [`BIGTIFF_TAG_SIZE`]
    /// bytes, matching `is_bigtiff`.
    ///
    /// Unrecognised data types are tolerated: their field size is treated
    /// as zero, which forces the (empty) payload inline, and a warning is
    /// logged.
    pub fn parse(record: &[u8], order: ByteOrder, is_bigtiff: bool) -> Tag {
        let code = order.read_u16(&record[0..2]);
        let data_type_raw = order.read_u16(&record[2..4]);
        let data_type = DataType::from_u16(data_type_raw);
        if data_type.is_none() {
            warn!(
                tag_code = code,
                data_type = data_type_raw,
                "unrecognized TIFF tag data type, value treated as opaque"
            );
        }

        let (count, payload, inline_capacity) = if is_bigtiff {
            (
                order.read_u64(&record[4..12]),
                &record[12..20],
                BIGTIFF_INLINE_CAPACITY,
            )
        } else {
            (
                order.read_u32(&record[4..8]) as u64,
                &record[8..12],
                CLASSIC_INLINE_CAPACITY,
            )
        };

        let field_size = data_type.map(DataType::field_size).unwrap_or(0);
        let data_size = field_size as u64 * count;

        let value = if data_size <= inline_capacity {
            let mut buf = [0u8; 8];
            buf[..payload.len()].copy_from_slice(payload);
            normalize_inline(&mut buf, data_type, data_size as usize, order);
            TagValue::Inline(buf)
        } else {
            let offset = if is_bigtiff {
                order.read_u64(payload)
            } else {
                order.read_u32(payload) as u64
            };
            TagValue::Offset(offset)
        };

        Tag {
            code,
            data_type,
            data_type_raw,
            count,
            value,
        }
    }

    /// Per-element size in bytes (0 for unrecognised types).
    #[inline]
    pub fn field_size(&self) -> u32 {
        self.data_type.map(DataType::field_size).unwrap_or(0)
    }

    /// Total payload size in bytes.
    #[inline]
    pub fn data_size(&self) -> u64 {
        self.field_size() as u64 * self.count
    }

    /// First inline element as u16. Returns 0 for offset-stored values;
    /// callers use this only for tags whose values are inline by
    /// construction (scalar SHORT/LONG tags).
    pub fn inline_u16(&self) -> u16 {
        match self.value {
            TagValue::Inline(buf) => u16::from_le_bytes([buf[0], buf[1]]),
            TagValue::Offset(_) => 0,
        }
    }

    /// First inline element widened to u32.
    ///
    /// The inline buffer is zero-padded, so a SHORT value reads correctly
    /// through a u32 window. This mirrors how scalar tags like ImageWidth
    /// may be SHORT or LONG depending on the writer.
    pub fn inline_u32(&self) -> u32 {
        match self.value {
            TagValue::Inline(buf) => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            TagValue::Offset(_) => 0,
        }
    }

    /// First inline element widened to u64.
    pub fn inline_u64(&self) -> u64 {
        match self.value {
            TagValue::Inline(buf) => u64::from_le_bytes(buf),
            TagValue::Offset(_) => 0,
        }
    }

    /// Second inline u16 element (used by YCbCrSubSampling).
    pub fn inline_u16_pair(&self) -> (u16, u16) {
        match self.value {
            TagValue::Inline(buf) => (
                u16::from_le_bytes([buf[0], buf[1]]),
                u16::from_le_bytes([buf[2], buf[3]]),
            ),
            TagValue::Offset(_) => (0, 0),
        }
    }
}

/// Endian-normalise an inline value buffer in place.
///
/// Applied exactly once, when the tag is decoded. Big-endian elements are
/// byte-swapped per field size; rationals swap their two 4-byte halves
/// independently. Only the first `data_size` bytes hold payload, the rest
/// is zero padding.
fn normalize_inline(buf: &mut [u8; 8], data_type: Option<DataType>, data_size: usize, order: ByteOrder) {
    if order != ByteOrder::BigEndian {
        return;
    }
    let Some(data_type) = data_type else {
        return;
    };
    let unit = if data_type.is_rational() {
        4
    } else {
        data_type.field_size() as usize
    };
    if unit > 1 {
        for element in buf[..data_size].chunks_exact_mut(unit) {
            element.reverse();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
