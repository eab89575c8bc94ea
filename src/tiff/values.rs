//! Realising tag payloads.
//!
//! Offset-stored tag values (tile offset arrays, descriptions, JPEG
//! tables, rationals) are read here. The readers widen heterogeneous
//! integer widths to a uniform u64 view and correct endianness at the
//! boundary between raw bytes and typed values, so consumers never see
//! the on-disk representation.

use std::io::{Read, Seek};

use crate::error::TiffError;
use crate::io::{ByteOrder, ByteOrderReader};

use super::tag::{Tag, TagValue};

/// An unsigned TIFF rational: numerator over denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

/// Read the integer values of a tag, widened to u64.
///
/// Tile offsets may be stored as 8-, 16-, 32- or 64-bit integers
/// depending on the TIFF variant; representing them uniformly as u64
/// decouples consumers from the on-disk width. Widening happens here,
/// exactly once.
///
/// Inline values yield a single-element vector holding the inline integer
/// interpreted according to its field size. Offset values are fetched
/// with a position-preserving read and converted per element.
pub fn read_integers<R: Read + Seek>(
    tag: &Tag,
    reader: &mut ByteOrderReader<R>,
    order: ByteOrder,
) -> Result<Vec<u64>, TiffError> {
    let field_size = tag.field_size();

    match tag.value {
        TagValue::Inline(buf) => {
            // The inline buffer is already normalised to little-endian.
            let value = match field_size {
                1 => buf[0] as u64,
                2 => u16::from_le_bytes([buf[0], buf[1]]) as u64,
                4 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64,
                8 => u64::from_le_bytes(buf),
                _ => {
                    return Err(TiffError::BadFieldSize {
                        tag_code: tag.code,
                        data_type: tag.data_type_raw,
                    })
                }
            };
            Ok(vec![value])
        }
        TagValue::Offset(offset) => {
            let count = tag.count as usize;
            if !matches!(field_size, 1 | 2 | 4 | 8) {
                return Err(TiffError::BadFieldSize {
                    tag_code: tag.code,
                    data_type: tag.data_type_raw,
                });
            }

            let mut raw = vec![0u8; count * field_size as usize];
            reader.read_at(offset, &mut raw)?;

            let mut values = Vec::with_capacity(count);
            match field_size {
                1 => values.extend(raw.iter().map(|&b| b as u64)),
                2 => values.extend(raw.chunks_exact(2).map(|c| order.read_u16(c) as u64)),
                4 => values.extend(raw.chunks_exact(4).map(|c| order.read_u32(c) as u64)),
                8 => values.extend(raw.chunks_exact(8).map(|c| order.read_u64(c))),
                _ => unreachable!(),
            }
            Ok(values)
        }
    }
}

/// Read an ASCII or opaque (UNDEFINED) tag payload.
///
/// The buffer is allocated as `max(8, count + 1)` zero-initialised bytes;
/// the extra byte guarantees NUL termination for string consumers without
/// trusting the file's own terminator. Only the first `count` bytes carry
/// payload.
pub fn read_ascii_padded<R: Read + Seek>(
    tag: &Tag,
    reader: &mut ByteOrderReader<R>,
) -> Result<Vec<u8>, TiffError> {
    let count = tag.count as usize;
    let mut buf = vec![0u8; count.saturating_add(1).max(8)];

    match tag.value {
        TagValue::Inline(data) => {
            // Inline payloads never exceed the 8-byte value field; for
            // unrecognised data types only the field bytes exist.
            let n = count.min(data.len());
            buf[..n].copy_from_slice(&data[..n]);
        }
        TagValue::Offset(offset) => {
            reader.read_at(offset, &mut buf[..count])?;
        }
    }
    Ok(buf)
}

/// Read a rational array tag.
///
/// Offset-stored arrays are fetched in a single read; inline storage
/// holds at most one rational (BigTIFF only). Both 32-bit halves are
/// corrected for endianness independently.
pub fn read_rationals<R: Read + Seek>(
    tag: &Tag,
    reader: &mut ByteOrderReader<R>,
    order: ByteOrder,
) -> Result<Vec<Rational>, TiffError> {
    let count = tag.count as usize;

    match tag.value {
        TagValue::Inline(buf) => {
            // Already normalised; each half reads as little-endian.
            let mut rationals = Vec::with_capacity(count);
            if count >= 1 {
                rationals.push(Rational {
                    numerator: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
                    denominator: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
                });
            }
            Ok(rationals)
        }
        TagValue::Offset(offset) => {
            let mut raw = vec![0u8; count * 8];
            reader.read_at(offset, &mut raw)?;

            let rationals = raw
                .chunks_exact(8)
                .map(|c| Rational {
                    numerator: order.read_u32(&c[0..4]),
                    denominator: order.read_u32(&c[4..8]),
                })
                .collect();
            Ok(rationals)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::tags::DataType;
    use std::io::Cursor;

    fn reader(data: Vec<u8>) -> ByteOrderReader<Cursor<Vec<u8>>> {
        ByteOrderReader::new(Cursor::new(data))
    }

    fn offset_tag(code: u16, data_type: DataType, count: u64, offset: u64) -> Tag {
        Tag {
            code,
            data_type: Some(data_type),
            data_type_raw: data_type as u16,
            count,
            value: TagValue::Offset(offset),
        }
    }

    fn inline_tag(code: u16, data_type: DataType, count: u64, buf: [u8; 8]) -> Tag {
        Tag {
            code,
            data_type: Some(data_type),
            data_type_raw: data_type as u16,
            count,
            value: TagValue::Inline(buf),
        }
    }

    // -------------------------------------------------------------------------
    // read_integers
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_integers_inline_short() {
        let mut r = reader(vec![0u8; 16]);
        let tag = inline_tag(324, DataType::Short, 1, [0x00, 0x02, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            read_integers(&tag, &mut r, ByteOrder::LittleEndian).unwrap(),
            vec![512]
        );
    }

    #[test]
    fn test_read_integers_inline_long8() {
        let mut r = reader(vec![0u8; 16]);
        let tag = inline_tag(
            324,
            DataType::Long8,
            1,
            0x0000_0001_0000_0000u64.to_le_bytes(),
        );
        assert_eq!(
            read_integers(&tag, &mut r, ByteOrder::LittleEndian).unwrap(),
            vec![0x0000_0001_0000_0000]
        );
    }

    #[test]
    fn test_read_integers_offset_long_widened() {
        // 5 LONG values at offset 100
        let mut data = vec![0u8; 200];
        for (i, v) in [1000u32, 2000, 3000, 4000, 5000].iter().enumerate() {
            data[100 + i * 4..100 + i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        let mut r = reader(data);
        let tag = offset_tag(324, DataType::Long, 5, 100);
        assert_eq!(
            read_integers(&tag, &mut r, ByteOrder::LittleEndian).unwrap(),
            vec![1000, 2000, 3000, 4000, 5000]
        );
    }

    #[test]
    fn test_read_integers_offset_short_big_endian() {
        let mut data = vec![0u8; 64];
        data[10..12].copy_from_slice(&100u16.to_be_bytes());
        data[12..14].copy_from_slice(&200u16.to_be_bytes());
        let mut r = reader(data);
        let tag = offset_tag(324, DataType::Short, 2, 10);
        assert_eq!(
            read_integers(&tag, &mut r, ByteOrder::BigEndian).unwrap(),
            vec![100, 200]
        );
    }

    #[test]
    fn test_read_integers_offset_byte() {
        let mut data = vec![0u8; 32];
        data[8..13].copy_from_slice(&[1, 2, 3, 4, 5]);
        let mut r = reader(data);
        let tag = offset_tag(324, DataType::Byte, 5, 8);
        assert_eq!(
            read_integers(&tag, &mut r, ByteOrder::LittleEndian).unwrap(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_read_integers_offset_long8_big_endian() {
        let mut data = vec![0u8; 64];
        data[16..24].copy_from_slice(&0x0000_0002_0000_0000u64.to_be_bytes());
        let mut r = reader(data);
        let tag = offset_tag(324, DataType::Long8, 1, 16);
        assert_eq!(
            read_integers(&tag, &mut r, ByteOrder::BigEndian).unwrap(),
            vec![0x0000_0002_0000_0000]
        );
    }

    #[test]
    fn test_read_integers_unknown_field_size_fails() {
        let mut r = reader(vec![0u8; 64]);
        let tag = Tag {
            code: 324,
            data_type: None,
            data_type_raw: 99,
            count: 4,
            value: TagValue::Offset(8),
        };
        let err = read_integers(&tag, &mut r, ByteOrder::LittleEndian).unwrap_err();
        assert!(matches!(
            err,
            TiffError::BadFieldSize {
                tag_code: 324,
                data_type: 99
            }
        ));
    }

    #[test]
    fn test_read_integers_past_eof() {
        let mut r = reader(vec![0u8; 16]);
        let tag = offset_tag(324, DataType::Long, 10, 8);
        let err = read_integers(&tag, &mut r, ByteOrder::LittleEndian).unwrap_err();
        assert!(matches!(err, TiffError::Eof { .. }));
    }

    // -------------------------------------------------------------------------
    // read_ascii_padded
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_ascii_offset() {
        let mut data = vec![0u8; 64];
        data[20..33].copy_from_slice(b"Aperio Image\0");
        let mut r = reader(data);
        let tag = offset_tag(270, DataType::Ascii, 13, 20);
        let buf = read_ascii_padded(&tag, &mut r).unwrap();
        assert_eq!(buf.len(), 14); // count + 1
        assert_eq!(&buf[..12], b"Aperio Image");
        assert_eq!(buf[13], 0);
    }

    #[test]
    fn test_read_ascii_inline() {
        let mut r = reader(vec![0u8; 8]);
        let tag = inline_tag(270, DataType::Ascii, 3, *b"abc\0\0\0\0\0");
        let buf = read_ascii_padded(&tag, &mut r).unwrap();
        // Short payloads still get an 8-byte zeroed buffer.
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[..3], b"abc");
        assert!(buf[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_ascii_missing_terminator_is_padded() {
        // The file's own data has no NUL; the reader's extra byte provides it.
        let mut data = vec![0xFFu8; 32];
        data[8..12].copy_from_slice(b"abcd");
        let mut r = reader(data);
        let tag = offset_tag(270, DataType::Ascii, 4, 8);
        let buf = read_ascii_padded(&tag, &mut r).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[..4], b"abcd");
        assert_eq!(buf[4], 0);
    }

    // -------------------------------------------------------------------------
    // read_rationals
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_rationals_offset() {
        let mut data = vec![0u8; 64];
        data[16..20].copy_from_slice(&3u32.to_le_bytes());
        data[20..24].copy_from_slice(&2u32.to_le_bytes());
        data[24..28].copy_from_slice(&255u32.to_le_bytes());
        data[28..32].copy_from_slice(&1u32.to_le_bytes());
        let mut r = reader(data);
        let tag = offset_tag(532, DataType::Rational, 2, 16);
        let rationals = read_rationals(&tag, &mut r, ByteOrder::LittleEndian).unwrap();
        assert_eq!(
            rationals,
            vec![
                Rational {
                    numerator: 3,
                    denominator: 2
                },
                Rational {
                    numerator: 255,
                    denominator: 1
                },
            ]
        );
    }

    #[test]
    fn test_read_rationals_offset_big_endian() {
        let mut data = vec![0u8; 32];
        data[8..12].copy_from_slice(&7u32.to_be_bytes());
        data[12..16].copy_from_slice(&4u32.to_be_bytes());
        let mut r = reader(data);
        let tag = offset_tag(532, DataType::Rational, 1, 8);
        let rationals = read_rationals(&tag, &mut r, ByteOrder::BigEndian).unwrap();
        assert_eq!(
            rationals,
            vec![Rational {
                numerator: 7,
                denominator: 4
            }]
        );
    }

    #[test]
    fn test_read_rationals_inline() {
        let mut r = reader(vec![0u8; 8]);
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&9u32.to_le_bytes());
        buf[4..8].copy_from_slice(&5u32.to_le_bytes());
        let tag = inline_tag(532, DataType::Rational, 1, buf);
        let rationals = read_rationals(&tag, &mut r, ByteOrder::LittleEndian).unwrap();
        assert_eq!(
            rationals,
            vec![Rational {
                numerator: 9,
                denominator: 5
            }]
        );
    }
}
