//! Unpacking a transfer stream back into a [`Tiff`].
//!
//! The deserializer is the tolerant half of the codec. It accepts streams
//! with or without the HTTP prefix and with or without the LZ4 envelope,
//! lets the per-IFD payload blocks arrive in any order, and skips block
//! types it does not recognise so newer peers can extend the format.
//! What it does not tolerate: a misordered prologue, payload blocks
//! referencing IFDs that do not exist, the same payload kind arriving
//! twice for one IFD, or any truncation.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::WireError;
use crate::io::read_u64_le;
use crate::tiff::{Ifd, Tiff};

use super::block::{
    block_type, SerialBlock, SerialHeader, SerialIfd, WireCursor, FLAG_BIGTIFF, FLAG_BIG_ENDIAN,
    SERIAL_HEADER_SIZE, SERIAL_IFD_SIZE,
};

/// Which payload kinds have already arrived for one IFD.
#[derive(Debug, Clone, Copy, Default)]
struct SeenPayloads {
    description: bool,
    tile_offsets: bool,
    tile_byte_counts: bool,
    jpeg_tables: bool,
}

/// Parse a transfer stream produced by [`serialize`](super::serialize()).
///
/// The input may start with an HTTP response header (skipped up to the
/// first CRLFCRLF) and the payload may be wrapped in one LZ4 envelope.
pub fn deserialize(data: &[u8]) -> Result<Tiff, WireError> {
    let body = skip_http_header(data);

    let mut cursor = WireCursor::new(body);
    let first = SerialBlock::decode(&mut cursor)?;

    if first.block_type == block_type::LZ4_COMPRESSED_DATA {
        let compressed = cursor.take(first.length)?;
        let expected_size = first.index as usize;

        let mut decompressed = vec![0u8; expected_size];
        let written = lz4_flex::block::decompress_into(compressed, &mut decompressed)
            .map_err(|error| {
                warn!(%error, "LZ4 decompression failed");
                WireError::DecompressionFailed
            })?;
        if written != expected_size {
            warn!(
                written,
                expected = expected_size,
                "decompressed size does not match the size announced by the envelope"
            );
            return Err(WireError::DecompressionFailed);
        }

        let mut inner = WireCursor::new(&decompressed);
        let head = SerialBlock::decode(&mut inner)?;
        decode_stream(&mut inner, head)
    } else {
        decode_stream(&mut cursor, first)
    }
}

/// Find the end of an HTTP response header; without one, the stream
/// starts at offset 0.
fn skip_http_header(data: &[u8]) -> &[u8] {
    data.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|position| &data[position + 4..])
        .unwrap_or(data)
}

/// Decode the framed payload, starting from its first block.
fn decode_stream(cursor: &mut WireCursor, first: SerialBlock) -> Result<Tiff, WireError> {
    // The prologue order is strict: header scalars, then the IFD array.
    if first.block_type != block_type::HEADER_AND_META {
        return Err(WireError::MalformedStream("expected the header block"));
    }
    if first.length != SERIAL_HEADER_SIZE as u64 {
        return Err(WireError::MalformedStream("header block length mismatch"));
    }
    let header = SerialHeader::decode(cursor)?;

    let ifds_block = SerialBlock::decode(cursor)?;
    if ifds_block.block_type != block_type::IFDS {
        return Err(WireError::MalformedStream("expected the IFD block"));
    }
    let ifd_count = header.ifd_count as usize;
    if ifds_block.length != (ifd_count * SERIAL_IFD_SIZE) as u64 {
        return Err(WireError::MalformedStream("IFD block length mismatch"));
    }

    let mut ifds: Vec<Ifd> = Vec::with_capacity(ifd_count);
    for index in 0..ifd_count {
        let serial = SerialIfd::decode(cursor)?;
        ifds.push(serial.into_ifd(index as u32));
    }

    // Payload blocks may arrive in any order; each kind at most once per
    // IFD. Unknown block types are skipped for forward compatibility.
    let mut seen = vec![SeenPayloads::default(); ifd_count];
    loop {
        let block = SerialBlock::decode(cursor)?;
        if block.block_type == block_type::TERMINATOR {
            break;
        }

        let payload = cursor.take(block.length)?;
        if block.index as usize >= ifd_count {
            return Err(WireError::MalformedStream(
                "block references a nonexistent IFD",
            ));
        }
        let ifd = &mut ifds[block.index as usize];
        let flags = &mut seen[block.index as usize];

        match block.block_type {
            block_type::IMAGE_DESCRIPTION => {
                if flags.description {
                    return Err(WireError::DuplicateBlock {
                        kind: "image description",
                        index: block.index,
                    });
                }
                flags.description = true;
                ifd.image_description = Bytes::copy_from_slice(payload);
            }
            block_type::TILE_OFFSETS => {
                if flags.tile_offsets {
                    return Err(WireError::DuplicateBlock {
                        kind: "tile offsets",
                        index: block.index,
                    });
                }
                flags.tile_offsets = true;
                ifd.tile_offsets = decode_u64_array(payload)?;
            }
            block_type::TILE_BYTE_COUNTS => {
                if flags.tile_byte_counts {
                    return Err(WireError::DuplicateBlock {
                        kind: "tile byte counts",
                        index: block.index,
                    });
                }
                flags.tile_byte_counts = true;
                ifd.tile_byte_counts = decode_u64_array(payload)?;
            }
            block_type::JPEG_TABLES => {
                if flags.jpeg_tables {
                    return Err(WireError::DuplicateBlock {
                        kind: "JPEG tables",
                        index: block.index,
                    });
                }
                flags.jpeg_tables = true;
                ifd.jpeg_tables = Bytes::copy_from_slice(payload);
            }
            other => {
                debug!(block_type = other, length = block.length, "skipping unknown block");
            }
        }
    }

    // Role indices must land inside the IFD vector (0 doubles as the
    // unset sentinel).
    if ifd_count > 0 {
        for role_index in [
            header.main_image_index,
            header.macro_image_index,
            header.label_image_index,
            header.level_image_index,
        ] {
            if role_index as usize >= ifd_count {
                return Err(WireError::MalformedStream("role index out of range"));
            }
        }
    }

    Ok(Tiff {
        file: None,
        filesize: header.filesize,
        is_big_endian: header.flags & FLAG_BIG_ENDIAN != 0,
        is_bigtiff: header.flags & FLAG_BIGTIFF != 0,
        offset_size: header.offset_size,
        ifds,
        main_image_index: header.main_image_index,
        macro_image_index: header.macro_image_index,
        label_image_index: header.label_image_index,
        level_image_index: header.level_image_index,
        level_count: header.level_count,
        mpp_x: header.mpp_x,
        mpp_y: header.mpp_y,
    })
}

/// Decode a little-endian u64 array payload.
fn decode_u64_array(payload: &[u8]) -> Result<Vec<u64>, WireError> {
    if payload.len() % 8 != 0 {
        return Err(WireError::MalformedStream(
            "integer array block length is not a multiple of 8",
        ));
    }
    Ok(payload.chunks_exact(8).map(read_u64_le).collect())
}
