//! Packing a [`Tiff`] into the transfer stream.
//!
//! The serialised form is one contiguous buffer, so the network layer can
//! dispatch it with a single write:
//!
//! ```text
//! HTTP response header (Content-Length zero-padded to 16 digits)
//! [HEADER_AND_META] SerialHeader
//! [IFDS]            SerialIfd x N
//! per IFD: [IMAGE_DESCRIPTION] [TILE_OFFSETS] [TILE_BYTE_COUNTS] [JPEG_TABLES]
//! [TERMINATOR]
//! ```
//!
//! When compression is requested the framed payload is wrapped in a single
//! LZ4 block whose `index` carries the decompressed size; if compression
//! fails the uncompressed payload is sent unchanged. The fixed-width
//! Content-Length field exists so the prefix never changes size whichever
//! form is emitted.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::tiff::Tiff;

use super::block::{
    block_type, SerialBlock, SerialHeader, SerialIfd, SERIAL_BLOCK_SIZE, SERIAL_HEADER_SIZE,
    SERIAL_IFD_SIZE,
};

/// Serialise a slide description, attempting LZ4 compression of the
/// payload.
pub fn serialize(tiff: &Tiff) -> Bytes {
    serialize_with(tiff, true)
}

/// Serialise a slide description without the LZ4 envelope.
pub fn serialize_uncompressed(tiff: &Tiff) -> Bytes {
    serialize_with(tiff, false)
}

fn serialize_with(tiff: &Tiff, compress: bool) -> Bytes {
    let mut payload = build_payload(tiff);
    if compress {
        payload = try_compress(payload);
    }

    let header = format!(
        "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Type: application/octet-stream\r\nContent-Length: {:016}\r\n\r\n",
        payload.len()
    );

    let mut out = BytesMut::with_capacity(header.len() + payload.len());
    out.put_slice(header.as_bytes());
    out.put_slice(&payload);
    out.freeze()
}

/// Build the uncompressed block-framed payload.
fn build_payload(tiff: &Tiff) -> BytesMut {
    let ifd_count = tiff.ifds.len();

    // The payload size is fully determined up front, so one allocation
    // suffices.
    let mut total_size = SERIAL_BLOCK_SIZE + SERIAL_HEADER_SIZE;
    total_size += SERIAL_BLOCK_SIZE + ifd_count * SERIAL_IFD_SIZE;
    for ifd in &tiff.ifds {
        total_size += 4 * SERIAL_BLOCK_SIZE
            + ifd.image_description.len()
            + ifd.tile_offsets.len() * 8
            + ifd.tile_byte_counts.len() * 8
            + ifd.jpeg_tables.len();
    }
    total_size += SERIAL_BLOCK_SIZE; // terminator

    let mut buf = BytesMut::with_capacity(total_size);

    push_block(
        &mut buf,
        block_type::HEADER_AND_META,
        0,
        SERIAL_HEADER_SIZE as u64,
    );
    SerialHeader::from_tiff(tiff).encode(&mut buf);

    push_block(
        &mut buf,
        block_type::IFDS,
        0,
        (ifd_count * SERIAL_IFD_SIZE) as u64,
    );
    for ifd in &tiff.ifds {
        SerialIfd::from_ifd(ifd).encode(&mut buf);
    }

    for (index, ifd) in tiff.ifds.iter().enumerate() {
        let index = index as u32;

        push_block(
            &mut buf,
            block_type::IMAGE_DESCRIPTION,
            index,
            ifd.image_description.len() as u64,
        );
        buf.put_slice(&ifd.image_description);

        push_block(
            &mut buf,
            block_type::TILE_OFFSETS,
            index,
            (ifd.tile_offsets.len() * 8) as u64,
        );
        for &offset in &ifd.tile_offsets {
            buf.put_u64_le(offset);
        }

        push_block(
            &mut buf,
            block_type::TILE_BYTE_COUNTS,
            index,
            (ifd.tile_byte_counts.len() * 8) as u64,
        );
        for &count in &ifd.tile_byte_counts {
            buf.put_u64_le(count);
        }

        push_block(
            &mut buf,
            block_type::JPEG_TABLES,
            index,
            ifd.jpeg_tables.len() as u64,
        );
        buf.put_slice(&ifd.jpeg_tables);
    }

    push_block(&mut buf, block_type::TERMINATOR, 0, 0);

    debug_assert_eq!(buf.len(), total_size);
    buf
}

/// Wrap the payload in an LZ4 envelope, falling back to the uncompressed
/// form when compression fails or the decompressed size would not fit the
/// envelope's 32-bit size field.
fn try_compress(payload: BytesMut) -> BytesMut {
    let uncompressed_size = payload.len();
    if uncompressed_size > u32::MAX as usize {
        warn!(
            size = uncompressed_size,
            "payload too large for the LZ4 envelope, sending uncompressed"
        );
        return payload;
    }

    let mut compressed = vec![0u8; lz4_flex::block::get_maximum_output_size(uncompressed_size)];
    match lz4_flex::block::compress_into(&payload, &mut compressed) {
        Ok(compressed_size) => {
            debug!(
                uncompressed_size,
                compressed_size, "wrapped payload in LZ4 envelope"
            );
            let mut out = BytesMut::with_capacity(SERIAL_BLOCK_SIZE + compressed_size);
            push_block(
                &mut out,
                block_type::LZ4_COMPRESSED_DATA,
                uncompressed_size as u32,
                compressed_size as u64,
            );
            out.put_slice(&compressed[..compressed_size]);
            out
        }
        Err(error) => {
            warn!(%error, "LZ4 compression failed, sending uncompressed");
            payload
        }
    }
}

/// Append a block header.
fn push_block(buf: &mut BytesMut, block_type: u32, index: u32, length: u64) {
    SerialBlock {
        block_type,
        index,
        length,
    }
    .encode(buf);
}
