//! Wire framing records.
//!
//! The transfer stream is a sequence of length-framed blocks, each headed
//! by a [`SerialBlock`] record. All multi-byte fields on the wire are
//! little-endian and encoded field by field; nothing is transmuted from
//! in-memory structs, so the format is identical on every host.
//!
//! The numeric block type assignments are part of the wire contract and
//! must never be renumbered. Receivers skip block types they do not
//! recognise, which is what makes the format forward-compatible.

use bytes::{BufMut, BytesMut};

use crate::error::WireError;
use crate::io::{read_u32_le, read_u64_le};
use crate::tiff::{Ifd, SubimageType, Tiff};

// =============================================================================
// Block Types
// =============================================================================

/// Stable block type identifiers. Part of the wire contract.
pub mod block_type {
    /// End-of-stream marker
    pub const TERMINATOR: u32 = 0;
    /// The `SerialHeader` record
    pub const HEADER_AND_META: u32 = 1;
    /// The packed `SerialIfd` array
    pub const IFDS: u32 = 2;
    /// One IFD's ImageDescription payload (index = IFD index)
    pub const IMAGE_DESCRIPTION: u32 = 3;
    /// One IFD's tile offset array (index = IFD index)
    pub const TILE_OFFSETS: u32 = 4;
    /// One IFD's tile byte count array (index = IFD index)
    pub const TILE_BYTE_COUNTS: u32 = 5;
    /// One IFD's JPEG tables payload (index = IFD index)
    pub const JPEG_TABLES: u32 = 6;
    /// LZ4 envelope wrapping the whole payload (index = decompressed size)
    pub const LZ4_COMPRESSED_DATA: u32 = 7;
}

/// Size of an encoded [`SerialBlock`] in bytes.
pub const SERIAL_BLOCK_SIZE: usize = 16;

/// Size of an encoded [`SerialHeader`] in bytes.
pub const SERIAL_HEADER_SIZE: usize = 48;

/// Size of an encoded [`SerialIfd`] in bytes.
pub const SERIAL_IFD_SIZE: usize = 68;

/// `SerialHeader` flag: the source file was BigTIFF.
pub const FLAG_BIGTIFF: u32 = 0x1;

/// `SerialHeader` flag: the source file was big-endian.
pub const FLAG_BIG_ENDIAN: u32 = 0x2;

// =============================================================================
// WireCursor
// =============================================================================

/// Bounds-checked sequential reader over a received buffer.
///
/// Every framing violation surfaces as [`WireError::MalformedStream`];
/// the cursor never panics on truncated input.
pub(crate) struct WireCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume `n` bytes. The length is taken as u64 so hostile block
    /// lengths cannot overflow the bounds check.
    pub fn take(&mut self, n: u64) -> Result<&'a [u8], WireError> {
        if n > self.remaining() as u64 {
            return Err(WireError::MalformedStream("stream truncated"));
        }
        let start = self.pos;
        self.pos += n as usize;
        Ok(&self.buf[start..self.pos])
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(read_u32_le(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(read_u64_le(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

// =============================================================================
// SerialBlock
// =============================================================================

/// Framing record heading every block in the transfer stream.
///
/// The meaning of `index` depends on the block type: the IFD index for
/// per-IFD payload blocks, the decompressed size for the LZ4 envelope,
/// zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialBlock {
    pub block_type: u32,
    pub index: u32,
    pub length: u64,
}

impl SerialBlock {
    /// Append the encoded record to `out`.
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u32_le(self.block_type);
        out.put_u32_le(self.index);
        out.put_u64_le(self.length);
    }

    /// Decode one record from the cursor.
    pub(crate) fn decode(cursor: &mut WireCursor) -> Result<Self, WireError> {
        Ok(SerialBlock {
            block_type: cursor.read_u32()?,
            index: cursor.read_u32()?,
            length: cursor.read_u64()?,
        })
    }
}

// =============================================================================
// SerialHeader
// =============================================================================

/// The `Tiff` scalars carried by the HEADER_AND_META block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialHeader {
    pub filesize: u64,
    pub ifd_count: u32,
    pub main_image_index: u32,
    pub macro_image_index: u32,
    pub label_image_index: u32,
    pub level_image_index: u32,
    pub level_count: u32,
    pub offset_size: u32,
    pub flags: u32,
    pub mpp_x: f32,
    pub mpp_y: f32,
}

impl SerialHeader {
    /// Capture the serialisable scalars of a [`Tiff`].
    pub fn from_tiff(tiff: &Tiff) -> Self {
        let mut flags = 0;
        if tiff.is_bigtiff {
            flags |= FLAG_BIGTIFF;
        }
        if tiff.is_big_endian {
            flags |= FLAG_BIG_ENDIAN;
        }

        SerialHeader {
            filesize: tiff.filesize,
            ifd_count: tiff.ifd_count(),
            main_image_index: tiff.main_image_index,
            macro_image_index: tiff.macro_image_index,
            label_image_index: tiff.label_image_index,
            level_image_index: tiff.level_image_index,
            level_count: tiff.level_count,
            offset_size: tiff.offset_size,
            flags,
            mpp_x: tiff.mpp_x,
            mpp_y: tiff.mpp_y,
        }
    }

    /// Append the encoded header to `out`.
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u64_le(self.filesize);
        out.put_u32_le(self.ifd_count);
        out.put_u32_le(self.main_image_index);
        out.put_u32_le(self.macro_image_index);
        out.put_u32_le(self.label_image_index);
        out.put_u32_le(self.level_image_index);
        out.put_u32_le(self.level_count);
        out.put_u32_le(self.offset_size);
        out.put_u32_le(self.flags);
        out.put_f32_le(self.mpp_x);
        out.put_f32_le(self.mpp_y);
    }

    /// Decode a header from the cursor.
    pub(crate) fn decode(cursor: &mut WireCursor) -> Result<Self, WireError> {
        Ok(SerialHeader {
            filesize: cursor.read_u64()?,
            ifd_count: cursor.read_u32()?,
            main_image_index: cursor.read_u32()?,
            macro_image_index: cursor.read_u32()?,
            label_image_index: cursor.read_u32()?,
            level_image_index: cursor.read_u32()?,
            level_count: cursor.read_u32()?,
            offset_size: cursor.read_u32()?,
            flags: cursor.read_u32()?,
            mpp_x: cursor.read_f32()?,
            mpp_y: cursor.read_f32()?,
        })
    }
}

// =============================================================================
// SerialIfd
// =============================================================================

/// The `Ifd` scalars carried by the IFDS block.
///
/// Variable-length payloads (description, tile arrays, JPEG tables) are
/// not included; they travel in their own per-IFD blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialIfd {
    pub image_width: u32,
    pub image_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub width_in_tiles: u32,
    pub height_in_tiles: u32,
    pub tile_count: u32,
    pub image_description_length: u32,
    pub jpeg_tables_length: u32,
    pub compression: u16,
    pub color_space: u16,
    pub chroma_subsampling_horizontal: u16,
    pub chroma_subsampling_vertical: u16,
    pub subimage_type: u32,
    pub level_magnification: f32,
    pub um_per_pixel_x: f32,
    pub um_per_pixel_y: f32,
    pub tile_side_x_um: f32,
    pub tile_side_y_um: f32,
}

impl SerialIfd {
    /// Capture the serialisable scalars of an [`Ifd`].
    pub fn from_ifd(ifd: &Ifd) -> Self {
        SerialIfd {
            image_width: ifd.image_width,
            image_height: ifd.image_height,
            tile_width: ifd.tile_width,
            tile_height: ifd.tile_height,
            width_in_tiles: ifd.width_in_tiles,
            height_in_tiles: ifd.height_in_tiles,
            tile_count: ifd.tile_count,
            image_description_length: ifd.image_description.len() as u32,
            jpeg_tables_length: ifd.jpeg_tables.len() as u32,
            compression: ifd.compression,
            color_space: ifd.color_space,
            chroma_subsampling_horizontal: ifd.chroma_subsampling_horizontal,
            chroma_subsampling_vertical: ifd.chroma_subsampling_vertical,
            subimage_type: ifd.subimage_type.as_u32(),
            level_magnification: ifd.level_magnification,
            um_per_pixel_x: ifd.um_per_pixel_x,
            um_per_pixel_y: ifd.um_per_pixel_y,
            tile_side_x_um: ifd.tile_side_x_um,
            tile_side_y_um: ifd.tile_side_y_um,
        }
    }

    /// Append the encoded record to `out`.
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u32_le(self.image_width);
        out.put_u32_le(self.image_height);
        out.put_u32_le(self.tile_width);
        out.put_u32_le(self.tile_height);
        out.put_u32_le(self.width_in_tiles);
        out.put_u32_le(self.height_in_tiles);
        out.put_u32_le(self.tile_count);
        out.put_u32_le(self.image_description_length);
        out.put_u32_le(self.jpeg_tables_length);
        out.put_u16_le(self.compression);
        out.put_u16_le(self.color_space);
        out.put_u16_le(self.chroma_subsampling_horizontal);
        out.put_u16_le(self.chroma_subsampling_vertical);
        out.put_u32_le(self.subimage_type);
        out.put_f32_le(self.level_magnification);
        out.put_f32_le(self.um_per_pixel_x);
        out.put_f32_le(self.um_per_pixel_y);
        out.put_f32_le(self.tile_side_x_um);
        out.put_f32_le(self.tile_side_y_um);
    }

    /// Decode one record from the cursor.
    pub(crate) fn decode(cursor: &mut WireCursor) -> Result<Self, WireError> {
        Ok(SerialIfd {
            image_width: cursor.read_u32()?,
            image_height: cursor.read_u32()?,
            tile_width: cursor.read_u32()?,
            tile_height: cursor.read_u32()?,
            width_in_tiles: cursor.read_u32()?,
            height_in_tiles: cursor.read_u32()?,
            tile_count: cursor.read_u32()?,
            image_description_length: cursor.read_u32()?,
            jpeg_tables_length: cursor.read_u32()?,
            compression: cursor.read_u16()?,
            color_space: cursor.read_u16()?,
            chroma_subsampling_horizontal: cursor.read_u16()?,
            chroma_subsampling_vertical: cursor.read_u16()?,
            subimage_type: cursor.read_u32()?,
            level_magnification: cursor.read_f32()?,
            um_per_pixel_x: cursor.read_f32()?,
            um_per_pixel_y: cursor.read_f32()?,
            tile_side_x_um: cursor.read_f32()?,
            tile_side_y_um: cursor.read_f32()?,
        })
    }

    /// Rebuild an [`Ifd`] from the transmitted scalars. The
    /// variable-length payloads are filled in later from their own blocks.
    pub fn into_ifd(self, ifd_index: u32) -> Ifd {
        let mut ifd = Ifd::new(ifd_index);
        ifd.image_width = self.image_width;
        ifd.image_height = self.image_height;
        ifd.tile_width = self.tile_width;
        ifd.tile_height = self.tile_height;
        ifd.width_in_tiles = self.width_in_tiles;
        ifd.height_in_tiles = self.height_in_tiles;
        ifd.tile_count = self.tile_count;
        ifd.compression = self.compression;
        ifd.color_space = self.color_space;
        ifd.chroma_subsampling_horizontal = self.chroma_subsampling_horizontal;
        ifd.chroma_subsampling_vertical = self.chroma_subsampling_vertical;
        ifd.subimage_type = SubimageType::from_u32(self.subimage_type);
        ifd.level_magnification = self.level_magnification;
        ifd.um_per_pixel_x = self.um_per_pixel_x;
        ifd.um_per_pixel_y = self.um_per_pixel_y;
        ifd.tile_side_x_um = self.tile_side_x_um;
        ifd.tile_side_y_um = self.tile_side_y_um;
        ifd
    }
}

// =============================================================================
// Tests
// =============================================================================
