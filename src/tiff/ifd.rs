//! Image File Directories.
//!
//! An IFD describes one image in the slide file: a pyramid level, the
//! macro overview, or the label. [`Ifd::read`] consumes the directory's
//! raw tag records, realises the payloads the viewer needs and classifies
//! the image's role.
//!
//! Role classification is a heuristic. Vendors are inconsistent about
//! marking sub-images, so the description prefix is checked first and the
//! NewSubfileType reduced-image bit is used as a fallback; anything that
//! still cannot be identified stays [`SubimageType::Unknown`].

use std::io::{Read, Seek};

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::{ByteOrder, ByteOrderReader};

use super::file::TiffHeader;
use super::tag::Tag;
use super::tags::{SubimageType, TiffTag, PHOTOMETRIC_RGB, SUBFILETYPE_REDUCEDIMAGE};
use super::values::{self, Rational};

/// A parsed Image File Directory.
///
/// Owns every buffer reached from its fields. Mutated only during
/// construction; read-only to consumers afterwards.
#[derive(Debug, Clone)]
pub struct Ifd {
    /// Position of this IFD in the file's directory chain
    pub ifd_index: u32,

    /// Raw NewSubfileType bits
    pub subfile_type: u32,

    /// Image width in pixels
    pub image_width: u32,

    /// Image height in pixels
    pub image_height: u32,

    /// Tile width in pixels (0 when the IFD is not tiled)
    pub tile_width: u32,

    /// Tile height in pixels (0 when the IFD is not tiled)
    pub tile_height: u32,

    /// Number of tile columns (ceiling of width / tile_width)
    pub width_in_tiles: u32,

    /// Number of tile rows
    pub height_in_tiles: u32,

    /// Number of tiles, as reported by TileOffsets
    pub tile_count: u32,

    /// Absolute file offset of each tile, widened to 64 bits
    pub tile_offsets: Vec<u64>,

    /// Byte count of each tile, widened to 64 bits
    pub tile_byte_counts: Vec<u64>,

    /// TIFF compression code (7 = JPEG)
    pub compression: u16,

    /// Photometric interpretation; defaults to RGB when the tag is absent
    pub color_space: u16,

    /// YCbCr horizontal subsampling factor
    pub chroma_subsampling_horizontal: u16,

    /// YCbCr vertical subsampling factor
    pub chroma_subsampling_vertical: u16,

    /// JPEG quantization/Huffman tables for abbreviated tile streams
    pub jpeg_tables: Bytes,

    /// Raw ImageDescription payload
    pub image_description: Bytes,

    /// ReferenceBlackWhite rationals (not carried by the wire format)
    pub reference_black_white: Vec<Rational>,

    /// The role this IFD plays in the slide
    pub subimage_type: SubimageType,

    /// Objective magnification at this level (0 when unknown)
    pub level_magnification: f32,

    /// Micrometres per pixel, horizontal
    pub um_per_pixel_x: f32,

    /// Micrometres per pixel, vertical
    pub um_per_pixel_y: f32,

    /// Physical tile width in micrometres
    pub tile_side_x_um: f32,

    /// Physical tile height in micrometres
    pub tile_side_y_um: f32,
}

impl Ifd {
    /// Create an empty IFD at the given chain position.
    ///
    /// TIFF files are required to specify PhotometricInterpretation, but
    /// RGB is assumed when they don't.
    pub fn new(ifd_index: u32) -> Self {
        Ifd {
            ifd_index,
            subfile_type: 0,
            image_width: 0,
            image_height: 0,
            tile_width: 0,
            tile_height: 0,
            width_in_tiles: 0,
            height_in_tiles: 0,
            tile_count: 0,
            tile_offsets: Vec::new(),
            tile_byte_counts: Vec::new(),
            compression: 0,
            color_space: PHOTOMETRIC_RGB,
            chroma_subsampling_horizontal: 0,
            chroma_subsampling_vertical: 0,
            jpeg_tables: Bytes::new(),
            image_description: Bytes::new(),
            reference_black_white: Vec::new(),
            subimage_type: SubimageType::Unknown,
            level_magnification: 0.0,
            um_per_pixel_x: 0.0,
            um_per_pixel_y: 0.0,
            tile_side_x_um: 0.0,
            tile_side_y_um: 0.0,
        }
    }

    /// Read one IFD from the current position of `reader`.
    ///
    /// On return the reader is positioned directly after the tag records,
    /// where the next-IFD offset lives.
    pub(crate) fn read<R: Read + Seek>(
        reader: &mut ByteOrderReader<R>,
        header: &TiffHeader,
        ifd_index: u32,
        filesize: u64,
    ) -> Result<Ifd, TiffError> {
        let order = header.byte_order;

        let tag_count = if header.is_bigtiff {
            reader.read_u64(order)?
        } else {
            reader.read_u16(order)? as u64
        };

        let record_size = header.tag_record_size() as u64;
        let bytes_to_read = tag_count.saturating_mul(record_size);
        if bytes_to_read > filesize {
            // A count that large cannot fit in the file; fail before
            // attempting the allocation.
            return Err(TiffError::Eof {
                offset: reader.position()?,
                needed: bytes_to_read,
            });
        }

        let mut raw_tags = vec![0u8; bytes_to_read as usize];
        reader.read_exact(&mut raw_tags)?;

        let mut ifd = Ifd::new(ifd_index);
        for record in raw_tags.chunks_exact(record_size as usize) {
            let tag = Tag::parse(record, order, header.is_bigtiff);
            ifd.apply_tag(&tag, reader, order)?;
        }

        ifd.finish();
        Ok(ifd)
    }

    /// Interpret one decoded tag. Codes outside the consumed set are
    /// silently ignored.
    fn apply_tag<R: Read + Seek>(
        &mut self,
        tag: &Tag,
        reader: &mut ByteOrderReader<R>,
        order: ByteOrder,
    ) -> Result<(), TiffError> {
        let Some(known) = TiffTag::from_u16(tag.code) else {
            return Ok(());
        };

        match known {
            TiffTag::NewSubfileType => self.subfile_type = tag.inline_u32(),
            // Scalar dimension tags may be SHORT or LONG depending on the
            // writer; the zero-padded inline buffer widens either.
            TiffTag::ImageWidth => self.image_width = tag.inline_u32(),
            TiffTag::ImageLength => self.image_height = tag.inline_u32(),
            TiffTag::BitsPerSample => {
                // Expected to be 8 per sample; not interpreted.
            }
            TiffTag::Compression => self.compression = tag.inline_u16(),
            TiffTag::PhotometricInterpretation => self.color_space = tag.inline_u16(),
            TiffTag::ImageDescription => {
                let mut buf = values::read_ascii_padded(tag, reader)?;
                buf.truncate(tag.count as usize);
                self.image_description = Bytes::from(buf);
            }
            TiffTag::TileWidth => self.tile_width = tag.inline_u32(),
            TiffTag::TileLength => self.tile_height = tag.inline_u32(),
            TiffTag::TileOffsets => {
                self.tile_count = tag.count as u32;
                self.tile_offsets = values::read_integers(tag, reader, order)?;
            }
            TiffTag::TileByteCounts => {
                if tag.count != self.tile_count as u64 {
                    return Err(TiffError::TileCountMismatch {
                        offsets: self.tile_count as u64,
                        byte_counts: tag.count,
                    });
                }
                self.tile_byte_counts = values::read_integers(tag, reader, order)?;
            }
            TiffTag::JpegTables => {
                let mut buf = values::read_ascii_padded(tag, reader)?;
                buf.truncate(tag.count as usize);
                self.jpeg_tables = Bytes::from(buf);
            }
            TiffTag::YCbCrSubSampling => {
                let (horizontal, vertical) = tag.inline_u16_pair();
                self.chroma_subsampling_horizontal = horizontal;
                self.chroma_subsampling_vertical = vertical;
            }
            TiffTag::ReferenceBlackWhite => {
                self.reference_black_white = values::read_rationals(tag, reader, order)?;
            }
        }
        Ok(())
    }

    /// Derive the tile grid and classify the sub-image once all tags have
    /// been consumed.
    fn finish(&mut self) {
        if self.tile_width > 0 {
            self.width_in_tiles = (self.image_width + self.tile_width - 1) / self.tile_width;
        }
        if self.tile_height > 0 {
            self.height_in_tiles = (self.image_height + self.tile_height - 1) / self.tile_height;
        }
        self.classify();
    }

    /// Deduce whether this IFD is a level, macro or label image.
    ///
    /// The description prefix wins when present; otherwise a tiled IFD is
    /// taken for a level if it is the main image or carries the
    /// reduced-image bit.
    fn classify(&mut self) {
        if self.image_description.starts_with(b"Macro") {
            self.subimage_type = SubimageType::Macro;
        } else if self.image_description.starts_with(b"Label") {
            self.subimage_type = SubimageType::Label;
        } else if self.image_description.starts_with(b"level") {
            self.subimage_type = SubimageType::Level;
        }

        if self.subimage_type == SubimageType::Unknown && self.tile_width > 0 {
            let is_main_image = self.ifd_index == 0;
            if is_main_image || self.subfile_type & SUBFILETYPE_REDUCEDIMAGE != 0 {
                self.subimage_type = SubimageType::Level;
            }
        }
    }

    /// The ImageDescription as text, up to the first NUL.
    pub fn description(&self) -> String {
        let end = self
            .image_description
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.image_description.len());
        String::from_utf8_lossy(&self.image_description[..end]).into_owned()
    }

    /// Whether this IFD stores its image as tiles.
    pub fn is_tiled(&self) -> bool {
        self.tile_width > 0 && self.tile_height > 0
    }

    /// Linear tile index for a tile coordinate, or `None` when out of
    /// bounds.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.width_in_tiles || tile_y >= self.height_in_tiles {
            return None;
        }
        Some(tile_y * self.width_in_tiles + tile_x)
    }

    /// Pixel dimensions of a specific tile; edge tiles may be smaller
    /// than the nominal tile size.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<(u32, u32)> {
        if tile_x >= self.width_in_tiles || tile_y >= self.height_in_tiles {
            return None;
        }

        let width = if tile_x == self.width_in_tiles - 1 {
            let remainder = self.image_width % self.tile_width;
            if remainder == 0 {
                self.tile_width
            } else {
                remainder
            }
        } else {
            self.tile_width
        };

        let height = if tile_y == self.height_in_tiles - 1 {
            let remainder = self.image_height % self.tile_height;
            if remainder == 0 {
                self.tile_height
            } else {
                remainder
            }
        } else {
            self.tile_height
        };

        Some((width, height))
    }

    /// Byte range of a tile by linear index.
    pub fn tile_location(&self, tile_index: u32) -> Option<(u64, u64)> {
        let idx = tile_index as usize;
        if idx >= self.tile_offsets.len() || idx >= self.tile_byte_counts.len() {
            return None;
        }
        Some((self.tile_offsets[idx], self.tile_byte_counts[idx]))
    }
}

// =============================================================================
// Tests
// =============================================================================
