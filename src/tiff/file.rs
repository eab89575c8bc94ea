//! TIFF/BigTIFF header parsing and the IFD chain walker.
//!
//! # Header structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = "II" little-endian, 0x4D4D = "MM" big-endian)
//! Bytes 2-3: Version (42 = 0x2A)
//! Bytes 4-7: Offset to first IFD (u32)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1:  Byte order
//! Bytes 2-3:  Version (43 = 0x2B)
//! Bytes 4-5:  Offset byte width (must be 8)
//! Bytes 6-7:  Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (u64)
//! ```
//!
//! IFDs form a singly-linked chain: each directory ends with the offset of
//! the next one, and a zero offset terminates the chain.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::TiffError;
use crate::io::{ByteOrder, ByteOrderReader};

use super::description::SlideMetadata;
use super::ifd::Ifd;
use super::tag::{BIGTIFF_TAG_SIZE, CLASSIC_TAG_SIZE};
use super::tags::SubimageType;

// =============================================================================
// Constants
// =============================================================================

/// Version number for classic TIFF.
const VERSION_CLASSIC: u16 = 0x2A;

/// Version number for BigTIFF.
const VERSION_BIGTIFF: u16 = 0x2B;

/// Size of a classic TIFF header in bytes.
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of a BigTIFF header in bytes.
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Safety limit on the number of IFDs followed in one chain.
const MAX_IFDS: usize = 100;

/// Fallback micrometres-per-pixel at level 0 when the description carries
/// no resolution hint.
pub const DEFAULT_MPP: f32 = 0.25;

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset of the first IFD
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// The input must hold at least 8 bytes; 16 for BigTIFF.
    ///
    /// # Errors
    /// - [`TiffError::Eof`] if the slice is too short for the detected format
    /// - [`TiffError::BadMagic`] for an unknown byte-order mark, an unknown
    ///   version, a BigTIFF offset width other than 8, or a nonzero
    ///   reserved field
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::Eof {
                offset: 0,
                needed: TIFF_HEADER_SIZE as u64,
            });
        }

        // The byte-order mark reads identically either way round.
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = ByteOrder::detect(magic).ok_or(TiffError::BadMagic {
            reason: "not a TIFF byte-order mark",
            value: magic as u32,
        })?;

        let version = byte_order.read_u16(&bytes[2..4]);
        match version {
            VERSION_CLASSIC => {
                let first_ifd_offset = byte_order.read_u32(&bytes[4..8]) as u64;
                Ok(TiffHeader {
                    byte_order,
                    is_bigtiff: false,
                    first_ifd_offset,
                })
            }
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::Eof {
                        offset: 0,
                        needed: BIGTIFF_HEADER_SIZE as u64,
                    });
                }

                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::BadMagic {
                        reason: "BigTIFF offset width must be 8",
                        value: offset_size as u32,
                    });
                }

                let reserved = byte_order.read_u16(&bytes[6..8]);
                if reserved != 0 {
                    return Err(TiffError::BadMagic {
                        reason: "BigTIFF reserved field must be zero",
                        value: reserved as u32,
                    });
                }

                let first_ifd_offset = byte_order.read_u64(&bytes[8..16]);
                Ok(TiffHeader {
                    byte_order,
                    is_bigtiff: true,
                    first_ifd_offset,
                })
            }
            _ => Err(TiffError::BadMagic {
                reason: "unrecognized TIFF version",
                value: version as u32,
            }),
        }
    }

    /// Width in bytes of file offsets: 4 for classic TIFF, 8 for BigTIFF.
    #[inline]
    pub const fn offset_size(&self) -> u32 {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of one raw tag record: 12 bytes classic, 20 bytes BigTIFF.
    #[inline]
    pub const fn tag_record_size(&self) -> usize {
        if self.is_bigtiff {
            BIGTIFF_TAG_SIZE
        } else {
            CLASSIC_TAG_SIZE
        }
    }
}

// =============================================================================
// Tiff
// =============================================================================

/// A parsed whole-slide TIFF file.
///
/// Created either by [`Tiff::open`] or by deserialising a transfer stream
/// (`wire::deserialize`). Mutated only during construction; afterwards the
/// structure is read-only to consumers. Dropping a `Tiff` releases its
/// buffers and closes the file handle if one is held.
#[derive(Debug)]
pub struct Tiff {
    /// Open handle to the backing file, kept for subsequent tile reads.
    /// `None` for deserialised instances.
    pub(crate) file: Option<File>,

    /// Size of the backing file in bytes
    pub filesize: u64,

    /// Whether the file declares big-endian byte order
    pub is_big_endian: bool,

    /// Whether the file is BigTIFF (64-bit offsets)
    pub is_bigtiff: bool,

    /// Width in bytes of file offsets (4 or 8)
    pub offset_size: u32,

    /// All IFDs in file order
    pub ifds: Vec<Ifd>,

    /// Index of the main image (always the first IFD)
    pub main_image_index: u32,

    /// Index of the macro overview IFD (0 = unset sentinel)
    pub macro_image_index: u32,

    /// Index of the label IFD (0 = unset sentinel)
    pub label_image_index: u32,

    /// Index of the first pyramid level IFD (0 = unset sentinel)
    pub level_image_index: u32,

    /// Number of pyramid level IFDs
    pub level_count: u32,

    /// Micrometres per pixel at level 0, horizontal
    pub mpp_x: f32,

    /// Micrometres per pixel at level 0, vertical
    pub mpp_y: f32,
}

impl Tiff {
    /// Open a slide file and parse its directory chain.
    ///
    /// The returned `Tiff` keeps the file handle open so tiles can be read
    /// later; drop the value (or call [`Tiff::close`]) to release it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Tiff, TiffError> {
        let file = File::open(path)?;
        let filesize = file.metadata()?.len();

        let mut reader = ByteOrderReader::new(BufReader::new(file));
        let mut tiff = Self::read_from(&mut reader, filesize)?;
        tiff.file = Some(reader.into_inner().into_inner());
        Ok(tiff)
    }

    /// Parse a slide from any seekable source positioned at byte 0.
    pub(crate) fn read_from<R: Read + Seek>(
        reader: &mut ByteOrderReader<R>,
        filesize: u64,
    ) -> Result<Tiff, TiffError> {
        let mut header_bytes = [0u8; BIGTIFF_HEADER_SIZE];
        reader.read_exact(&mut header_bytes[..TIFF_HEADER_SIZE])?;

        // The version field decides whether 8 more header bytes follow;
        // peeking it needs the byte order first.
        let magic = u16::from_le_bytes([header_bytes[0], header_bytes[1]]);
        let order = ByteOrder::detect(magic).ok_or(TiffError::BadMagic {
            reason: "not a TIFF byte-order mark",
            value: magic as u32,
        })?;

        let header = if order.read_u16(&header_bytes[2..4]) == VERSION_BIGTIFF {
            reader.read_exact(&mut header_bytes[TIFF_HEADER_SIZE..])?;
            TiffHeader::parse(&header_bytes)?
        } else {
            TiffHeader::parse(&header_bytes[..TIFF_HEADER_SIZE])?
        };

        let mut ifds = Vec::new();
        let mut next_ifd_offset = header.first_ifd_offset;
        while next_ifd_offset != 0 {
            if ifds.len() >= MAX_IFDS {
                warn!(
                    limit = MAX_IFDS,
                    "IFD chain exceeds safety limit, remaining directories ignored"
                );
                break;
            }

            debug!(ifd_index = ifds.len(), offset = next_ifd_offset, "reading IFD");
            reader.seek_to(next_ifd_offset)?;
            let ifd = Ifd::read(reader, &header, ifds.len() as u32, filesize)?;
            ifds.push(ifd);

            // The walker is left right after the tag records, where the
            // next-IFD offset lives.
            next_ifd_offset = if header.is_bigtiff {
                reader.read_u64(order)?
            } else {
                reader.read_u32(order)? as u64
            };
        }

        let mut tiff = Tiff {
            file: None,
            filesize,
            is_big_endian: order == ByteOrder::BigEndian,
            is_bigtiff: header.is_bigtiff,
            offset_size: header.offset_size(),
            ifds,
            main_image_index: 0,
            macro_image_index: 0,
            label_image_index: 0,
            level_image_index: 0,
            level_count: 0,
            mpp_x: DEFAULT_MPP,
            mpp_y: DEFAULT_MPP,
        };
        tiff.assign_roles();
        Ok(tiff)
    }

    /// Resolve role indices and derive the physical scale of each level.
    ///
    /// The first IFD is taken for the main image. Levels are assumed to
    /// form a downsampled pyramid in file order, doubling micrometres per
    /// pixel at each step from the level-0 baseline. The baseline comes
    /// from an `MPP` hint in the level-0 description when present, else
    /// from [`DEFAULT_MPP`].
    fn assign_roles(&mut self) {
        let mut first_level: Option<u32> = None;
        for ifd in &self.ifds {
            match ifd.subimage_type {
                SubimageType::Macro => self.macro_image_index = ifd.ifd_index,
                SubimageType::Label => self.label_image_index = ifd.ifd_index,
                SubimageType::Level => {
                    if first_level.is_none() {
                        first_level = Some(ifd.ifd_index);
                    }
                }
                SubimageType::Unknown => {}
            }
        }

        self.main_image_index = 0;
        self.level_image_index = first_level.unwrap_or(0);
        self.level_count = self
            .ifds
            .iter()
            .filter(|ifd| ifd.subimage_type == SubimageType::Level)
            .count() as u32;

        let metadata = match first_level {
            Some(index) => SlideMetadata::parse(&self.ifds[index as usize].description()),
            None => SlideMetadata::default(),
        };
        let baseline_mpp = metadata.mpp.unwrap_or(DEFAULT_MPP);
        self.mpp_x = baseline_mpp;
        self.mpp_y = baseline_mpp;

        let mut um_per_pixel = baseline_mpp;
        let mut magnification = metadata.magnification;
        let mut reference_tile: Option<(u32, u32)> = None;

        for ifd in self
            .ifds
            .iter_mut()
            .filter(|ifd| ifd.subimage_type == SubimageType::Level)
        {
            match reference_tile {
                None => reference_tile = Some((ifd.tile_width, ifd.tile_height)),
                Some((width, height)) => {
                    if ifd.tile_width != width || ifd.tile_height != height {
                        warn!(
                            ifd_index = ifd.ifd_index,
                            tile_width = ifd.tile_width,
                            tile_height = ifd.tile_height,
                            "level tile dimensions differ from the first level"
                        );
                    }
                }
            }

            ifd.um_per_pixel_x = um_per_pixel;
            ifd.um_per_pixel_y = um_per_pixel;
            ifd.tile_side_x_um = um_per_pixel * ifd.tile_width as f32;
            ifd.tile_side_y_um = um_per_pixel * ifd.tile_height as f32;
            if let Some(mag) = magnification {
                ifd.level_magnification = mag;
            }

            um_per_pixel *= 2.0;
            magnification = magnification.map(|m| m / 2.0);
        }
    }

    /// Number of IFDs in the file.
    pub fn ifd_count(&self) -> u32 {
        self.ifds.len() as u32
    }

    /// The main (level 0) image.
    pub fn main_image(&self) -> Option<&Ifd> {
        self.ifds.get(self.main_image_index as usize)
    }

    /// The macro overview image, when one was identified.
    pub fn macro_image(&self) -> Option<&Ifd> {
        let ifd = self.ifds.get(self.macro_image_index as usize)?;
        (ifd.subimage_type == SubimageType::Macro).then_some(ifd)
    }

    /// The label image, when one was identified.
    pub fn label_image(&self) -> Option<&Ifd> {
        let ifd = self.ifds.get(self.label_image_index as usize)?;
        (ifd.subimage_type == SubimageType::Label).then_some(ifd)
    }

    /// Pyramid level IFDs in file order (level 0 first).
    pub fn level_images(&self) -> impl Iterator<Item = &Ifd> {
        self.ifds
            .iter()
            .filter(|ifd| ifd.subimage_type == SubimageType::Level)
    }

    /// A pyramid level by ordinal.
    pub fn level_image(&self, level: usize) -> Option<&Ifd> {
        self.level_images().nth(level)
    }

    /// Whether this instance still holds an open file handle.
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// Release the file handle, keeping the parsed structure.
    pub fn close(&mut self) {
        self.file = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
