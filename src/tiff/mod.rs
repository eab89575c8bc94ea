//! TIFF/BigTIFF slide parsing.
//!
//! This module turns a tiled, pyramidal whole-slide TIFF file into a
//! normalised in-memory description: one [`Tiff`] holding an [`Ifd`] per
//! directory, with per-tile byte ranges, pyramid scale information and
//! macro/label classification.
//!
//! # Key concepts
//!
//! - **Byte order**: declared in the header (`II`/`MM`); every multi-byte
//!   read respects it, and normalisation to a uniform representation
//!   happens exactly once, at tag decode.
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets; both are
//!   handled transparently and surfaced as u64.
//! - **Inline vs offset values**: small tag payloads live inside the tag
//!   record, larger ones at an absolute file offset.

mod description;
mod file;
mod ifd;
mod tag;
mod tags;
mod values;

pub use description::SlideMetadata;
pub use file::{Tiff, TiffHeader, BIGTIFF_HEADER_SIZE, DEFAULT_MPP, TIFF_HEADER_SIZE};
pub use ifd::Ifd;
pub use tag::{
    Tag, TagValue, BIGTIFF_INLINE_CAPACITY, BIGTIFF_TAG_SIZE, CLASSIC_INLINE_CAPACITY,
    CLASSIC_TAG_SIZE,
};
pub use tags::{
    Compression, DataType, SubimageType, TiffTag, PHOTOMETRIC_RGB, PHOTOMETRIC_YCBCR,
    SUBFILETYPE_REDUCEDIMAGE,
};
pub use values::{read_ascii_padded, read_integers, read_rationals, Rational};
