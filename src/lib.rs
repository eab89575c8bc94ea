//! slidewire - reader and transfer codec for whole-slide images.
//!
//! This library provides the core functionality for a digital pathology
//! viewer: opening tiled, pyramidal whole-slide images stored in
//! TIFF/BigTIFF containers, and moving the parsed slide description over
//! the network in a compact block-framed stream.
//!
//! Two halves share one data model:
//!
//! - [`Tiff::open`] walks a file's Image File Directories and exposes a
//!   normalised description of the pyramid (levels, macro, label) with
//!   per-tile byte ranges.
//! - [`wire::serialize`] / [`wire::deserialize`] carry that description
//!   (minus pixel data) across the network, optionally LZ4-compressed,
//!   prefixed with an HTTP response header.
//!
//! Parsing and serialisation are synchronous; a `Tiff` is owned by its
//! creator and read-only after construction.

pub mod error;
pub mod io;
pub mod tiff;
pub mod wire;

// Re-export commonly used types
pub use error::{TiffError, WireError};
pub use io::{ByteOrder, ByteOrderReader};
pub use tiff::{
    Compression, DataType, Ifd, Rational, SlideMetadata, SubimageType, Tag, TagValue, Tiff,
    TiffHeader, TiffTag, BIGTIFF_HEADER_SIZE, DEFAULT_MPP, TIFF_HEADER_SIZE,
};
pub use wire::{
    block_type, deserialize, serialize, serialize_uncompressed, SerialBlock, SerialHeader,
    SerialIfd, SERIAL_BLOCK_SIZE, SERIAL_HEADER_SIZE, SERIAL_IFD_SIZE,
};
