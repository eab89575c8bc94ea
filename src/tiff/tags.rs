//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for TIFF parsing:
//! - Data types that determine how tag values are encoded
//! - Tag IDs that identify the metadata fields the slide reader consumes
//! - Compression and photometric interpretation codes
//! - The sub-image classification assigned to each IFD
//!
//! The definitions cover both classic TIFF and BigTIFF.

// =============================================================================
// TIFF Data Types
// =============================================================================

/// TIFF field data types, covering the full TIFF 6.0 set plus the BigTIFF
/// additions.
///
/// The per-element size is critical for two decisions:
/// - whether a value fits inline in a tag record
/// - how to widen integer arrays to a uniform 64-bit view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DataType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit NUL-terminated string data
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two unsigned 32-bit integers (numerator, denominator)
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque byte data
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two signed 32-bit integers
    SRational = 10,
    /// 32-bit IEEE float
    Float = 11,
    /// 64-bit IEEE float
    Double = 12,
    /// 32-bit IFD offset
    Ifd = 13,
    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,
    /// Signed 64-bit integer (BigTIFF)
    SLong8 = 17,
    /// 64-bit IFD offset (BigTIFF)
    Ifd8 = 18,
}

impl DataType {
    /// Create a DataType from its numeric value.
    ///
    /// Returns `None` for unknown type values; callers treat those as
    /// opaque with a field size of zero.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(DataType::Byte),
            2 => Some(DataType::Ascii),
            3 => Some(DataType::Short),
            4 => Some(DataType::Long),
            5 => Some(DataType::Rational),
            6 => Some(DataType::SByte),
            7 => Some(DataType::Undefined),
            8 => Some(DataType::SShort),
            9 => Some(DataType::SLong),
            10 => Some(DataType::SRational),
            11 => Some(DataType::Float),
            12 => Some(DataType::Double),
            13 => Some(DataType::Ifd),
            16 => Some(DataType::Long8),
            17 => Some(DataType::SLong8),
            18 => Some(DataType::Ifd8),
            _ => None,
        }
    }

    /// Size of a single element of this type in bytes.
    ///
    /// Rational types count as 8 bytes (two 4-byte components that are
    /// byte-swapped independently).
    #[inline]
    pub const fn field_size(self) -> u32 {
        match self {
            DataType::Byte | DataType::SByte | DataType::Ascii | DataType::Undefined => 1,
            DataType::Short | DataType::SShort => 2,
            DataType::Long | DataType::SLong | DataType::Ifd | DataType::Float => 4,
            DataType::Rational | DataType::SRational => 8,
            DataType::Double | DataType::Long8 | DataType::SLong8 | DataType::Ifd8 => 8,
        }
    }

    /// Whether this type is a rational (two independently-swapped halves).
    #[inline]
    pub const fn is_rational(self) -> bool {
        matches!(self, DataType::Rational | DataType::SRational)
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs consumed by the slide reader.
///
/// Tags not listed here are tolerated and silently ignored during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    /// Bit flags describing the kind of sub-image this IFD holds
    NewSubfileType = 254,

    /// Image width in pixels
    ImageWidth = 256,

    /// Image height (length) in pixels
    ImageLength = 257,

    /// Bits per sample (expected to be 8 per sample)
    BitsPerSample = 258,

    /// Compression scheme used for the tile data
    Compression = 259,

    /// Photometric interpretation (RGB, YCbCr, ...)
    PhotometricInterpretation = 262,

    /// Free-form description; vendors stash metadata here
    ImageDescription = 270,

    /// Width of each tile in pixels
    TileWidth = 322,

    /// Height (length) of each tile in pixels
    TileLength = 323,

    /// Absolute byte offset of each tile in the file
    TileOffsets = 324,

    /// Byte count of each tile
    TileByteCounts = 325,

    /// JPEG quantization and Huffman tables for abbreviated tile streams
    JpegTables = 347,

    /// YCbCr chroma subsampling factors (horizontal, vertical)
    YCbCrSubSampling = 530,

    /// Reference black/white point pairs (rationals)
    ReferenceBlackWhite = 532,
}

impl TiffTag {
    /// Create a TiffTag from its numeric code.
    ///
    /// Returns `None` for unrecognized codes; unknown tags are not an
    /// error, they are simply skipped.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            254 => Some(TiffTag::NewSubfileType),
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            270 => Some(TiffTag::ImageDescription),
            322 => Some(TiffTag::TileWidth),
            323 => Some(TiffTag::TileLength),
            324 => Some(TiffTag::TileOffsets),
            325 => Some(TiffTag::TileByteCounts),
            347 => Some(TiffTag::JpegTables),
            530 => Some(TiffTag::YCbCrSubSampling),
            532 => Some(TiffTag::ReferenceBlackWhite),
            _ => None,
        }
    }

    /// Get the numeric tag code.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// TIFF compression scheme identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    /// No compression
    None = 1,
    /// LZW compression
    Lzw = 5,
    /// "Old-style" JPEG (rarely used)
    OldJpeg = 6,
    /// JPEG compression (the usual scheme for slide tiles)
    Jpeg = 7,
    /// Deflate/zlib compression
    Deflate = 8,
    /// Adobe Deflate
    AdobeDeflate = 32946,
    /// JPEG 2000
    Jpeg2000 = 33003,
}

impl Compression {
    /// Create a Compression from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000),
            _ => None,
        }
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Jpeg2000 => "JPEG 2000",
        }
    }
}

// =============================================================================
// Photometric Interpretation / Subfile Type
// =============================================================================

/// PhotometricInterpretation: RGB color space.
pub const PHOTOMETRIC_RGB: u16 = 2;

/// PhotometricInterpretation: YCbCr color space.
pub const PHOTOMETRIC_YCBCR: u16 = 6;

/// NewSubfileType bit: this IFD is a reduced-resolution version of the
/// main image.
pub const SUBFILETYPE_REDUCEDIMAGE: u32 = 0x1;

// =============================================================================
// Sub-image Classification
// =============================================================================

/// The role an IFD plays within a whole-slide file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum SubimageType {
    /// Role could not be determined
    #[default]
    Unknown = 0,
    /// A pyramid level
    Level = 1,
    /// Overview image of the whole slide
    Macro = 2,
    /// Image of the slide label (barcode/text)
    Label = 3,
}

impl SubimageType {
    /// Create a SubimageType from its numeric value; unrecognized values
    /// fall back to `Unknown`.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => SubimageType::Level,
            2 => SubimageType::Macro,
            3 => SubimageType::Label,
            _ => SubimageType::Unknown,
        }
    }

    /// Get the numeric value used on the wire.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

// =============================================================================
// Tests
// =============================================================================
