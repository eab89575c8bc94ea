use thiserror::Error;

/// Errors produced while opening and parsing a TIFF/BigTIFF slide file.
///
/// All errors are terminal for the current operation: partially parsed
/// state is discarded before the error is returned.
#[derive(Debug, Error)]
pub enum TiffError {
    /// The underlying read or seek failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read requested more bytes than the file contains.
    #[error("unexpected end of file: {needed} bytes requested at offset {offset}")]
    Eof { offset: u64, needed: u64 },

    /// Not a TIFF/BigTIFF header, or the declared offset width is inconsistent.
    #[error("bad magic: {reason} (value {value:#06x})")]
    BadMagic { reason: &'static str, value: u32 },

    /// An integer-array tag carries a data type whose element size cannot
    /// be read as an integer.
    #[error("unreadable element size for tag {tag_code} (data type {data_type})")]
    BadFieldSize { tag_code: u16, data_type: u16 },

    /// TileByteCounts disagrees with TileOffsets about the number of tiles.
    #[error("tile count mismatch: TileByteCounts has {byte_counts} entries, TileOffsets has {offsets}")]
    TileCountMismatch { offsets: u64, byte_counts: u64 },
}

/// Errors produced while decoding the block-framed transfer stream.
#[derive(Debug, Error)]
pub enum WireError {
    /// A framing violation: truncated stream, missing or misordered
    /// prologue blocks, or a block referencing a nonexistent IFD.
    #[error("malformed transfer stream: {0}")]
    MalformedStream(&'static str),

    /// The same payload kind appeared twice for one IFD.
    #[error("duplicate {kind} block for IFD {index}")]
    DuplicateBlock { kind: &'static str, index: u32 },

    /// The LZ4 envelope could not be decompressed, or the decompressed
    /// size does not match the size announced in the block header.
    #[error("LZ4 decompression failed")]
    DecompressionFailed,
}
