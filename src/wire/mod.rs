//! The network transfer codec.
//!
//! Serialises a parsed slide description (minus pixel data) into a
//! compact, length-framed, optionally LZ4-compressed byte stream with an
//! HTTP response prefix, and parses the same stream back on the client
//! side. Block type numbers are stable; unknown blocks between the header
//! and the terminator are skipped, never rejected.

mod block;
mod deserialize;
mod serialize;

pub use block::{
    block_type, SerialBlock, SerialHeader, SerialIfd, FLAG_BIGTIFF, FLAG_BIG_ENDIAN,
    SERIAL_BLOCK_SIZE, SERIAL_HEADER_SIZE, SERIAL_IFD_SIZE,
};
pub use deserialize::deserialize;
pub use serialize::{serialize, serialize_uncompressed};
