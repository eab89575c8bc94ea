//! Low-level byte access: endianness primitives and the seekable reader
//! used by the TIFF parser.

mod byte_order;
mod reader;

pub use byte_order::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, ByteOrder,
    BYTE_ORDER_BIG_ENDIAN, BYTE_ORDER_LITTLE_ENDIAN,
};
pub use reader::ByteOrderReader;
