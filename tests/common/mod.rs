//! Test utilities shared by the integration tests.
//!
//! Provides a synthetic TIFF builder that assembles classic TIFF and
//! BigTIFF files in either byte order, plus helpers for carving up and
//! comparing transfer streams.

#![allow(dead_code)]

use std::io::Write;

use slidewire::{SerialHeader, SerialIfd, Tiff};

// =============================================================================
// Endianness
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn write_u16(self, out: &mut Vec<u8>, value: u16) {
        match self {
            Endian::Little => out.extend(&value.to_le_bytes()),
            Endian::Big => out.extend(&value.to_be_bytes()),
        }
    }

    fn write_u32(self, out: &mut Vec<u8>, value: u32) {
        match self {
            Endian::Little => out.extend(&value.to_le_bytes()),
            Endian::Big => out.extend(&value.to_be_bytes()),
        }
    }

    fn write_u64(self, out: &mut Vec<u8>, value: u64) {
        match self {
            Endian::Little => out.extend(&value.to_le_bytes()),
            Endian::Big => out.extend(&value.to_be_bytes()),
        }
    }
}

// =============================================================================
// IFD entries
// =============================================================================

/// Logical tag value; encoded into file bytes at build time.
#[derive(Debug, Clone)]
pub enum EntryValue {
    Short(u16),
    Long(u32),
    Shorts(Vec<u16>),
    Longs(Vec<u32>),
    Long8s(Vec<u64>),
    Ascii(Vec<u8>),
    Undefined(Vec<u8>),
    Rationals(Vec<(u32, u32)>),
}

impl EntryValue {
    fn data_type(&self) -> u16 {
        match self {
            EntryValue::Ascii(_) => 2,
            EntryValue::Short(_) | EntryValue::Shorts(_) => 3,
            EntryValue::Long(_) | EntryValue::Longs(_) => 4,
            EntryValue::Rationals(_) => 5,
            EntryValue::Undefined(_) => 7,
            EntryValue::Long8s(_) => 16,
        }
    }

    fn count(&self) -> u64 {
        match self {
            EntryValue::Short(_) | EntryValue::Long(_) => 1,
            EntryValue::Shorts(values) => values.len() as u64,
            EntryValue::Longs(values) => values.len() as u64,
            EntryValue::Long8s(values) => values.len() as u64,
            EntryValue::Ascii(bytes) | EntryValue::Undefined(bytes) => bytes.len() as u64,
            EntryValue::Rationals(values) => values.len() as u64,
        }
    }

    fn encode(&self, endian: Endian) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            EntryValue::Short(value) => endian.write_u16(&mut out, *value),
            EntryValue::Long(value) => endian.write_u32(&mut out, *value),
            EntryValue::Shorts(values) => {
                for &value in values {
                    endian.write_u16(&mut out, value);
                }
            }
            EntryValue::Longs(values) => {
                for &value in values {
                    endian.write_u32(&mut out, value);
                }
            }
            EntryValue::Long8s(values) => {
                for &value in values {
                    endian.write_u64(&mut out, value);
                }
            }
            EntryValue::Ascii(bytes) | EntryValue::Undefined(bytes) => out.extend(bytes),
            EntryValue::Rationals(values) => {
                for &(numerator, denominator) in values {
                    endian.write_u32(&mut out, numerator);
                    endian.write_u32(&mut out, denominator);
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct TestEntry {
    pub code: u16,
    pub value: EntryValue,
}

pub fn entry(code: u16, value: EntryValue) -> TestEntry {
    TestEntry { code, value }
}

// =============================================================================
// TIFF builder
// =============================================================================

/// Assembles a complete TIFF/BigTIFF byte stream from logical IFDs.
pub struct TiffBuilder {
    pub endian: Endian,
    pub bigtiff: bool,
    pub ifds: Vec<Vec<TestEntry>>,
}

impl TiffBuilder {
    pub fn new(endian: Endian, bigtiff: bool) -> Self {
        Self {
            endian,
            bigtiff,
            ifds: Vec::new(),
        }
    }

    pub fn add_ifd(mut self, entries: Vec<TestEntry>) -> Self {
        self.ifds.push(entries);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let endian = self.endian;
        let header_size: u64 = if self.bigtiff { 16 } else { 8 };
        let count_size: u64 = if self.bigtiff { 8 } else { 2 };
        let record_size: u64 = if self.bigtiff { 20 } else { 12 };
        let offset_size: u64 = if self.bigtiff { 8 } else { 4 };
        let inline_capacity = offset_size as usize;

        // First pass: lay out IFDs and their external payload areas.
        let mut ifd_offsets: Vec<u64> = Vec::new();
        let mut external_offsets: Vec<Vec<Option<u64>>> = Vec::new();
        let mut position = header_size;
        for entries in &self.ifds {
            ifd_offsets.push(position);
            let ifd_size = count_size + entries.len() as u64 * record_size + offset_size;
            let mut external_position = position + ifd_size;
            let mut offsets = Vec::with_capacity(entries.len());
            for test_entry in entries {
                let data = test_entry.value.encode(endian);
                if data.len() > inline_capacity {
                    offsets.push(Some(external_position));
                    external_position += data.len() as u64;
                } else {
                    offsets.push(None);
                }
            }
            external_offsets.push(offsets);
            position = external_position;
        }

        // Second pass: emit bytes.
        let mut out = Vec::new();
        match endian {
            Endian::Little => out.extend(b"II"),
            Endian::Big => out.extend(b"MM"),
        }
        let first_ifd_offset = ifd_offsets.first().copied().unwrap_or(0);
        if self.bigtiff {
            endian.write_u16(&mut out, 0x2B);
            endian.write_u16(&mut out, 8);
            endian.write_u16(&mut out, 0);
            endian.write_u64(&mut out, first_ifd_offset);
        } else {
            endian.write_u16(&mut out, 0x2A);
            endian.write_u32(&mut out, first_ifd_offset as u32);
        }

        for (ifd_index, entries) in self.ifds.iter().enumerate() {
            assert_eq!(out.len() as u64, ifd_offsets[ifd_index]);

            if self.bigtiff {
                endian.write_u64(&mut out, entries.len() as u64);
            } else {
                endian.write_u16(&mut out, entries.len() as u16);
            }

            for (entry_index, test_entry) in entries.iter().enumerate() {
                endian.write_u16(&mut out, test_entry.code);
                endian.write_u16(&mut out, test_entry.value.data_type());
                let count = test_entry.value.count();
                if self.bigtiff {
                    endian.write_u64(&mut out, count);
                } else {
                    endian.write_u32(&mut out, count as u32);
                }

                match external_offsets[ifd_index][entry_index] {
                    Some(offset) => {
                        if self.bigtiff {
                            endian.write_u64(&mut out, offset);
                        } else {
                            endian.write_u32(&mut out, offset as u32);
                        }
                    }
                    None => {
                        let data = test_entry.value.encode(endian);
                        out.extend(&data);
                        out.resize(out.len() + inline_capacity - data.len(), 0);
                    }
                }
            }

            let next_ifd_offset = ifd_offsets.get(ifd_index + 1).copied().unwrap_or(0);
            if self.bigtiff {
                endian.write_u64(&mut out, next_ifd_offset);
            } else {
                endian.write_u32(&mut out, next_ifd_offset as u32);
            }

            // External payloads for this IFD, in entry order.
            for (entry_index, test_entry) in entries.iter().enumerate() {
                if external_offsets[ifd_index][entry_index].is_some() {
                    out.extend(test_entry.value.encode(endian));
                }
            }
        }

        out
    }
}

// =============================================================================
// Canned IFDs
// =============================================================================

/// Entries for a tiled JPEG pyramid level.
pub fn level_entries(
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    subfile_type: Option<u32>,
    description: Option<&str>,
    jpeg_tables: Option<&[u8]>,
) -> Vec<TestEntry> {
    let tiles_x = (width + tile_width - 1) / tile_width;
    let tiles_y = (height + tile_height - 1) / tile_height;
    let tile_count = (tiles_x * tiles_y) as usize;

    let offsets: Vec<u32> = (0..tile_count).map(|i| 100_000 + i as u32 * 4096).collect();
    let byte_counts: Vec<u32> = (0..tile_count).map(|i| 2000 + i as u32).collect();

    let mut entries = Vec::new();
    if let Some(subfile) = subfile_type {
        entries.push(entry(254, EntryValue::Long(subfile)));
    }
    entries.push(entry(256, EntryValue::Long(width)));
    entries.push(entry(257, EntryValue::Long(height)));
    entries.push(entry(259, EntryValue::Short(7))); // JPEG
    entries.push(entry(262, EntryValue::Short(6))); // YCbCr
    if let Some(text) = description {
        entries.push(entry(270, EntryValue::Ascii(text.as_bytes().to_vec())));
    }
    entries.push(entry(322, EntryValue::Long(tile_width)));
    entries.push(entry(323, EntryValue::Long(tile_height)));
    entries.push(entry(324, EntryValue::Longs(offsets)));
    entries.push(entry(325, EntryValue::Longs(byte_counts)));
    if let Some(tables) = jpeg_tables {
        entries.push(entry(347, EntryValue::Undefined(tables.to_vec())));
    }
    entries.push(entry(530, EntryValue::Shorts(vec![2, 2])));
    entries
}

/// Entries for an untiled auxiliary image (macro or label).
pub fn auxiliary_entries(width: u32, height: u32, description: &str) -> Vec<TestEntry> {
    vec![
        entry(256, EntryValue::Long(width)),
        entry(257, EntryValue::Long(height)),
        entry(259, EntryValue::Short(7)),
        entry(262, EntryValue::Short(2)),
        entry(270, EntryValue::Ascii(description.as_bytes().to_vec())),
    ]
}

/// A three-level 512-tile pyramid plus macro and label images, in the
/// given byte order.
pub fn pyramid_slide(endian: Endian, bigtiff: bool) -> Vec<u8> {
    let tables: &[u8] = &[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0x01, 0xFF, 0xD9];
    TiffBuilder::new(endian, bigtiff)
        .add_ifd(level_entries(2048, 1536, 512, 512, None, None, Some(tables)))
        .add_ifd(level_entries(1024, 768, 512, 512, Some(1), None, Some(tables)))
        .add_ifd(level_entries(512, 384, 512, 512, Some(1), None, Some(tables)))
        .add_ifd(auxiliary_entries(640, 480, "Macro overview"))
        .add_ifd(auxiliary_entries(400, 400, "Label barcode"))
        .build()
}

// =============================================================================
// Opening helpers
// =============================================================================

/// Write the bytes to a temporary file and open it as a slide.
pub fn open_bytes(data: &[u8]) -> Result<Tiff, slidewire::TiffError> {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(data).expect("write temp file");
    file.flush().expect("flush temp file");
    Tiff::open(file.path())
}

// =============================================================================
// Wire helpers
// =============================================================================

/// Strip the HTTP response header from a serialised stream.
pub fn payload_of(stream: &[u8]) -> &[u8] {
    let position = stream
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("stream has an HTTP header");
    &stream[position + 4..]
}

/// One carved-up block: (type, index, body bytes).
pub type RawBlock = (u32, u32, Vec<u8>);

/// Split a (decompressed, headerless) payload into its framed blocks,
/// terminator included.
pub fn split_blocks(payload: &[u8]) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut position = 0;
    loop {
        let header = &payload[position..position + 16];
        let block_type = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let index = u32::from_le_bytes(header[4..8].try_into().unwrap());
        let length = u64::from_le_bytes(header[8..16].try_into().unwrap()) as usize;
        position += 16;
        let body = payload[position..position + length].to_vec();
        position += length;
        blocks.push((block_type, index, body));
        if block_type == slidewire::block_type::TERMINATOR {
            break;
        }
    }
    blocks
}

/// Reassemble blocks into a payload.
pub fn join_blocks(blocks: &[RawBlock]) -> Vec<u8> {
    let mut out = Vec::new();
    for (block_type, index, body) in blocks {
        out.extend(&block_type.to_le_bytes());
        out.extend(&index.to_le_bytes());
        out.extend(&(body.len() as u64).to_le_bytes());
        out.extend(body);
    }
    out
}

// =============================================================================
// Equality
// =============================================================================

/// Assert two slides agree on every wire-visible field: the header and
/// per-IFD scalars plus the four variable-length payloads.
pub fn assert_tiff_wire_eq(a: &Tiff, b: &Tiff) {
    assert_eq!(SerialHeader::from_tiff(a), SerialHeader::from_tiff(b));
    assert_eq!(a.ifds.len(), b.ifds.len());
    for (x, y) in a.ifds.iter().zip(&b.ifds) {
        assert_eq!(SerialIfd::from_ifd(x), SerialIfd::from_ifd(y));
        assert_eq!(x.tile_offsets, y.tile_offsets);
        assert_eq!(x.tile_byte_counts, y.tile_byte_counts);
        assert_eq!(x.image_description, y.image_description);
        assert_eq!(x.jpeg_tables, y.jpeg_tables);
    }
}
