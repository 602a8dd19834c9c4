//! TIFF and BigTIFF image file directory reader.
//!
//! Reads the header and the full IFD chain of a TIFF file without decoding
//! any pixel data. Tag values are decoded eagerly; the directory offsets are
//! kept because the COG check depends on the physical layout.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use super::RasterError;

pub const TAG_NEW_SUBFILE_TYPE: u16 = 254;
pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_BITS_PER_SAMPLE: u16 = 258;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub const TAG_DATETIME: u16 = 306;
pub const TAG_TILE_WIDTH: u16 = 322;
pub const TAG_TILE_LENGTH: u16 = 323;
pub const TAG_TILE_OFFSETS: u16 = 324;
pub const TAG_SAMPLE_FORMAT: u16 = 339;
pub const TAG_COPYRIGHT: u16 = 33432;
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GDAL_NODATA: u16 = 42113;

/// Upper bound on directories followed in one file.
const MAX_DIRECTORIES: usize = 1024;

/// Upper bound on entries in one directory.
const MAX_ENTRIES: u64 = 4096;

/// Upper bound on the decoded size of a single tag value.
const MAX_TAG_BYTES: u64 = 64 * 1024 * 1024;

/// Upper bound on SamplesPerPixel, the range of the tag's SHORT type.
const MAX_SAMPLES_PER_PIXEL: u64 = u16::MAX as u64;

/// Byte order declared in the TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, b: &[u8]) -> u16 {
        let a = [b[0], b[1]];
        match self {
            Self::Little => u16::from_le_bytes(a),
            Self::Big => u16::from_be_bytes(a),
        }
    }

    fn u32(self, b: &[u8]) -> u32 {
        let a = [b[0], b[1], b[2], b[3]];
        match self {
            Self::Little => u32::from_le_bytes(a),
            Self::Big => u32::from_be_bytes(a),
        }
    }

    fn u64(self, b: &[u8]) -> u64 {
        let a = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        match self {
            Self::Little => u64::from_le_bytes(a),
            Self::Big => u64::from_be_bytes(a),
        }
    }
}

/// Classic TIFF (32-bit offsets) or BigTIFF (64-bit offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffVariant {
    Classic,
    Big,
}

impl TiffVariant {
    fn count_size(self) -> usize {
        match self {
            Self::Classic => 2,
            Self::Big => 8,
        }
    }

    fn entry_size(self) -> usize {
        match self {
            Self::Classic => 12,
            Self::Big => 20,
        }
    }

    fn offset_size(self) -> usize {
        match self {
            Self::Classic => 4,
            Self::Big => 8,
        }
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Unsigned(Vec<u64>),
    Signed(Vec<i64>),
    Float(Vec<f64>),
    Ascii(String),
    Undefined(Vec<u8>),
}

impl TagValue {
    /// First value as an unsigned integer, if the tag is integral.
    pub fn first_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => v.first().copied(),
            Self::Signed(v) => v.first().and_then(|x| u64::try_from(*x).ok()),
            _ => None,
        }
    }

    /// All values converted to floating point.
    pub fn to_f64s(&self) -> Vec<f64> {
        match self {
            Self::Unsigned(v) => v.iter().map(|x| *x as f64).collect(),
            Self::Signed(v) => v.iter().map(|x| *x as f64).collect(),
            Self::Float(v) => v.clone(),
            Self::Ascii(_) | Self::Undefined(_) => Vec::new(),
        }
    }

    /// All values as unsigned integers.
    pub fn to_u64s(&self) -> Vec<u64> {
        match self {
            Self::Unsigned(v) => v.clone(),
            Self::Signed(v) => v.iter().filter_map(|x| u64::try_from(*x).ok()).collect(),
            _ => Vec::new(),
        }
    }

    /// String value of an ASCII tag.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Ascii(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// One image file directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    /// Byte offset of the directory within the file
    pub offset: u64,
    tags: BTreeMap<u16, TagValue>,
}

impl Directory {
    /// Returns a tag value by tag number.
    pub fn tag(&self, tag: u16) -> Option<&TagValue> {
        self.tags.get(&tag)
    }

    /// Image width in pixels.
    pub fn width(&self) -> u64 {
        self.tag(TAG_IMAGE_WIDTH)
            .and_then(TagValue::first_u64)
            .unwrap_or(0)
    }

    /// Image height in pixels.
    pub fn height(&self) -> u64 {
        self.tag(TAG_IMAGE_LENGTH)
            .and_then(TagValue::first_u64)
            .unwrap_or(0)
    }

    /// Whether the image data is organized in tiles rather than strips.
    pub fn is_tiled(&self) -> bool {
        self.tags.contains_key(&TAG_TILE_WIDTH)
    }

    /// Offset of the first tile or strip, 0 when absent or sparse.
    pub fn first_block_offset(&self) -> u64 {
        let tag = if self.is_tiled() {
            TAG_TILE_OFFSETS
        } else {
            TAG_STRIP_OFFSETS
        };
        self.tag(tag).and_then(TagValue::first_u64).unwrap_or(0)
    }

    fn subfile_type(&self) -> u64 {
        self.tag(TAG_NEW_SUBFILE_TYPE)
            .and_then(TagValue::first_u64)
            .unwrap_or(0)
    }

    /// Whether the directory is a reduced-resolution copy of the main image.
    pub fn is_reduced_resolution(&self) -> bool {
        self.subfile_type() & 1 == 1
    }

    /// Whether the directory holds a transparency mask.
    pub fn is_mask(&self) -> bool {
        self.subfile_type() & 4 == 4
    }

    /// Number of samples per pixel (bands).
    pub fn samples_per_pixel(&self) -> u64 {
        self.tag(TAG_SAMPLES_PER_PIXEL)
            .and_then(TagValue::first_u64)
            .unwrap_or(1)
    }
}

/// A parsed TIFF file: header information plus every directory in chain order.
#[derive(Debug, Clone)]
pub struct TiffFile {
    pub byte_order: ByteOrder,
    pub variant: TiffVariant,
    directories: Vec<Directory>,
}

impl TiffFile {
    /// Opens and parses the file at `path`.
    ///
    /// The file handle is dropped before this returns, on every path.
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Parses a TIFF from any seekable reader.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, RasterError> {
        let mut header = [0u8; 8];
        read_exact_or(reader, &mut header, RasterError::NotTiff)?;

        let byte_order = match &header[0..2] {
            b"II" => ByteOrder::Little,
            b"MM" => ByteOrder::Big,
            _ => return Err(RasterError::NotTiff),
        };

        let (variant, first_offset) = match byte_order.u16(&header[2..4]) {
            42 => (TiffVariant::Classic, byte_order.u32(&header[4..8]) as u64),
            43 => {
                if byte_order.u16(&header[4..6]) != 8 {
                    return Err(RasterError::Malformed(
                        "BigTIFF offset size must be 8".to_string(),
                    ));
                }
                let mut first = [0u8; 8];
                read_exact_or(reader, &mut first, RasterError::NotTiff)?;
                (TiffVariant::Big, byte_order.u64(&first))
            }
            _ => return Err(RasterError::NotTiff),
        };

        let mut directories = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = first_offset;

        while offset != 0 {
            if !seen.insert(offset) {
                return Err(RasterError::Malformed(format!(
                    "directory chain loops back to offset {}",
                    offset
                )));
            }
            if directories.len() >= MAX_DIRECTORIES {
                return Err(RasterError::Malformed(format!(
                    "more than {} directories",
                    MAX_DIRECTORIES
                )));
            }
            let (directory, next) = read_directory(reader, byte_order, variant, offset)?;
            directories.push(directory);
            offset = next;
        }

        if directories.is_empty() {
            return Err(RasterError::Malformed("no image directory".to_string()));
        }

        Ok(Self {
            byte_order,
            variant,
            directories,
        })
    }

    /// The full-resolution image directory.
    pub fn main_image(&self) -> &Directory {
        &self.directories[0]
    }

    /// Reduced-resolution directories in file order, masks excluded.
    pub fn overviews(&self) -> Vec<&Directory> {
        self.directories
            .iter()
            .skip(1)
            .filter(|d| d.is_reduced_resolution() && !d.is_mask())
            .collect()
    }

    /// Every directory in chain order.
    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }
}

fn read_exact_or<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    on_eof: RasterError,
) -> Result<(), RasterError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(on_eof),
        Err(e) => Err(RasterError::Io(e)),
    }
}

fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> Result<Vec<u8>, RasterError> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    read_exact_or(
        reader,
        &mut buf,
        RasterError::Malformed(format!("truncated read of {} bytes at {}", len, offset)),
    )?;
    Ok(buf)
}

/// Size in bytes of one element of a TIFF field type.
fn type_size(field_type: u16) -> Option<u64> {
    match field_type {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 | 13 => Some(4),
        5 | 10 | 12 | 16 | 17 | 18 => Some(8),
        _ => None,
    }
}

fn read_directory<R: Read + Seek>(
    reader: &mut R,
    order: ByteOrder,
    variant: TiffVariant,
    offset: u64,
) -> Result<(Directory, u64), RasterError> {
    let count_bytes = read_at(reader, offset, variant.count_size())?;
    let count = match variant {
        TiffVariant::Classic => order.u16(&count_bytes) as u64,
        TiffVariant::Big => order.u64(&count_bytes),
    };
    if count > MAX_ENTRIES {
        return Err(RasterError::Malformed(format!(
            "directory at {} declares {} entries",
            offset, count
        )));
    }

    let entries_len = count as usize * variant.entry_size();
    let body = read_at(
        reader,
        offset + variant.count_size() as u64,
        entries_len + variant.offset_size(),
    )?;

    let next_field = &body[entries_len..];
    let next = match variant {
        TiffVariant::Classic => order.u32(next_field) as u64,
        TiffVariant::Big => order.u64(next_field),
    };

    let inline_capacity = variant.offset_size() as u64;
    let mut tags = BTreeMap::new();

    for entry in body[..entries_len].chunks_exact(variant.entry_size()) {
        let tag = order.u16(&entry[0..2]);
        let field_type = order.u16(&entry[2..4]);
        let (value_count, value_field) = match variant {
            TiffVariant::Classic => (order.u32(&entry[4..8]) as u64, &entry[8..12]),
            TiffVariant::Big => (order.u64(&entry[4..12]), &entry[12..20]),
        };

        // Unknown field types are skipped, as the TIFF spec requires.
        let Some(element_size) = type_size(field_type) else {
            continue;
        };

        let total = value_count
            .checked_mul(element_size)
            .filter(|t| *t <= MAX_TAG_BYTES)
            .ok_or_else(|| {
                RasterError::Malformed(format!("tag {} value too large", tag))
            })?;

        let bytes = if total <= inline_capacity {
            value_field[..total as usize].to_vec()
        } else {
            let value_offset = match variant {
                TiffVariant::Classic => order.u32(value_field) as u64,
                TiffVariant::Big => order.u64(value_field),
            };
            read_at(reader, value_offset, total as usize)?
        };

        tags.insert(tag, decode_value(order, field_type, &bytes));
    }

    let directory = Directory { offset, tags };
    if directory.samples_per_pixel() > MAX_SAMPLES_PER_PIXEL {
        return Err(RasterError::Malformed(format!(
            "directory at {} declares {} samples per pixel",
            offset,
            directory.samples_per_pixel()
        )));
    }

    Ok((directory, next))
}

fn decode_value(order: ByteOrder, field_type: u16, bytes: &[u8]) -> TagValue {
    match field_type {
        1 => TagValue::Unsigned(bytes.iter().map(|b| *b as u64).collect()),
        2 => {
            let text = String::from_utf8_lossy(bytes);
            TagValue::Ascii(text.trim_end_matches('\0').to_string())
        }
        3 => TagValue::Unsigned(bytes.chunks_exact(2).map(|c| order.u16(c) as u64).collect()),
        4 | 13 => TagValue::Unsigned(bytes.chunks_exact(4).map(|c| order.u32(c) as u64).collect()),
        16 | 18 => TagValue::Unsigned(bytes.chunks_exact(8).map(|c| order.u64(c)).collect()),
        6 => TagValue::Signed(bytes.iter().map(|b| *b as i8 as i64).collect()),
        8 => TagValue::Signed(
            bytes
                .chunks_exact(2)
                .map(|c| order.u16(c) as i16 as i64)
                .collect(),
        ),
        9 => TagValue::Signed(
            bytes
                .chunks_exact(4)
                .map(|c| order.u32(c) as i32 as i64)
                .collect(),
        ),
        17 => TagValue::Signed(bytes.chunks_exact(8).map(|c| order.u64(c) as i64).collect()),
        5 => TagValue::Float(
            bytes
                .chunks_exact(8)
                .map(|c| ratio(order.u32(&c[0..4]) as f64, order.u32(&c[4..8]) as f64))
                .collect(),
        ),
        10 => TagValue::Float(
            bytes
                .chunks_exact(8)
                .map(|c| {
                    ratio(
                        order.u32(&c[0..4]) as i32 as f64,
                        order.u32(&c[4..8]) as i32 as f64,
                    )
                })
                .collect(),
        ),
        11 => TagValue::Float(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_bits(order.u32(c)) as f64)
                .collect(),
        ),
        12 => TagValue::Float(
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_bits(order.u64(c)))
                .collect(),
        ),
        _ => TagValue::Undefined(bytes.to_vec()),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
