//! Little-endian TIFF writer for tests.
//!
//! Produces structurally complete files (directories, offsets, georeferencing
//! tags) with placeholder image blocks. Nothing here decodes pixels, so block
//! contents are filler bytes. Only depends on std so integration tests can
//! include it with `#[path]`.

#![allow(dead_code)]

use std::io;
use std::path::Path;

const TILE_SIZE: u32 = 256;
const BLOCK_LEN: u32 = 16;

const SHORT: u16 = 3;
const LONG: u16 = 4;
const ASCII: u16 = 2;
const DOUBLE: u16 = 12;

/// One directory in the fixture: main image or overview.
#[derive(Debug, Clone)]
pub struct FixtureLevel {
    pub width: u32,
    pub height: u32,
    pub tiled: bool,
    pub subfile_type: u32,
}

impl FixtureLevel {
    pub fn tiled(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiled: true,
            subfile_type: 0,
        }
    }

    pub fn strips(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiled: false,
            subfile_type: 0,
        }
    }

    fn block_count(&self) -> u32 {
        if self.tiled {
            self.width.div_ceil(TILE_SIZE) * self.height.div_ceil(TILE_SIZE)
        } else {
            1
        }
    }
}

/// Builder for a synthetic (Geo)TIFF.
#[derive(Debug, Clone)]
pub struct TiffFixture {
    /// Directories in chain order; the first is the main image
    pub levels: Vec<FixtureLevel>,
    pub datetime: Option<String>,
    pub copyright: Option<String>,
    /// Pixel size in x and y
    pub pixel_scale: Option<[f64; 2]>,
    /// Model coordinates of the upper-left corner
    pub origin: Option<[f64; 2]>,
    pub epsg: Option<u16>,
    pub nodata: Option<String>,
    pub bits_per_sample: u16,
    /// Write image blocks before the directories
    pub data_first: bool,
    /// Write image blocks main image first instead of smallest overview first
    pub blocks_main_first: bool,
    /// Physically place directories in reverse chain order
    pub ifds_reversed: bool,
}

impl TiffFixture {
    /// A tiled main image with one overview per decimation factor, laid out
    /// like a cloud-optimized GeoTIFF.
    pub fn cog(width: u32, height: u32, decimations: &[u32]) -> Self {
        let mut levels = vec![FixtureLevel::tiled(width, height)];
        for d in decimations {
            let mut level = FixtureLevel::tiled(width.div_ceil(*d), height.div_ceil(*d));
            level.subfile_type = 1;
            levels.push(level);
        }
        Self {
            levels,
            datetime: None,
            copyright: None,
            pixel_scale: None,
            origin: None,
            epsg: None,
            nodata: None,
            bits_per_sample: 8,
            data_first: false,
            blocks_main_first: false,
            ifds_reversed: false,
        }
    }

    /// A georeferenced single-band COG in the given projected CRS.
    pub fn georeferenced(width: u32, height: u32, epsg: u16) -> Self {
        let mut fixture = Self::cog(width, height, &[]);
        fixture.pixel_scale = Some([10.0, 10.0]);
        fixture.origin = Some([500_000.0, 4_600_000.0]);
        fixture.epsg = Some(epsg);
        fixture
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let count = self.levels.len();

        // Directory sizes do not depend on the offsets they contain, so size
        // them with placeholder offsets first.
        let ifd_sizes: Vec<u32> = (0..count)
            .map(|i| ifd_size(&self.entries(i, &vec![0; self.levels[i].block_count() as usize])))
            .collect();
        let data_sizes: Vec<u32> = self
            .levels
            .iter()
            .map(|l| l.block_count() * BLOCK_LEN)
            .collect();

        let ifd_order: Vec<usize> = if self.ifds_reversed {
            (0..count).rev().collect()
        } else {
            (0..count).collect()
        };
        let data_order: Vec<usize> = if self.blocks_main_first {
            (0..count).collect()
        } else {
            (0..count).rev().collect()
        };

        let mut ifd_offsets = vec![0u32; count];
        let mut data_offsets = vec![0u32; count];
        let mut pos = 8u32;

        let mut place_ifds = |pos: &mut u32| {
            for &i in &ifd_order {
                ifd_offsets[i] = *pos;
                *pos += ifd_sizes[i];
            }
        };
        let mut place_data = |pos: &mut u32| {
            for &i in &data_order {
                data_offsets[i] = *pos;
                *pos += data_sizes[i];
            }
        };

        if self.data_first {
            place_data(&mut pos);
            place_ifds(&mut pos);
        } else {
            place_ifds(&mut pos);
            place_data(&mut pos);
        }

        let mut out = vec![0u8; pos as usize];
        out[0..2].copy_from_slice(b"II");
        out[2..4].copy_from_slice(&42u16.to_le_bytes());
        out[4..8].copy_from_slice(&ifd_offsets[0].to_le_bytes());

        for i in 0..count {
            let blocks: Vec<u32> = (0..self.levels[i].block_count())
                .map(|b| data_offsets[i] + b * BLOCK_LEN)
                .collect();
            let next = if i + 1 < count { ifd_offsets[i + 1] } else { 0 };
            let bytes = encode_ifd(&self.entries(i, &blocks), ifd_offsets[i], next);
            let start = ifd_offsets[i] as usize;
            out[start..start + bytes.len()].copy_from_slice(&bytes);

            let data_start = data_offsets[i] as usize;
            let data_end = data_start + data_sizes[i] as usize;
            out[data_start..data_end].fill(0xAB);
        }

        out
    }

    fn entries(&self, index: usize, block_offsets: &[u32]) -> Vec<Entry> {
        let level = &self.levels[index];
        let is_main = index == 0;
        let mut entries = vec![
            Entry::longs(254, &[level.subfile_type]),
            Entry::longs(256, &[level.width]),
            Entry::longs(257, &[level.height]),
            Entry::shorts(258, &[self.bits_per_sample]),
            Entry::shorts(259, &[1]),
            Entry::shorts(262, &[1]),
            Entry::shorts(277, &[1]),
            Entry::shorts(339, &[1]),
        ];

        let byte_counts = vec![BLOCK_LEN; block_offsets.len()];
        if level.tiled {
            entries.push(Entry::shorts(322, &[TILE_SIZE as u16]));
            entries.push(Entry::shorts(323, &[TILE_SIZE as u16]));
            entries.push(Entry::longs(324, block_offsets));
            entries.push(Entry::longs(325, &byte_counts));
        } else {
            entries.push(Entry::longs(273, block_offsets));
            entries.push(Entry::longs(278, &[level.height]));
            entries.push(Entry::longs(279, &byte_counts));
        }

        if is_main {
            if let Some(datetime) = &self.datetime {
                entries.push(Entry::ascii(306, datetime));
            }
            if let Some(copyright) = &self.copyright {
                entries.push(Entry::ascii(33432, copyright));
            }
            if let Some([sx, sy]) = self.pixel_scale {
                entries.push(Entry::doubles(33550, &[sx, sy, 0.0]));
            }
            if let Some([x, y]) = self.origin {
                entries.push(Entry::doubles(33922, &[0.0, 0.0, 0.0, x, y, 0.0]));
            }
            if let Some(epsg) = self.epsg {
                let geographic = (4000..5000).contains(&epsg);
                let (model_type, crs_key) = if geographic { (2, 2048) } else { (1, 3072) };
                entries.push(Entry::shorts(
                    34735,
                    &[
                        1, 1, 0, 3, // header: version, revision, minor, key count
                        1024, 0, 1, model_type, // GTModelType
                        1025, 0, 1, 1, // GTRasterType: PixelIsArea
                        crs_key, 0, 1, epsg,
                    ],
                ));
            }
        }
        if let Some(nodata) = &self.nodata {
            entries.push(Entry::ascii(42113, nodata));
        }

        entries.sort_by_key(|e| e.tag);
        entries
    }
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn shorts(tag: u16, values: &[u16]) -> Self {
        Self {
            tag,
            field_type: SHORT,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn longs(tag: u16, values: &[u32]) -> Self {
        Self {
            tag,
            field_type: LONG,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn doubles(tag: u16, values: &[f64]) -> Self {
        Self {
            tag,
            field_type: DOUBLE,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn ascii(tag: u16, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        Self {
            tag,
            field_type: ASCII,
            count: data.len() as u32,
            data,
        }
    }

    fn overflow_len(&self) -> u32 {
        if self.data.len() <= 4 {
            0
        } else {
            (self.data.len() as u32).next_multiple_of(2)
        }
    }
}

fn ifd_size(entries: &[Entry]) -> u32 {
    let table = 2 + 12 * entries.len() as u32 + 4;
    table + entries.iter().map(Entry::overflow_len).sum::<u32>()
}

fn encode_ifd(entries: &[Entry], offset: u32, next: u32) -> Vec<u8> {
    let table_len = 2 + 12 * entries.len() as u32 + 4;
    let mut table = Vec::with_capacity(table_len as usize);
    let mut overflow = Vec::new();

    table.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        table.extend_from_slice(&entry.tag.to_le_bytes());
        table.extend_from_slice(&entry.field_type.to_le_bytes());
        table.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            table.extend_from_slice(&inline);
        } else {
            let at = offset + table_len + overflow.len() as u32;
            table.extend_from_slice(&at.to_le_bytes());
            overflow.extend_from_slice(&entry.data);
            if overflow.len() % 2 == 1 {
                overflow.push(0);
            }
        }
    }
    table.extend_from_slice(&next.to_le_bytes());
    table.extend_from_slice(&overflow);
    table
}
