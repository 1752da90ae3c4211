//! Test utilities for integration tests.
//!
//! This module provides an in-memory range reader, a builder for tiled
//! Int16 elevation TIFFs with internal overviews, and a recording tile sink.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::ZlibEncoder;

use dem_tiler::error::{IoError, StoreError};
use dem_tiler::io::RangeReader;
use dem_tiler::store::TileSink;
use dem_tiler::tile::TileCoord;

pub const NO_DATA: i16 = -512;

// =============================================================================
// In-memory Range Reader
// =============================================================================

/// A range reader over a byte buffer that counts read requests.
pub struct MemoryReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RangeReader for MemoryReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Recording Tile Sink
// =============================================================================

/// Records inserts in order. Like the SQLite store, duplicate keys are
/// accepted on insert and only reported by [`MemoryTileStore::finalize`].
#[derive(Default)]
pub struct MemoryTileStore {
    pub tiles: Vec<(TileCoord, Vec<u8>)>,
    finalized: bool,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coords(&self) -> Vec<TileCoord> {
        self.tiles.iter().map(|(coord, _)| *coord).collect()
    }

    pub fn finalize(&mut self) -> Result<(), StoreError> {
        if self.finalized {
            return Err(StoreError::AlreadyFinalized);
        }
        self.finalized = true;

        let mut seen = HashSet::new();
        for (coord, _) in &self.tiles {
            if !seen.insert(*coord) {
                return Err(StoreError::DuplicateKey(coord.to_string()));
            }
        }
        Ok(())
    }
}

impl TileSink for MemoryTileStore {
    fn insert(&mut self, coord: TileCoord, data: &[u8]) -> Result<(), StoreError> {
        if self.finalized {
            return Err(StoreError::AlreadyFinalized);
        }
        self.tiles.push((coord, data.to_vec()));
        Ok(())
    }
}

// =============================================================================
// Elevation TIFF Builder
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_LONG8: u16 = 16;

type SampleFn = Box<dyn Fn(u8, u32, u32) -> i16>;

/// Builds a tiled elevation TIFF laid out like a GDAL pyramid: the base image
/// for `max_zoom` first, then one overview per lower zoom, largest first.
///
/// Samples come from a function of `(zoom, x, y)` in the pixel space of the
/// level; by default every sample is [`NO_DATA`].
pub struct DemTiffBuilder {
    max_zoom: u8,
    tile_size: u32,
    byte_order: ByteOrderType,
    bigtiff: bool,
    compression: u16,
    predictor: u16,
    bits_per_sample: u16,
    sample_format: u16,
    samples_per_pixel: u16,
    overview_count: Option<u8>,
    nodata: Option<String>,
    sparse: bool,
    mask: bool,
    sample: SampleFn,
}

impl DemTiffBuilder {
    pub fn new(max_zoom: u8, tile_size: u32) -> Self {
        Self {
            max_zoom,
            tile_size,
            byte_order: ByteOrderType::LittleEndian,
            bigtiff: false,
            compression: 1,
            predictor: 1,
            bits_per_sample: 16,
            sample_format: 2,
            samples_per_pixel: 1,
            overview_count: None,
            nodata: None,
            sparse: false,
            mask: false,
            sample: Box::new(|_, _, _| NO_DATA),
        }
    }

    pub fn with_samples(mut self, sample: impl Fn(u8, u32, u32) -> i16 + 'static) -> Self {
        self.sample = Box::new(sample);
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, bigtiff: bool) -> Self {
        self.bigtiff = bigtiff;
        self
    }

    /// 1 = none, 5 = LZW, 8 / 32946 = Deflate.
    pub fn with_compression(mut self, compression: u16) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_predictor(mut self, predictor: u16) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_sample_type(mut self, bits_per_sample: u16, sample_format: u16) -> Self {
        self.bits_per_sample = bits_per_sample;
        self.sample_format = sample_format;
        self
    }

    pub fn with_samples_per_pixel(mut self, samples_per_pixel: u16) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    /// Write only the `count` largest overviews.
    pub fn with_overview_count(mut self, count: u8) -> Self {
        self.overview_count = Some(count);
        self
    }

    /// Attach a GDAL_NODATA string to the base image.
    pub fn with_nodata(mut self, nodata: impl Into<String>) -> Self {
        self.nodata = Some(nodata.into());
        self
    }

    /// Leave tiles made only of [`NO_DATA`] unwritten (zero byte count).
    pub fn with_sparse_tiles(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    /// Add a mask IFD right after the base image.
    pub fn with_mask(mut self, mask: bool) -> Self {
        self.mask = mask;
        self
    }

    /// Expected sample of the level serving `zoom`.
    pub fn sample(&self, zoom: u8, x: u32, y: u32) -> i16 {
        (self.sample)(zoom, x, y)
    }

    /// Expected row-major samples of tile `(column, row)` at `zoom`.
    pub fn tile_samples(&self, zoom: u8, column: u32, row: u32) -> Vec<i16> {
        let ts = self.tile_size;
        let mut samples = Vec::with_capacity((ts * ts) as usize);
        for y in 0..ts {
            for x in 0..ts {
                samples.push(self.sample(zoom, column * ts + x, row * ts + y));
            }
        }
        samples
    }

    /// Build the TIFF file data.
    pub fn build(&self) -> Vec<u8> {
        let mut w = Writer {
            data: Vec::new(),
            byte_order: self.byte_order,
            bigtiff: self.bigtiff,
        };

        // Header
        match self.byte_order {
            ByteOrderType::LittleEndian => w.data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => w.data.extend_from_slice(b"MM"),
        }
        let mut next_pointer = if self.bigtiff {
            w.put_u16(43);
            w.put_u16(8);
            w.put_u16(0);
            let pos = w.data.len();
            w.put_u64(0);
            pos
        } else {
            w.put_u16(42);
            let pos = w.data.len();
            w.put_u32(0);
            pos
        };

        let overviews = self.overview_count.unwrap_or(self.max_zoom).min(self.max_zoom);
        let mut zooms = vec![self.max_zoom];
        zooms.extend((0..self.max_zoom).rev().take(overviews as usize));

        for (index, &zoom) in zooms.iter().enumerate() {
            let entries = self.level_entries(&mut w, zoom, index > 0);
            next_pointer = w.write_ifd(entries, next_pointer);

            if index == 0 && self.mask {
                let side = (1u64 << self.max_zoom) * self.tile_size as u64;
                let entries = vec![
                    w.entry_u32(254, TYPE_LONG, 4),
                    w.entry_u32(256, TYPE_LONG, side as u32),
                    w.entry_u32(257, TYPE_LONG, side as u32),
                    w.entry_u32(258, TYPE_SHORT, 1),
                ];
                next_pointer = w.write_ifd(entries, next_pointer);
            }
        }

        w.data
    }

    /// Write the tiles of `zoom` and return the entries of its IFD.
    fn level_entries(&self, w: &mut Writer, zoom: u8, overview: bool) -> Vec<Entry> {
        let tiles = 1u32 << zoom;
        let side = tiles * self.tile_size;

        let mut offsets = Vec::new();
        let mut byte_counts = Vec::new();
        for row in 0..tiles {
            for column in 0..tiles {
                let samples = self.tile_samples(zoom, column, row);
                if self.sparse && samples.iter().all(|&s| s == NO_DATA) {
                    offsets.push(0u64);
                    byte_counts.push(0u64);
                    continue;
                }
                let stored = self.encode_tile(samples);
                offsets.push(w.data.len() as u64);
                byte_counts.push(stored.len() as u64);
                w.data.extend_from_slice(&stored);
            }
        }

        let mut entries = Vec::new();
        if overview {
            entries.push(w.entry_u32(254, TYPE_LONG, 1));
        }
        entries.push(w.entry_u32(256, TYPE_LONG, side));
        entries.push(w.entry_u32(257, TYPE_LONG, side));
        entries.push(w.entry_u32(258, TYPE_SHORT, self.bits_per_sample as u32));
        entries.push(w.entry_u32(259, TYPE_SHORT, self.compression as u32));
        entries.push(w.entry_u32(262, TYPE_SHORT, 1));
        entries.push(w.entry_u32(277, TYPE_SHORT, self.samples_per_pixel as u32));
        entries.push(w.entry_u32(284, TYPE_SHORT, 1));
        if self.predictor != 1 {
            entries.push(w.entry_u32(317, TYPE_SHORT, self.predictor as u32));
        }
        entries.push(w.entry_u32(322, TYPE_LONG, self.tile_size));
        entries.push(w.entry_u32(323, TYPE_LONG, self.tile_size));
        entries.push(w.entry_offsets(324, &offsets));
        entries.push(w.entry_offsets(325, &byte_counts));
        entries.push(w.entry_u32(339, TYPE_SHORT, self.sample_format as u32));
        if !overview {
            if let Some(nodata) = &self.nodata {
                let mut text = nodata.as_bytes().to_vec();
                text.push(0);
                entries.push(Entry {
                    tag: 42113,
                    field_type: TYPE_ASCII,
                    count: text.len() as u64,
                    value: text,
                });
            }
        }
        entries
    }

    fn encode_tile(&self, mut samples: Vec<i16>) -> Vec<u8> {
        if self.predictor == 2 {
            for row in samples.chunks_exact_mut(self.tile_size as usize) {
                for x in (1..row.len()).rev() {
                    row[x] = row[x].wrapping_sub(row[x - 1]);
                }
            }
        }

        let raw: Vec<u8> = samples
            .iter()
            .flat_map(|s| match self.byte_order {
                ByteOrderType::LittleEndian => s.to_le_bytes(),
                ByteOrderType::BigEndian => s.to_be_bytes(),
            })
            .collect();

        match self.compression {
            5 => weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
                .encode(&raw)
                .unwrap(),
            8 | 32946 => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&raw).unwrap();
                encoder.finish().unwrap()
            }
            _ => raw,
        }
    }
}

struct Entry {
    tag: u16,
    field_type: u16,
    count: u64,
    /// Encoded value in file byte order
    value: Vec<u8>,
}

struct Writer {
    data: Vec<u8>,
    byte_order: ByteOrderType,
    bigtiff: bool,
}

impl Writer {
    fn encode(&self, value: u64, size: usize) -> Vec<u8> {
        let bytes = match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        };
        match self.byte_order {
            ByteOrderType::LittleEndian => bytes[..size].to_vec(),
            ByteOrderType::BigEndian => bytes[8 - size..].to_vec(),
        }
    }

    fn put_u16(&mut self, value: u16) {
        let bytes = self.encode(value as u64, 2);
        self.data.extend(bytes);
    }

    fn put_u32(&mut self, value: u32) {
        let bytes = self.encode(value as u64, 4);
        self.data.extend(bytes);
    }

    fn put_u64(&mut self, value: u64) {
        let bytes = self.encode(value, 8);
        self.data.extend(bytes);
    }

    fn entry_u32(&self, tag: u16, field_type: u16, value: u32) -> Entry {
        let size = if field_type == TYPE_SHORT { 2 } else { 4 };
        Entry {
            tag,
            field_type,
            count: 1,
            value: self.encode(value as u64, size),
        }
    }

    /// TileOffsets / TileByteCounts as Long, or Long8 in BigTIFF.
    fn entry_offsets(&self, tag: u16, values: &[u64]) -> Entry {
        let (field_type, size) = if self.bigtiff {
            (TYPE_LONG8, 8)
        } else {
            (TYPE_LONG, 4)
        };
        Entry {
            tag,
            field_type,
            count: values.len() as u64,
            value: values.iter().flat_map(|&v| self.encode(v, size)).collect(),
        }
    }

    fn align(&mut self) {
        if self.data.len() % 2 != 0 {
            self.data.push(0);
        }
    }

    /// Append an IFD, link it from `pointer_pos`, and return the position of
    /// its own next-IFD pointer.
    fn write_ifd(&mut self, mut entries: Vec<Entry>, pointer_pos: usize) -> usize {
        entries.sort_by_key(|e| e.tag);
        let inline = if self.bigtiff { 8 } else { 4 };

        // Out-of-line values go before the IFD
        let mut value_fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.value.len() <= inline {
                let mut field = entry.value.clone();
                field.resize(inline, 0);
                value_fields.push(field);
            } else {
                self.align();
                let offset = self.data.len() as u64;
                self.data.extend_from_slice(&entry.value);
                value_fields.push(self.encode(offset, inline));
            }
        }

        self.align();
        let ifd_offset = self.data.len() as u64;
        let pointer = self.encode(ifd_offset, inline);
        self.data[pointer_pos..pointer_pos + inline].copy_from_slice(&pointer);

        if self.bigtiff {
            self.put_u64(entries.len() as u64);
        } else {
            self.put_u16(entries.len() as u16);
        }
        for (entry, field) in entries.iter().zip(value_fields) {
            self.put_u16(entry.tag);
            self.put_u16(entry.field_type);
            if self.bigtiff {
                self.put_u64(entry.count);
            } else {
                self.put_u32(entry.count as u32);
            }
            self.data.extend(field);
        }

        let next_pos = self.data.len();
        if self.bigtiff {
            self.put_u64(0);
        } else {
            self.put_u32(0);
        }
        next_pos
    }
}

// =============================================================================
// Sample Patterns
// =============================================================================

/// A sample pattern that differs per zoom and per pixel, never [`NO_DATA`].
pub fn zoom_gradient(zoom: u8, x: u32, y: u32) -> i16 {
    zoom as i16 * 1000 + ((x * 3 + y * 7) % 500) as i16
}
