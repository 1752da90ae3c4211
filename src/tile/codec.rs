//! Elevation tile codec.
//!
//! A tile is stored as the first-order difference of its samples taken along
//! the flattened row-major sequence, serialized as little-endian `i16` and
//! gzip-compressed. Neighbouring elevations are close, so the differences are
//! small and compress far better than the raw heights.
//!
//! ```text
//! out[0] = in[0]
//! out[i] = in[i] - in[i - 1]      (wrapping 16-bit arithmetic)
//! ```
//!
//! Row boundaries are not special: the first sample of a row is differenced
//! against the last sample of the previous row.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::config::CodecConfig;
use crate::error::CodecError;

use super::block::RawBlock;

/// Turns raw blocks into stored tile payloads and back.
#[derive(Debug, Clone, Copy)]
pub struct TileCodec {
    tile_size: u32,
    no_data: i16,
    compression: flate2::Compression,
}

impl TileCodec {
    pub fn new(tile_size: u32, no_data: i16, config: CodecConfig) -> Self {
        Self {
            tile_size,
            no_data,
            compression: flate2::Compression::new(config.compression_level),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn no_data(&self) -> i16 {
        self.no_data
    }

    fn samples_per_tile(&self) -> usize {
        self.tile_size as usize * self.tile_size as usize
    }

    /// Whether every sample of the block is the no-data sentinel.
    pub fn is_empty(&self, block: &RawBlock) -> bool {
        block.samples().iter().all(|&s| s == self.no_data)
    }

    /// Delta-transform and gzip a block.
    pub fn encode(&self, block: &RawBlock) -> Result<Bytes, CodecError> {
        let samples = block.samples();
        if samples.len() != self.samples_per_tile() {
            return Err(CodecError::SampleCount {
                expected: self.samples_per_tile(),
                actual: samples.len(),
            });
        }

        let mut raw = Vec::with_capacity(samples.len() * 2);
        for delta in delta_encode(samples) {
            raw.extend_from_slice(&delta.to_le_bytes());
        }

        let mut encoder = GzEncoder::new(Vec::new(), self.compression);
        encoder
            .write_all(&raw)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CodecError::Compression(e.to_string()))?;

        Ok(Bytes::from(compressed))
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(&self, payload: &[u8]) -> Result<RawBlock, CodecError> {
        let expected = self.samples_per_tile() * 2;

        // Read one byte past the expected length to detect oversized payloads
        let mut raw = Vec::with_capacity(expected);
        GzDecoder::new(payload)
            .take(expected as u64 + 1)
            .read_to_end(&mut raw)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;

        if raw.len() != expected {
            return Err(CodecError::ByteLength {
                expected,
                actual: raw.len(),
            });
        }

        let deltas: Vec<i16> = raw
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        RawBlock::new(self.tile_size, delta_decode(&deltas))
    }
}

/// First-order difference along the sequence, wrapping on overflow.
pub fn delta_encode(samples: &[i16]) -> Vec<i16> {
    let mut prev = 0i16;
    samples
        .iter()
        .map(|&s| {
            let d = s.wrapping_sub(prev);
            prev = s;
            d
        })
        .collect()
}

/// Running sum of deltas, wrapping on overflow.
pub fn delta_decode(deltas: &[i16]) -> Vec<i16> {
    let mut acc = 0i16;
    deltas
        .iter()
        .map(|&d| {
            acc = acc.wrapping_add(d);
            acc
        })
        .collect()
}
