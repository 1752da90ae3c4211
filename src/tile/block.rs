use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Address of one tile in the pyramid and primary key of the tile store.
///
/// `row` counts from the top of the raster, as the source blocks do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub column: u32,
    pub row: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, column: u32, row: u32) -> Self {
        Self { zoom, column, row }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// One tile-sized block of elevation samples in row-major order.
///
/// Always holds exactly `tile_size * tile_size` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    tile_size: u32,
    samples: Vec<i16>,
}

impl RawBlock {
    /// Wrap `samples`, failing unless there are exactly `tile_size^2` of them.
    pub fn new(tile_size: u32, samples: Vec<i16>) -> Result<Self, CodecError> {
        let expected = tile_size as usize * tile_size as usize;
        if samples.len() != expected {
            return Err(CodecError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { tile_size, samples })
    }

    /// A block with every sample set to `value`.
    pub fn filled(tile_size: u32, value: i16) -> Self {
        Self {
            tile_size,
            samples: vec![value; tile_size as usize * tile_size as usize],
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Sample at pixel `(x, y)` of the block.
    pub fn get(&self, x: u32, y: u32) -> Option<i16> {
        if x >= self.tile_size || y >= self.tile_size {
            return None;
        }
        self.samples
            .get(y as usize * self.tile_size as usize + x as usize)
            .copied()
    }

    /// Size of the block serialized as 16-bit samples.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }
}
