use async_trait::async_trait;

use crate::error::SourceError;
use crate::tile::RawBlock;

/// One zoom level of an elevation pyramid, readable block by block.
///
/// Implemented by [`RasterLevel`](super::RasterLevel); the pyramid walker
/// only depends on this trait so tests can drive it with synthetic data.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Blocks per axis of the square level grid.
    fn tiles_per_axis(&self) -> u32;

    /// Read the raw block at `(column, row)`, row 0 being the top of the raster.
    async fn read_block(&self, column: u32, row: u32) -> Result<RawBlock, SourceError>;
}
