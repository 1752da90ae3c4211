use crate::error::StoreError;
use crate::tile::TileCoord;

/// Destination of encoded tiles.
///
/// Inserts arrive in row-major order per level, levels in ascending zoom.
/// Key uniqueness is the implementation's concern; a sink may defer the
/// check until loading is complete.
pub trait TileSink {
    fn insert(&mut self, coord: TileCoord, data: &[u8]) -> Result<(), StoreError>;
}
