//! Tile blocks and the tile codec.
//!
//! - [`RawBlock`]: one tile of raw `i16` elevation samples read from the raster
//! - [`TileCoord`]: `(zoom, column, row)` address of a tile
//! - [`TileCodec`]: emptiness test, delta transform and gzip, plus the inverse

mod block;
mod codec;

pub use block::{RawBlock, TileCoord};
pub use codec::{delta_decode, delta_encode, TileCodec};
