//! Tile stores.
//!
//! - [`TileSink`]: the insert-only interface the pyramid walker writes to
//! - [`MbTilesStore`]: SQLite file with the MBTiles `tiles` table and a
//!   `tile_index` unique index built after the bulk load

mod mbtiles;
mod sink;

pub use mbtiles::MbTilesStore;
pub use sink::TileSink;
