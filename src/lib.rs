//! # dem-tiler
//!
//! Cuts a tiled, single-band Int16 GeoTIFF elevation pyramid into an MBTiles
//! store of compact terrain tiles.
//!
//! Every tile is a square grid of 16-bit samples. Tiles made only of the
//! no-data sentinel are skipped. The rest are delta-encoded over the
//! flattened row-major grid, written as little-endian `i16`, gzip-compressed
//! and stored under `(zoom, column, row)`.
//!
//! ## Architecture
//!
//! - [`io`] - Range-based reads of the source file
//! - [`mod@format`] - TIFF/BigTIFF parsing and pyramid discovery
//! - [`raster`] - Zoom-to-level mapping, geometry checks and block decoding
//! - [`tile`] - Tile coordinates, raw blocks and the delta + gzip codec
//! - [`store`] - The MBTiles SQLite sink
//! - [`pyramid`] - The level walker that ties the pieces together
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dem_tiler::{
//!     CodecConfig, ElevationRaster, LocalFileReader, MbTilesStore, PyramidConfig,
//!     PyramidWalker, TileCodec, ZoomSelection,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PyramidConfig::default();
//!     let reader = Arc::new(LocalFileReader::open("dem.tif").await?);
//!     let raster = ElevationRaster::open(reader, config).await?;
//!
//!     let mut store = MbTilesStore::create("dem.mbtiles")?;
//!     let codec = TileCodec::new(config.tile_size, config.no_data, CodecConfig::default());
//!     PyramidWalker::new(codec)
//!         .run(&raster, &ZoomSelection::All, &mut store)
//!         .await?;
//!     store.finalize()?;
//!     store.close()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod pyramid;
pub mod raster;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, CodecConfig, PyramidConfig, ZoomSelection};
pub use error::{CodecError, IoError, PipelineError, SourceError, StoreError, TiffError};
pub use format::tiff::{
    validate_ifd, ByteOrder, Compression, Ifd, IfdEntry, Predictor, PyramidLevel, TiffHeader,
    TiffPyramid, TileData,
};
pub use io::{LocalFileReader, RangeReader};
pub use pyramid::{LevelSummary, ProgressObserver, PyramidWalker, RunSummary};
pub use raster::{BlockSource, ElevationRaster, RasterLevel};
pub use store::{MbTilesStore, TileSink};
pub use tile::{RawBlock, TileCodec, TileCoord};
