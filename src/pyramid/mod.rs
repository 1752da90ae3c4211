//! Pyramid traversal.
//!
//! [`PyramidWalker`] connects a [`BlockSource`](crate::raster::BlockSource),
//! the [`TileCodec`](crate::tile::TileCodec) and a
//! [`TileSink`](crate::store::TileSink), reporting through an optional
//! [`ProgressObserver`] and returning [`LevelSummary`] / [`RunSummary`]
//! counters.

mod progress;
mod summary;
mod walker;

pub use progress::ProgressObserver;
pub use summary::{LevelSummary, RunSummary};
pub use walker::PyramidWalker;
