//! Block reading from an elevation pyramid.
//!
//! [`ElevationRaster`] validates the file once when opened; each
//! [`RasterLevel`] then serves raw `tile_size` square blocks of one zoom,
//! with TIFF storage compression and predictor already undone.

mod decode;
mod elevation;
mod source;

pub use elevation::{ElevationRaster, RasterLevel};
pub use source::BlockSource;
