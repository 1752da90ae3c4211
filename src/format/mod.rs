//! Raster file formats.
//!
//! Only tiled TIFF/BigTIFF is supported, which covers GeoTIFFs with internal
//! overviews as written by GDAL.

pub mod tiff;
