//! TIFF parser for tiled elevation rasters.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values, tile samples included, follow this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. Global DEMs are usually BigTIFF.
//!
//! - **IFD (Image File Directory)**: Contains metadata and pointers to image data.
//!   An overviewed GeoTIFF has one IFD for the base image and one per overview.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod parser;
mod pyramid;
mod tags;
mod validation;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{PyramidLevel, TiffPyramid, TileData};
pub use tags::{Compression, FieldType, Predictor, TiffTag, SAMPLE_FORMAT_SIGNED, SUBFILE_MASK};
pub use validation::{inspect_ifd, validate_ifd, ValidationError, ValidationResult};
pub use values::{parse_u64_array, ValueReader};
