//! Identification of the base image and its overviews.
//!
//! A GDAL-written elevation GeoTIFF holds one IFD for the full-resolution
//! image followed by one IFD per internal overview, and optionally a mask
//! IFD next to each of them. Masks are dropped and the remaining images are
//! ordered by area, so index 0 is the base image and index `i` is overview
//! `i - 1`.

use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::tags::{TiffTag, SUBFILE_MASK};
use super::validation::validate_ifd;
use super::values::ValueReader;

/// Maximum number of IFDs followed along the chain.
const MAX_IFDS: usize = 256;

// =============================================================================
// PyramidLevel
// =============================================================================

/// One image of the pyramid, as described by its IFD.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Position of the IFD in the file's chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,

    /// Tiles per row
    pub tiles_x: u32,

    /// Tiles per column
    pub tiles_y: u32,

    pub compression: u16,
    pub predictor: u16,
    pub bits_per_sample: u16,
    pub sample_format: u16,
    pub samples_per_pixel: u32,

    pub tile_offsets_entry: IfdEntry,
    pub tile_byte_counts_entry: IfdEntry,
}

impl PyramidLevel {
    /// Build a level from a validated tiled IFD.
    fn from_ifd(ifd: &Ifd, ifd_index: usize, header: &TiffHeader) -> Result<Self, TiffError> {
        let bo = header.byte_order;

        let width = ifd
            .image_width(bo)
            .ok_or(TiffError::MissingTag("ImageWidth"))?;
        let height = ifd
            .image_height(bo)
            .ok_or(TiffError::MissingTag("ImageLength"))?;
        let tile_width = ifd
            .tile_width(bo)
            .ok_or(TiffError::MissingTag("TileWidth"))?;
        let tile_height = ifd
            .tile_height(bo)
            .ok_or(TiffError::MissingTag("TileLength"))?;

        if tile_width == 0 || tile_height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "TileWidth",
                message: format!("zero tile size {}x{}", tile_width, tile_height),
            });
        }

        let tile_offsets_entry = ifd
            .get_entry_by_tag(TiffTag::TileOffsets)
            .cloned()
            .ok_or(TiffError::MissingTag("TileOffsets"))?;
        let tile_byte_counts_entry = ifd
            .get_entry_by_tag(TiffTag::TileByteCounts)
            .cloned()
            .ok_or(TiffError::MissingTag("TileByteCounts"))?;

        Ok(PyramidLevel {
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            compression: ifd.compression(bo).unwrap_or(1),
            predictor: ifd.predictor(bo),
            bits_per_sample: ifd.bits_per_sample(bo),
            sample_format: ifd.sample_format(bo),
            samples_per_pixel: ifd.samples_per_pixel(bo),
            tile_offsets_entry,
            tile_byte_counts_entry,
        })
    }

    /// Total number of tiles in the level.
    pub fn tile_count(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64
    }

    /// Linear tile index for a tile coordinate, row-major.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<usize> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y as usize * self.tiles_x as usize + tile_x as usize)
    }

    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// The images of a tiled TIFF, largest first.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,

    /// Base image followed by overviews in decreasing size
    pub levels: Vec<PyramidLevel>,

    /// GDAL_NODATA entry of the base image, if any
    pub nodata_entry: Option<IfdEntry>,
}

impl TiffPyramid {
    /// Read the header and IFD chain and identify the pyramid images.
    pub async fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = BIGTIFF_HEADER_SIZE.min(reader.size() as usize);
        if header_len < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: reader.size(),
            });
        }
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header).await?;
        Self::build(header, ifds)
    }

    /// Follow the next-IFD chain from the first IFD.
    async fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            if ifds.len() >= MAX_IFDS {
                return Err(TiffError::InvalidIfdOffset(offset));
            }
            if offset >= reader.size() {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size()).await?;
            let entry_count = Ifd::entry_count(&count_bytes, header)?;

            let ifd_size = Ifd::calculate_size(entry_count, header);
            let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    fn build(header: TiffHeader, ifds: Vec<Ifd>) -> Result<Self, TiffError> {
        let bo = header.byte_order;
        let mut levels = Vec::new();

        for (ifd_index, ifd) in ifds.iter().enumerate() {
            if ifd.new_subfile_type(bo) & SUBFILE_MASK != 0 {
                debug!(ifd_index, "Skipping mask IFD");
                continue;
            }
            validate_ifd(ifd, ifd_index, bo)?;
            levels.push(PyramidLevel::from_ifd(ifd, ifd_index, &header)?);
        }

        if levels.is_empty() {
            return Err(TiffError::MissingTag("ImageWidth"));
        }

        // Stable sort keeps file order for equal areas
        levels.sort_by_key(|level| std::cmp::Reverse(level.area()));

        let base_ifd = levels[0].ifd_index;
        let nodata_entry = ifds[base_ifd]
            .get_entry_by_tag(TiffTag::GdalNoData)
            .cloned();

        Ok(TiffPyramid {
            header,
            levels,
            nodata_entry,
        })
    }

    /// The full-resolution image.
    pub fn base(&self) -> &PyramidLevel {
        &self.levels[0]
    }

    /// Reduced-resolution images, largest first.
    pub fn overviews(&self) -> &[PyramidLevel] {
        &self.levels[1..]
    }

    /// Read the GDAL_NODATA string of the base image.
    pub async fn read_nodata<R: RangeReader>(
        &self,
        reader: &R,
    ) -> Result<Option<String>, TiffError> {
        match &self.nodata_entry {
            Some(entry) => {
                let values = ValueReader::new(reader, &self.header);
                Ok(Some(values.read_string(entry).await?))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// TileData
// =============================================================================

/// Tile location tables of one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData {
    /// Byte offset of each tile, row-major
    pub offsets: Vec<u64>,

    /// Stored size of each tile; 0 marks a sparse tile
    pub byte_counts: Vec<u64>,
}

impl TileData {
    /// Load the TileOffsets and TileByteCounts arrays of a level.
    pub async fn load<R: RangeReader>(
        reader: &R,
        level: &PyramidLevel,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);
        let offsets = values.read_u64_array(&level.tile_offsets_entry).await?;
        let byte_counts = values.read_u64_array(&level.tile_byte_counts_entry).await?;

        let expected = level.tile_count();
        if offsets.len() as u64 != expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!("expected {} entries, found {}", expected, offsets.len()),
            });
        }
        if byte_counts.len() as u64 != expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileByteCounts",
                message: format!("expected {} entries, found {}", expected, byte_counts.len()),
            });
        }

        Ok(TileData {
            offsets,
            byte_counts,
        })
    }

    /// Offset and stored size of a tile.
    pub fn get_tile_location(&self, tile_index: usize) -> Option<(u64, u64)> {
        Some((
            *self.offsets.get(tile_index)?,
            *self.byte_counts.get(tile_index)?,
        ))
    }
}
