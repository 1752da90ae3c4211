//! Elevation raster backed by a tiled GeoTIFF pyramid.
//!
//! The raster must be a single-band Int16 image of exactly
//! `2^max_zoom * tile_size` pixels per side, stored in `tile_size` square
//! tiles, with `max_zoom` internal overviews each half the size of the one
//! above. Zoom `z` is served by:
//!
//! ```text
//! z == max_zoom  ->  base image
//! z <  max_zoom  ->  overview max_zoom - z - 1   (0 = largest overview)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::PyramidConfig;
use crate::error::{SourceError, TiffError};
use crate::format::tiff::{
    ByteOrder, Compression, Predictor, PyramidLevel, TiffPyramid, TileData, SAMPLE_FORMAT_SIGNED,
};
use crate::io::RangeReader;
use crate::tile::RawBlock;

use super::decode::{decompress, samples_from_bytes, undo_predictor};
use super::source::BlockSource;

// =============================================================================
// ElevationRaster
// =============================================================================

/// An opened, validated elevation pyramid.
pub struct ElevationRaster<R: RangeReader> {
    reader: Arc<R>,
    pyramid: TiffPyramid,
    config: PyramidConfig,
}

impl<R: RangeReader> ElevationRaster<R> {
    /// Check `config`, parse the file and check it against `config`.
    pub async fn open(reader: Arc<R>, config: PyramidConfig) -> Result<Self, SourceError> {
        config.validate().map_err(SourceError::InvalidConfig)?;

        let pyramid = TiffPyramid::parse(reader.as_ref()).await?;
        let base = pyramid.base();

        if base.samples_per_pixel != 1 {
            return Err(SourceError::BandCount(base.samples_per_pixel));
        }
        check_level(base, config.max_zoom, &config)?;

        let found = pyramid.overviews().len();
        if found != config.max_zoom as usize {
            return Err(SourceError::OverviewCount {
                expected: config.max_zoom as usize,
                found,
            });
        }

        match pyramid.read_nodata(reader.as_ref()).await {
            Ok(Some(text)) => match text.parse::<f64>() {
                Ok(value) if value == config.no_data as f64 => {}
                _ => warn!(
                    file_nodata = %text,
                    no_data = config.no_data,
                    "GDAL_NODATA of {} differs from the configured no-data value",
                    reader.identifier()
                ),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read GDAL_NODATA"),
        }

        info!(
            source = reader.identifier(),
            width = base.width,
            height = base.height,
            overviews = found,
            bigtiff = pyramid.header.is_bigtiff,
            "Opened elevation raster"
        );

        Ok(Self {
            reader,
            pyramid,
            config,
        })
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    pub fn max_zoom(&self) -> u8 {
        self.config.max_zoom
    }

    /// Resolve and validate the level serving `zoom`, loading its tile tables.
    pub async fn level(&self, zoom: u8) -> Result<RasterLevel<R>, SourceError> {
        let max_zoom = self.config.max_zoom;
        if zoom > max_zoom {
            return Err(SourceError::ZoomOutOfRange { zoom, max_zoom });
        }

        // levels[0] is the base image, overview i sits at levels[i + 1]
        let index = (max_zoom - zoom) as usize;
        let level = self
            .pyramid
            .levels
            .get(index)
            .ok_or(SourceError::OverviewCount {
                expected: max_zoom as usize,
                found: self.pyramid.overviews().len(),
            })?;

        check_level(level, zoom, &self.config)?;

        let compression = Compression::from_u16(level.compression)
            .filter(|c| c.is_supported())
            .ok_or_else(|| {
                TiffError::UnsupportedCompression(format!("Unknown ({})", level.compression))
            })?;
        let predictor = Predictor::from_u16(level.predictor)
            .ok_or(TiffError::UnsupportedPredictor(level.predictor))?;

        let tiles = TileData::load(self.reader.as_ref(), level, &self.pyramid.header).await?;

        debug!(
            zoom,
            ifd = level.ifd_index,
            width = level.width,
            compression = compression.name(),
            predictor = ?predictor,
            "Resolved raster level"
        );

        Ok(RasterLevel {
            reader: Arc::clone(&self.reader),
            zoom,
            tile_size: self.config.tile_size,
            layout: Arc::new(level.clone()),
            no_data: self.config.no_data,
            byte_order: self.pyramid.header.byte_order,
            compression,
            predictor,
            tiles: Arc::new(tiles),
        })
    }
}

/// Check sample type, dimensions and block size of the image serving `zoom`.
fn check_level(level: &PyramidLevel, zoom: u8, config: &PyramidConfig) -> Result<(), SourceError> {
    if level.samples_per_pixel != 1 {
        return Err(SourceError::BandCount(level.samples_per_pixel));
    }

    if level.bits_per_sample != 16 || level.sample_format != SAMPLE_FORMAT_SIGNED {
        return Err(SourceError::SampleType {
            zoom,
            bits: level.bits_per_sample,
            format: level.sample_format,
        });
    }

    let expected = config.level_side(zoom);
    if level.width != expected || level.height != expected {
        return Err(SourceError::Dimensions {
            zoom,
            expected,
            width: level.width,
            height: level.height,
        });
    }

    if level.tile_width != config.tile_size || level.tile_height != config.tile_size {
        return Err(SourceError::BlockSize {
            zoom,
            expected: config.tile_size,
            width: level.tile_width,
            height: level.tile_height,
        });
    }

    Ok(())
}

// =============================================================================
// RasterLevel
// =============================================================================

/// One validated zoom level, cheap to clone and share across tasks.
pub struct RasterLevel<R: RangeReader> {
    reader: Arc<R>,
    zoom: u8,
    tile_size: u32,
    layout: Arc<PyramidLevel>,
    no_data: i16,
    byte_order: ByteOrder,
    compression: Compression,
    predictor: Predictor,
    tiles: Arc<TileData>,
}

impl<R: RangeReader> Clone for RasterLevel<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            layout: Arc::clone(&self.layout),
            tiles: Arc::clone(&self.tiles),
            ..*self
        }
    }
}

impl<R: RangeReader> RasterLevel<R> {
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Read and decode the block at `(column, row)`.
    pub async fn read_block(&self, column: u32, row: u32) -> Result<RawBlock, SourceError> {
        let out_of_range = SourceError::TileOutOfRange {
            zoom: self.zoom,
            column,
            row,
        };
        let (offset, byte_count) = self
            .layout
            .tile_index(column, row)
            .and_then(|index| self.tiles.get_tile_location(index))
            .ok_or(out_of_range)?;

        // GDAL leaves unwritten tiles of sparse files with a zero byte count
        if byte_count == 0 {
            return Ok(RawBlock::filled(self.tile_size, self.no_data));
        }

        let stored = self.reader.read_exact_at(offset, byte_count as usize).await?;

        let expected = self.tile_size as usize * self.tile_size as usize * 2;
        let decoded = decompress(self.compression, &stored, expected).map_err(|message| {
            SourceError::Decompression {
                zoom: self.zoom,
                column,
                row,
                message,
            }
        })?;

        if decoded.len() != expected {
            return Err(SourceError::BlockLength {
                expected,
                actual: decoded.len(),
            });
        }

        let mut samples = samples_from_bytes(&decoded, self.byte_order);
        undo_predictor(&mut samples, self.tile_size as usize, self.predictor);

        RawBlock::new(self.tile_size, samples).map_err(|_| SourceError::BlockLength {
            expected,
            actual: decoded.len(),
        })
    }
}

#[async_trait]
impl<R: RangeReader> BlockSource for RasterLevel<R> {
    fn tiles_per_axis(&self) -> u32 {
        self.layout.tiles_x
    }

    async fn read_block(&self, column: u32, row: u32) -> Result<RawBlock, SourceError> {
        RasterLevel::read_block(self, column, row).await
    }
}
