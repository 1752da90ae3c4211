//! Configuration for dem-tiler.
//!
//! This module provides:
//! - [`PyramidConfig`] and [`CodecConfig`]: the values every component is
//!   constructed with (no process-wide state)
//! - [`ZoomSelection`]: which zoom levels a run processes
//! - [`Cli`]: command-line arguments via clap, with environment fallbacks
//!
//! # Environment Variables
//!
//! Every tuning option can be set with the `DEM_TILER_` prefix:
//!
//! - `DEM_TILER_ZOOM` - Zoom selection: `3`, `0-5`, `0,2,4` or `all` (default: 0)
//! - `DEM_TILER_MAX_ZOOM` - Zoom of the full-resolution image (default: 11)
//! - `DEM_TILER_TILE_SIZE` - Tile side in pixels (default: 256)
//! - `DEM_TILER_NO_DATA` - No-data sentinel (default: -512)
//! - `DEM_TILER_COMPRESSION_LEVEL` - gzip level 0-9 (default: 6)
//! - `DEM_TILER_CONCURRENCY` - Tiles read and encoded at once (default: 1)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use serde::{Deserialize, Serialize};

// =============================================================================
// Default Values
// =============================================================================

/// Zoom of the full-resolution image.
pub const DEFAULT_MAX_ZOOM: u8 = 11;

/// Tile side length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Sample value marking missing elevation.
pub const DEFAULT_NO_DATA: i16 = -512;

/// gzip level used for tile payloads.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Upper bound for `--concurrency`.
pub const MAX_CONCURRENCY: usize = 1024;

// =============================================================================
// Pyramid / codec configuration
// =============================================================================

/// Geometry of the elevation pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidConfig {
    /// Zoom of the full-resolution image; the raster has this many overviews
    pub max_zoom: u8,

    /// Side of a tile in pixels
    pub tile_size: u32,

    /// Sentinel sample for missing data
    pub no_data: i16,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            tile_size: DEFAULT_TILE_SIZE,
            no_data: DEFAULT_NO_DATA,
        }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 || !self.tile_size.is_power_of_two() {
            return Err(format!(
                "tile_size must be a non-zero power of two, got {}",
                self.tile_size
            ));
        }
        if self.max_zoom >= 32 || self.level_side_u64(self.max_zoom) > u32::MAX as u64 {
            return Err(format!(
                "max_zoom {} with tile_size {} exceeds the largest supported raster",
                self.max_zoom, self.tile_size
            ));
        }
        Ok(())
    }

    /// Tiles per axis at `zoom`.
    pub fn tiles_per_axis(&self, zoom: u8) -> u32 {
        1u32 << zoom
    }

    /// Pixel side of the level at `zoom`. Only meaningful after `validate`.
    pub fn level_side(&self, zoom: u8) -> u32 {
        self.level_side_u64(zoom) as u32
    }

    fn level_side_u64(&self, zoom: u8) -> u64 {
        (1u64 << zoom) * self.tile_size as u64
    }

    /// Samples in one tile.
    pub fn samples_per_tile(&self) -> usize {
        self.tile_size as usize * self.tile_size as usize
    }
}

/// Settings of the tile codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// gzip level, 0 (store) to 9 (best)
    pub compression_level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.compression_level > 9 {
            return Err(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Zoom selection
// =============================================================================

/// The zoom levels a run processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomSelection {
    Single(u8),
    /// Inclusive range
    Range { min: u8, max: u8 },
    List(Vec<u8>),
    /// `0..=max_zoom`
    All,
}

impl Default for ZoomSelection {
    fn default() -> Self {
        ZoomSelection::Single(0)
    }
}

impl ZoomSelection {
    /// The selected zooms in ascending order without duplicates.
    pub fn resolve(&self, max_zoom: u8) -> Result<Vec<u8>, String> {
        let mut zooms = match self {
            ZoomSelection::Single(z) => vec![*z],
            ZoomSelection::Range { min, max } => {
                if min > max {
                    return Err(format!("empty zoom range {}-{}", min, max));
                }
                (*min..=*max).collect()
            }
            ZoomSelection::List(list) => list.clone(),
            ZoomSelection::All => (0..=max_zoom).collect(),
        };

        zooms.sort_unstable();
        zooms.dedup();

        if zooms.is_empty() {
            return Err("no zoom levels selected".to_string());
        }
        if let Some(&z) = zooms.iter().find(|&&z| z > max_zoom) {
            return Err(format!("zoom {} exceeds max zoom {}", z, max_zoom));
        }

        Ok(zooms)
    }
}

impl FromStr for ZoomSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid zoom level '{}'", part.trim()))
        };

        if s.eq_ignore_ascii_case("all") {
            Ok(ZoomSelection::All)
        } else if s.contains(',') {
            s.split(',')
                .map(parse)
                .collect::<Result<Vec<_>, _>>()
                .map(ZoomSelection::List)
        } else if let Some((min, max)) = s.split_once('-') {
            Ok(ZoomSelection::Range {
                min: parse(min)?,
                max: parse(max)?,
            })
        } else {
            parse(s).map(ZoomSelection::Single)
        }
    }
}

impl fmt::Display for ZoomSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomSelection::Single(z) => write!(f, "{}", z),
            ZoomSelection::Range { min, max } => write!(f, "{}-{}", min, max),
            ZoomSelection::List(list) => {
                let parts: Vec<String> = list.iter().map(u8::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
            ZoomSelection::All => write!(f, "all"),
        }
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// dem-tiler - Cut an elevation GeoTIFF pyramid into an MBTiles store.
///
/// Reads a single-band Int16 GeoTIFF with internal power-of-two overviews and
/// writes every non-empty tile of the selected zooms as a delta-encoded,
/// gzip-compressed 16-bit grid.
#[derive(Parser, Debug, Clone)]
#[command(name = "dem-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source GeoTIFF.
    pub src: PathBuf,

    /// Destination MBTiles file (replaced if it exists).
    pub dest: PathBuf,

    // =========================================================================
    // Pyramid
    // =========================================================================
    /// Zoom levels to process: `3`, `0-5`, `0,2,4` or `all`.
    #[arg(long, default_value = "0", env = "DEM_TILER_ZOOM")]
    pub zoom: ZoomSelection,

    /// Zoom of the full-resolution image.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "DEM_TILER_MAX_ZOOM")]
    pub max_zoom: u8,

    /// Tile side in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "DEM_TILER_TILE_SIZE")]
    pub tile_size: u32,

    /// No-data sentinel; tiles made only of it are skipped.
    #[arg(long, default_value_t = DEFAULT_NO_DATA, env = "DEM_TILER_NO_DATA", allow_hyphen_values = true)]
    pub no_data: i16,

    // =========================================================================
    // Encoding
    // =========================================================================
    /// gzip level for tile payloads (0-9).
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL, env = "DEM_TILER_COMPRESSION_LEVEL")]
    pub compression_level: u32,

    /// Number of tiles of a row read and encoded concurrently.
    #[arg(long, default_value_t = 1, env = "DEM_TILER_CONCURRENCY")]
    pub concurrency: usize,

    // =========================================================================
    // Output
    // =========================================================================
    /// Do not print the progress line.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Print the run summary as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.pyramid_config().validate()?;
        self.codec_config().validate()?;

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }

        self.zoom.resolve(self.max_zoom)?;

        if self.src == self.dest {
            return Err("source and destination must differ".to_string());
        }

        Ok(())
    }

    pub fn pyramid_config(&self) -> PyramidConfig {
        PyramidConfig {
            max_zoom: self.max_zoom,
            tile_size: self.tile_size,
            no_data: self.no_data,
        }
    }

    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            compression_level: self.compression_level,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
