//! Storage-level checks for elevation TIFFs.
//!
//! Files outside the supported subset are rejected when the pyramid is
//! parsed, before any tile is read:
//! - **Organization**: tiled only (no strips)
//! - **Compression**: none, LZW, Deflate or Adobe Deflate
//! - **Predictor**: none or horizontal differencing
//! - **Planar configuration**: chunky or planar (identical for one band)
//!
//! Sample type and geometry are checked later against the pyramid
//! configuration, since they depend on the zoom a level is used for.

use tracing::warn;

use crate::error::TiffError;

use super::parser::{ByteOrder, Ifd};
use super::tags::{Compression, Predictor, TiffTag};

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of inspecting one IFD.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,

    /// Non-fatal oddities, logged by [`validate_ifd`]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// The first error, if any, as a [`TiffError`].
    pub fn into_result(self) -> Result<(), TiffError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

/// A specific reason an IFD cannot be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    StripOrganization {
        ifd_index: usize,
    },

    UnsupportedCompression {
        ifd_index: usize,
        compression: u16,
        compression_name: String,
    },

    UnsupportedPredictor {
        ifd_index: usize,
        predictor: u16,
    },

    InvalidPlanarConfiguration {
        ifd_index: usize,
        value: u16,
    },

    MissingTileTags {
        ifd_index: usize,
        missing_tags: Vec<&'static str>,
    },
}

impl From<ValidationError> for TiffError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::StripOrganization { .. } => TiffError::StripOrganization,
            ValidationError::UnsupportedCompression {
                compression_name, ..
            } => TiffError::UnsupportedCompression(compression_name),
            ValidationError::UnsupportedPredictor { predictor, .. } => {
                TiffError::UnsupportedPredictor(predictor)
            }
            ValidationError::InvalidPlanarConfiguration { ifd_index, value } => {
                TiffError::InvalidTagValue {
                    tag: "PlanarConfiguration",
                    message: format!("IFD {}: unknown value {}", ifd_index, value),
                }
            }
            ValidationError::MissingTileTags { missing_tags, .. } => {
                TiffError::MissingTag(missing_tags.first().copied().unwrap_or("TileOffsets"))
            }
        }
    }
}

// =============================================================================
// IFD Validation
// =============================================================================

/// Collect every problem with an IFD.
pub fn inspect_ifd(ifd: &Ifd, ifd_index: usize, byte_order: ByteOrder) -> ValidationResult {
    let mut result = ValidationResult::default();

    if ifd.is_stripped() && !ifd.is_tiled() {
        result.add_error(ValidationError::StripOrganization { ifd_index });
        return result;
    }

    let missing_tags: Vec<&'static str> = [
        (TiffTag::TileWidth, "TileWidth"),
        (TiffTag::TileLength, "TileLength"),
        (TiffTag::TileOffsets, "TileOffsets"),
        (TiffTag::TileByteCounts, "TileByteCounts"),
    ]
    .into_iter()
    .filter(|(tag, _)| ifd.get_entry_by_tag(*tag).is_none())
    .map(|(_, name)| name)
    .collect();

    if !missing_tags.is_empty() {
        result.add_error(ValidationError::MissingTileTags {
            ifd_index,
            missing_tags,
        });
    }

    // Absent Compression means uncompressed
    let compression = ifd.compression(byte_order).unwrap_or(1);
    match Compression::from_u16(compression) {
        Some(c) if c.is_supported() => {}
        Some(c) => result.add_error(ValidationError::UnsupportedCompression {
            ifd_index,
            compression,
            compression_name: c.name().to_string(),
        }),
        None => result.add_error(ValidationError::UnsupportedCompression {
            ifd_index,
            compression,
            compression_name: format!("Unknown ({})", compression),
        }),
    }

    let predictor = ifd.predictor(byte_order);
    if Predictor::from_u16(predictor).is_none() {
        result.add_error(ValidationError::UnsupportedPredictor {
            ifd_index,
            predictor,
        });
    }

    let planar = ifd.planar_configuration(byte_order);
    if planar != 1 && planar != 2 {
        result.add_error(ValidationError::InvalidPlanarConfiguration {
            ifd_index,
            value: planar,
        });
    }

    if let (Some(w), Some(h)) = (ifd.tile_width(byte_order), ifd.tile_height(byte_order)) {
        if w % 16 != 0 || h % 16 != 0 {
            result.add_warning(format!(
                "IFD {}: tile dimensions {}x{} are not multiples of 16",
                ifd_index, w, h
            ));
        }
    }

    result
}

/// Reject an IFD that cannot be read, logging any warnings.
pub fn validate_ifd(ifd: &Ifd, ifd_index: usize, byte_order: ByteOrder) -> Result<(), TiffError> {
    let result = inspect_ifd(ifd, ifd_index, byte_order);
    for warning in &result.warnings {
        warn!("{}", warning);
    }
    result.into_result()
}
