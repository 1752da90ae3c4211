//! Raster integration tests.
//!
//! Tests verify:
//! - Zoom levels map to the base image and overviews
//! - Blocks decode identically for every storage compression and predictor
//! - Little/big-endian and BigTIFF files
//! - Sparse tiles and mask IFDs
//! - Geometry mismatches are rejected when the raster or a level is opened

use std::sync::Arc;

use dem_tiler::config::PyramidConfig;
use dem_tiler::error::SourceError;
use dem_tiler::raster::ElevationRaster;

use super::test_utils::{zoom_gradient, ByteOrderType, DemTiffBuilder, MemoryReader, NO_DATA};

fn config(max_zoom: u8, tile_size: u32) -> PyramidConfig {
    PyramidConfig {
        max_zoom,
        tile_size,
        no_data: NO_DATA,
    }
}

async fn open(
    builder: &DemTiffBuilder,
    config: PyramidConfig,
) -> Result<ElevationRaster<MemoryReader>, SourceError> {
    let reader = MemoryReader::new(builder.build(), "mem://dem.tif");
    ElevationRaster::open(Arc::new(reader), config).await
}

/// Read every block of every zoom and compare with the builder's samples.
async fn assert_pyramid_matches(builder: &DemTiffBuilder, max_zoom: u8, tile_size: u32) {
    let raster = open(builder, config(max_zoom, tile_size)).await.unwrap();
    for zoom in 0..=max_zoom {
        let level = raster.level(zoom).await.unwrap();
        let tiles = 1u32 << zoom;
        for row in 0..tiles {
            for column in 0..tiles {
                let block = level.read_block(column, row).await.unwrap();
                assert_eq!(
                    block.samples(),
                    builder.tile_samples(zoom, column, row).as_slice(),
                    "zoom {} tile ({}, {})",
                    zoom,
                    column,
                    row
                );
            }
        }
    }
}

// =============================================================================
// Level Mapping
// =============================================================================

#[tokio::test]
async fn test_zoom_maps_to_base_and_overviews() {
    let builder = DemTiffBuilder::new(2, 16).with_samples(zoom_gradient);
    let raster = open(&builder, config(2, 16)).await.unwrap();
    assert_eq!(raster.max_zoom(), 2);

    for zoom in 0..=2u8 {
        let level = raster.level(zoom).await.unwrap();
        assert_eq!(level.zoom(), zoom);
        let block = level.read_block(0, 0).await.unwrap();
        // zoom_gradient encodes the zoom in the thousands
        assert_eq!(block.get(0, 0), Some(zoom as i16 * 1000));
    }
}

#[tokio::test]
async fn test_tiles_per_axis_doubles_per_zoom() {
    use dem_tiler::raster::BlockSource;

    let builder = DemTiffBuilder::new(3, 16).with_samples(zoom_gradient);
    let raster = open(&builder, config(3, 16)).await.unwrap();
    for zoom in 0..=3u8 {
        let level = raster.level(zoom).await.unwrap();
        assert_eq!(level.tiles_per_axis(), 1 << zoom);
    }
}

#[tokio::test]
async fn test_single_level_raster() {
    let builder = DemTiffBuilder::new(0, 16).with_samples(zoom_gradient);
    assert_pyramid_matches(&builder, 0, 16).await;
}

// =============================================================================
// Storage Compression
// =============================================================================

#[tokio::test]
async fn test_uncompressed_blocks() {
    let builder = DemTiffBuilder::new(2, 16).with_samples(zoom_gradient);
    assert_pyramid_matches(&builder, 2, 16).await;
}

#[tokio::test]
async fn test_compressed_blocks() {
    for compression in [5u16, 8, 32946] {
        for predictor in [1u16, 2] {
            let builder = DemTiffBuilder::new(2, 16)
                .with_samples(zoom_gradient)
                .with_compression(compression)
                .with_predictor(predictor);
            assert_pyramid_matches(&builder, 2, 16).await;
        }
    }
}

#[tokio::test]
async fn test_predictor_with_negative_samples() {
    let builder = DemTiffBuilder::new(1, 16)
        .with_samples(|_, x, y| if (x + y) % 2 == 0 { -30000 } else { 30000 })
        .with_compression(8)
        .with_predictor(2);
    assert_pyramid_matches(&builder, 1, 16).await;
}

#[tokio::test]
async fn test_unsupported_compression_is_rejected() {
    // JPEG
    let builder = DemTiffBuilder::new(1, 16)
        .with_samples(zoom_gradient)
        .with_compression(7);
    assert!(matches!(
        open(&builder, config(1, 16)).await,
        Err(SourceError::Tiff(_))
    ));
}

// =============================================================================
// Byte Order and BigTIFF
// =============================================================================

#[tokio::test]
async fn test_big_endian_tiff() {
    let builder = DemTiffBuilder::new(2, 16)
        .with_samples(zoom_gradient)
        .with_byte_order(ByteOrderType::BigEndian)
        .with_compression(8)
        .with_predictor(2);
    let data = builder.build();
    assert_eq!(&data[..2], b"MM");
    assert_pyramid_matches(&builder, 2, 16).await;
}

#[tokio::test]
async fn test_bigtiff() {
    for order in [ByteOrderType::LittleEndian, ByteOrderType::BigEndian] {
        let builder = DemTiffBuilder::new(2, 16)
            .with_samples(zoom_gradient)
            .with_byte_order(order)
            .with_bigtiff(true)
            .with_compression(5);
        assert_pyramid_matches(&builder, 2, 16).await;
    }
}

// =============================================================================
// Sparse Tiles and Masks
// =============================================================================

#[tokio::test]
async fn test_sparse_tiles_read_as_no_data() {
    // Only the top-left quadrant holds data at every zoom
    let builder = DemTiffBuilder::new(2, 16)
        .with_samples(|zoom, x, y| {
            let half = (16u32 << zoom) / 2;
            if zoom > 0 && (x >= half || y >= half) {
                NO_DATA
            } else {
                zoom_gradient(zoom, x, y)
            }
        })
        .with_sparse_tiles(true);
    assert_pyramid_matches(&builder, 2, 16).await;

    let raster = open(&builder, config(2, 16)).await.unwrap();
    let block = raster.level(1).await.unwrap().read_block(1, 1).await.unwrap();
    assert!(block.samples().iter().all(|&s| s == NO_DATA));
}

#[tokio::test]
async fn test_mask_ifd_is_ignored() {
    let builder = DemTiffBuilder::new(2, 16)
        .with_samples(zoom_gradient)
        .with_mask(true);
    assert_pyramid_matches(&builder, 2, 16).await;
}

#[tokio::test]
async fn test_nodata_mismatch_still_opens() {
    let builder = DemTiffBuilder::new(1, 16)
        .with_samples(zoom_gradient)
        .with_nodata("-32768");
    assert!(open(&builder, config(1, 16)).await.is_ok());

    let builder = DemTiffBuilder::new(1, 16)
        .with_samples(zoom_gradient)
        .with_nodata("-512");
    assert!(open(&builder, config(1, 16)).await.is_ok());
}

// =============================================================================
// Validation Errors
// =============================================================================

#[tokio::test]
async fn test_multi_band_raster_is_rejected() {
    let builder = DemTiffBuilder::new(1, 16).with_samples_per_pixel(3);
    assert!(matches!(
        open(&builder, config(1, 16)).await,
        Err(SourceError::BandCount(3))
    ));
}

#[tokio::test]
async fn test_wrong_sample_type_is_rejected() {
    // Unsigned 16-bit
    let builder = DemTiffBuilder::new(1, 16).with_sample_type(16, 1);
    assert!(matches!(
        open(&builder, config(1, 16)).await,
        Err(SourceError::SampleType {
            zoom: 1,
            bits: 16,
            format: 1
        })
    ));
}

#[tokio::test]
async fn test_wrong_dimensions_are_rejected() {
    // 32x32 base image, 64x64 expected
    let builder = DemTiffBuilder::new(1, 16);
    match open(&builder, config(2, 16)).await {
        Err(SourceError::Dimensions {
            zoom,
            expected,
            width,
            height,
        }) => {
            assert_eq!(zoom, 2);
            assert_eq!(expected, 64);
            assert_eq!((width, height), (32, 32));
        }
        other => panic!("expected dimensions error, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_wrong_block_size_is_rejected() {
    // 64x64 base in 16x16 tiles, read as 32x32 tiles
    let builder = DemTiffBuilder::new(2, 16);
    assert!(matches!(
        open(&builder, config(1, 32)).await,
        Err(SourceError::BlockSize {
            expected: 32,
            width: 16,
            height: 16,
            ..
        })
    ));
}

#[tokio::test]
async fn test_missing_overviews_are_rejected() {
    let builder = DemTiffBuilder::new(3, 16).with_overview_count(2);
    assert!(matches!(
        open(&builder, config(3, 16)).await,
        Err(SourceError::OverviewCount {
            expected: 3,
            found: 2
        })
    ));
}

#[tokio::test]
async fn test_zoom_above_max_is_rejected() {
    let builder = DemTiffBuilder::new(1, 16);
    let raster = open(&builder, config(1, 16)).await.unwrap();
    assert!(matches!(
        raster.level(2).await,
        Err(SourceError::ZoomOutOfRange {
            zoom: 2,
            max_zoom: 1
        })
    ));
}

#[tokio::test]
async fn test_block_outside_level_is_rejected() {
    let builder = DemTiffBuilder::new(1, 16).with_samples(zoom_gradient);
    let raster = open(&builder, config(1, 16)).await.unwrap();
    let level = raster.level(1).await.unwrap();

    assert!(level.read_block(1, 1).await.is_ok());
    assert!(matches!(
        level.read_block(2, 0).await,
        Err(SourceError::TileOutOfRange {
            zoom: 1,
            column: 2,
            row: 0
        })
    ));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_parsing() {
    let builder = DemTiffBuilder::new(1, 16).with_samples(zoom_gradient);
    let reader = Arc::new(MemoryReader::new(builder.build(), "mem://dem.tif"));

    for bad in [config(64, 16), config(255, 16), config(1, 0), config(1, 24)] {
        let result = ElevationRaster::open(Arc::clone(&reader), bad).await;
        assert!(matches!(result, Err(SourceError::InvalidConfig(_))));
    }
    assert_eq!(reader.request_count(), 0);
}

#[tokio::test]
async fn test_truncated_file_is_rejected() {
    let data = DemTiffBuilder::new(1, 16).with_samples(zoom_gradient).build();
    let reader = MemoryReader::new(data[..6].to_vec(), "mem://short.tif");
    assert!(ElevationRaster::open(Arc::new(reader), config(1, 16))
        .await
        .is_err());
}

#[tokio::test]
async fn test_open_reads_only_metadata() {
    let builder = DemTiffBuilder::new(2, 16).with_samples(zoom_gradient);
    let reader = Arc::new(MemoryReader::new(builder.build(), "mem://dem.tif"));
    let raster = ElevationRaster::open(Arc::clone(&reader), config(2, 16))
        .await
        .unwrap();

    // Header, then count and body of each of the three IFDs
    assert_eq!(reader.request_count(), 7);

    let level = raster.level(2).await.unwrap();
    let before = reader.request_count();
    level.read_block(3, 3).await.unwrap();
    assert_eq!(reader.request_count(), before + 1);
}
