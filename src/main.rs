//! dem-tiler - Cut an elevation GeoTIFF pyramid into an MBTiles store.
//!
//! This binary wires the raster, codec, walker and store together and
//! reports progress on stdout.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dem_tiler::{
    Cli, ElevationRaster, LevelSummary, LocalFileReader, MbTilesStore, PipelineError,
    ProgressObserver, PyramidWalker, RunSummary, TileCodec,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        eprintln!("Error [config]: {}", e);
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    match run(&cli).await {
        Ok(summary) => {
            println!();
            println!("Size {}", summary.encoded_bytes);
            println!("Elapsed: {:.2}", start.elapsed().as_secs_f64());

            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: failed to serialize summary: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!();
            error!(stage = e.stage(), "Tiling failed: {}", e);
            eprintln!("Error [{}]: {}", e.stage(), e);
            ExitCode::FAILURE
        }
    }
}

/// Open the source, tile the selected zooms and finalize the store.
async fn run(cli: &Cli) -> Result<RunSummary, PipelineError> {
    let config = cli.pyramid_config();

    info!("Configuration:");
    info!("  Source: {}", cli.src.display());
    info!("  Destination: {}", cli.dest.display());
    info!("  Zoom: {} (max zoom {})", cli.zoom, config.max_zoom);
    info!("  Tile size: {}, no-data: {}", config.tile_size, config.no_data);
    info!(
        "  gzip level: {}, concurrency: {}",
        cli.compression_level, cli.concurrency
    );

    let reader = LocalFileReader::open(&cli.src)
        .await
        .map_err(dem_tiler::SourceError::from)?;
    let raster = ElevationRaster::open(Arc::new(reader), config).await?;

    let mut store = MbTilesStore::create(&cli.dest)?;

    let codec = TileCodec::new(config.tile_size, config.no_data, cli.codec_config());
    let mut walker = PyramidWalker::new(codec).with_concurrency(cli.concurrency);
    if !cli.quiet {
        walker = walker.with_progress(ConsoleProgress);
    }

    let summary = walker.run(&raster, &cli.zoom, &mut store).await?;

    store.finalize()?;
    store.close()?;

    Ok(summary)
}

/// Prints a banner per level and an overwritten percentage per row.
struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn level_started(&self, zoom: u8, tiles_per_axis: u32) {
        println!();
        println!("────────────────────────────────────────");
        println!(
            "  Zoom {}: {}x{} tiles",
            zoom, tiles_per_axis, tiles_per_axis
        );
        println!("────────────────────────────────────────");
    }

    fn row_finished(&self, _zoom: u8, rows_done: u32, rows_total: u32) {
        let percent = rows_done as f64 * 100.0 / rows_total as f64;
        let mut stdout = std::io::stdout().lock();
        // Progress output is best-effort
        let _ = write!(stdout, "\r{:.2}%", percent);
        let _ = stdout.flush();
    }

    fn level_finished(&self, summary: &LevelSummary) {
        println!();
        println!(
            "  {} written, {} skipped, {} bytes",
            summary.tiles_written, summary.tiles_skipped, summary.encoded_bytes
        );
    }
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr so the progress line on stdout stays readable.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dem_tiler=debug"
    } else {
        "dem_tiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
