//! Traversal of pyramid levels.
//!
//! Every block of a level is visited in row-major order (row 0 first, columns
//! left to right). Blocks made only of the no-data sentinel are skipped, the
//! others are encoded and inserted into the sink under
//! `(zoom, column, row)`.
//!
//! With a concurrency above 1, up to that many blocks of the current row are
//! read and encoded in parallel tokio tasks. Results are put back in column
//! order and inserted from the walker's task, so the sink still sees
//! row-major order and is never shared. When one block fails, the blocks
//! still in flight are aborted.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::ZoomSelection;
use crate::error::PipelineError;
use crate::io::RangeReader;
use crate::raster::{BlockSource, ElevationRaster};
use crate::store::TileSink;
use crate::tile::{TileCodec, TileCoord};

use super::progress::ProgressObserver;
use super::summary::{LevelSummary, RunSummary};

/// Drives block reading, encoding and storage across zoom levels.
pub struct PyramidWalker {
    codec: TileCodec,
    concurrency: usize,
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl PyramidWalker {
    /// A sequential walker without progress reporting.
    pub fn new(codec: TileCodec) -> Self {
        Self {
            codec,
            concurrency: 1,
            progress: None,
        }
    }

    /// Read and encode up to `concurrency` blocks of a row at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.progress = Some(Arc::new(observer));
        self
    }

    pub fn codec(&self) -> &TileCodec {
        &self.codec
    }

    /// Process every selected zoom of `raster` in ascending order.
    ///
    /// Each level is resolved and validated before any of its tiles is read.
    /// The first error aborts the run.
    pub async fn run<R, K>(
        &self,
        raster: &ElevationRaster<R>,
        selection: &ZoomSelection,
        sink: &mut K,
    ) -> Result<RunSummary, PipelineError>
    where
        R: RangeReader + 'static,
        K: TileSink + ?Sized,
    {
        let start = Instant::now();
        let zooms = selection
            .resolve(raster.max_zoom())
            .map_err(PipelineError::Config)?;

        info!(zooms = ?zooms, concurrency = self.concurrency, "Starting pyramid run");

        let mut summary = RunSummary::default();
        for zoom in zooms {
            let level = raster.level(zoom).await?;
            let level_summary = self.run_level(Arc::new(level), zoom, sink).await?;
            summary.push(level_summary);
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            written = summary.tiles_written,
            skipped = summary.tiles_skipped,
            bytes = summary.encoded_bytes,
            "Pyramid run complete"
        );
        Ok(summary)
    }

    /// Process all blocks of one level.
    pub async fn run_level<S, K>(
        &self,
        source: Arc<S>,
        zoom: u8,
        sink: &mut K,
    ) -> Result<LevelSummary, PipelineError>
    where
        S: BlockSource + 'static,
        K: TileSink + ?Sized,
    {
        let start = Instant::now();
        let tiles = source.tiles_per_axis();
        let mut summary = LevelSummary {
            zoom,
            ..Default::default()
        };

        info!(zoom, tiles_per_axis = tiles, "Processing level");
        if let Some(progress) = &self.progress {
            progress.level_started(zoom, tiles);
        }

        let batch = self.concurrency.min(u32::MAX as usize) as u32;

        for row in 0..tiles {
            let mut column = 0;
            while column < tiles {
                let end = column.saturating_add(batch).min(tiles);
                let payloads = self.process_columns(&source, row, column, end).await?;

                for (col, payload) in (column..end).zip(payloads) {
                    summary.tiles_visited += 1;
                    match payload {
                        Some(bytes) => {
                            sink.insert(TileCoord::new(zoom, col, row), &bytes)?;
                            summary.tiles_written += 1;
                            summary.encoded_bytes += bytes.len() as u64;
                        }
                        None => summary.tiles_skipped += 1,
                    }
                }
                column = end;
            }

            if let Some(progress) = &self.progress {
                progress.row_finished(zoom, row + 1, tiles);
            }
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            zoom,
            written = summary.tiles_written,
            skipped = summary.tiles_skipped,
            bytes = summary.encoded_bytes,
            elapsed_ms = summary.elapsed_ms,
            "Level complete"
        );
        if let Some(progress) = &self.progress {
            progress.level_finished(&summary);
        }

        Ok(summary)
    }

    /// Read and encode columns `start..end` of `row`, in column order.
    async fn process_columns<S>(
        &self,
        source: &Arc<S>,
        row: u32,
        start: u32,
        end: u32,
    ) -> Result<Vec<Option<Bytes>>, PipelineError>
    where
        S: BlockSource + 'static,
    {
        let mut results = Vec::with_capacity((end - start) as usize);

        if end - start == 1 {
            results.push(process_block(source.as_ref(), self.codec, start, row).await?);
            return Ok(results);
        }

        // Dropping the set on an early return aborts the remaining tasks
        let mut tasks = JoinSet::new();
        for column in start..end {
            let source = Arc::clone(source);
            let codec = self.codec;
            tasks.spawn(async move {
                (column, process_block(source.as_ref(), codec, column, row).await)
            });
        }

        let mut slots: Vec<Option<Option<Bytes>>> = vec![None; (end - start) as usize];
        while let Some(joined) = tasks.join_next().await {
            let (column, payload) = joined?;
            slots[(column - start) as usize] = Some(payload?);
        }
        results.extend(slots.into_iter().flatten());
        Ok(results)
    }
}

/// Read one block; `None` if it holds only no-data.
async fn process_block<S>(
    source: &S,
    codec: TileCodec,
    column: u32,
    row: u32,
) -> Result<Option<Bytes>, PipelineError>
where
    S: BlockSource + ?Sized,
{
    let block = source.read_block(column, row).await?;
    if codec.is_empty(&block) {
        return Ok(None);
    }
    Ok(Some(codec.encode(&block)?))
}
