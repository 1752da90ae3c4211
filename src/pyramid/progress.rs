use super::summary::LevelSummary;

/// Receives progress notifications from the pyramid walker.
///
/// Any `Fn(zoom, rows_done, rows_total)` closure is an observer.
pub trait ProgressObserver: Send + Sync {
    fn level_started(&self, _zoom: u8, _tiles_per_axis: u32) {}

    /// Called after every completed row of a level.
    fn row_finished(&self, zoom: u8, rows_done: u32, rows_total: u32);

    fn level_finished(&self, _summary: &LevelSummary) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(u8, u32, u32) + Send + Sync,
{
    fn row_finished(&self, zoom: u8, rows_done: u32, rows_total: u32) {
        self(zoom, rows_done, rows_total)
    }
}
