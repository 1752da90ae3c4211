use serde::{Deserialize, Serialize};

/// Counters for one processed zoom level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub zoom: u8,

    /// Blocks read from the source
    pub tiles_visited: u64,

    /// Blocks encoded and inserted
    pub tiles_written: u64,

    /// Blocks made only of the no-data sentinel
    pub tiles_skipped: u64,

    /// Total size of the inserted payloads
    pub encoded_bytes: u64,

    pub elapsed_ms: u64,
}

/// Counters for a whole run, with a per-level breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub levels: Vec<LevelSummary>,
    pub tiles_visited: u64,
    pub tiles_written: u64,
    pub tiles_skipped: u64,
    pub encoded_bytes: u64,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Add a finished level to the totals.
    pub fn push(&mut self, level: LevelSummary) {
        self.tiles_visited += level.tiles_visited;
        self.tiles_written += level.tiles_written;
        self.tiles_skipped += level.tiles_skipped;
        self.encoded_bytes += level.encoded_bytes;
        self.levels.push(level);
    }
}
