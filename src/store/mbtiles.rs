//! SQLite tile store using the MBTiles `tiles` table layout.
//!
//! The store is tuned for one bulk load: no journal, no fsync, a single
//! transaction around all inserts, and the unique key index built only once
//! loading is done. Duplicate keys are therefore accepted by [`insert`] and
//! reported by [`finalize`].
//!
//! [`insert`]: MbTilesStore::insert
//! [`finalize`]: MbTilesStore::finalize

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::tile::TileCoord;

use super::sink::TileSink;

const CREATE_TABLE: &str = "CREATE TABLE tiles (
    zoom_level INTEGER,
    tile_column INTEGER,
    tile_row INTEGER,
    tile_data BLOB
)";

const INSERT_TILE: &str =
    "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)";

const CREATE_INDEX: &str =
    "CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row)";

/// Append-only MBTiles writer.
pub struct MbTilesStore {
    conn: Connection,
    path: PathBuf,
    in_transaction: bool,
    finalized: bool,
    inserted: u64,
}

impl MbTilesStore {
    /// Create a fresh store at `path`, replacing any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed existing store"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update_and_check(None, "journal_mode", "OFF", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.execute(CREATE_TABLE, [])?;
        conn.execute_batch("BEGIN")?;

        info!(path = %path.display(), "Created tile store");

        Ok(Self {
            conn,
            path,
            in_transaction: true,
            finalized: false,
            inserted: 0,
        })
    }

    /// Open an existing store read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn,
            path,
            in_transaction: false,
            finalized: true,
            inserted: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of tiles inserted through this handle.
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Commit the bulk load and build the unique key index.
    ///
    /// Fails with [`StoreError::DuplicateKey`] if any key was inserted twice,
    /// and with [`StoreError::AlreadyFinalized`] when called again.
    pub fn finalize(&mut self) -> Result<(), StoreError> {
        if self.finalized {
            return Err(StoreError::AlreadyFinalized);
        }
        self.finalized = true;

        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }

        match self.conn.execute(CREATE_INDEX, []) {
            Ok(_) => {
                info!(tiles = self.inserted, "Built tile index");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateKey(self.first_duplicate()?))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Describe one key that occurs more than once.
    fn first_duplicate(&self) -> Result<String, StoreError> {
        let key = self
            .conn
            .query_row(
                "SELECT zoom_level, tile_column, tile_row FROM tiles
                 GROUP BY zoom_level, tile_column, tile_row
                 HAVING COUNT(*) > 1 LIMIT 1",
                [],
                |row| {
                    Ok(TileCoord::new(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                    ))
                },
            )
            .optional()?;
        Ok(key.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))
    }

    /// Close the connection.
    ///
    /// Without a prior [`finalize`](Self::finalize) the bulk transaction is
    /// abandoned and the file is left without its key index.
    pub fn close(self) -> Result<(), StoreError> {
        if !self.finalized {
            warn!(
                path = %self.path.display(),
                tiles = self.inserted,
                "Closing tile store without finalize"
            );
        }
        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }

    /// Number of rows in the `tiles` table.
    pub fn tile_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Payload stored under `coord`.
    pub fn get_tile(&self, coord: TileCoord) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self
            .conn
            .query_row(
                "SELECT tile_data FROM tiles
                 WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                params![coord.zoom, coord.column, coord.row],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    /// All keys in insertion order.
    pub fn coords(&self) -> Result<Vec<TileCoord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT zoom_level, tile_column, tile_row FROM tiles ORDER BY rowid")?;
        let coords = stmt
            .query_map([], |row| {
                Ok(TileCoord::new(row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(coords)
    }
}

impl TileSink for MbTilesStore {
    fn insert(&mut self, coord: TileCoord, data: &[u8]) -> Result<(), StoreError> {
        if self.finalized {
            return Err(StoreError::AlreadyFinalized);
        }
        let mut stmt = self.conn.prepare_cached(INSERT_TILE)?;
        stmt.execute(params![coord.zoom, coord.column, coord.row, data])?;
        self.inserted += 1;
        Ok(())
    }
}
