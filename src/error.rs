use thiserror::Error;

/// I/O errors that can occur when reading the source raster
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the local filesystem
    #[error("File I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError::Io(err.to_string())
    }
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported storage compression scheme
    #[error("Unsupported compression: {0} (only None, LZW and Deflate are supported)")]
    UnsupportedCompression(String),

    /// Unsupported predictor
    #[error("Unsupported predictor: {0} (only none and horizontal differencing are supported)")]
    UnsupportedPredictor(u16),

    /// File uses strips instead of tiles
    #[error("Unsupported organization: file uses strips instead of tiles")]
    StripOrganization,

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised by the raster source: geometry mismatches detected when the
/// raster or one of its levels is opened, and per-block read failures.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// I/O error while reading the raster
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The file is not a usable TIFF
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Pyramid geometry cannot describe any raster
    #[error("Invalid pyramid configuration: {0}")]
    InvalidConfig(String),

    /// Raster is not single-band
    #[error("Expected a single-band raster, found {0} samples per pixel")]
    BandCount(u32),

    /// Level dimensions do not match the pyramid geometry
    #[error("Zoom {zoom}: expected {expected}x{expected} pixels, found {width}x{height}")]
    Dimensions {
        zoom: u8,
        expected: u32,
        width: u32,
        height: u32,
    },

    /// Samples are not signed 16-bit integers
    #[error("Zoom {zoom}: expected signed 16-bit samples, found {bits} bits with sample format {format}")]
    SampleType { zoom: u8, bits: u16, format: u16 },

    /// Native block size is not the tile size
    #[error("Zoom {zoom}: expected {expected}x{expected} blocks, found {width}x{height}")]
    BlockSize {
        zoom: u8,
        expected: u32,
        width: u32,
        height: u32,
    },

    /// Wrong number of reduced-resolution levels
    #[error("Expected {expected} overview levels, found {found}")]
    OverviewCount { expected: usize, found: usize },

    /// Requested zoom is not part of the pyramid
    #[error("Zoom {zoom} is outside the pyramid (max zoom {max_zoom})")]
    ZoomOutOfRange { zoom: u8, max_zoom: u8 },

    /// Requested block is outside the level grid
    #[error("Tile ({column}, {row}) is outside zoom {zoom}")]
    TileOutOfRange { zoom: u8, column: u32, row: u32 },

    /// Stored tile could not be decompressed
    #[error("Failed to decompress tile ({column}, {row}) at zoom {zoom}: {message}")]
    Decompression {
        zoom: u8,
        column: u32,
        row: u32,
        message: String,
    },

    /// A block decoded to the wrong number of bytes
    #[error("Block decoded to {actual} bytes, expected {expected}")]
    BlockLength { expected: usize, actual: usize },
}

/// Errors from the tile codec
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Input block does not hold exactly one tile of samples
    #[error("Expected {expected} samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    /// Decompressed payload does not hold exactly one tile of bytes
    #[error("Expected {expected} decoded bytes, got {actual}")]
    ByteLength { expected: usize, actual: usize },

    /// Compressor failed
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Payload is not a valid compressed stream
    #[error("Decompression failed: {0}")]
    Decompression(String),
}

/// Errors from the tile store
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while preparing the store file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two tiles were written with the same key
    #[error("Duplicate tile key: {0}")]
    DuplicateKey(String),

    /// The store was already finalized
    #[error("Store is already finalized")]
    AlreadyFinalized,
}

/// Any failure that aborts a tiling run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration
    #[error("{0}")]
    Config(String),

    /// Raster source failure
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Codec failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A block worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Name of the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Source(_) => "source",
            PipelineError::Codec(_) => "codec",
            PipelineError::Store(_) => "store",
            PipelineError::Worker(_) => "worker",
        }
    }
}
