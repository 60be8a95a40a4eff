//! Error types for Thalweg

use thiserror::Error;

/// Main error type for Thalweg operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Shape mismatch: expected {expected_rows}x{expected_cols}, got {actual_rows}x{actual_cols}")]
    SizeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error(
        "Unsupported topology: network has {heads} channel heads, distance queries need exactly \
         one. Isolate a single head-to-outlet path before querying by distance"
    )]
    UnsupportedTopology { heads: usize },

    #[error("Invalid node-attribute list: {actual} rows for a network of {expected} nodes")]
    InvalidAttributeList { expected: usize, actual: usize },

    #[error("Invalid stream network: {0}")]
    InvalidNetwork(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Thalweg operations
pub type Result<T> = std::result::Result<T, Error>;
