use std::path::PathBuf;

use arrow_schema::{ArrowError, DataType};
use clade_core::{CladeError, CollaboratorError, TableError};
use thiserror::Error;

/// Errors raised while reading or writing run artefacts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("column `{column}` not found in Parquet schema")]
    ColumnNotFound { column: String },
    #[error("column `{column}` must be {expected} but found {actual:?}")]
    InvalidColumnType {
        column: String,
        expected: &'static str,
        actual: DataType,
    },
    #[error("FixedSizeList child type must be Float32 but found {actual:?}")]
    InvalidListValueType { actual: DataType },
    #[error("invalid FixedSizeList dimension {actual}")]
    InvalidDimension { actual: i32 },
    #[error("column `{column}` row {row} is null")]
    NullRow { column: String, row: usize },
    #[error("row {row} contains null value at position {value_index}")]
    NullValue { row: usize, value_index: usize },
    #[error("row {row} has length {actual} but expected {expected}")]
    InvalidRowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("column `{column}` row {row} holds {value}, which does not fit the target type")]
    OutOfRange {
        column: String,
        row: usize,
        value: String,
    },
    #[error("matrix with {rows} rows and dimension {dimension} exceeds capacity limits")]
    CapacityOverflow { rows: usize, dimension: usize },
    #[error("inconsistent dimensions across batches: expected {expected}, got {actual}")]
    InconsistentBatchDimension { expected: usize, actual: usize },
    #[error("`{path}` has no file name")]
    InvalidPath { path: PathBuf },
    #[error(transparent)]
    Clade(#[from] CladeError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("i/o error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

impl From<StoreError> for CollaboratorError {
    fn from(error: StoreError) -> Self {
        Self::new(error.to_string())
    }
}
