//! Feature matrices and scoring projections stored as Parquet.
//!
//! A dataset file has a `sample` Utf8 column and one
//! `FixedSizeList<Float32, D>` feature column.
use std::{path::Path, sync::Arc};

use arrow_array::{FixedSizeListArray, RecordBatch};
use arrow_schema::Schema;
use clade_core::Dataset;
use parquet::file::reader::ChunkReader;

use crate::{
    errors::StoreError,
    ingest::{
        SAMPLE_COLUMN, append_fixed_size_list_values, append_strings, column_index,
        fixed_size_list, open, read_batches, sample_array, sample_field, sample_ids,
        validate_fixed_size_list_field,
    },
};

/// Default name of the feature column.
pub const FEATURE_COLUMN: &str = "features";

/// Name of the coordinate column in scoring projections.
pub const PROJECTION_COLUMN: &str = "coords";

/// Loads a dataset from a Parquet file.
///
/// # Errors
/// Returns [`StoreError`] when the file cannot be read, a column is missing
/// or mistyped, a row is null, or the rows do not form a valid [`Dataset`].
pub fn read_dataset(path: impl AsRef<Path>, column: &str) -> Result<Dataset, StoreError> {
    read_dataset_from(open(path.as_ref())?, column)
}

/// Loads a dataset from any Parquet reader.
///
/// # Errors
/// See [`read_dataset`].
pub fn read_dataset_from<R>(reader: R, column: &str) -> Result<Dataset, StoreError>
where
    R: ChunkReader + Send + 'static,
{
    let (schema, batches) = read_batches(reader)?;
    let index = column_index(&schema, column)?;
    let dimension = validate_fixed_size_list_field(schema.field(index), column)?;
    let mut samples = Vec::new();
    let mut values = Vec::new();
    for batch in &batches {
        let start = samples.len();
        append_strings(batch, SAMPLE_COLUMN, start, &mut samples)?;
        let column_array = batch.column(index);
        let list = column_array
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| StoreError::InvalidColumnType {
                column: column.to_owned(),
                expected: "FixedSizeList<Float32, _>",
                actual: column_array.data_type().clone(),
            })?;
        append_fixed_size_list_values(list, column, Some(dimension), start, &mut values)?;
    }
    let dimension = if samples.is_empty() { 0 } else { dimension };
    Ok(Dataset::from_parts(sample_ids(samples), dimension, values)?)
}

/// Encodes `dataset` as a record batch with the given feature column name.
///
/// # Errors
/// Returns [`StoreError`] when the batch cannot be assembled.
pub fn dataset_batch(dataset: &Dataset, column: &str) -> Result<RecordBatch, StoreError> {
    let flat: Vec<f32> = dataset
        .iter()
        .flat_map(|(_, row)| row.iter().copied())
        .collect();
    let (field, array) = fixed_size_list(column, &flat, dataset.dimension())?;
    let schema = Arc::new(Schema::new(vec![sample_field(), field]));
    Ok(RecordBatch::try_new(
        schema,
        vec![sample_array(dataset.samples()), array],
    )?)
}

/// Writes `dataset` to `path` atomically.
///
/// # Errors
/// Returns [`StoreError`] when encoding or writing fails.
pub fn write_dataset(
    path: impl AsRef<Path>,
    dataset: &Dataset,
    column: &str,
) -> Result<(), StoreError> {
    let batch = dataset_batch(dataset, column)?;
    crate::layout::write_atomically(path.as_ref(), |file| {
        crate::ingest::write_batch(file, &batch)
    })
}
