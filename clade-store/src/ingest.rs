//! Helpers for moving Arrow columns in and out of core types.
use std::{fs::File, path::Path, sync::Arc};

use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchReader, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use clade_core::SampleId;
use parquet::arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::file::reader::ChunkReader;

use crate::errors::StoreError;

/// Name of the sample identifier column in every artefact.
pub const SAMPLE_COLUMN: &str = "sample";

/// Reads every record batch of a Parquet source.
pub(crate) fn read_batches<R>(reader: R) -> Result<(Arc<Schema>, Vec<RecordBatch>), StoreError>
where
    R: ChunkReader + Send + 'static,
{
    let reader = ParquetRecordBatchReaderBuilder::try_new(reader)?.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}

pub(crate) fn open(path: &Path) -> Result<File, StoreError> {
    File::open(path).map_err(StoreError::io(path))
}

/// Serialises one batch to any writer.
pub(crate) fn write_batch<W>(writer: W, batch: &RecordBatch) -> Result<(), StoreError>
where
    W: std::io::Write + Send,
{
    let mut writer = ArrowWriter::try_new(writer, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

pub(crate) fn column_index(schema: &Schema, column: &str) -> Result<usize, StoreError> {
    schema
        .index_of(column)
        .map_err(|_| StoreError::ColumnNotFound {
            column: column.to_owned(),
        })
}

/// Downcasts column `column` of `batch` to `A`.
pub(crate) fn typed_column<'a, A: Array + 'static>(
    batch: &'a RecordBatch,
    column: &str,
    expected: &'static str,
) -> Result<&'a A, StoreError> {
    let index = column_index(&batch.schema(), column)?;
    let array = batch.column(index);
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| StoreError::InvalidColumnType {
            column: column.to_owned(),
            expected,
            actual: array.data_type().clone(),
        })
}

/// Appends the non-null strings of a Utf8 column.
pub(crate) fn append_strings(
    batch: &RecordBatch,
    column: &str,
    start_row: usize,
    out: &mut Vec<String>,
) -> Result<(), StoreError> {
    let strings = typed_column::<StringArray>(batch, column, "Utf8")?;
    out.reserve(strings.len());
    for (offset, value) in strings.iter().enumerate() {
        let value = value.ok_or_else(|| StoreError::NullRow {
            column: column.to_owned(),
            row: start_row + offset,
        })?;
        out.push(value.to_owned());
    }
    Ok(())
}

pub(crate) fn sample_ids(raw: Vec<String>) -> Vec<SampleId> {
    raw.into_iter().map(SampleId::from).collect()
}

pub(crate) fn sample_array(samples: &[SampleId]) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(
        samples.iter().map(AsRef::<str>::as_ref),
    ))
}

pub(crate) fn sample_field() -> Field {
    Field::new(SAMPLE_COLUMN, DataType::Utf8, false)
}

pub(crate) fn validate_fixed_size_list_field(
    field: &Field,
    column: &str,
) -> Result<usize, StoreError> {
    match field.data_type() {
        DataType::FixedSizeList(child, width) => {
            if child.data_type() != &DataType::Float32 {
                return Err(StoreError::InvalidListValueType {
                    actual: child.data_type().clone(),
                });
            }
            usize::try_from(*width).map_err(|_| StoreError::InvalidDimension { actual: *width })
        }
        other => Err(StoreError::InvalidColumnType {
            column: column.to_owned(),
            expected: "FixedSizeList<Float32, _>",
            actual: other.clone(),
        }),
    }
}

pub(crate) fn append_fixed_size_list_values(
    array: &FixedSizeListArray,
    column: &str,
    expected_dimension: Option<usize>,
    start_row: usize,
    out: &mut Vec<f32>,
) -> Result<usize, StoreError> {
    let dimension = validate_fixed_size_list(array)?;
    if let Some(expected) = expected_dimension.filter(|&expected| expected != dimension) {
        return Err(StoreError::InconsistentBatchDimension {
            expected,
            actual: dimension,
        });
    }
    copy_list_values(array, column, dimension, start_row, out)?;
    Ok(dimension)
}

pub(crate) fn validate_fixed_size_list(array: &FixedSizeListArray) -> Result<usize, StoreError> {
    let value_type = array.value_type();
    if value_type != DataType::Float32 {
        return Err(StoreError::InvalidListValueType { actual: value_type });
    }
    usize::try_from(array.value_length()).map_err(|_| StoreError::InvalidDimension {
        actual: array.value_length(),
    })
}

pub(crate) fn copy_list_values(
    array: &FixedSizeListArray,
    column: &str,
    dimension: usize,
    start_row: usize,
    out: &mut Vec<f32>,
) -> Result<(), StoreError> {
    let rows = array.len();
    let additional = rows
        .checked_mul(dimension)
        .ok_or(StoreError::CapacityOverflow { rows, dimension })?;
    out.reserve(additional);
    for row_index in 0..rows {
        let absolute_row = start_row + row_index;
        if array.is_null(row_index) {
            return Err(StoreError::NullRow {
                column: column.to_owned(),
                row: absolute_row,
            });
        }
        let row = array.value(row_index);
        let floats = row.as_any().downcast_ref::<Float32Array>().ok_or_else(|| {
            StoreError::InvalidListValueType {
                actual: row.data_type().clone(),
            }
        })?;
        if floats.len() != dimension {
            return Err(StoreError::InvalidRowLength {
                row: absolute_row,
                expected: dimension,
                actual: floats.len(),
            });
        }
        if let Some(value_index) = (0..dimension).find(|&index| floats.is_null(index)) {
            return Err(StoreError::NullValue {
                row: absolute_row,
                value_index,
            });
        }
        out.extend(floats.iter().flatten());
    }
    Ok(())
}

/// Builds a non-nullable `FixedSizeList<Float32, dimension>` column.
pub(crate) fn fixed_size_list(
    name: &str,
    values: &[f32],
    dimension: usize,
) -> Result<(Field, ArrayRef), StoreError> {
    let width = i32::try_from(dimension).map_err(|_| StoreError::CapacityOverflow {
        rows: values.len().checked_div(dimension).unwrap_or_default(),
        dimension,
    })?;
    let child = Arc::new(Field::new("item", DataType::Float32, false));
    let array = FixedSizeListArray::try_new(
        Arc::clone(&child),
        width,
        Arc::new(Float32Array::from(values.to_vec())),
        None,
    )?;
    let field = Field::new(name, DataType::FixedSizeList(child, width), false);
    Ok((field, Arc::new(array)))
}
