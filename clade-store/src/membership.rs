//! One-hot membership tables stored as Parquet.
//!
//! The file holds a `sample` Utf8 column followed by one UInt8 column per
//! node, in hierarchy order.
use std::{path::Path, sync::Arc};

use arrow_array::{ArrayRef, RecordBatch, UInt8Array};
use arrow_schema::{DataType, Field, Schema};
use clade_core::{MembershipTable, NodeName};
use parquet::file::reader::ChunkReader;

use crate::{
    errors::StoreError,
    ingest::{
        SAMPLE_COLUMN, append_strings, open, read_batches, sample_array, sample_field, sample_ids,
        typed_column, write_batch,
    },
    layout::write_atomically,
};

/// Loads a membership table from a Parquet file.
///
/// # Errors
/// Returns [`StoreError`] when the file cannot be read, a node column is not
/// UInt8, holds nulls, or holds values other than 0 and 1.
pub fn read_membership(path: impl AsRef<Path>) -> Result<MembershipTable, StoreError> {
    read_membership_from(open(path.as_ref())?)
}

/// Loads a membership table from any Parquet reader.
///
/// # Errors
/// See [`read_membership`].
pub fn read_membership_from<R>(reader: R) -> Result<MembershipTable, StoreError>
where
    R: ChunkReader + Send + 'static,
{
    let (schema, batches) = read_batches(reader)?;
    let names: Vec<&str> = schema
        .fields()
        .iter()
        .map(|field| field.name().as_str())
        .filter(|&name| name != SAMPLE_COLUMN)
        .collect();
    let mut samples = Vec::new();
    let mut columns: Vec<Vec<u8>> = vec![Vec::new(); names.len()];
    for batch in &batches {
        let start = samples.len();
        append_strings(batch, SAMPLE_COLUMN, start, &mut samples)?;
        for (name, column) in names.iter().zip(columns.iter_mut()) {
            let values = typed_column::<UInt8Array>(batch, name, "UInt8")?;
            for (offset, value) in values.iter().enumerate() {
                column.push(value.ok_or_else(|| StoreError::NullRow {
                    column: (*name).to_owned(),
                    row: start + offset,
                })?);
            }
        }
    }
    let mut table = MembershipTable::from_columns(
        sample_ids(samples),
        names
            .into_iter()
            .map(NodeName::from)
            .zip(columns)
            .collect(),
    )?;
    table.sort_columns();
    Ok(table)
}

/// Encodes `table` as a record batch.
///
/// # Errors
/// Returns [`StoreError`] when the batch cannot be assembled.
pub fn membership_batch(table: &MembershipTable) -> Result<RecordBatch, StoreError> {
    let mut fields = vec![sample_field()];
    let mut arrays: Vec<ArrayRef> = vec![sample_array(table.samples())];
    for (name, values) in table.columns() {
        fields.push(Field::new(name.as_str(), DataType::UInt8, false));
        arrays.push(Arc::new(UInt8Array::from(values.to_vec())));
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Writes `table` to `path` atomically.
///
/// # Errors
/// Returns [`StoreError`] when encoding or writing fails.
pub fn write_membership(path: impl AsRef<Path>, table: &MembershipTable) -> Result<(), StoreError> {
    let batch = membership_batch(table)?;
    write_atomically(path.as_ref(), |file| write_batch(file, &batch))
}
