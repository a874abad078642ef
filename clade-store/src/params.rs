//! The per-node parameter table stored as Parquet.
use std::{path::Path, sync::Arc};

use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use clade_core::{NodeName, ParamRecord, ParamTable};
use parquet::file::reader::ChunkReader;

use crate::{
    errors::StoreError,
    ingest::{open, read_batches, typed_column, write_batch},
    layout::write_atomically,
};

const NAME: &str = "name";
const COUNT_COLUMNS: [&str; 4] = ["n_samples", "n_clusters", "dim", "n_neighbours"];
const SCORE_COLUMNS: [&str; 4] = [
    "obj_function_score",
    "cluster_parm",
    "features_cutoff",
    "reassigned",
];
const LABEL_COLUMNS: [&str; 3] = ["metric_map", "metric_clust", "norm"];
const SEED: &str = "seed";

fn schema() -> Schema {
    let mut fields = vec![Field::new(NAME, DataType::Utf8, false)];
    fields.extend(
        COUNT_COLUMNS
            .iter()
            .map(|&name| Field::new(name, DataType::UInt64, false)),
    );
    fields.extend(
        SCORE_COLUMNS
            .iter()
            .map(|&name| Field::new(name, DataType::Float64, false)),
    );
    fields.extend(
        LABEL_COLUMNS
            .iter()
            .map(|&name| Field::new(name, DataType::Utf8, false)),
    );
    fields.push(Field::new(SEED, DataType::UInt64, false));
    Schema::new(fields)
}

fn counts(record: &ParamRecord) -> [usize; 4] {
    [
        record.n_samples,
        record.n_clusters,
        record.dim,
        record.n_neighbours,
    ]
}

fn scores(record: &ParamRecord) -> [f64; 4] {
    [
        record.obj_function_score,
        record.cluster_parm,
        record.features_cutoff,
        record.reassigned,
    ]
}

fn labels(record: &ParamRecord) -> [&str; 3] {
    [&record.metric_map, &record.metric_clust, &record.norm]
}

/// Encodes `params` as a record batch with one row per node.
///
/// # Errors
/// Returns [`StoreError`] when the batch cannot be assembled.
pub fn params_batch(params: &ParamTable) -> Result<RecordBatch, StoreError> {
    let records = params.records();
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
        records.iter().map(|record| record.name.as_str()),
    ))];
    for position in 0..COUNT_COLUMNS.len() {
        arrays.push(Arc::new(UInt64Array::from_iter_values(records.iter().map(
            |record| {
                counts(record)
                    .get(position)
                    .and_then(|&count| u64::try_from(count).ok())
                    .unwrap_or(u64::MAX)
            },
        ))));
    }
    for position in 0..SCORE_COLUMNS.len() {
        arrays.push(Arc::new(Float64Array::from_iter_values(records.iter().map(
            |record| scores(record).get(position).copied().unwrap_or(f64::NAN),
        ))));
    }
    for position in 0..LABEL_COLUMNS.len() {
        arrays.push(Arc::new(StringArray::from_iter_values(records.iter().map(
            |record| labels(record).get(position).copied().unwrap_or_default(),
        ))));
    }
    arrays.push(Arc::new(UInt64Array::from_iter_values(
        records.iter().map(|record| record.seed),
    )));
    Ok(RecordBatch::try_new(Arc::new(schema()), arrays)?)
}

/// Writes `params` to `path` atomically.
///
/// # Errors
/// Returns [`StoreError`] when encoding or writing fails.
pub fn write_params(path: impl AsRef<Path>, params: &ParamTable) -> Result<(), StoreError> {
    let batch = params_batch(params)?;
    write_atomically(path.as_ref(), |file| write_batch(file, &batch))
}

/// Loads the parameter table from a Parquet file.
///
/// # Errors
/// Returns [`StoreError`] when the file cannot be read, a column is missing,
/// mistyped or null, or node names repeat.
pub fn read_params(path: impl AsRef<Path>) -> Result<ParamTable, StoreError> {
    read_params_from(open(path.as_ref())?)
}

/// Loads the parameter table from any Parquet reader.
///
/// # Errors
/// See [`read_params`].
pub fn read_params_from<R>(reader: R) -> Result<ParamTable, StoreError>
where
    R: ChunkReader + Send + 'static,
{
    let (_, batches) = read_batches(reader)?;
    let mut records = Vec::new();
    for batch in &batches {
        let start = records.len();
        for row in 0..batch.num_rows() {
            records.push(record_at(batch, row, start + row)?);
        }
    }
    Ok(ParamTable::try_new(records)?)
}

fn record_at(batch: &RecordBatch, row: usize, absolute: usize) -> Result<ParamRecord, StoreError> {
    let null = |column: &str| StoreError::NullRow {
        column: column.to_owned(),
        row: absolute,
    };
    let text = |column: &str| -> Result<String, StoreError> {
        let values = typed_column::<StringArray>(batch, column, "Utf8")?;
        values
            .iter()
            .nth(row)
            .flatten()
            .map(str::to_owned)
            .ok_or_else(|| null(column))
    };
    let unsigned = |column: &str| -> Result<u64, StoreError> {
        let values = typed_column::<UInt64Array>(batch, column, "UInt64")?;
        values.iter().nth(row).flatten().ok_or_else(|| null(column))
    };
    let count = |column: &str| -> Result<usize, StoreError> {
        let value = unsigned(column)?;
        usize::try_from(value).map_err(|_| StoreError::OutOfRange {
            column: column.to_owned(),
            row: absolute,
            value: value.to_string(),
        })
    };
    let float = |column: &str| -> Result<f64, StoreError> {
        let values = typed_column::<Float64Array>(batch, column, "Float64")?;
        values.iter().nth(row).flatten().ok_or_else(|| null(column))
    };

    Ok(ParamRecord {
        name: NodeName::from(text(NAME)?),
        n_samples: count("n_samples")?,
        n_clusters: count("n_clusters")?,
        dim: count("dim")?,
        obj_function_score: float("obj_function_score")?,
        n_neighbours: count("n_neighbours")?,
        cluster_parm: float("cluster_parm")?,
        features_cutoff: float("features_cutoff")?,
        metric_map: text("metric_map")?,
        metric_clust: text("metric_clust")?,
        norm: text("norm")?,
        reassigned: float("reassigned")?,
        seed: unsigned(SEED)?,
    })
}
