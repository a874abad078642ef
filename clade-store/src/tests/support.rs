use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{Field, Schema};
use bytes::Bytes;
use clade_core::{Dataset, MembershipTable, NodeName, ParamRecord, ParamTable, SampleId};
use parquet::arrow::arrow_writer::ArrowWriter;

pub(crate) fn ids(names: &[&str]) -> Vec<SampleId> {
    names.iter().map(|&name| SampleId::from(name)).collect()
}

pub(crate) fn dataset() -> Dataset {
    Dataset::try_new(
        ids(&["a", "b", "c"]),
        vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.5, -1.0]],
    )
    .expect("valid dataset")
}

pub(crate) fn membership() -> MembershipTable {
    MembershipTable::from_columns(
        ids(&["a", "b", "c"]),
        vec![
            (NodeName::from("0_0"), vec![1, 1, 0]),
            (NodeName::from("0_1"), vec![0, 0, 1]),
            (NodeName::from("0_0_0"), vec![1, 0, 0]),
            (NodeName::from("0_0_1"), vec![0, 1, 0]),
        ],
    )
    .expect("valid table")
}

pub(crate) fn params() -> ParamTable {
    let mut root = ParamRecord::new(NodeName::from("0"), 2);
    root.n_samples = 3;
    root.dim = 2;
    root.obj_function_score = 0.75;
    root.n_neighbours = 15;
    root.cluster_parm = 0.5;
    root.features_cutoff = 0.1;
    root.metric_map = "cosine".to_owned();
    root.metric_clust = "euclidean".to_owned();
    root.norm = "l2".to_owned();
    root.reassigned = 0.25;
    root.seed = 32;
    ParamTable::try_new(vec![root, ParamRecord::new(NodeName::from("0_0"), 2)])
        .expect("unique names")
}

/// Serialises arbitrary columns to an in-memory Parquet file.
pub(crate) fn parquet(columns: Vec<(Field, ArrayRef)>) -> Bytes {
    let (fields, arrays): (Vec<_>, Vec<_>) = columns.into_iter().unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays).expect("batch");
    let mut buffer = Vec::new();
    {
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).expect("writer");
        writer.write(&batch).expect("write");
        writer.close().expect("close");
    }
    Bytes::from(buffer)
}

/// Serialises an encoded batch to an in-memory Parquet file.
pub(crate) fn encode(batch: &RecordBatch) -> Bytes {
    let mut buffer = Vec::new();
    crate::ingest::write_batch(&mut buffer, batch).expect("write");
    Bytes::from(buffer)
}
