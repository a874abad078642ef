//! Parquet and JSON persistence for `clade` runs.
//!
//! Datasets, membership tables and the parameter table travel as Parquet
//! files with a `sample` Utf8 column; trees are exported as JSON. Every write
//! goes through a temporary sibling renamed into place.

mod checkpoint;
mod dataset;
mod errors;
mod ingest;
mod layout;
mod membership;
mod params;
mod tree;

pub use checkpoint::ParquetCheckpointStore;
pub use dataset::{
    FEATURE_COLUMN, PROJECTION_COLUMN, dataset_batch, read_dataset, read_dataset_from,
    write_dataset,
};
pub use errors::StoreError;
pub use ingest::SAMPLE_COLUMN;
pub use layout::{DATA_DIR, RunLayout};
pub use membership::{membership_batch, read_membership, read_membership_from, write_membership};
pub use params::{params_batch, read_params, read_params_from, write_params};
pub use tree::{read_tree, write_tree};

#[cfg(test)]
mod tests;
