//! Checkpoint store and projection source backed by a run directory.
use std::{fs, io, path::PathBuf};

use clade_core::{
    CheckpointStore, CollaboratorError, Dataset, MembershipTable, NodeName, ParamTable,
    ProjectionSource,
};
use tracing::{debug, instrument, warn};

use crate::{
    dataset::{PROJECTION_COLUMN, read_dataset},
    errors::StoreError,
    layout::{RunLayout, is_parquet, is_temporary},
    membership::{read_membership, write_membership},
    params::{read_params, write_params},
};

/// Reads and writes the parameter table, per-node checkpoints and scoring
/// projections of one run directory.
#[derive(Clone, Debug)]
pub struct ParquetCheckpointStore {
    layout: RunLayout,
}

impl ParquetCheckpointStore {
    /// Creates a store over `layout`.
    #[must_use]
    pub fn new(layout: RunLayout) -> Self {
        Self { layout }
    }

    /// The run directory layout.
    #[must_use]
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Persists the checkpoint of `node`, which holds its local children.
    ///
    /// # Errors
    /// Returns [`StoreError`] when encoding or writing fails.
    #[instrument(
        name = "clade.store.write_checkpoint",
        err,
        skip(self, table),
        fields(columns = table.column_count()),
    )]
    pub fn write_checkpoint(
        &self,
        node: &NodeName,
        table: &MembershipTable,
    ) -> Result<(), StoreError> {
        write_membership(self.layout.checkpoint(node), table)
    }

    /// Persists the parameter table.
    ///
    /// # Errors
    /// Returns [`StoreError`] when encoding or writing fails.
    pub fn write_params(&self, params: &ParamTable) -> Result<(), StoreError> {
        write_params(self.layout.params(), params)
    }

    /// Lists checkpoint files in name order, skipping leftovers of
    /// interrupted writes.
    fn checkpoint_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let directory = self.layout.checkpoint_dir();
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StoreError::io(&directory)(error)),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(StoreError::io(&directory))?.path();
            if is_temporary(&path) {
                warn!(path = %path.display(), "ignoring incomplete checkpoint");
            } else if is_parquet(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl CheckpointStore for ParquetCheckpointStore {
    fn location(&self) -> String {
        self.layout.data_dir().display().to_string()
    }

    fn load_params(&self) -> Result<Option<ParamTable>, CollaboratorError> {
        let path = self.layout.params();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_params(path)?))
    }

    fn load_checkpoints(&self) -> Result<Vec<MembershipTable>, CollaboratorError> {
        let paths = self.checkpoint_paths()?;
        debug!(count = paths.len(), "loading checkpoints");
        paths
            .into_iter()
            .map(|path| read_membership(path).map_err(CollaboratorError::from))
            .collect()
    }
}

impl ProjectionSource for ParquetCheckpointStore {
    fn projection(&self, node: &NodeName) -> Result<Option<Dataset>, CollaboratorError> {
        let path = self.layout.projection(node);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_dataset(path, PROJECTION_COLUMN)?))
    }
}
