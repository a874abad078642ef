//! Run directories shared across CLI tests.
//!
//! A reference run holds two well separated blobs split at the root; the new
//! samples sit inside the second blob.

use std::path::{Path, PathBuf};

use clade_core::{Dataset, MembershipTable, NodeName, ParamRecord, ParamTable, SampleId};
use clade_store::{
    FEATURE_COLUMN, ParquetCheckpointStore, RunLayout, write_dataset, write_membership,
    write_params,
};
use clade_test_support::fixtures::{Blob, uniform_blob};
use tempfile::TempDir;

use super::{Cli, CliError, ReferenceArgs, SettingsArgs, run_cli};

pub(super) const REFERENCE_RUN: &str = "reference";

pub(super) struct Workspace {
    pub(super) dir: TempDir,
    pub(super) reference: PathBuf,
    pub(super) new: PathBuf,
}

impl Workspace {
    pub(super) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(super) fn layout(&self) -> RunLayout {
        RunLayout::new(self.dir.path())
    }

    pub(super) fn reference_args(&self) -> ReferenceArgs {
        ReferenceArgs {
            run_dir: self.dir.path().to_path_buf(),
            run: REFERENCE_RUN.to_owned(),
            data: self.reference.clone(),
            column: FEATURE_COLUMN.to_owned(),
        }
    }
}

pub(super) fn dataset(blob: Blob) -> Dataset {
    let samples = blob
        .samples
        .iter()
        .map(|sample| SampleId::from(sample.as_str()))
        .collect();
    Dataset::try_new(samples, blob.rows).expect("valid dataset")
}

fn root_split(data: &Dataset, first: usize) -> MembershipTable {
    let left: Vec<u8> = (0..data.len()).map(|row| u8::from(row < first)).collect();
    let right = left.iter().map(|value| 1 - value).collect();
    MembershipTable::from_columns(
        data.samples().to_vec(),
        vec![(NodeName::from("0_0"), left), (NodeName::from("0_1"), right)],
    )
    .expect("valid table")
}

/// A finished reference run plus a file of new samples.
pub(super) fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dataset(
        uniform_blob("a", 20, &[0.0, 0.0], 0.3, 1).chain(uniform_blob(
            "b",
            20,
            &[10.0, 0.0],
            0.3,
            2,
        )),
    );
    let layout = RunLayout::new(dir.path());
    let reference = dir.path().join("reference.parquet");
    let new = dir.path().join("new.parquet");
    write_dataset(&reference, &data, FEATURE_COLUMN).expect("reference data");
    write_dataset(
        &new,
        &dataset(uniform_blob("n", 5, &[10.0, 0.0], 0.3, 3)),
        FEATURE_COLUMN,
    )
    .expect("new data");
    let membership = root_split(&data, 20);
    write_membership(layout.clusters(REFERENCE_RUN), &membership).expect("membership");
    write_params(
        layout.params(),
        &ParamTable::try_new(vec![ParamRecord::new(NodeName::from("0"), 2)])
            .expect("unique names"),
    )
    .expect("params");
    ParquetCheckpointStore::new(layout)
        .write_checkpoint(&NodeName::from("0"), &membership)
        .expect("checkpoint");
    Workspace {
        dir,
        reference,
        new,
    }
}

pub(super) fn settings() -> SettingsArgs {
    SettingsArgs::default()
}

pub(super) fn run_cli_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run_cli(cli) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}
