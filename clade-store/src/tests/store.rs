use std::fs;

use clade_core::{
    CheckpointStore, CladeBuilder, CladeErrorCode, CollaboratorError, Dataset, HierarchyTree,
    MembershipTable, NodeName, ParamRecord, ParamTable, ProjectionSource, SampleId,
};
use clade_test_support::{fixtures::uniform_blob, tracing::RecordingLayer};
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tracing::Level;

use super::support::dataset;
use crate::{
    PROJECTION_COLUMN, ParquetCheckpointStore, RunLayout, read_membership, read_tree,
    write_dataset, write_membership, write_tree,
};

struct Run {
    _dir: TempDir,
    store: ParquetCheckpointStore,
    data: Dataset,
}

fn names(table: &MembershipTable) -> Vec<&str> {
    table.column_names().iter().map(NodeName::as_str).collect()
}

/// A run whose root split into `0_0` (20 points) and `0_1` (10 points)
/// before being interrupted.
#[fixture]
fn interrupted() -> Run {
    let blob = uniform_blob("a", 20, &[0.0, 0.0], 0.5, 1).chain(uniform_blob(
        "b",
        10,
        &[10.0, 0.0],
        0.5,
        2,
    ));
    let samples: Vec<SampleId> = blob
        .samples
        .iter()
        .map(|s| SampleId::from(s.as_str()))
        .collect();
    let data = Dataset::try_new(samples.clone(), blob.rows).expect("valid dataset");
    let first = (0..30).map(|index| u8::from(index < 20)).collect::<Vec<_>>();
    let second = first.iter().map(|value| 1 - value).collect();
    let root = MembershipTable::from_columns(
        samples,
        vec![
            (NodeName::from("0_0"), first),
            (NodeName::from("0_1"), second),
        ],
    )
    .expect("valid checkpoint");

    let dir = tempfile::tempdir().expect("tempdir");
    let store = ParquetCheckpointStore::new(RunLayout::new(dir.path()));
    store
        .write_checkpoint(&NodeName::from("0"), &root)
        .expect("checkpoint");
    store
        .write_params(
            &ParamTable::try_new(vec![ParamRecord::new(NodeName::from("0"), 2)])
                .expect("unique names"),
        )
        .expect("params");
    Run {
        _dir: dir,
        store,
        data,
    }
}

type Built = Result<Option<MembershipTable>, CollaboratorError>;

fn halve(
    calls: &mut Vec<(String, usize, usize)>,
) -> impl FnMut(&Dataset, usize, &NodeName) -> Built + '_ {
    move |subset: &Dataset, depth: usize, name: &NodeName| {
        calls.push((name.to_string(), depth, subset.len()));
        if name.as_str() != "0_0" {
            return Ok(None);
        }
        let half = subset.len() / 2;
        let first = (0..subset.len())
            .map(|index| u8::from(index < half))
            .collect::<Vec<_>>();
        let second = first.iter().map(|value| 1 - value).collect();
        MembershipTable::from_columns(
            subset.samples().to_vec(),
            vec![(name.child(0), first), (name.child(1), second)],
        )
        .map(Some)
        .map_err(|err| CollaboratorError::new(err.to_string()))
    }
}

#[rstest]
fn missing_parameter_table_loads_as_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ParquetCheckpointStore::new(RunLayout::new(dir.path()));
    assert!(store.load_params().expect("load").is_none());
    assert!(store.load_checkpoints().expect("load").is_empty());
}

#[rstest]
fn resume_without_parameter_table_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ParquetCheckpointStore::new(RunLayout::new(dir.path()));
    let clade = CladeBuilder::new()
        .build()
        .expect("valid settings");
    let mut calls = Vec::new();
    let err = clade
        .resume(&dataset(), &store, &mut halve(&mut calls))
        .expect_err("nothing to resume");
    assert_eq!(err.code(), CladeErrorCode::MissingParameterTable);
    assert!(calls.is_empty());
}

#[rstest]
fn resume_without_checkpoints_is_fatal(interrupted: Run) {
    fs::remove_dir_all(interrupted.store.layout().checkpoint_dir()).expect("remove chk");
    let clade = CladeBuilder::new()
        .build()
        .expect("valid settings");
    let mut calls = Vec::new();
    let err = clade
        .resume(&interrupted.data, &interrupted.store, &mut halve(&mut calls))
        .expect_err("no checkpoints");
    assert_eq!(err.code(), CladeErrorCode::NoCheckpoints);
}

#[rstest]
fn interrupted_writes_are_skipped_with_a_warning(interrupted: Run) {
    let leftover = interrupted
        .store
        .layout()
        .checkpoint_dir()
        .join(".0_0.parquet.tmp");
    fs::write(&leftover, b"partial").expect("leftover");
    let (loaded, recorder) = RecordingLayer::capture(|| interrupted.store.load_checkpoints());
    assert_eq!(loaded.expect("load").len(), 1);
    assert!(recorder.has_message(Level::WARN, "ignoring incomplete checkpoint"));
}

#[rstest]
fn corrupt_checkpoints_surface_as_store_errors(interrupted: Run) {
    let corrupt = interrupted
        .store
        .layout()
        .checkpoint(&NodeName::from("0_1"));
    fs::write(&corrupt, b"not parquet").expect("corrupt");
    let clade = CladeBuilder::new()
        .build()
        .expect("valid settings");
    let mut calls = Vec::new();
    let err = clade
        .resume(&interrupted.data, &interrupted.store, &mut halve(&mut calls))
        .expect_err("corrupt checkpoint");
    assert_eq!(err.code(), CladeErrorCode::StoreFailure);
}

#[rstest]
fn resume_builds_unfinished_nodes_and_exports(interrupted: Run) {
    let clade = CladeBuilder::new()
        .with_population_cutoff(5)
        .build()
        .expect("valid settings");
    let mut calls = Vec::new();
    let report = clade
        .resume(&interrupted.data, &interrupted.store, &mut halve(&mut calls))
        .expect("resume");
    assert_eq!(
        calls,
        [("0_0".to_owned(), 1, 20), ("0_1".to_owned(), 1, 10)]
    );
    assert_eq!(names(report.membership()), ["0_0", "0_1", "0_0_0", "0_0_1"]);
    assert_eq!(report.dropped_params(), 0);

    let layout = interrupted.store.layout();
    write_membership(layout.clusters("demo"), report.membership()).expect("clusters");
    write_tree(layout.tree("demo"), report.tree()).expect("tree");
    assert_eq!(
        &read_membership(layout.clusters("demo")).expect("read clusters"),
        report.membership()
    );
    let tree: HierarchyTree = read_tree(layout.tree("demo")).expect("read tree");
    assert_eq!(&tree, report.tree());
    assert_eq!(tree.leaves().count(), 3);
}

#[rstest]
fn projections_are_read_when_persisted(interrupted: Run) {
    let node = NodeName::from("0_1");
    let layout = interrupted.store.layout();
    write_dataset(layout.projection(&node), &dataset(), PROJECTION_COLUMN).expect("write");
    let stored = interrupted
        .store
        .projection(&node)
        .expect("readable")
        .expect("persisted");
    assert_eq!(stored.len(), 3);
    assert!(
        interrupted
            .store
            .projection(&NodeName::from("0_0"))
            .expect("readable")
            .is_none()
    );
}
