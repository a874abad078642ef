//! Reconstructing interrupted builds from checkpoints.

mod common;

use clade_core::{
    CheckpointStore, CladeBuilder, CladeErrorCode, CollaboratorError, MembershipTable, NodeName,
    ParamRecord, ParamTable,
};
use clade_test_support::tracing::RecordingLayer;
use common::{SplitAtThree, names, reference};
use rstest::{fixture, rstest};
use tracing::Level;

#[derive(Default)]
struct MemoryStore {
    params: Option<ParamTable>,
    checkpoints: Vec<MembershipTable>,
}

impl CheckpointStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_owned()
    }

    fn load_params(&self) -> Result<Option<ParamTable>, CollaboratorError> {
        Ok(self.params.clone())
    }

    fn load_checkpoints(&self) -> Result<Vec<MembershipTable>, CollaboratorError> {
        Ok(self.checkpoints.clone())
    }
}

fn params(names: &[&str]) -> ParamTable {
    ParamTable::try_new(
        names
            .iter()
            .map(|&name| ParamRecord::new(NodeName::from(name), 2))
            .collect(),
    )
    .expect("unique names")
}

/// A run interrupted after splitting the root and `0_1` but before `0_0`.
#[fixture]
fn interrupted() -> MemoryStore {
    let reference = reference();
    let membership = reference.membership();
    let root = membership
        .select_columns(&[NodeName::from("0_0"), NodeName::from("0_1")])
        .expect("columns exist");
    let inner = membership
        .select_columns(&[NodeName::from("0_1_0"), NodeName::from("0_1_1")])
        .expect("columns exist");
    MemoryStore {
        params: Some(params(&["0", "0_1", "0_1_0_0"])),
        checkpoints: vec![inner, root],
    }
}

#[rstest]
fn resume_rebuilds_unfinished_nodes(interrupted: MemoryStore) {
    let clade = CladeBuilder::new()
        .with_population_cutoff(20)
        .build()
        .expect("configuration must be valid");
    let data = reference().data().clone();
    let mut builder = SplitAtThree::default();
    let (report, layer) =
        RecordingLayer::capture(|| clade.resume(&data, &interrupted, &mut builder));
    let report = report.expect("resume must succeed");

    assert_eq!(report.dropped_params(), 1, "0_1_0_0 has no checkpoint column");
    let warnings = layer.events_with_message(
        Level::WARN,
        "discrepancies between parameter table and checkpoints found; stale records dropped",
    );
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("dropped"), Some("1"));
    assert_eq!(report.resumed(), [NodeName::from("0_0")]);
    assert_eq!(builder.calls, [(NodeName::from("0_0"), 1, 80)]);
    assert_eq!(
        names(report.membership()),
        ["0_0", "0_1", "0_0_0", "0_1_0", "0_1_1"]
    );
    assert_eq!(report.membership().sample_count(), 100);
    assert_eq!(report.tree().root().map(|node| node.population), Some(100));
}

#[rstest]
fn finished_run_warns_and_returns_the_checkpoints(mut interrupted: MemoryStore) {
    interrupted.params = Some(params(&["0", "0_0", "0_1", "0_1_0", "0_1_1"]));
    let clade = CladeBuilder::new()
        .with_population_cutoff(20)
        .build()
        .expect("configuration must be valid");
    let data = reference().data().clone();
    let mut builder = SplitAtThree::default();
    let (report, layer) =
        RecordingLayer::capture(|| clade.resume(&data, &interrupted, &mut builder));
    let report = report.expect("resume must succeed");

    assert!(report.resumed().is_empty());
    assert!(builder.calls.is_empty());
    assert_eq!(report.membership().column_count(), 4);
    assert!(layer.has_message(
        Level::WARN,
        "no resumable node found; the run might have completed successfully"
    ));
}

#[rstest]
fn depth_limit_stops_resumption() {
    let reference = reference();
    let store = MemoryStore {
        params: Some(params(&["0"])),
        checkpoints: vec![reference.membership().clone()],
    };
    let clade = CladeBuilder::new()
        .with_population_cutoff(1)
        .with_max_depth(Some(1))
        .build()
        .expect("configuration must be valid");
    let report = clade
        .resume(reference.data(), &store, &mut SplitAtThree::default())
        .expect("resume must succeed");
    assert!(report.resumed().is_empty());
    assert_eq!(report.dropped_params(), 0);
}

#[rstest]
#[case::missing(None, Vec::new(), CladeErrorCode::MissingParameterTable)]
#[case::empty(Some(ParamTable::default()), Vec::new(), CladeErrorCode::EmptyParameterTable)]
#[case::no_checkpoints(Some(params(&["0"])), Vec::new(), CladeErrorCode::NoCheckpoints)]
fn unusable_stores_are_fatal(
    #[case] stored: Option<ParamTable>,
    #[case] checkpoints: Vec<MembershipTable>,
    #[case] code: CladeErrorCode,
) {
    let store = MemoryStore {
        params: stored,
        checkpoints,
    };
    let clade = CladeBuilder::new()
        .build()
        .expect("configuration must be valid");
    let err = clade
        .resume(reference().data(), &store, &mut SplitAtThree::default())
        .expect_err("resume must fail");
    assert_eq!(err.code(), code);
}
