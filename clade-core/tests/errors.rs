use std::sync::Arc;

use clade_core::{
    CladeError, CladeErrorCode, CollaboratorError, ExecutionStrategy, NodeName, ScoreError,
    TableError, TableErrorCode,
};
use rstest::rstest;

#[rstest]
#[case(TableError::DuplicateSample { sample: Arc::from("a") }, TableErrorCode::DuplicateSample)]
#[case(
    TableError::DuplicateColumn { name: NodeName::from("0_1") },
    TableErrorCode::DuplicateColumn,
)]
#[case(
    TableError::LengthMismatch { column: NodeName::from("0_1"), expected: 2, actual: 1 },
    TableErrorCode::LengthMismatch,
)]
#[case(
    TableError::InvalidValue { column: NodeName::from("0_1"), row: 0, value: Arc::from("2") },
    TableErrorCode::InvalidValue,
)]
fn returns_expected_table_code(#[case] error: TableError, #[case] expected: TableErrorCode) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().as_str(), expected.as_str());
}

#[rstest]
#[case(CladeError::InvalidTolerance { got: -1.0 }, CladeErrorCode::InvalidTolerance, None)]
#[case(
    CladeError::InvalidProbabilityCutoff { got: 2.0 },
    CladeErrorCode::InvalidProbabilityCutoff,
    None,
)]
#[case(CladeError::InvalidMinClusterSize { got: 0 }, CladeErrorCode::InvalidMinClusterSize, None)]
#[case(
    CladeError::NoCheckpoints { location: Arc::from("clade_data/chk") },
    CladeErrorCode::NoCheckpoints,
    None,
)]
#[case(
    CladeError::RootInvalidated { root: NodeName::from("0"), delta: -0.4 },
    CladeErrorCode::RootInvalidated,
    None,
)]
#[case(
    CladeError::BackendUnavailable { requested: ExecutionStrategy::GpuPreferred },
    CladeErrorCode::BackendUnavailable,
    None,
)]
#[case(
    CladeError::Builder { node: NodeName::from("0_1"), source: CollaboratorError::new("oom") },
    CladeErrorCode::BuilderFailure,
    None,
)]
#[case(
    CladeError::Score { node: NodeName::from("0_1"), source: ScoreError::ZeroDiameter },
    CladeErrorCode::ScoreFailure,
    None,
)]
#[case(
    CladeError::Table(TableError::DuplicateSample { sample: Arc::from("a") }),
    CladeErrorCode::TableFailure,
    Some(TableErrorCode::DuplicateSample),
)]
fn returns_expected_clade_code(
    #[case] error: CladeError,
    #[case] expected: CladeErrorCode,
    #[case] table_code: Option<TableErrorCode>,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().as_str(), expected.as_str());
    assert!(error.code().as_str().starts_with("CLADE_"));
    assert_eq!(error.table_code(), table_code);
}

#[rstest]
fn root_invalidation_message_names_the_root() {
    let error = CladeError::RootInvalidated {
        root: NodeName::from("0"),
        delta: -0.25,
    };
    let message = error.to_string();
    assert!(message.contains("`0`"));
    assert!(message.contains("0.250"));
}
