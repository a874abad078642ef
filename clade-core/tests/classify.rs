//! Classification of new samples and fresh builds.

mod common;

use clade_core::{
    CladeBuilder, CladeErrorCode, CollaboratorError, Dataset, MembershipTable, NodeName,
    ProbabilityTable, Projector,
};
use clade_test_support::tracing::RecordingLayer;
use common::{SplitAtThree, consistent_points, disruptive_points, ids, names, projector, reference};
use rstest::rstest;

#[rstest]
fn classification_follows_a_single_path() {
    let clade = CladeBuilder::new()
        .build()
        .expect("configuration must be valid");
    let reference = reference();
    let assigned = clade
        .classify(&consistent_points(), &reference, &mut projector())
        .expect("classification must succeed");

    assert_eq!(assigned.sample_count(), 10);
    for sample in ["n0", "n4"] {
        assert_eq!(assigned.get(sample, &NodeName::from("0_1")), 1);
        assert_eq!(assigned.get(sample, &NodeName::from("0_1_0")), 1);
        assert_eq!(assigned.get(sample, &NodeName::from("0_1_0_0")), 1);
        assert_eq!(assigned.get(sample, &NodeName::from("0_1_0_1")), 0);
        assert_eq!(assigned.get(sample, &NodeName::from("0_0")), 0);
    }
    assert_eq!(assigned.get("m2", &NodeName::from("0_1_1")), 1);
}

#[rstest]
fn each_call_opens_its_run_span_under_the_current_subscriber() {
    let (clade, _) = RecordingLayer::capture(|| {
        CladeBuilder::new()
            .build()
            .expect("configuration must be valid")
    });
    let reference = reference();

    for _ in 0..2 {
        let (assigned, layer) = RecordingLayer::capture(|| {
            clade.classify(&consistent_points(), &reference, &mut projector())
        });
        assigned.expect("classification must succeed");
        let run = layer.span("clade.run").expect("run span closed");
        assert_eq!(run.fields.get("operation").map(String::as_str), Some("classify"));
        assert_eq!(run.fields.get("root").map(String::as_str), Some("0"));
        assert!(layer.span("clade.classify").is_some());
    }
}

/// Projector returning fixed probabilities for every sample.
struct Fixed(Vec<(NodeName, f32)>);

impl Projector for Fixed {
    fn project(
        &mut self,
        new: &Dataset,
        _reference: &Dataset,
        _membership: &MembershipTable,
    ) -> Result<ProbabilityTable, CollaboratorError> {
        ProbabilityTable::from_columns(
            new.samples().to_vec(),
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), vec![*value; new.len()]))
                .collect(),
        )
        .map_err(|error| CollaboratorError::new(error.to_string()))
    }
}

#[rstest]
fn low_confidence_projections_become_noise() {
    let clade = CladeBuilder::new()
        .with_probability_cutoff(0.5)
        .build()
        .expect("configuration must be valid");
    let mut projector = Fixed(vec![
        (NodeName::from("0_0"), 0.2),
        (NodeName::from("0_1"), 0.6),
        (NodeName::from("0_1_0"), 0.3),
        (NodeName::from("0_1_1"), 0.4),
    ]);
    let assigned = clade
        .classify(&disruptive_points(), &reference(), &mut projector)
        .expect("classification must succeed");
    assert_eq!(assigned.population(&NodeName::from("0_1")), 10);
    assert_eq!(assigned.population(&NodeName::from("0_0")), 0);
    assert_eq!(assigned.population(&NodeName::from("0_1_0")), 0);
    assert_eq!(assigned.population(&NodeName::from("0_1_1")), 0);
}

struct Failing;

impl Projector for Failing {
    fn project(
        &mut self,
        _new: &Dataset,
        _reference: &Dataset,
        _membership: &MembershipTable,
    ) -> Result<ProbabilityTable, CollaboratorError> {
        Err(CollaboratorError::new("model file missing"))
    }
}

#[rstest]
fn projector_failures_are_wrapped() {
    let clade = CladeBuilder::new()
        .build()
        .expect("configuration must be valid");
    let err = clade
        .classify(&consistent_points(), &reference(), &mut Failing)
        .expect_err("projector failure must surface");
    assert_eq!(err.code(), CladeErrorCode::ProjectorFailure);
    assert!(err.to_string().contains("model file missing"));
}

#[rstest]
fn mismatched_widths_are_rejected() {
    let clade = CladeBuilder::new()
        .build()
        .expect("configuration must be valid");
    let wide = Dataset::try_new(ids(&["w"]), vec![vec![0.0, 0.0, 0.0]]).expect("valid dataset");
    let err = clade
        .classify(&wide, &reference(), &mut projector())
        .expect_err("width mismatch must be rejected");
    assert_eq!(err.code(), CladeErrorCode::UnconvertibleInput);
}

#[rstest]
fn cluster_builds_from_the_root_and_exports_a_tree() {
    let clade = CladeBuilder::new()
        .build()
        .expect("configuration must be valid");
    let reference = reference();
    let mut builder = SplitAtThree::default();
    let clustering = clade
        .cluster(reference.data(), &mut builder)
        .expect("clustering must succeed");

    assert_eq!(builder.calls, [(NodeName::from("0"), 0, 100)]);
    assert_eq!(names(clustering.membership()), ["0_0", "0_1"]);
    assert_eq!(clustering.membership().population(&NodeName::from("0_1")), 10);
    let tree = clustering.tree();
    assert_eq!(tree.len(), 3);
    assert!(
        tree.leaves()
            .all(|node| node.parent == Some(NodeName::from("0")))
    );
}
