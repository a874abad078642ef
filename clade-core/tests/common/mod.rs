//! Shared fixtures for the clade-core API tests.
//!
//! The reference hierarchy has a tight root child `0_0` of 80 points near
//! the origin and a root child `0_1` of 20 points near `(20, 2)`. `0_1`
//! splits into `0_1_0` around `(20, 0)` and `0_1_1` around `(20, 4)`, and
//! `0_1_0` splits once more along the second axis.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::{num::NonZeroUsize, sync::Arc};

use clade_core::{
    CollaboratorError, Dataset, KnnProjector, MembershipTable, Metric, NodeName, ParamRecord,
    ParamTable, ReferenceHierarchy, SampleId,
};
use clade_test_support::fixtures::{Blob, line, uniform_blob};

pub fn dataset(blob: &Blob) -> Dataset {
    Dataset::try_new(
        blob.samples
            .iter()
            .map(|id| Arc::from(id.as_str()))
            .collect(),
        blob.rows.clone(),
    )
    .expect("fixture rows are valid")
}

fn indicator(samples: &[String], members: &[String]) -> Vec<u8> {
    samples
        .iter()
        .map(|sample| u8::from(members.contains(sample)))
        .collect()
}

pub fn reference_blobs() -> (Blob, Blob, Blob, Blob) {
    (
        uniform_blob("a", 80, &[0.0, 0.0], 0.25, 1),
        uniform_blob("b", 5, &[20.0, -0.5], 0.05, 2),
        uniform_blob("c", 5, &[20.0, 0.5], 0.05, 3),
        uniform_blob("d", 10, &[20.0, 4.0], 0.1, 4),
    )
}

pub fn reference() -> ReferenceHierarchy {
    let (tight, lower, upper, far) = reference_blobs();
    let data = tight
        .clone()
        .chain(lower.clone())
        .chain(upper.clone())
        .chain(far.clone());
    let diffuse: Vec<String> = lower
        .samples
        .iter()
        .chain(&upper.samples)
        .chain(&far.samples)
        .cloned()
        .collect();
    let split: Vec<String> = lower.samples.iter().chain(&upper.samples).cloned().collect();
    let columns = vec![
        ("0_0", indicator(&data.samples, &tight.samples)),
        ("0_1", indicator(&data.samples, &diffuse)),
        ("0_1_0", indicator(&data.samples, &split)),
        ("0_1_1", indicator(&data.samples, &far.samples)),
        ("0_1_0_0", indicator(&data.samples, &lower.samples)),
        ("0_1_0_1", indicator(&data.samples, &upper.samples)),
    ];
    let dataset = dataset(&data);
    let membership = MembershipTable::from_columns(
        dataset.samples().to_vec(),
        columns
            .into_iter()
            .map(|(name, values)| (NodeName::from(name), values))
            .collect(),
    )
    .expect("fixture membership is valid");
    let params = ParamTable::try_new(vec![
        ParamRecord::new(NodeName::from("0"), 2),
        ParamRecord::new(NodeName::from("0_1"), 2),
        ParamRecord::new(NodeName::from("0_1_0"), 2),
    ])
    .expect("unique names");
    ReferenceHierarchy::try_new(dataset, membership, params).expect("fixture is consistent")
}

/// Ten points inside the existing `0_1` children, five in each.
pub fn consistent_points() -> Dataset {
    dataset(
        &uniform_blob("n", 5, &[20.0, -0.5], 0.05, 11).chain(uniform_blob(
            "m",
            5,
            &[20.0, 4.0],
            0.1,
            12,
        )),
    )
}

/// Ten points on a line between `0_1`'s children.
pub fn disruptive_points() -> Dataset {
    dataset(&line("n", 10, &[19.55, 2.0], 0.1))
}

pub fn projector() -> KnnProjector {
    KnnProjector::new(NonZeroUsize::new(3).expect("non-zero"), Metric::Euclidean)
}

pub fn empty() -> Dataset {
    Dataset::try_new(Vec::new(), Vec::new()).expect("empty dataset is valid")
}

/// Builder splitting every subset at `y = 3`, recording each call.
#[derive(Debug, Default)]
pub struct SplitAtThree {
    pub calls: Vec<(NodeName, usize, usize)>,
}

impl clade_core::SubtreeBuilder for SplitAtThree {
    fn build(
        &mut self,
        data: &Dataset,
        depth: usize,
        name: &NodeName,
    ) -> Result<Option<MembershipTable>, CollaboratorError> {
        self.calls.push((name.clone(), depth, data.len()));
        let (low, high): (Vec<u8>, Vec<u8>) = data
            .iter()
            .map(|(_, row)| {
                if row.get(1).copied().unwrap_or_default() < 3.0 {
                    (1, 0)
                } else {
                    (0, 1)
                }
            })
            .unzip();
        let columns: Vec<(NodeName, Vec<u8>)> = [(name.child(0), low), (name.child(1), high)]
            .into_iter()
            .filter(|(_, values)| values.contains(&1))
            .collect();
        MembershipTable::from_columns(data.samples().to_vec(), columns)
            .map(Some)
            .map_err(|error| CollaboratorError::new(error.to_string()))
    }
}

pub fn names(table: &MembershipTable) -> Vec<&str> {
    table.column_names().iter().map(NodeName::as_str).collect()
}

pub fn ids(raw: &[&str]) -> Vec<SampleId> {
    raw.iter().map(|&id| Arc::from(id)).collect()
}
