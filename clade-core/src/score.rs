//! Clustering-quality objectives used to judge whether a split still holds.
//!
//! Both objectives ignore samples labelled [`Label::Noise`]. They need at
//! least two distinct clusters; anything less yields
//! [`ScoreError::Degenerate`] rather than a number.

use core::{fmt, str::FromStr};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    backend::{DistanceMatrix, NumericBackend},
    distance::{DistanceError, Metric},
};

/// Cluster assignment of a single sample within one node.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Label {
    /// The sample belongs to none of the node's children.
    Noise,
    /// Index of the child the sample belongs to.
    Cluster(usize),
}

impl Label {
    /// Returns the cluster index, or `None` for noise.
    #[must_use]
    pub fn cluster(self) -> Option<usize> {
        match self {
            Self::Noise => None,
            Self::Cluster(index) => Some(index),
        }
    }
}

/// Objective used to score a partition.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCriterion {
    /// Mean silhouette coefficient; higher is better, range `[-1, 1]`.
    #[default]
    Silhouette,
    /// Dunn index; higher is better.
    Dunn,
}

impl ScoreCriterion {
    /// Stable lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Silhouette => "silhouette",
            Self::Dunn => "dunn",
        }
    }
}

impl fmt::Display for ScoreCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown criterion identifier.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown score criterion `{0}`; expected silhouette or dunn")]
pub struct UnknownCriterion(pub String);

impl FromStr for ScoreCriterion {
    type Err = UnknownCriterion;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "silhouette" => Ok(Self::Silhouette),
            "dunn" => Ok(Self::Dunn),
            _ => Err(UnknownCriterion(raw.to_owned())),
        }
    }
}

/// Errors produced while scoring a partition.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScoreError {
    /// Fewer than two distinct non-noise labels.
    #[error("score is undefined for {clusters} non-noise cluster(s)")]
    Degenerate {
        /// Distinct non-noise labels observed.
        clusters: usize,
    },
    /// Every cluster has zero diameter, so the Dunn index is unbounded.
    #[error("dunn index is unbounded: every cluster has zero diameter")]
    ZeroDiameter,
    /// Coordinates and labels disagree in length.
    #[error("{points} coordinate rows for {labels} labels")]
    LengthMismatch {
        /// Coordinate rows supplied.
        points: usize,
        /// Labels supplied.
        labels: usize,
    },
    /// A distance could not be computed.
    #[error(transparent)]
    Distance(#[from] DistanceError),
}

impl ScoreError {
    /// Reports whether the score is undefined for the partition rather than
    /// failing on bad input.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate { .. } | Self::ZeroDiameter)
    }
}

/// Scores labelled coordinates under a configured criterion and metric.
#[derive(Clone, Copy, Debug)]
pub struct ScoreEvaluator<'a> {
    criterion: ScoreCriterion,
    metric: Metric,
    backend: &'a dyn NumericBackend,
}

impl<'a> ScoreEvaluator<'a> {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(criterion: ScoreCriterion, metric: Metric, backend: &'a dyn NumericBackend) -> Self {
        Self {
            criterion,
            metric,
            backend,
        }
    }

    /// The configured criterion.
    #[must_use]
    pub fn criterion(&self) -> ScoreCriterion {
        self.criterion
    }

    /// Scores `points` partitioned by the parallel `labels`.
    ///
    /// # Errors
    /// - [`ScoreError::LengthMismatch`] when the inputs differ in length.
    /// - [`ScoreError::Degenerate`] when fewer than two clusters remain after
    ///   discarding noise.
    /// - [`ScoreError::ZeroDiameter`] for a Dunn index with no spread.
    /// - [`ScoreError::Distance`] when coordinates are invalid for the metric.
    pub fn score(&self, points: &[&[f32]], labels: &[Label]) -> Result<f64, ScoreError> {
        if points.len() != labels.len() {
            return Err(ScoreError::LengthMismatch {
                points: points.len(),
                labels: labels.len(),
            });
        }
        let (kept, clusters): (Vec<&[f32]>, Vec<usize>) = points
            .iter()
            .zip(labels)
            .filter_map(|(&point, label)| label.cluster().map(|cluster| (point, cluster)))
            .unzip();
        let groups = group_indices(&clusters);
        if groups.len() < 2 {
            return Err(ScoreError::Degenerate {
                clusters: groups.len(),
            });
        }
        let distances = self.backend.pairwise(&kept, self.metric)?;
        match self.criterion {
            ScoreCriterion::Silhouette => Ok(silhouette(&distances, &clusters, &groups)),
            ScoreCriterion::Dunn => dunn(&distances, &groups),
        }
    }
}

/// Groups point indices by cluster, in ascending cluster order.
fn group_indices(clusters: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &cluster) in clusters.iter().enumerate() {
        groups.entry(cluster).or_default().push(index);
    }
    groups.into_values().collect()
}

fn mean_distance(distances: &DistanceMatrix, point: usize, members: &[usize]) -> f64 {
    let (sum, count) = members
        .iter()
        .filter(|&&other| other != point)
        .fold((0.0, 0_usize), |(sum, count), &other| {
            (sum + distances.get(point, other), count + 1)
        });
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn silhouette(distances: &DistanceMatrix, clusters: &[usize], groups: &[Vec<usize>]) -> f64 {
    let lookup: BTreeMap<usize, usize> = groups
        .iter()
        .enumerate()
        .filter_map(|(group, members)| {
            members
                .first()
                .and_then(|&first| clusters.get(first))
                .map(|&cluster| (cluster, group))
        })
        .collect();

    let total: f64 = clusters
        .iter()
        .enumerate()
        .map(|(point, cluster)| {
            let Some(own) = lookup.get(cluster).and_then(|&group| groups.get(group)) else {
                return 0.0;
            };
            if own.len() < 2 {
                return 0.0;
            }
            let a = mean_distance(distances, point, own);
            let b = groups
                .iter()
                .filter(|members| !core::ptr::eq(*members, own))
                .map(|members| mean_distance(distances, point, members))
                .fold(f64::INFINITY, f64::min);
            let scale = a.max(b);
            if scale > 0.0 { (b - a) / scale } else { 0.0 }
        })
        .sum();
    total / clusters.len() as f64
}

fn dunn(distances: &DistanceMatrix, groups: &[Vec<usize>]) -> Result<f64, ScoreError> {
    let diameter = groups
        .iter()
        .flat_map(|members| {
            members.iter().flat_map(move |&i| {
                members.iter().map(move |&j| distances.get(i, j))
            })
        })
        .fold(0.0_f64, f64::max);
    if diameter <= 0.0 {
        return Err(ScoreError::ZeroDiameter);
    }
    let separation = groups
        .iter()
        .enumerate()
        .flat_map(|(index, left)| {
            groups.iter().skip(index + 1).flat_map(move |right| {
                left.iter()
                    .flat_map(move |&i| right.iter().map(move |&j| distances.get(i, j)))
            })
        })
        .fold(f64::INFINITY, f64::min);
    Ok(separation / diameter)
}
