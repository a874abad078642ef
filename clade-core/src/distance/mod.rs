//! Distance primitives for built-in numeric metrics.
//!
//! Scalar implementations of the Euclidean, cosine and Manhattan distances
//! used when scoring splits and projecting samples. These routines validate
//! their inputs and surface detailed errors so callers can react
//! appropriately.

mod cosine;
mod euclidean;
mod helpers;
mod manhattan;
mod types;

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use self::cosine::cosine_distance;
pub use self::euclidean::euclidean_distance;
pub use self::manhattan::manhattan_distance;
pub use self::types::{Distance, DistanceError, Result, VectorKind};

/// Distance metric used for scoring and projection.
///
/// # Examples
/// ```
/// use clade_core::Metric;
///
/// let metric: Metric = "manhattan".parse().expect("known metric");
/// let d = metric.distance(&[0.0, 0.0], &[1.0, 1.0]).expect("valid vectors");
/// assert!((d.value() - 2.0).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// One minus cosine similarity.
    Cosine,
    /// L1 distance.
    Manhattan,
}

impl Metric {
    /// Computes the distance between `left` and `right` under this metric.
    ///
    /// # Errors
    /// Propagates the validation failures of the underlying kernel.
    pub fn distance(self, left: &[f32], right: &[f32]) -> Result<Distance> {
        match self {
            Self::Euclidean => euclidean_distance(left, right),
            Self::Cosine => cosine_distance(left, right),
            Self::Manhattan => manhattan_distance(left, right),
        }
    }

    /// Stable lowercase identifier, as persisted in parameter tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
            Self::Manhattan => "manhattan",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown metric identifier.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown metric `{0}`; expected euclidean, cosine or manhattan")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(raw: &str) -> core::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            "manhattan" | "l1" | "cityblock" => Ok(Self::Manhattan),
            _ => Err(UnknownMetric(raw.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(Metric::Euclidean, 5.0)]
    #[case(Metric::Manhattan, 7.0)]
    fn metrics_match_closed_forms(#[case] metric: Metric, #[case] expected: f64) {
        let d = metric
            .distance(&[0.0, 0.0], &[3.0, 4.0])
            .expect("valid vectors");
        assert!((d.value() - expected).abs() < 1e-9);
    }

    #[test]
    fn cosine_rejects_zero_vectors() {
        let err = Metric::Cosine
            .distance(&[0.0, 0.0], &[1.0, 0.0])
            .expect_err("zero magnitude");
        assert_eq!(
            err,
            DistanceError::ZeroMagnitude {
                which: VectorKind::Left
            }
        );
    }

    #[test]
    fn mismatched_dimensions_are_reported() {
        let err = Metric::Euclidean
            .distance(&[0.0], &[1.0, 2.0])
            .expect_err("mismatch");
        assert_eq!(err, DistanceError::DimensionMismatch { left: 1, right: 2 });
    }

    #[rstest]
    #[case("Euclidean", Metric::Euclidean)]
    #[case("l1", Metric::Manhattan)]
    #[case(" cosine ", Metric::Cosine)]
    fn parses_identifiers(#[case] raw: &str, #[case] expected: Metric) {
        assert_eq!(raw.parse::<Metric>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_identifiers() {
        assert!("hamming".parse::<Metric>().is_err());
    }
}
