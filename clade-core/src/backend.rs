//! Numeric backend selection.
//!
//! The engine routes its dense numeric work (pairwise distances for scoring,
//! per-row argmax for label extraction) through a [`NumericBackend`]. The
//! backend is resolved once per run from the configured
//! [`ExecutionStrategy`] and [`FallbackPolicy`].

#[cfg(feature = "cpu")]
use rayon::prelude::*;
use tracing::warn;

use crate::{
    Result,
    distance::{DistanceError, Metric},
    error::CladeError,
};

/// Indicates how [`crate::Clade`] selects a numeric backend.
///
/// `Auto` resolves backends deterministically. No GPU implementation ships
/// with the crate, so every strategy resolves to the CPU backend when the
/// `cpu` feature is enabled, subject to the [`FallbackPolicy`].
///
/// # Examples
/// ```
/// use clade_core::ExecutionStrategy;
///
/// let strategy = ExecutionStrategy::default();
/// assert!(matches!(strategy, ExecutionStrategy::Auto));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Allow the library to select an appropriate backend automatically.
    #[default]
    Auto,
    /// Restrict execution to the CPU implementation.
    CpuOnly,
    /// Prefer a GPU implementation if one is available.
    GpuPreferred,
}

/// What to do when the preferred backend is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Log a warning and use the CPU backend.
    #[default]
    FallBackToCpu,
    /// Fail with [`CladeError::BackendUnavailable`].
    Strict,
}

/// Dense symmetric matrix of pairwise distances.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    len: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Number of rows (and columns).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the matrix covers no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance between points `i` and `j`; zero when out of range.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        i.checked_mul(self.len)
            .and_then(|offset| offset.checked_add(j))
            .filter(|_| j < self.len)
            .and_then(|index| self.values.get(index))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Numeric operations the engine delegates to a backend.
pub trait NumericBackend: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Computes all pairwise distances between `points` under `metric`.
    ///
    /// # Errors
    /// Propagates the first distance failure encountered.
    fn pairwise(
        &self,
        points: &[&[f32]],
        metric: Metric,
    ) -> core::result::Result<DistanceMatrix, DistanceError>;

    /// Index of the first maximal strictly positive entry, or `None` when every
    /// entry is zero.
    fn argmax(&self, row: &[u8]) -> Option<usize>;
}

/// CPU backend; rows of the distance matrix are computed in parallel when
/// the `cpu` feature is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl NumericBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn pairwise(
        &self,
        points: &[&[f32]],
        metric: Metric,
    ) -> core::result::Result<DistanceMatrix, DistanceError> {
        let len = points.len();
        let row = |(i, left): (usize, &&[f32])| {
            points
                .iter()
                .enumerate()
                .map(|(j, right)| {
                    if i == j {
                        Ok(0.0)
                    } else {
                        metric
                            .distance(left, right)
                            .map(|distance| distance.value())
                    }
                })
                .collect::<core::result::Result<Vec<f64>, DistanceError>>()
        };
        #[cfg(feature = "cpu")]
        let rows = points
            .par_iter()
            .enumerate()
            .map(row)
            .collect::<core::result::Result<Vec<_>, _>>()?;
        #[cfg(not(feature = "cpu"))]
        let rows = points
            .iter()
            .enumerate()
            .map(row)
            .collect::<core::result::Result<Vec<_>, _>>()?;
        let values = rows.into_iter().flatten().collect();
        Ok(DistanceMatrix { len, values })
    }

    fn argmax(&self, row: &[u8]) -> Option<usize> {
        row.iter()
            .enumerate()
            .filter(|&(_, &value)| value > 0)
            .fold(None, |best: Option<(usize, u8)>, (index, &value)| match best {
                Some((_, current)) if current >= value => best,
                _ => Some((index, value)),
            })
            .map(|(index, _)| index)
    }
}

#[cfg(feature = "cpu")]
static CPU_BACKEND: CpuBackend = CpuBackend;

/// Resolves the backend for a run.
///
/// # Errors
/// Returns [`CladeError::BackendUnavailable`] when no backend can satisfy the
/// request under the given policy.
///
/// # Examples
/// ```
/// use clade_core::{ExecutionStrategy, FallbackPolicy, select_backend};
///
/// let backend = select_backend(ExecutionStrategy::Auto, FallbackPolicy::Strict)
///     .expect("cpu backend is compiled in");
/// assert_eq!(backend.name(), "cpu");
/// ```
pub fn select_backend(
    strategy: ExecutionStrategy,
    policy: FallbackPolicy,
) -> Result<&'static dyn NumericBackend> {
    match (strategy, policy) {
        #[cfg(feature = "cpu")]
        (ExecutionStrategy::Auto | ExecutionStrategy::CpuOnly, _) => Ok(&CPU_BACKEND),
        #[cfg(feature = "cpu")]
        (ExecutionStrategy::GpuPreferred, FallbackPolicy::FallBackToCpu) => {
            warn!(
                requested = ?strategy,
                fallback = CPU_BACKEND.name(),
                "gpu backend unavailable in this build, falling back to cpu"
            );
            Ok(&CPU_BACKEND)
        }
        _ => Err(CladeError::BackendUnavailable {
            requested: strategy,
        }),
    }
}
