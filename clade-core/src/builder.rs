//! Builder utilities for configuring clade runs.
//!
//! Collects the run options, validates them, and resolves the numeric
//! backend once before constructing a [`Clade`] instance.

use core::{fmt, str::FromStr};
use std::num::NonZeroUsize;

use crate::{
    Result,
    backend::{ExecutionStrategy, FallbackPolicy, select_backend},
    clade::{Clade, RunSettings},
    distance::Metric,
    error::CladeError,
    naming::{DEFAULT_ROOT, NodeName},
    score::ScoreCriterion,
};

/// What an update does when the root itself needs rebuilding.
///
/// # Examples
/// ```
/// use clade_core::RootPolicy;
///
/// assert_eq!("abort".parse::<RootPolicy>(), Ok(RootPolicy::Abort));
/// assert_eq!(RootPolicy::default(), RootPolicy::Continue);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RootPolicy {
    /// Log a warning and rebuild the whole hierarchy.
    #[default]
    Continue,
    /// Stop the update with [`CladeError::RootInvalidated`].
    Abort,
}

impl RootPolicy {
    /// Lowercase name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for RootPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`RootPolicy`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown root policy `{0}`; expected `continue` or `abort`")]
pub struct UnknownRootPolicy(pub String);

impl FromStr for RootPolicy {
    type Err = UnknownRootPolicy;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            _ => Err(UnknownRootPolicy(s.to_owned())),
        }
    }
}

/// Configures and constructs [`Clade`] instances.
///
/// # Examples
/// ```
/// use clade_core::{CladeBuilder, ExecutionStrategy, ScoreCriterion};
///
/// let clade = CladeBuilder::new()
///     .with_tolerance(0.05)
///     .with_min_cluster_size(8)
///     .with_score_criterion(ScoreCriterion::Dunn)
///     .with_execution_strategy(ExecutionStrategy::CpuOnly)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(clade.min_cluster_size().get(), 8);
/// assert_eq!(clade.score_criterion(), ScoreCriterion::Dunn);
/// assert_eq!(clade.backend_name(), "cpu");
/// ```
#[derive(Debug, Clone)]
pub struct CladeBuilder {
    tolerance: f64,
    probability_cutoff: f32,
    min_cluster_size: usize,
    population_cutoff: usize,
    max_depth: Option<usize>,
    root: NodeName,
    criterion: ScoreCriterion,
    metric: Metric,
    root_policy: RootPolicy,
    execution_strategy: ExecutionStrategy,
    fallback_policy: FallbackPolicy,
}

impl Default for CladeBuilder {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            probability_cutoff: 0.25,
            min_cluster_size: 10,
            population_cutoff: 50,
            max_depth: None,
            root: NodeName::from(DEFAULT_ROOT),
            criterion: ScoreCriterion::default(),
            metric: Metric::default(),
            root_policy: RootPolicy::default(),
            execution_strategy: ExecutionStrategy::default(),
            fallback_policy: FallbackPolicy::default(),
        }
    }
}

impl CladeBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{CladeBuilder, ExecutionStrategy};
    ///
    /// let builder = CladeBuilder::new();
    /// assert_eq!(builder.tolerance(), 0.1);
    /// assert_eq!(builder.min_cluster_size(), 10);
    /// assert_eq!(builder.root().as_str(), "0");
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::Auto);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the score drop tolerated before a subtree is rebuilt.
    ///
    /// # Examples
    /// ```
    /// use clade_core::CladeBuilder;
    ///
    /// let builder = CladeBuilder::new().with_tolerance(0.2);
    /// assert_eq!(builder.tolerance(), 0.2);
    /// ```
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Returns the configured tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Overrides the probability below which projections are discarded.
    #[must_use]
    pub fn with_probability_cutoff(mut self, cutoff: f32) -> Self {
        self.probability_cutoff = cutoff;
        self
    }

    /// Returns the configured probability cutoff.
    #[must_use]
    pub fn probability_cutoff(&self) -> f32 {
        self.probability_cutoff
    }

    /// Overrides the minimum cluster size.
    ///
    /// # Examples
    /// ```
    /// use clade_core::CladeBuilder;
    ///
    /// let builder = CladeBuilder::new().with_min_cluster_size(3);
    /// assert_eq!(builder.min_cluster_size(), 3);
    /// ```
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Returns the configured minimum cluster size.
    #[must_use]
    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Overrides the population a node must exceed to be split further.
    #[must_use]
    pub fn with_population_cutoff(mut self, cutoff: usize) -> Self {
        self.population_cutoff = cutoff;
        self
    }

    /// Returns the configured population cutoff.
    #[must_use]
    pub fn population_cutoff(&self) -> usize {
        self.population_cutoff
    }

    /// Limits the depth below which nodes are no longer split.
    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Returns the configured depth limit.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Overrides the root node name.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<NodeName>) -> Self {
        self.root = root.into();
        self
    }

    /// Returns the configured root node name.
    #[must_use]
    pub fn root(&self) -> &NodeName {
        &self.root
    }

    /// Selects the internal validity score.
    #[must_use]
    pub fn with_score_criterion(mut self, criterion: ScoreCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Returns the configured score criterion.
    #[must_use]
    pub fn score_criterion(&self) -> ScoreCriterion {
        self.criterion
    }

    /// Selects the metric used for scoring and projection.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Returns the configured metric.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Selects what happens when the root needs rebuilding.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{CladeBuilder, RootPolicy};
    ///
    /// let builder = CladeBuilder::new().with_root_policy(RootPolicy::Abort);
    /// assert_eq!(builder.root_policy(), RootPolicy::Abort);
    /// ```
    #[must_use]
    pub fn with_root_policy(mut self, policy: RootPolicy) -> Self {
        self.root_policy = policy;
        self
    }

    /// Returns the configured root policy.
    #[must_use]
    pub fn root_policy(&self) -> RootPolicy {
        self.root_policy
    }

    /// Sets the execution strategy used to pick a numeric backend.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{CladeBuilder, ExecutionStrategy};
    ///
    /// let builder = CladeBuilder::new().with_execution_strategy(ExecutionStrategy::CpuOnly);
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::CpuOnly);
    /// ```
    #[must_use]
    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    /// Returns the currently configured execution strategy.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Sets what happens when the requested backend is unavailable.
    #[must_use]
    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback_policy = policy;
        self
    }

    /// Returns the configured fallback policy.
    #[must_use]
    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback_policy
    }

    /// Validates the configuration and constructs a [`Clade`] instance.
    ///
    /// # Errors
    /// Returns [`CladeError::InvalidTolerance`],
    /// [`CladeError::InvalidProbabilityCutoff`] or
    /// [`CladeError::InvalidMinClusterSize`] for out-of-range options, and
    /// [`CladeError::BackendUnavailable`] when no backend satisfies the
    /// execution strategy under the fallback policy.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{CladeBuilder, CladeErrorCode};
    ///
    /// let err = CladeBuilder::new().with_tolerance(-1.0).build().unwrap_err();
    /// assert_eq!(err.code(), CladeErrorCode::InvalidTolerance);
    /// ```
    pub fn build(self) -> Result<Clade> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CladeError::InvalidTolerance {
                got: self.tolerance,
            });
        }
        if !(0.0..=1.0).contains(&self.probability_cutoff) {
            return Err(CladeError::InvalidProbabilityCutoff {
                got: self.probability_cutoff,
            });
        }
        let min_cluster_size = NonZeroUsize::new(self.min_cluster_size).ok_or(
            CladeError::InvalidMinClusterSize {
                got: self.min_cluster_size,
            },
        )?;
        let backend = select_backend(self.execution_strategy, self.fallback_policy)?;

        Ok(Clade::new(
            RunSettings {
                tolerance: self.tolerance,
                probability_cutoff: self.probability_cutoff,
                min_cluster_size,
                population_cutoff: self.population_cutoff,
                max_depth: self.max_depth,
                root: self.root,
                criterion: self.criterion,
                metric: self.metric,
                root_policy: self.root_policy,
                execution_strategy: self.execution_strategy,
            },
            backend,
        ))
    }
}
