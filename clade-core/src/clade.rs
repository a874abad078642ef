//! Core orchestration for clade runs.
//!
//! Provides the [`Clade`] runtime entry point. Every call opens a `clade.run`
//! span carrying the run's configuration, so the events it emits can be
//! attributed to the settings that produced them.

use std::num::NonZeroUsize;

use tracing::{Span, info, info_span, instrument};

use crate::{
    Result,
    assemble::{assemble, enforce_lineage},
    backend::{ExecutionStrategy, NumericBackend},
    builder::RootPolicy,
    dataset::Dataset,
    distance::Metric,
    error::CladeError,
    index::HierarchyIndex,
    naming::NodeName,
    node_update::{NodeUpdater, UpdateSettings},
    projection::ProjectionSource,
    projector::{Projector, apply_probability_cutoff, unique_assignment},
    reference::ReferenceHierarchy,
    resume::{CheckpointStore, ResumeReport, ResumeSettings, resume},
    score::{ScoreCriterion, ScoreEvaluator},
    subtree::SubtreeBuilder,
    table::MembershipTable,
    tree::HierarchyTree,
    walker::{UpdateReport, walk},
};

/// Validated options a run reads.
#[derive(Clone, Debug)]
pub(crate) struct RunSettings {
    pub(crate) tolerance: f64,
    pub(crate) probability_cutoff: f32,
    pub(crate) min_cluster_size: NonZeroUsize,
    pub(crate) population_cutoff: usize,
    pub(crate) max_depth: Option<usize>,
    pub(crate) root: NodeName,
    pub(crate) criterion: ScoreCriterion,
    pub(crate) metric: Metric,
    pub(crate) root_policy: RootPolicy,
    pub(crate) execution_strategy: ExecutionStrategy,
}

/// A freshly built hierarchy.
#[derive(Clone, Debug)]
pub struct Clustering {
    membership: MembershipTable,
    tree: HierarchyTree,
}

impl Clustering {
    /// The membership table.
    #[must_use]
    pub fn membership(&self) -> &MembershipTable {
        &self.membership
    }

    /// The hierarchy derived from [`Self::membership`].
    #[must_use]
    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    /// Consumes the result and returns the membership table.
    #[must_use]
    pub fn into_membership(self) -> MembershipTable {
        self.membership
    }
}

/// Entry point for building, resuming, updating and classifying against a
/// divisive hierarchy.
///
/// # Examples
/// ```
/// use clade_core::{CladeBuilder, CollaboratorError, Dataset, MembershipTable, NodeName};
///
/// let clade = CladeBuilder::new().build().expect("builder must succeed");
/// let data = Dataset::try_from(vec![vec![0.0], vec![0.1], vec![5.0]])?;
/// let mut halves = |data: &Dataset, _depth: usize, name: &NodeName| {
///     let (left, right): (Vec<u8>, Vec<u8>) = data
///         .iter()
///         .map(|(_, row)| if row[0] < 1.0 { (1, 0) } else { (0, 1) })
///         .unzip();
///     MembershipTable::from_columns(
///         data.samples().to_vec(),
///         vec![(name.child(0), left), (name.child(1), right)],
///     )
///     .map(Some)
///     .map_err(|err| CollaboratorError::new(err.to_string()))
/// };
/// let clustering = clade.cluster(&data, &mut halves)?;
/// assert_eq!(clustering.membership().population(&NodeName::from("0_0")), 2);
/// assert_eq!(clustering.tree().len(), 3);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Clade {
    settings: RunSettings,
    backend: &'static dyn NumericBackend,
}

impl Clade {
    pub(crate) fn new(settings: RunSettings, backend: &'static dyn NumericBackend) -> Self {
        Self { settings, backend }
    }

    /// Opens the span an entry point runs under, registered with whichever
    /// subscriber is current at call time.
    fn run_span(&self, operation: &'static str) -> Span {
        info_span!(
            "clade.run",
            operation,
            root = %self.settings.root,
            tolerance = self.settings.tolerance,
            criterion = %self.settings.criterion,
            metric = %self.settings.metric,
            backend = self.backend.name(),
        )
    }

    /// Returns the configured tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.settings.tolerance
    }

    /// Returns the configured probability cutoff.
    #[must_use]
    pub fn probability_cutoff(&self) -> f32 {
        self.settings.probability_cutoff
    }

    /// Returns the minimum cluster size configured for this instance.
    #[must_use]
    pub fn min_cluster_size(&self) -> NonZeroUsize {
        self.settings.min_cluster_size
    }

    /// Returns the population a node must exceed to be split.
    #[must_use]
    pub fn population_cutoff(&self) -> usize {
        self.settings.population_cutoff
    }

    /// Returns the depth limit.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.settings.max_depth
    }

    /// Returns the root node name.
    #[must_use]
    pub fn root(&self) -> &NodeName {
        &self.settings.root
    }

    /// Returns the score criterion.
    #[must_use]
    pub fn score_criterion(&self) -> ScoreCriterion {
        self.settings.criterion
    }

    /// Returns the metric used for scoring and projection.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.settings.metric
    }

    /// Returns the root policy.
    #[must_use]
    pub fn root_policy(&self) -> RootPolicy {
        self.settings.root_policy
    }

    /// Returns the execution strategy the backend was resolved from.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.settings.execution_strategy
    }

    /// Returns the name of the resolved numeric backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Builds a hierarchy from scratch by handing all of `data` to `builder`
    /// at the root.
    ///
    /// # Errors
    /// Returns [`CladeError::Builder`] when the builder fails and
    /// [`CladeError::Table`] when its output is malformed.
    pub fn cluster<B>(&self, data: &Dataset, builder: &mut B) -> Result<Clustering>
    where
        B: SubtreeBuilder + ?Sized,
    {
        self.run_span("cluster")
            .in_scope(|| self.cluster_in_run(data, builder))
    }

    #[instrument(name = "clade.cluster", err, skip_all, fields(samples = data.len()))]
    fn cluster_in_run<B>(&self, data: &Dataset, builder: &mut B) -> Result<Clustering>
    where
        B: SubtreeBuilder + ?Sized,
    {
        let root = &self.settings.root;
        let built = builder
            .build(data, root.depth(), root)
            .map_err(|source| CladeError::Builder {
                node: root.clone(),
                source,
            })?;
        let base = MembershipTable::empty(data.samples().to_vec())?;
        let mut membership = match built {
            Some(table) => assemble([base, table.reindex(data.samples())?])?,
            None => base,
        };
        enforce_lineage(&mut membership, root);
        info!(clusters = membership.column_count(), "clustering finished");
        let tree = HierarchyTree::from_membership(&membership, root, None);
        Ok(Clustering { membership, tree })
    }

    /// Assigns each sample of `new` to a single path through the reference
    /// hierarchy.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when `new` cannot be merged
    /// with the reference data and [`CladeError::Projector`] when the
    /// projector fails.
    pub fn classify<P>(
        &self,
        new: &Dataset,
        reference: &ReferenceHierarchy,
        projector: &mut P,
    ) -> Result<MembershipTable>
    where
        P: Projector + ?Sized,
    {
        self.run_span("classify")
            .in_scope(|| self.classify_in_run(new, reference, projector))
    }

    #[instrument(name = "clade.classify", err, skip_all, fields(samples = new.len()))]
    fn classify_in_run<P>(
        &self,
        new: &Dataset,
        reference: &ReferenceHierarchy,
        projector: &mut P,
    ) -> Result<MembershipTable>
    where
        P: Projector + ?Sized,
    {
        reference.validate_new(new)?;
        self.project(new, reference, projector)
    }

    /// Folds `new` into the reference hierarchy, accepting or rebuilding
    /// each affected node.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] for incompatible inputs,
    /// [`CladeError::RootInvalidated`] when the root needs rebuilding under
    /// [`RootPolicy::Abort`], and collaborator errors from the projector,
    /// the builder or the projection source.
    pub fn update<P, B, S>(
        &self,
        new: &Dataset,
        reference: &ReferenceHierarchy,
        projector: &mut P,
        builder: &mut B,
        projections: &S,
    ) -> Result<UpdateReport>
    where
        P: Projector + ?Sized,
        B: SubtreeBuilder + ?Sized,
        S: ProjectionSource + ?Sized,
    {
        self.run_span("update").in_scope(|| {
            self.update_in_run(new, reference, projector, builder, projections)
        })
    }

    #[instrument(
        name = "clade.update",
        err,
        skip_all,
        fields(samples = new.len(), reference = reference.data().len()),
    )]
    fn update_in_run<P, B, S>(
        &self,
        new: &Dataset,
        reference: &ReferenceHierarchy,
        projector: &mut P,
        builder: &mut B,
        projections: &S,
    ) -> Result<UpdateReport>
    where
        P: Projector + ?Sized,
        B: SubtreeBuilder + ?Sized,
        S: ProjectionSource + ?Sized,
    {
        reference.validate_new(new)?;
        let projected = if new.is_empty() {
            MembershipTable::empty(Vec::new())?
        } else {
            self.project(new, reference, projector)?
        };
        let index = HierarchyIndex::new(reference.membership().column_names());
        let updater = NodeUpdater {
            settings: UpdateSettings {
                tolerance: self.settings.tolerance,
                min_cluster_size: self.settings.min_cluster_size.get(),
                root: &self.settings.root,
                root_policy: self.settings.root_policy,
            },
            evaluator: ScoreEvaluator::new(
                self.settings.criterion,
                self.settings.metric,
                self.backend,
            ),
            backend: self.backend,
            reference,
            new_data: new,
            projected: &projected,
            index: &index,
        };
        let report = walk(&updater, reference.params(), builder, projections)?;
        info!(
            clusters = report.membership().column_count(),
            rebuilt = report.rebuilt().count(),
            "update finished"
        );
        Ok(report)
    }

    /// Reconstructs an interrupted build from `store` and builds every
    /// node that was left unfinished.
    ///
    /// # Errors
    /// Returns [`CladeError::MissingParameterTable`],
    /// [`CladeError::EmptyParameterTable`] or [`CladeError::NoCheckpoints`]
    /// when the store holds nothing to resume from, and collaborator errors
    /// from the store or the builder.
    pub fn resume<S, B>(&self, data: &Dataset, store: &S, builder: &mut B) -> Result<ResumeReport>
    where
        S: CheckpointStore + ?Sized,
        B: SubtreeBuilder + ?Sized,
    {
        let settings = ResumeSettings {
            root: &self.settings.root,
            population_cutoff: self.settings.population_cutoff,
            max_depth: self.settings.max_depth,
        };
        self.run_span("resume")
            .in_scope(|| resume(data, store, builder, &settings))
    }

    fn project<P>(
        &self,
        new: &Dataset,
        reference: &ReferenceHierarchy,
        projector: &mut P,
    ) -> Result<MembershipTable>
    where
        P: Projector + ?Sized,
    {
        let probabilities = projector
            .project(new, reference.data(), reference.membership())
            .map_err(|source| CladeError::Projector { source })?;
        let confident = apply_probability_cutoff(probabilities, self.settings.probability_cutoff)?;
        Ok(unique_assignment(&confident, &self.settings.root)?)
    }
}
