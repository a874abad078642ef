//! Per-node accept-or-rebuild decision.
//!
//! For one node the updater merges the reference members with the new
//! samples projected into it, scores the node's split before and after the
//! merge, and either keeps the merged assignment or rebuilds the node's
//! subtree from scratch.

use core::fmt;

use tracing::{info, instrument, warn};

use crate::{
    Result,
    assemble::assemble,
    backend::NumericBackend,
    builder::RootPolicy,
    dataset::Dataset,
    error::{CladeError, CollaboratorError},
    index::HierarchyIndex,
    labels::{child_labels, one_hot_encode},
    naming::NodeName,
    projection::ProjectionSource,
    reference::ReferenceHierarchy,
    score::{Label, ScoreEvaluator},
    subtree::SubtreeBuilder,
    table::{MembershipTable, SampleId},
};

/// Outcome of scoring a node against the merged data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeDecision {
    /// The split still holds; the merged assignment is kept.
    Accept,
    /// The split degraded beyond tolerance; the subtree was rebuilt.
    Rebuild,
    /// A score was undefined; the merged assignment is kept and the node's
    /// descendants are still visited.
    Undecided,
}

impl fmt::Display for NodeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "accept",
            Self::Rebuild => "rebuild",
            Self::Undecided => "undecided",
        })
    }
}

/// Scores and decision recorded for one visited node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeReport {
    /// Visited node.
    pub node: NodeName,
    /// Score of the reference split, when defined.
    pub old_score: Option<f64>,
    /// Score of the merged split, when defined.
    pub new_score: Option<f64>,
    /// What the updater did.
    pub decision: NodeDecision,
}

impl NodeReport {
    /// `new_score - old_score`, when both are defined.
    #[must_use]
    pub fn delta(&self) -> Option<f64> {
        self.old_score
            .zip(self.new_score)
            .map(|(old, new)| new - old)
    }
}

/// Result of updating a single node.
#[derive(Clone, Debug)]
pub(crate) struct NodeOutcome {
    pub(crate) report: NodeReport,
    pub(crate) output: MembershipTable,
}

/// Settings the updater reads from the run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct UpdateSettings<'a> {
    pub(crate) tolerance: f64,
    pub(crate) min_cluster_size: usize,
    pub(crate) root: &'a NodeName,
    pub(crate) root_policy: RootPolicy,
}

/// Everything one update pass reads.
pub(crate) struct NodeUpdater<'a> {
    pub(crate) settings: UpdateSettings<'a>,
    pub(crate) evaluator: ScoreEvaluator<'a>,
    pub(crate) backend: &'a dyn NumericBackend,
    pub(crate) reference: &'a ReferenceHierarchy,
    pub(crate) new_data: &'a Dataset,
    pub(crate) projected: &'a MembershipTable,
    pub(crate) index: &'a HierarchyIndex,
}

/// One side of a node's data: its samples and their child labels.
struct Subset {
    samples: Vec<SampleId>,
    labels: Vec<Label>,
}

impl NodeUpdater<'_> {
    #[instrument(
        name = "clade.node_update",
        err,
        skip_all,
        fields(node = %node, depth = node.depth()),
    )]
    pub(crate) fn update<B, P>(
        &self,
        node: &NodeName,
        builder: &mut B,
        projections: &P,
    ) -> Result<NodeOutcome>
    where
        B: SubtreeBuilder + ?Sized,
        P: ProjectionSource + ?Sized,
    {
        let is_root = node == self.settings.root;
        let children = self.index.children(node);
        let old = self.subset(node, is_root, children, true);
        let new = self.subset(node, is_root, children, false);

        let combined_samples: Vec<SampleId> =
            old.samples.iter().chain(&new.samples).cloned().collect();
        let combined_labels: Vec<Label> = old.labels.iter().chain(&new.labels).copied().collect();

        let projection = projections
            .projection(node)
            .map_err(|source| CladeError::Projection {
                node: node.clone(),
                source,
            })?;
        let old_points = self.coordinates(node, projection.as_ref(), &old.samples)?;
        let all_points = self.coordinates(node, projection.as_ref(), &combined_samples)?;

        let old_score = self.score(node, &old_points, &old.labels)?;
        let new_score = self.score(node, &all_points, &combined_labels)?;

        let decision = match old_score.zip(new_score) {
            Some((old, new)) if new - old < -self.settings.tolerance => NodeDecision::Rebuild,
            Some(_) => NodeDecision::Accept,
            None => NodeDecision::Undecided,
        };
        let report = NodeReport {
            node: node.clone(),
            old_score,
            new_score,
            decision,
        };
        info!(
            old_score = ?report.old_score,
            new_score = ?report.new_score,
            delta = ?report.delta(),
            decision = %decision,
            reference = old.samples.len(),
            added = new.samples.len(),
            "node scored"
        );

        let output = if decision == NodeDecision::Rebuild {
            if is_root {
                warn!(
                    delta = ?report.delta(),
                    policy = ?self.settings.root_policy,
                    "clustering score at the root deteriorates below tolerance; rerun from scratch"
                );
                if self.settings.root_policy == RootPolicy::Abort {
                    return Err(CladeError::RootInvalidated {
                        root: node.clone(),
                        delta: report.delta().unwrap_or_default(),
                    });
                }
            }
            info!("clustering score deteriorates below tolerance, subtree will be rebuilt");
            self.rebuild(node, &old.samples, &new.samples, builder)?
        } else {
            one_hot_encode(
                &combined_samples,
                &combined_labels,
                children,
                self.settings.min_cluster_size,
            )?
        };
        Ok(NodeOutcome { report, output })
    }

    fn subset(&self, node: &NodeName, is_root: bool, children: &[NodeName], old: bool) -> Subset {
        let table = if old {
            self.reference.membership()
        } else {
            self.projected
        };
        let samples = match (is_root, old) {
            (true, true) => self.reference.data().samples().to_vec(),
            (true, false) => self.new_data.samples().to_vec(),
            (false, _) => table.members(node),
        };
        let labels = child_labels(table, &samples, children, self.backend);
        Subset { samples, labels }
    }

    fn coordinates<'d>(
        &'d self,
        node: &NodeName,
        projection: Option<&'d Dataset>,
        samples: &[SampleId],
    ) -> Result<Vec<&'d [f32]>> {
        samples
            .iter()
            .map(|sample| match projection {
                Some(projection) => {
                    projection
                        .row(sample)
                        .ok_or_else(|| CladeError::Projection {
                            node: node.clone(),
                            source: CollaboratorError::new(format!(
                                "sample `{sample}` is missing from the projection"
                            )),
                        })
                }
                None => self
                    .reference
                    .data()
                    .row(sample)
                    .or_else(|| self.new_data.row(sample))
                    .ok_or_else(|| {
                        CladeError::unconvertible(
                            "membership",
                            format!("sample `{sample}` has no feature row"),
                        )
                    }),
            })
            .collect()
    }

    fn score(&self, node: &NodeName, points: &[&[f32]], labels: &[Label]) -> Result<Option<f64>> {
        match self.evaluator.score(points, labels) {
            Ok(score) => Ok(Some(score)),
            Err(error) if error.is_degenerate() => {
                info!(reason = %error, "score undefined, keeping the existing assignment");
                Ok(None)
            }
            Err(source) => Err(CladeError::Score {
                node: node.clone(),
                source,
            }),
        }
    }

    fn rebuild<B>(
        &self,
        node: &NodeName,
        old: &[SampleId],
        new: &[SampleId],
        builder: &mut B,
    ) -> Result<MembershipTable>
    where
        B: SubtreeBuilder + ?Sized,
    {
        let data = self
            .reference
            .data()
            .select(old)?
            .concat(&self.new_data.select(new)?)?;
        let rebuilt = node.rebuilt();
        let built = builder
            .build(&data, node.depth(), &rebuilt)
            .map_err(|source| CladeError::Builder {
                node: node.clone(),
                source,
            })?;
        let anchor = MembershipTable::from_columns(
            data.samples().to_vec(),
            vec![(rebuilt, vec![1; data.len()])],
        )?;
        let built = match built {
            Some(table) => table.reindex(data.samples())?,
            None => MembershipTable::empty(data.samples().to_vec())?,
        };
        Ok(assemble([anchor, built])?)
    }
}
