//! Queue-driven traversal of a hierarchy during an update.
//!
//! The queue starts with the root and every node that received new samples,
//! in hierarchy order so ancestors are visited before their descendants.
//! A rebuilt node's descendants are removed from the queue; the rebuild
//! already covers them.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::{debug, info};

use crate::{
    Result,
    assemble::{assemble, concat_rows, enforce_lineage},
    naming::NodeName,
    node_update::{NodeDecision, NodeReport, NodeUpdater},
    params::ParamTable,
    projection::ProjectionSource,
    subtree::SubtreeBuilder,
    table::{MembershipTable, SampleId},
};

/// Consolidated result of an update pass.
#[derive(Clone, Debug)]
pub struct UpdateReport {
    membership: MembershipTable,
    nodes: Vec<NodeReport>,
}

impl UpdateReport {
    /// The consolidated membership over reference and new samples.
    #[must_use]
    pub fn membership(&self) -> &MembershipTable {
        &self.membership
    }

    /// Per-node scores and decisions, in visiting order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeReport] {
        &self.nodes
    }

    /// Names of the nodes whose subtree was rebuilt.
    pub fn rebuilt(&self) -> impl Iterator<Item = &NodeName> {
        self.nodes
            .iter()
            .filter(|report| report.decision == NodeDecision::Rebuild)
            .map(|report| &report.node)
    }

    /// Consumes the report and returns the membership table.
    #[must_use]
    pub fn into_membership(self) -> MembershipTable {
        self.membership
    }
}

/// Builds the initial queue: the root followed by every projected node with
/// at least one member, restricted to nodes recorded as split into more
/// than one cluster.
pub(crate) fn initial_queue(
    root: &NodeName,
    projected: &MembershipTable,
    params: &ParamTable,
) -> VecDeque<NodeName> {
    let supported = projected
        .columns()
        .filter(|(_, values)| values.contains(&1))
        .map(|(name, _)| name.clone());
    std::iter::once(root.clone())
        .chain(supported)
        .filter(|name| params.get(name).is_some_and(|record| record.is_split()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub(crate) fn walk<B, P>(
    updater: &NodeUpdater<'_>,
    params: &ParamTable,
    builder: &mut B,
    projections: &P,
) -> Result<UpdateReport>
where
    B: SubtreeBuilder + ?Sized,
    P: ProjectionSource + ?Sized,
{
    let root = updater.settings.root;
    let mut queue = initial_queue(root, updater.projected, params);
    info!(queued = queue.len(), "update walk started");

    let mut outputs = Vec::with_capacity(queue.len());
    let mut reports = Vec::with_capacity(queue.len());
    while let Some(node) = queue.pop_front() {
        let outcome = updater.update(&node, builder, projections)?;
        if outcome.report.decision == NodeDecision::Rebuild {
            let pruned: HashSet<&NodeName> = updater.index.descendants(&node).iter().collect();
            let before = queue.len();
            queue.retain(|name| !pruned.contains(name));
            debug!(node = %node, pruned = before - queue.len(), "descendants dropped from queue");
        }
        outputs.push(outcome.output);
        reports.push(outcome.report);
    }

    let membership = consolidate(updater, outputs, &reports)?;
    Ok(UpdateReport {
        membership,
        nodes: reports,
    })
}

/// Layers node outputs over the reference membership extended with the
/// projected rows, then restores path consistency.
fn consolidate(
    updater: &NodeUpdater<'_>,
    outputs: Vec<MembershipTable>,
    reports: &[NodeReport],
) -> Result<MembershipTable> {
    let root = updater.settings.root;
    let (rebuilt, replaced): (Vec<&NodeReport>, Vec<&NodeReport>) = reports
        .iter()
        .partition(|report| report.decision == NodeDecision::Rebuild);
    let rebuilt: Vec<&NodeName> = rebuilt.into_iter().map(|report| &report.node).collect();
    let replaced: Vec<&NodeName> = replaced.into_iter().map(|report| &report.node).collect();
    let superseded = |name: &NodeName| {
        rebuilt
            .iter()
            .any(|&node| name == node || name.is_descendant_of(node))
    };

    let mut base = concat_rows(updater.reference.membership(), updater.projected)?;
    base.retain_columns(|name| {
        !superseded(name)
            && !name
                .parent()
                .is_some_and(|parent| replaced.contains(&&parent))
    });
    let order: Vec<SampleId> = base.samples().to_vec();

    let mut merged = assemble(outputs.into_iter().chain(std::iter::once(base)))?;
    merged.retain_columns(|name| !superseded(name));
    let dropped = enforce_lineage(&mut merged, root);
    if !dropped.is_empty() {
        debug!(dropped = dropped.len(), "orphaned columns removed");
    }

    let mut samples = order;
    let known: HashSet<SampleId> = samples.iter().cloned().collect();
    samples.extend(
        merged
            .samples()
            .iter()
            .filter(|sample| !known.contains(*sample))
            .cloned(),
    );
    Ok(merged.reindex(&samples)?)
}
