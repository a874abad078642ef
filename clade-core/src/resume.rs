//! Reconstructing and resuming a partially completed build.
//!
//! A build writes one parameter record and one checkpoint per node as each
//! node completes. After an interruption the checkpoints are unioned into a
//! membership table, parameter records without a matching checkpoint column
//! are dropped, and every populated node without a record is built again.

use tracing::{info, instrument, warn};

use crate::{
    Result,
    assemble::assemble,
    dataset::Dataset,
    error::{CladeError, CollaboratorError},
    naming::NodeName,
    params::ParamTable,
    subtree::SubtreeBuilder,
    table::MembershipTable,
    tree::HierarchyTree,
};

type StoreResult<T> = core::result::Result<T, CollaboratorError>;

/// Storage holding a run's parameter table and per-node checkpoints.
pub trait CheckpointStore {
    /// Human-readable location used in diagnostics.
    fn location(&self) -> String;

    /// Loads the parameter table, or `None` when it does not exist.
    ///
    /// # Errors
    /// Returns [`CollaboratorError`] when the table exists but cannot be read.
    fn load_params(&self) -> StoreResult<Option<ParamTable>>;

    /// Loads every per-node checkpoint.
    ///
    /// # Errors
    /// Returns [`CollaboratorError`] when a checkpoint cannot be read.
    fn load_checkpoints(&self) -> StoreResult<Vec<MembershipTable>>;
}

/// Limits on which nodes a resume rebuilds.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ResumeSettings<'a> {
    pub(crate) root: &'a NodeName,
    pub(crate) population_cutoff: usize,
    pub(crate) max_depth: Option<usize>,
}

/// Outcome of a resume.
#[derive(Clone, Debug)]
pub struct ResumeReport {
    membership: MembershipTable,
    tree: HierarchyTree,
    params: ParamTable,
    dropped_params: usize,
    resumed: Vec<NodeName>,
}

impl ResumeReport {
    /// The membership table after resuming.
    #[must_use]
    pub fn membership(&self) -> &MembershipTable {
        &self.membership
    }

    /// The hierarchy derived from [`Self::membership`].
    #[must_use]
    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    /// The reconciled parameter table.
    #[must_use]
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    /// Parameter records dropped during reconciliation.
    #[must_use]
    pub fn dropped_params(&self) -> usize {
        self.dropped_params
    }

    /// Nodes handed to the builder, in the order they were resumed.
    #[must_use]
    pub fn resumed(&self) -> &[NodeName] {
        &self.resumed
    }

    /// Consumes the report and returns the membership table.
    #[must_use]
    pub fn into_membership(self) -> MembershipTable {
        self.membership
    }
}

/// Unions checkpoints over `data`'s samples, sorted in hierarchy order.
///
/// # Errors
/// Returns [`CladeError::NoCheckpoints`] when `checkpoints` is empty.
pub(crate) fn load_membership(
    data: &Dataset,
    checkpoints: Vec<MembershipTable>,
    location: &str,
) -> Result<MembershipTable> {
    if checkpoints.is_empty() {
        return Err(CladeError::NoCheckpoints {
            location: location.into(),
        });
    }
    let mut aligned = Vec::with_capacity(checkpoints.len() + 1);
    aligned.push(MembershipTable::empty(data.samples().to_vec())?);
    for checkpoint in checkpoints {
        aligned.push(checkpoint.reindex(data.samples())?);
    }
    Ok(assemble(aligned)?)
}

/// Drops parameter records that are neither the root nor a loaded column;
/// returns the dropped count.
pub(crate) fn reconcile(
    params: &mut ParamTable,
    loaded: &MembershipTable,
    root: &NodeName,
) -> usize {
    let dropped =
        params.retain(|record| &record.name == root || loaded.contains_column(&record.name));
    if dropped > 0 {
        warn!(
            dropped,
            "discrepancies between parameter table and checkpoints found; stale records dropped"
        );
    }
    dropped
}

/// Loaded columns that still need building, in column order.
pub(crate) fn resumable(
    loaded: &MembershipTable,
    params: &ParamTable,
    settings: &ResumeSettings<'_>,
) -> Vec<NodeName> {
    loaded
        .column_names()
        .iter()
        .filter(|name| !params.contains(name))
        .filter(|name| loaded.population(name) > settings.population_cutoff)
        .filter(|name| settings.max_depth.is_none_or(|max| name.depth() < max))
        .cloned()
        .collect()
}

#[instrument(
    name = "clade.resume",
    err,
    skip_all,
    fields(location = %store.location(), samples = data.len()),
)]
pub(crate) fn resume<S, B>(
    data: &Dataset,
    store: &S,
    builder: &mut B,
    settings: &ResumeSettings<'_>,
) -> Result<ResumeReport>
where
    S: CheckpointStore + ?Sized,
    B: SubtreeBuilder + ?Sized,
{
    let location = store.location();
    let mut params = store
        .load_params()
        .map_err(|source| CladeError::Store { source })?
        .ok_or_else(|| CladeError::MissingParameterTable {
            location: location.as_str().into(),
        })?;
    if params.is_empty() {
        return Err(CladeError::EmptyParameterTable {
            location: location.as_str().into(),
        });
    }
    let checkpoints = store
        .load_checkpoints()
        .map_err(|source| CladeError::Store { source })?;
    let loaded = load_membership(data, checkpoints, &location)?;
    info!(columns = loaded.column_count(), "resuming clustering run");

    let dropped_params = reconcile(&mut params, &loaded, settings.root);
    let pending = resumable(&loaded, &params, settings);
    if pending.is_empty() {
        warn!("no resumable node found; the run might have completed successfully");
    }

    let mut outputs = Vec::with_capacity(pending.len());
    for node in &pending {
        info!(node = %node, "resuming node");
        let subset = data.select(&loaded.members(node))?;
        let built = builder
            .build(&subset, node.depth(), node)
            .map_err(|source| CladeError::Builder {
                node: node.clone(),
                source,
            })?;
        if let Some(table) = built {
            outputs.push(table);
        }
    }

    let membership = assemble(std::iter::once(loaded).chain(outputs))?;
    info!(clusters = membership.column_count(), "resume finished");
    let tree = HierarchyTree::from_membership(&membership, settings.root, Some(&params));
    Ok(ResumeReport {
        membership,
        tree,
        params,
        dropped_params,
        resumed: pending,
    })
}
