//! Persisted per-node scoring projections.

use std::collections::HashMap;

use crate::{dataset::Dataset, error::CollaboratorError, naming::NodeName};

/// Supplies the reduced coordinates a node was scored on.
///
/// A projection covers the node's reference members and the new samples
/// projected into it, keyed by sample identifier.
pub trait ProjectionSource {
    /// Returns the projection for `node`, or `None` when none was persisted,
    /// in which case the node is scored on raw features.
    ///
    /// # Errors
    /// Returns [`CollaboratorError`] when a stored projection cannot be read.
    fn projection(&self, node: &NodeName) -> Result<Option<Dataset>, CollaboratorError>;
}

/// Projection source that never has a stored projection, so every node is
/// scored on raw features.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawFeatures;

impl ProjectionSource for RawFeatures {
    fn projection(&self, _node: &NodeName) -> Result<Option<Dataset>, CollaboratorError> {
        Ok(None)
    }
}

/// In-memory projections keyed by node name.
///
/// # Examples
/// ```
/// use clade_core::{Dataset, NodeName, ProjectionMap, ProjectionSource};
///
/// let mut projections = ProjectionMap::default();
/// projections.insert(NodeName::from("0"), Dataset::try_from(vec![vec![0.0, 1.0]])?);
/// assert!(projections.projection(&NodeName::from("0"))?.is_some());
/// assert!(projections.projection(&NodeName::from("0_1"))?.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ProjectionMap {
    projections: HashMap<NodeName, Dataset>,
}

impl ProjectionMap {
    /// Stores the projection for `node`, replacing any previous one.
    pub fn insert(&mut self, node: NodeName, projection: Dataset) {
        self.projections.insert(node, projection);
    }
}

impl ProjectionSource for ProjectionMap {
    fn projection(&self, node: &NodeName) -> Result<Option<Dataset>, CollaboratorError> {
        Ok(self.projections.get(node).cloned())
    }
}
