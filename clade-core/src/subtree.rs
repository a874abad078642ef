//! The injected cluster-builder seam.

use crate::{
    dataset::Dataset, error::CollaboratorError, naming::NodeName, table::MembershipTable,
};

/// Builds a fresh sub-hierarchy below a node.
///
/// The engine never clusters data itself. Fresh builds, rebuilds of
/// invalidated subtrees and resumed nodes all call this seam.
pub trait SubtreeBuilder {
    /// Clusters `data` into a one-hot sub-hierarchy whose columns descend from
    /// `name`; `depth` is the depth of `name`.
    ///
    /// Returns `Ok(None)` when no further structure was found.
    ///
    /// # Errors
    /// Returns [`CollaboratorError`] when the build fails.
    fn build(
        &mut self,
        data: &Dataset,
        depth: usize,
        name: &NodeName,
    ) -> Result<Option<MembershipTable>, CollaboratorError>;
}

impl<F> SubtreeBuilder for F
where
    F: FnMut(&Dataset, usize, &NodeName) -> Result<Option<MembershipTable>, CollaboratorError>,
{
    fn build(
        &mut self,
        data: &Dataset,
        depth: usize,
        name: &NodeName,
    ) -> Result<Option<MembershipTable>, CollaboratorError> {
        self(data, depth, name)
    }
}
