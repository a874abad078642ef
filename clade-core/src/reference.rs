//! The reference hierarchy an update or classification runs against.

use crate::{
    Result,
    dataset::Dataset,
    error::CladeError,
    params::ParamTable,
    table::MembershipTable,
};

/// A previously built hierarchy: the data it was built on, its membership
/// table and its per-node parameter records.
///
/// # Examples
/// ```
/// use clade_core::{
///     Dataset, MembershipTable, NodeName, ParamRecord, ParamTable, ReferenceHierarchy,
/// };
///
/// let data = Dataset::try_from(vec![vec![0.0], vec![1.0]])?;
/// let membership = MembershipTable::from_columns(
///     data.samples().to_vec(),
///     vec![(NodeName::from("0_0"), vec![1, 0]), (NodeName::from("0_1"), vec![0, 1])],
/// )?;
/// let params = ParamTable::try_new(vec![ParamRecord::new(NodeName::from("0"), 2)])?;
/// let reference = ReferenceHierarchy::try_new(data, membership, params)?;
/// assert_eq!(reference.membership().column_count(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct ReferenceHierarchy {
    data: Dataset,
    membership: MembershipTable,
    params: ParamTable,
}

impl ReferenceHierarchy {
    /// Bundles a reference hierarchy.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when the membership table
    /// names a sample absent from `data`.
    pub fn try_new(data: Dataset, membership: MembershipTable, params: ParamTable) -> Result<Self> {
        if let Some(sample) = membership
            .samples()
            .iter()
            .find(|sample| !data.contains(sample))
        {
            return Err(CladeError::unconvertible(
                "membership",
                format!("sample `{sample}` has no feature row in the reference data"),
            ));
        }
        Ok(Self {
            data,
            membership,
            params,
        })
    }

    /// Reference features.
    #[must_use]
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    /// Reference membership.
    #[must_use]
    pub fn membership(&self) -> &MembershipTable {
        &self.membership
    }

    /// Reference parameter records.
    #[must_use]
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    /// Checks that `new` can be merged with the reference data.
    pub(crate) fn validate_new(&self, new: &Dataset) -> Result<()> {
        if new.is_empty() || self.data.is_empty() {
            return Ok(());
        }
        if new.dimension() != self.data.dimension() {
            return Err(CladeError::unconvertible(
                "new data",
                format!(
                    "feature width {} does not match reference width {}",
                    new.dimension(),
                    self.data.dimension()
                ),
            ));
        }
        if let Some(sample) = new
            .samples()
            .iter()
            .find(|sample| self.data.contains(sample))
        {
            return Err(CladeError::unconvertible(
                "new data",
                format!("sample `{sample}` already belongs to the reference data"),
            ));
        }
        Ok(())
    }
}
