//! Projection of new samples onto an existing hierarchy.
//!
//! A [`Projector`] yields per-node confidences for each new sample. The
//! engine then zeroes low-confidence entries with
//! [`apply_probability_cutoff`] and resolves each sample to a single
//! root-to-leaf path with [`unique_assignment`].

mod knn;

pub use self::knn::KnnProjector;

use std::collections::HashMap;

use crate::{
    dataset::Dataset,
    error::CollaboratorError,
    index::HierarchyIndex,
    naming::NodeName,
    table::{MembershipTable, ProbabilityTable, TableError},
};

/// Assigns new samples to the nodes of a reference hierarchy.
pub trait Projector {
    /// Returns a probability table over `membership`'s columns with one row
    /// per sample of `new`.
    ///
    /// # Errors
    /// Returns [`CollaboratorError`] when the projection cannot be computed.
    fn project(
        &mut self,
        new: &Dataset,
        reference: &Dataset,
        membership: &MembershipTable,
    ) -> Result<ProbabilityTable, CollaboratorError>;
}

/// Zeroes every probability below `probcut`.
///
/// # Errors
/// Propagates [`TableError`] from rebuilding the table; a valid input table
/// cannot trigger it.
///
/// # Examples
/// ```
/// use clade_core::{NodeName, ProbabilityTable, apply_probability_cutoff};
///
/// let table = ProbabilityTable::from_columns(
///     vec!["a".into(), "b".into()],
///     vec![(NodeName::from("0_0"), vec![0.2, 0.9])],
/// )?;
/// let cut = apply_probability_cutoff(table, 0.25)?;
/// assert_eq!(cut.column(&NodeName::from("0_0")), Some(&[0.0, 0.9][..]));
/// # Ok::<(), clade_core::TableError>(())
/// ```
pub fn apply_probability_cutoff(
    table: ProbabilityTable,
    probcut: f32,
) -> Result<ProbabilityTable, TableError> {
    let (samples, columns) = table.into_parts();
    let columns = columns
        .into_iter()
        .map(|(name, values)| {
            let values = values
                .into_iter()
                .map(|value| if value < probcut { 0.0 } else { value })
                .collect();
            (name, values)
        })
        .collect();
    ProbabilityTable::from_columns(samples, columns)
}

/// Resolves each sample to one consistent path from `root`.
///
/// At each level the child with the highest positive probability is
/// selected, ties going to the child that sorts first in hierarchy order.
/// The root column, when present, is set for every sample that reaches at
/// least one node or carries a positive root probability.
///
/// # Errors
/// Propagates [`TableError`] from building the output table.
pub fn unique_assignment(
    table: &ProbabilityTable,
    root: &NodeName,
) -> Result<MembershipTable, TableError> {
    let index = HierarchyIndex::new(table.column_names());
    let mut columns: Vec<(NodeName, Vec<u8>)> = table
        .column_names()
        .iter()
        .map(|name| (name.clone(), vec![0; table.sample_count()]))
        .collect();
    let positions: HashMap<&NodeName, usize> = table
        .column_names()
        .iter()
        .enumerate()
        .map(|(position, name)| (name, position))
        .collect();
    let mut set = |column: &NodeName, row: usize| {
        if let Some(slot) = positions
            .get(column)
            .and_then(|&position| columns.get_mut(position))
            .and_then(|(_, values)| values.get_mut(row))
        {
            *slot = 1;
        }
    };

    for (row, sample) in table.samples().iter().enumerate() {
        let mut current = root.clone();
        let mut reached = table.get(sample, root) > 0.0;
        loop {
            let best = index
                .children(&current)
                .iter()
                .map(|child| (child, table.get(sample, child)))
                .filter(|&(_, probability)| probability > 0.0)
                .fold(None, |best: Option<(&NodeName, f32)>, candidate| match best {
                    Some((_, top)) if top >= candidate.1 => best,
                    _ => Some(candidate),
                });
            let Some((child, _)) = best else {
                break;
            };
            set(child, row);
            reached = true;
            current = child.clone();
        }
        if reached {
            set(root, row);
        }
    }
    MembershipTable::from_columns(table.samples().to_vec(), columns)
}
