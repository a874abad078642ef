//! Reference k-nearest-neighbour projector.

use std::num::NonZeroUsize;

use tracing::instrument;

use crate::{
    dataset::Dataset,
    distance::Metric,
    error::CollaboratorError,
    projector::Projector,
    table::{MembershipTable, ProbabilityTable},
};

/// Scores each new sample against its `k` nearest reference samples.
///
/// The probability of node `n` is the fraction of those neighbours that are
/// members of `n`. Reference samples missing from the membership table count
/// as members of nothing.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
///
/// use clade_core::{Dataset, KnnProjector, MembershipTable, Metric, NodeName, Projector};
///
/// let reference = Dataset::try_from(vec![vec![0.0], vec![0.1], vec![5.0]])?;
/// let membership = MembershipTable::from_columns(
///     reference.samples().to_vec(),
///     vec![(NodeName::from("0_0"), vec![1, 1, 0]), (NodeName::from("0_1"), vec![0, 0, 1])],
/// )?;
/// let new = Dataset::try_new(vec!["x".into()], vec![vec![0.05]])?;
/// let mut projector = KnnProjector::new(NonZeroUsize::MIN.saturating_add(1), Metric::Euclidean);
/// let probabilities = projector.project(&new, &reference, &membership)?;
/// assert_eq!(probabilities.get("x", &NodeName::from("0_0")), 1.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct KnnProjector {
    neighbours: NonZeroUsize,
    metric: Metric,
}

impl KnnProjector {
    /// Creates a projector consulting `neighbours` reference samples.
    #[must_use]
    pub fn new(neighbours: NonZeroUsize, metric: Metric) -> Self {
        Self { neighbours, metric }
    }

    /// Number of neighbours consulted per sample.
    #[must_use]
    pub fn neighbours(&self) -> NonZeroUsize {
        self.neighbours
    }

    fn nearest(&self, point: &[f32], reference: &Dataset) -> Result<Vec<usize>, CollaboratorError> {
        let mut distances = reference
            .iter()
            .enumerate()
            .map(|(index, (_, row))| {
                self.metric
                    .distance(point, row)
                    .map(|distance| (distance.value(), index))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| CollaboratorError::new(format!("knn distance failed: {error}")))?;
        distances.sort_by(|left, right| left.0.total_cmp(&right.0).then(left.1.cmp(&right.1)));
        Ok(distances
            .into_iter()
            .take(self.neighbours.get())
            .map(|(_, index)| index)
            .collect())
    }
}

impl Projector for KnnProjector {
    #[instrument(
        name = "clade.knn_project",
        skip_all,
        fields(new = new.len(), reference = reference.len(), k = self.neighbours.get()),
    )]
    fn project(
        &mut self,
        new: &Dataset,
        reference: &Dataset,
        membership: &MembershipTable,
    ) -> Result<ProbabilityTable, CollaboratorError> {
        if reference.is_empty() && !new.is_empty() {
            return Err(CollaboratorError::new(
                "knn projection needs at least one reference sample",
            ));
        }
        let rows: Vec<Option<usize>> = reference
            .samples()
            .iter()
            .map(|sample| membership.row_of(sample))
            .collect();
        let names = membership.column_names();
        let mut columns: Vec<Vec<f32>> = vec![Vec::with_capacity(new.len()); names.len()];

        for (_, point) in new.iter() {
            let nearest = self.nearest(point, reference)?;
            let share = 1.0 / nearest.len().max(1) as f32;
            for ((_, values), column) in membership.columns().zip(columns.iter_mut()) {
                let hits = nearest
                    .iter()
                    .filter_map(|&index| rows.get(index).copied().flatten())
                    .filter(|&row| values.get(row).copied() == Some(1))
                    .count();
                column.push((hits as f32 * share).clamp(0.0, 1.0));
            }
        }

        ProbabilityTable::from_columns(
            new.samples().to_vec(),
            names.iter().cloned().zip(columns).collect(),
        )
        .map_err(|error| CollaboratorError::new(error.to_string()))
    }
}
