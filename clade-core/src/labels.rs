//! Conversion between one-hot child columns and per-sample labels.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    backend::NumericBackend,
    naming::NodeName,
    score::Label,
    table::{MembershipTable, SampleId, TableError},
};

/// Collapses the `children` columns of `table` into one label per sample.
///
/// A sample takes the first child whose indicator is set; a sample with no
/// child set is [`Label::Noise`]. With no children every sample is
/// `Label::Cluster(0)`. Samples absent from `table` are noise.
#[must_use]
pub fn child_labels(
    table: &MembershipTable,
    samples: &[SampleId],
    children: &[NodeName],
    backend: &dyn NumericBackend,
) -> Vec<Label> {
    if children.is_empty() {
        return vec![Label::Cluster(0); samples.len()];
    }
    let columns: Vec<Option<&[u8]>> = children.iter().map(|child| table.column(child)).collect();
    let mut row = vec![0_u8; children.len()];
    samples
        .iter()
        .map(|sample| {
            let Some(position) = table.row_of(sample) else {
                return Label::Noise;
            };
            for (slot, column) in row.iter_mut().zip(&columns) {
                *slot = column
                    .and_then(|values| values.get(position))
                    .copied()
                    .unwrap_or(0);
            }
            backend.argmax(&row).map_or(Label::Noise, Label::Cluster)
        })
        .collect()
}

/// One-hot encodes `labels` over the `children` column names.
///
/// Labels whose population is below `min_cluster_size` collapse into noise
/// and produce no column. Noise never produces a column.
///
/// # Errors
/// Returns [`TableError`] when `samples` repeats or `labels` differs in
/// length from `samples`.
pub fn one_hot_encode(
    samples: &[SampleId],
    labels: &[Label],
    children: &[NodeName],
    min_cluster_size: usize,
) -> Result<MembershipTable, TableError> {
    let mut table = MembershipTable::empty(samples.to_vec())?;
    if labels.len() != samples.len() {
        return Err(TableError::LengthMismatch {
            column: children.first().cloned().unwrap_or_default(),
            expected: samples.len(),
            actual: labels.len(),
        });
    }
    let mut populations: HashMap<usize, usize> = HashMap::new();
    for cluster in labels.iter().filter_map(|label| label.cluster()) {
        *populations.entry(cluster).or_default() += 1;
    }
    for (index, child) in children.iter().enumerate() {
        let population = populations.get(&index).copied().unwrap_or(0);
        if population == 0 {
            continue;
        }
        if population < min_cluster_size {
            debug!(
                node = %child,
                population,
                min_cluster_size,
                "label below minimum cluster size collapsed into noise"
            );
            continue;
        }
        let column = labels
            .iter()
            .map(|&label| u8::from(label == Label::Cluster(index)))
            .collect();
        table.insert_column(child.clone(), column)?;
    }
    Ok(table)
}
