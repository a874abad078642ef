//! Per-node build parameters.
//!
//! One [`ParamRecord`] is written when a node's local clustering completes.
//! Presence of a record implies the node was built; resume uses that to
//! decide which nodes still need work.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Result, error::CladeError, naming::NodeName};

/// Parameters chosen when a node was built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRecord {
    /// Node the record describes.
    pub name: NodeName,
    /// Samples clustered at this node.
    pub n_samples: usize,
    /// Clusters found at this node.
    pub n_clusters: usize,
    /// Dimensionality of the reduced projection.
    pub dim: usize,
    /// Objective score of the selected split.
    pub obj_function_score: f64,
    /// Neighbourhood size used by the projection.
    pub n_neighbours: usize,
    /// Clustering hyperparameter of the selected split.
    pub cluster_parm: f64,
    /// Feature-selection cutoff.
    pub features_cutoff: f64,
    /// Metric used for the projection.
    pub metric_map: String,
    /// Metric used for clustering and scoring.
    pub metric_clust: String,
    /// Normalisation applied before projection.
    pub norm: String,
    /// Fraction of samples reassigned after clustering.
    pub reassigned: f64,
    /// Random seed used for the node.
    pub seed: u64,
}

impl ParamRecord {
    /// Creates a record with the given name and cluster count, every other
    /// field zeroed or empty.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{NodeName, ParamRecord};
    ///
    /// let record = ParamRecord::new(NodeName::from("0"), 2);
    /// assert_eq!(record.n_clusters, 2);
    /// assert!(record.is_split());
    /// ```
    #[must_use]
    pub fn new(name: NodeName, n_clusters: usize) -> Self {
        Self {
            name,
            n_samples: 0,
            n_clusters,
            dim: 0,
            obj_function_score: 0.0,
            n_neighbours: 0,
            cluster_parm: 0.0,
            features_cutoff: 0.0,
            metric_map: String::new(),
            metric_clust: String::new(),
            norm: String::new(),
            reassigned: 0.0,
            seed: 0,
        }
    }

    /// Reports whether the node was split into more than one cluster.
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.n_clusters > 1
    }
}

/// Parameter records keyed by node name, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamTable {
    records: Vec<ParamRecord>,
    lookup: HashMap<NodeName, usize>,
}

impl ParamTable {
    /// Builds a table, rejecting repeated names.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when a name appears twice.
    pub fn try_new(records: Vec<ParamRecord>) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if lookup.insert(record.name.clone(), index).is_some() {
                return Err(CladeError::unconvertible(
                    "parameter table",
                    format!("node `{}` has more than one record", record.name),
                ));
            }
        }
        Ok(Self { records, lookup })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Reports whether the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record for `name`.
    #[must_use]
    pub fn get(&self, name: &NodeName) -> Option<&ParamRecord> {
        self.lookup
            .get(name)
            .and_then(|&index| self.records.get(index))
    }

    /// Reports whether `name` has a record.
    #[must_use]
    pub fn contains(&self, name: &NodeName) -> bool {
        self.lookup.contains_key(name)
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[ParamRecord] {
        &self.records
    }

    /// Keeps the records for which `keep` returns `true` and returns how many
    /// were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&ParamRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|record| keep(record));
        self.lookup = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.name.clone(), index))
            .collect();
        before - self.records.len()
    }

    /// Consumes the table and returns its records.
    #[must_use]
    pub fn into_records(self) -> Vec<ParamRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::CladeErrorCode;

    fn table(names: &[(&str, usize)]) -> ParamTable {
        ParamTable::try_new(
            names
                .iter()
                .map(|&(name, clusters)| ParamRecord::new(NodeName::from(name), clusters))
                .collect(),
        )
        .expect("names are unique")
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let records = vec![
            ParamRecord::new(NodeName::from("0"), 2),
            ParamRecord::new(NodeName::from("0"), 3),
        ];
        let err = ParamTable::try_new(records).expect_err("duplicate");
        assert_eq!(err.code(), CladeErrorCode::UnconvertibleInput);
    }

    #[test]
    fn retain_reports_dropped_count_and_reindexes() {
        let mut params = table(&[("0", 2), ("0_0", 2), ("0_1", 1)]);
        let dropped = params.retain(|record| record.name.as_str() != "0_0");
        assert_eq!(dropped, 1);
        assert!(!params.contains(&NodeName::from("0_0")));
        assert_eq!(
            params.get(&NodeName::from("0_1")).map(|r| r.n_clusters),
            Some(1)
        );
    }
}
