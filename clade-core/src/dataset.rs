//! Dense feature matrices keyed by sample identifier.

use std::{collections::HashMap, sync::Arc};

use crate::{
    Result,
    error::CladeError,
    table::SampleId,
};

/// Raw features for a set of samples, stored row-major.
///
/// Every public entry point converts caller data into a [`Dataset`] first;
/// conversion failures surface as [`CladeError::UnconvertibleInput`].
///
/// # Examples
/// ```
/// use clade_core::Dataset;
///
/// let data = Dataset::try_from(vec![vec![0.0, 1.0], vec![2.0, 3.0]])?;
/// assert_eq!(data.len(), 2);
/// assert_eq!(data.row("1"), Some(&[2.0, 3.0][..]));
/// # Ok::<(), clade_core::CladeError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    samples: Vec<SampleId>,
    rows: HashMap<SampleId, usize>,
    dimension: usize,
    values: Vec<f32>,
}

impl Dataset {
    /// Builds a dataset from named rows.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when rows are ragged, have
    /// zero width, hold non-finite values, or sample identifiers repeat.
    pub fn try_new(samples: Vec<SampleId>, rows: Vec<Vec<f32>>) -> Result<Self> {
        if samples.len() != rows.len() {
            return Err(CladeError::unconvertible(
                "dataset",
                format!("{} sample ids for {} rows", samples.len(), rows.len()),
            ));
        }
        let dimension = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len().saturating_mul(dimension));
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(CladeError::unconvertible(
                    "dataset",
                    format!("row {index} has {} features, expected {dimension}", row.len()),
                ));
            }
            values.extend(row);
        }
        Self::from_parts(samples, dimension, values)
    }

    /// Builds a dataset from a row-major buffer.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when the buffer length does
    /// not match `samples.len() * dimension`, the dimension is zero for a
    /// non-empty dataset, a value is non-finite, or identifiers repeat.
    pub fn from_parts(samples: Vec<SampleId>, dimension: usize, values: Vec<f32>) -> Result<Self> {
        if !samples.is_empty() && dimension == 0 {
            return Err(CladeError::unconvertible(
                "dataset",
                "rows must have at least one feature",
            ));
        }
        if Some(values.len()) != samples.len().checked_mul(dimension) {
            return Err(CladeError::unconvertible(
                "dataset",
                format!(
                    "{} values cannot form {} rows of width {dimension}",
                    values.len(),
                    samples.len()
                ),
            ));
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(CladeError::unconvertible(
                "dataset",
                format!("non-finite feature at flat position {position}"),
            ));
        }
        let mut rows = HashMap::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            if rows.insert(Arc::clone(sample), index).is_some() {
                return Err(CladeError::unconvertible(
                    "dataset",
                    format!("sample `{sample}` appears more than once"),
                ));
            }
        }
        Ok(Self {
            samples,
            rows,
            dimension,
            values,
        })
    }

    /// Sample identifiers in row order.
    #[must_use]
    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Reports whether the dataset has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of features per sample.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Reports whether `sample` belongs to the dataset.
    #[must_use]
    pub fn contains(&self, sample: &str) -> bool {
        self.rows.contains_key(sample)
    }

    /// Features of `sample`.
    #[must_use]
    pub fn row(&self, sample: &str) -> Option<&[f32]> {
        self.rows.get(sample).and_then(|&index| self.row_at(index))
    }

    /// Features of the row at `index`.
    #[must_use]
    pub fn row_at(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.values.get(start..end)
    }

    /// Iterates over `(sample, features)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&SampleId, &[f32])> {
        self.samples
            .iter()
            .zip(self.values.chunks_exact(self.dimension.max(1)))
    }

    /// Returns the subset of rows named by `samples`, in that order.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when a sample is unknown.
    pub fn select(&self, samples: &[SampleId]) -> Result<Self> {
        let mut values = Vec::with_capacity(samples.len().saturating_mul(self.dimension));
        for sample in samples {
            let row = self.row(sample).ok_or_else(|| {
                CladeError::unconvertible("dataset", format!("unknown sample `{sample}`"))
            })?;
            values.extend_from_slice(row);
        }
        Self::from_parts(samples.to_vec(), self.dimension, values)
    }

    /// Stacks `other` below `self`.
    ///
    /// # Errors
    /// Returns [`CladeError::UnconvertibleInput`] when the feature widths
    /// differ or the two datasets share a sample identifier.
    pub fn concat(&self, other: &Self) -> Result<Self> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.dimension != other.dimension {
            return Err(CladeError::unconvertible(
                "dataset",
                format!(
                    "feature width {} does not match reference width {}",
                    other.dimension, self.dimension
                ),
            ));
        }
        let samples = self.samples.iter().chain(&other.samples).cloned().collect();
        let values = self.values.iter().chain(&other.values).copied().collect();
        Self::from_parts(samples, self.dimension, values)
    }
}

impl TryFrom<Vec<Vec<f32>>> for Dataset {
    type Error = CladeError;

    /// Converts bare rows, naming samples by their row index.
    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self> {
        let samples = (0..rows.len())
            .map(|index| Arc::from(index.to_string()))
            .collect();
        Self::try_new(samples, rows)
    }
}
