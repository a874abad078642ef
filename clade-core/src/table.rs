//! Sample × node tables.
//!
//! [`MembershipTable`] holds one-hot {0,1} indicators; [`ProbabilityTable`]
//! holds the projector's raw assignment confidences. Storage is
//! column-major: every column has exactly one value per sample, and rows
//! outside a node's subtree hold zero rather than being absent.

use std::{collections::HashMap, fmt, sync::Arc};

use thiserror::Error;

use crate::{error::define_error_codes, naming::NodeName};

/// Identifier of a sample (table row).
pub type SampleId = Arc<str>;

/// Errors raised when a table would violate its invariants.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TableError {
    /// A sample identifier appeared twice.
    #[error("sample `{sample}` appears more than once")]
    DuplicateSample {
        /// The repeated identifier.
        sample: SampleId,
    },
    /// A column name appeared twice.
    #[error("column `{name}` appears more than once")]
    DuplicateColumn {
        /// The repeated column name.
        name: NodeName,
    },
    /// A column did not have one value per sample.
    #[error("column `{column}` has {actual} values but the table has {expected} samples")]
    LengthMismatch {
        /// Offending column.
        column: NodeName,
        /// Number of samples in the table.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// A cell held a value outside the table's domain.
    #[error("column `{column}` row {row} holds invalid value {value}")]
    InvalidValue {
        /// Offending column.
        column: NodeName,
        /// Offending row.
        row: usize,
        /// Rendered value.
        value: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`TableError`] variants.
    enum TableErrorCode for TableError {
        /// A sample identifier appeared twice.
        DuplicateSample => DuplicateSample { .. } => "TABLE_DUPLICATE_SAMPLE",
        /// A column name appeared twice.
        DuplicateColumn => DuplicateColumn { .. } => "TABLE_DUPLICATE_COLUMN",
        /// A column did not have one value per sample.
        LengthMismatch => LengthMismatch { .. } => "TABLE_LENGTH_MISMATCH",
        /// A cell held a value outside the table's domain.
        InvalidValue => InvalidValue { .. } => "TABLE_INVALID_VALUE",
    }
}

/// Values that can be stored in a [`Table`].
pub trait Cell: Copy + Default + PartialEq + fmt::Debug {
    /// Reports whether the value lies within the table's domain.
    fn is_valid(self) -> bool;
}

impl Cell for u8 {
    fn is_valid(self) -> bool {
        self <= 1
    }
}

impl Cell for f32 {
    fn is_valid(self) -> bool {
        (0.0..=1.0).contains(&self)
    }
}

/// A sample × node table.
#[derive(Clone, Debug, PartialEq)]
pub struct Table<V> {
    samples: Vec<SampleId>,
    rows: HashMap<SampleId, usize>,
    names: Vec<NodeName>,
    values: Vec<Vec<V>>,
    lookup: HashMap<NodeName, usize>,
}

/// One-hot {0,1} membership over node columns.
pub type MembershipTable = Table<u8>;

/// Projector confidences in `[0, 1]` over node columns.
pub type ProbabilityTable = Table<f32>;

fn index_samples(samples: &[SampleId]) -> Result<HashMap<SampleId, usize>, TableError> {
    let mut rows = HashMap::with_capacity(samples.len());
    for (index, sample) in samples.iter().enumerate() {
        if rows.insert(Arc::clone(sample), index).is_some() {
            return Err(TableError::DuplicateSample {
                sample: Arc::clone(sample),
            });
        }
    }
    Ok(rows)
}

impl<V: Cell> Table<V> {
    /// Creates a table with the given rows and no columns.
    ///
    /// # Errors
    /// Returns [`TableError::DuplicateSample`] when a sample repeats.
    pub fn empty(samples: Vec<SampleId>) -> Result<Self, TableError> {
        let rows = index_samples(&samples)?;
        Ok(Self {
            samples,
            rows,
            names: Vec::new(),
            values: Vec::new(),
            lookup: HashMap::new(),
        })
    }

    /// Builds a table from explicit columns, validating every invariant.
    ///
    /// # Errors
    /// Returns [`TableError`] when samples or column names repeat, a column
    /// has the wrong length, or a value lies outside the table's domain.
    ///
    /// # Examples
    /// ```
    /// use clade_core::{MembershipTable, NodeName};
    ///
    /// let table = MembershipTable::from_columns(
    ///     vec!["a".into(), "b".into()],
    ///     vec![(NodeName::from("0_0"), vec![1, 0]), (NodeName::from("0_1"), vec![0, 1])],
    /// )?;
    /// assert_eq!(table.population(&NodeName::from("0_1")), 1);
    /// # Ok::<(), clade_core::TableError>(())
    /// ```
    pub fn from_columns(
        samples: Vec<SampleId>,
        columns: Vec<(NodeName, Vec<V>)>,
    ) -> Result<Self, TableError> {
        let mut table = Self::empty(samples)?;
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    /// Appends a column.
    ///
    /// # Errors
    /// Returns [`TableError`] when the name already exists, the length is
    /// wrong, or a value lies outside the table's domain.
    pub fn insert_column(&mut self, name: NodeName, values: Vec<V>) -> Result<(), TableError> {
        if self.lookup.contains_key(&name) {
            return Err(TableError::DuplicateColumn { name });
        }
        if values.len() != self.samples.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.samples.len(),
                actual: values.len(),
            });
        }
        if let Some((row, value)) = values.iter().enumerate().find(|(_, v)| !v.is_valid()) {
            return Err(TableError::InvalidValue {
                column: name,
                row,
                value: Arc::from(format!("{value:?}")),
            });
        }
        self.lookup.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.values.push(values);
        Ok(())
    }

    /// Returns the sample identifiers in row order.
    #[must_use]
    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    /// Number of rows.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.names.len()
    }

    /// Returns the row index of `sample`.
    #[must_use]
    pub fn row_of(&self, sample: &str) -> Option<usize> {
        self.rows.get(sample).copied()
    }

    /// Reports whether `sample` is a row of the table.
    #[must_use]
    pub fn contains_sample(&self, sample: &str) -> bool {
        self.rows.contains_key(sample)
    }

    /// Column names in column order.
    #[must_use]
    pub fn column_names(&self) -> &[NodeName] {
        &self.names
    }

    /// Reports whether the named column exists.
    #[must_use]
    pub fn contains_column(&self, name: &NodeName) -> bool {
        self.lookup.contains_key(name)
    }

    /// Returns the values of the named column.
    #[must_use]
    pub fn column(&self, name: &NodeName) -> Option<&[V]> {
        self.lookup
            .get(name)
            .and_then(|&index| self.values.get(index))
            .map(Vec::as_slice)
    }

    /// Mutable access to the named column. Callers keep values within the
    /// table's domain.
    pub(crate) fn column_mut(&mut self, name: &NodeName) -> Option<&mut [V]> {
        self.lookup
            .get(name)
            .copied()
            .and_then(|index| self.values.get_mut(index))
            .map(Vec::as_mut_slice)
    }

    /// Iterates over `(name, values)` pairs in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&NodeName, &[V])> {
        self.names
            .iter()
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Returns the value at (`sample`, `column`), or the zero value when
    /// either is absent.
    #[must_use]
    pub fn get(&self, sample: &str, column: &NodeName) -> V {
        self.row_of(sample)
            .and_then(|row| self.column(column).and_then(|values| values.get(row)))
            .copied()
            .unwrap_or_default()
    }

    /// Keeps only the columns for which `keep` returns `true`.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&NodeName) -> bool) {
        let names = std::mem::take(&mut self.names);
        let values = std::mem::take(&mut self.values);
        for (name, column) in names.into_iter().zip(values) {
            if keep(&name) {
                self.names.push(name);
                self.values.push(column);
            }
        }
        self.rebuild_lookup();
    }

    /// Sorts columns into hierarchy order (depth, then numeric segments).
    pub fn sort_columns(&mut self) {
        let names = std::mem::take(&mut self.names);
        let values = std::mem::take(&mut self.values);
        let mut pairs: Vec<(NodeName, Vec<V>)> = names.into_iter().zip(values).collect();
        pairs.sort_by(|left, right| left.0.cmp(&right.0));
        for (name, column) in pairs {
            self.names.push(name);
            self.values.push(column);
        }
        self.rebuild_lookup();
    }

    /// Returns a table over `samples`, copying existing rows and filling
    /// rows absent from `self` with the zero value.
    ///
    /// # Errors
    /// Returns [`TableError::DuplicateSample`] when `samples` repeats.
    pub fn reindex(&self, samples: &[SampleId]) -> Result<Self, TableError> {
        let rows = index_samples(samples)?;
        let positions: Vec<Option<usize>> = samples.iter().map(|s| self.row_of(s)).collect();
        let values = self
            .values
            .iter()
            .map(|column| {
                positions
                    .iter()
                    .map(|position| {
                        position
                            .and_then(|row| column.get(row))
                            .copied()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            samples: samples.to_vec(),
            rows,
            names: self.names.clone(),
            values,
            lookup: self.lookup.clone(),
        })
    }

    /// Returns a table restricted to `names`, in the given order; names
    /// absent from `self` become all-zero columns.
    ///
    /// # Errors
    /// Returns [`TableError::DuplicateColumn`] when `names` repeats.
    pub fn select_columns(&self, names: &[NodeName]) -> Result<Self, TableError> {
        let mut selected = Self::empty(self.samples.clone())?;
        for name in names {
            let values = self
                .column(name)
                .map_or_else(|| vec![V::default(); self.samples.len()], <[V]>::to_vec);
            selected.insert_column(name.clone(), values)?;
        }
        Ok(selected)
    }

    /// Consumes the table, yielding its samples and columns.
    #[must_use]
    pub fn into_parts(self) -> (Vec<SampleId>, Vec<(NodeName, Vec<V>)>) {
        (self.samples, self.names.into_iter().zip(self.values).collect())
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
    }
}

impl Table<u8> {
    /// Number of samples whose indicator for `name` is set; zero when the
    /// column is absent.
    #[must_use]
    pub fn population(&self, name: &NodeName) -> usize {
        self.column(name)
            .map_or(0, |values| values.iter().filter(|&&v| v == 1).count())
    }

    /// Samples whose indicator for `name` is set, in row order.
    #[must_use]
    pub fn members(&self, name: &NodeName) -> Vec<SampleId> {
        self.column(name).map_or_else(Vec::new, |values| {
            self.samples
                .iter()
                .zip(values)
                .filter(|&(_, &v)| v == 1)
                .map(|(sample, _)| Arc::clone(sample))
                .collect()
        })
    }

    /// Builds a membership table from per-sample indicator rows, rejecting
    /// ragged rows and non-indicator values.
    ///
    /// # Errors
    /// Returns [`crate::CladeError::UnconvertibleInput`] for ragged rows and
    /// [`crate::CladeError::Table`] for duplicates or invalid values.
    pub fn try_from_rows(
        samples: Vec<SampleId>,
        names: Vec<NodeName>,
        rows: &[Vec<u8>],
    ) -> crate::Result<Self> {
        if rows.len() != samples.len() {
            return Err(crate::CladeError::unconvertible(
                "membership",
                format!("{} rows for {} samples", rows.len(), samples.len()),
            ));
        }
        let mut columns: Vec<Vec<u8>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for (index, row) in rows.iter().enumerate() {
            if row.len() != names.len() {
                return Err(crate::CladeError::unconvertible(
                    "membership",
                    format!(
                        "row {index} has {} values but {} columns were named",
                        row.len(),
                        names.len()
                    ),
                ));
            }
            for (column, &value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Ok(Self::from_columns(samples, names.into_iter().zip(columns).collect())?)
    }
}
