//! Domain primitives shared by the distance routines.

use core::{fmt, ops::Deref};

use thiserror::Error;

/// Identifies whether an error was produced while inspecting the left or right
/// vector argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VectorKind {
    /// Value originating from the first argument.
    Left,
    /// Value originating from the second argument.
    Right,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Errors emitted while computing distances.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DistanceError {
    /// Either input vector had zero length.
    #[error("vectors must have positive dimension")]
    ZeroLength,
    /// Input vectors had different lengths.
    #[error("dimension mismatch: left={left}, right={right}")]
    DimensionMismatch { left: usize, right: usize },
    /// Encountered a non-finite value in one of the vectors.
    #[error("{which} vector contains a non-finite value at index {index}: {value}")]
    NonFinite {
        which: VectorKind,
        index: usize,
        value: f32,
    },
    /// Cosine distance is undefined for zero-magnitude vectors.
    #[error("{which} vector has zero magnitude")]
    ZeroMagnitude { which: VectorKind },
    /// A computed norm overflowed.
    #[error("{which} norm is not finite")]
    InvalidNorm { which: VectorKind },
}

/// Convenient alias for distance computations.
pub type Result<T> = core::result::Result<T, DistanceError>;

/// Vector newtype that validates dimensionality and finiteness on construction.
#[derive(Clone, Copy, Debug)]
pub struct Vector<'a>(&'a [f32]);

impl<'a> Vector<'a> {
    /// Validates and constructs a [`Vector`].
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::ZeroLength`] when the slice is empty and
    /// [`DistanceError::NonFinite`] when a value is NaN or infinite.
    pub fn new(values: &'a [f32], which: VectorKind) -> Result<Self> {
        if values.is_empty() {
            return Err(DistanceError::ZeroLength);
        }

        if let Some((index, value)) = values
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(DistanceError::NonFinite {
                which,
                index,
                value: *value,
            });
        }

        Ok(Self(values))
    }

    /// Returns the dimensionality of the vector.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }
}

impl Deref for Vector<'_> {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

/// Validated non-zero L2 norm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Norm(f64);

impl Norm {
    pub(crate) fn from_squared_sum(sum: f64, which: VectorKind) -> Result<Self> {
        if !sum.is_finite() {
            return Err(DistanceError::InvalidNorm { which });
        }
        if sum == 0.0 {
            return Err(DistanceError::ZeroMagnitude { which });
        }
        Ok(Self(sum.sqrt()))
    }

    pub(crate) fn value(self) -> f64 {
        self.0
    }
}

/// Distance result newtype.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    pub(crate) fn from_raw(value: f64) -> Self {
        Self(value)
    }

    /// Returns the raw distance value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Deref for Distance {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
