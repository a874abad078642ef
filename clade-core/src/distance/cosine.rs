use crate::distance::helpers::{accumulate_components, validated_pair};
use crate::distance::types::{Distance, Norm, Result, VectorKind};

/// Computes the cosine distance between two vectors.
///
/// # Examples
///
/// ```
/// use clade_core::{DistanceError, cosine_distance};
///
/// fn main() -> Result<(), DistanceError> {
///     let orthogonal = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0])?;
///     assert!((orthogonal.value() - 1.0).abs() < 1e-6);
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - [`DistanceError::ZeroLength`](crate::DistanceError::ZeroLength) when any input is empty.
/// - [`DistanceError::DimensionMismatch`](crate::DistanceError::DimensionMismatch) when input
///   lengths differ.
/// - [`DistanceError::NonFinite`](crate::DistanceError::NonFinite) when a value is NaN or infinite.
/// - [`DistanceError::ZeroMagnitude`](crate::DistanceError::ZeroMagnitude) when either vector
///   has zero L2 norm.
pub fn cosine_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let (left, right) = validated_pair(left, right)?;

    let (dot, left_squares, right_squares) = accumulate_components(&left, &right);
    let left_norm = Norm::from_squared_sum(left_squares, VectorKind::Left)?;
    let right_norm = Norm::from_squared_sum(right_squares, VectorKind::Right)?;

    let similarity = dot / (left_norm.value() * right_norm.value());
    // Theoretical range is [-1, 1], but numerical noise can spill over.
    let similarity = similarity.clamp(-1.0, 1.0);

    Ok(Distance::from_raw(1.0 - similarity))
}
