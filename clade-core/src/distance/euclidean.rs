use crate::distance::helpers::validated_pair;
use crate::distance::types::{Distance, Result};

/// Computes the Euclidean distance between two vectors.
///
/// # Examples
///
/// ```
/// use clade_core::{DistanceError, euclidean_distance};
///
/// fn main() -> Result<(), DistanceError> {
///     let distance = euclidean_distance(&[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0])?;
///     assert!((distance.value() - 7.071_068).abs() < 1e-6);
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
pub fn euclidean_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let (left, right) = validated_pair(left, right)?;

    let sum: f64 = left
        .iter()
        .zip(right.iter())
        .map(|(&l, &r)| {
            let diff = f64::from(l) - f64::from(r);
            diff * diff
        })
        .sum();

    Ok(Distance::from_raw(sum.sqrt()))
}
