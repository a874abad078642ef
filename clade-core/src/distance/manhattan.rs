use crate::distance::helpers::validated_pair;
use crate::distance::types::{Distance, Result};

/// Computes the Manhattan (L1) distance between two vectors.
///
/// # Examples
///
/// ```
/// use clade_core::{DistanceError, manhattan_distance};
///
/// fn main() -> Result<(), DistanceError> {
///     let distance = manhattan_distance(&[1.0, -2.0], &[4.0, 2.0])?;
///     assert!((distance.value() - 7.0).abs() < 1e-9);
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Shares the validation failures of [`euclidean_distance`](crate::euclidean_distance).
pub fn manhattan_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let (left, right) = validated_pair(left, right)?;

    let sum: f64 = left
        .iter()
        .zip(right.iter())
        .map(|(&l, &r)| (f64::from(l) - f64::from(r)).abs())
        .sum();

    Ok(Distance::from_raw(sum))
}
