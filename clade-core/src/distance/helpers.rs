//! Shared helpers for distance implementations.

use super::types::{DistanceError, Result, Vector, VectorKind};

/// Validates both inputs and ensures they share the same dimensionality.
pub(crate) fn validated_pair<'a>(
    left: &'a [f32],
    right: &'a [f32],
) -> Result<(Vector<'a>, Vector<'a>)> {
    let left = Vector::new(left, VectorKind::Left)?;
    let right = Vector::new(right, VectorKind::Right)?;
    if left.dimension() != right.dimension() {
        return Err(DistanceError::DimensionMismatch {
            left: left.dimension(),
            right: right.dimension(),
        });
    }
    Ok((left, right))
}

/// Accumulates the dot product and squared magnitudes across both vectors.
pub(crate) fn accumulate_components(left: &Vector<'_>, right: &Vector<'_>) -> (f64, f64, f64) {
    left.iter().zip(right.iter()).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, left_squares, right_squares), (&l, &r)| {
            let (l, r) = (f64::from(l), f64::from(r));
            (dot + l * r, left_squares + l * l, right_squares + r * r)
        },
    )
}
