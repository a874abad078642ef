//! Synthetic point clouds for hierarchy tests.
//!
//! Blobs are sampled from a seeded [`SmallRng`] so fixtures are reproducible
//! across runs and platforms.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Named group of points.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    /// Sample identifiers, `<prefix><index>`.
    pub samples: Vec<String>,
    /// One row per sample.
    pub rows: Vec<Vec<f32>>,
}

impl Blob {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the blob holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends `other`'s points after this blob's.
    #[must_use]
    pub fn chain(mut self, other: Self) -> Self {
        self.samples.extend(other.samples);
        self.rows.extend(other.rows);
        self
    }
}

/// Samples `count` points uniformly within `spread` of `centre` on every
/// axis.
///
/// # Examples
/// ```
/// use clade_test_support::fixtures::uniform_blob;
///
/// let blob = uniform_blob("a", 7, &[1.0, -1.0], 0.5, 42);
/// assert_eq!(blob.len(), 7);
/// assert_eq!(blob.samples[0], "a0");
/// assert!(blob.rows.iter().all(|row| (row[0] - 1.0).abs() <= 0.5));
/// ```
#[must_use]
pub fn uniform_blob(prefix: &str, count: usize, centre: &[f32], spread: f32, seed: u64) -> Blob {
    let mut rng = SmallRng::seed_from_u64(seed);
    let rows = (0..count)
        .map(|_| {
            centre
                .iter()
                .map(|&axis| {
                    if spread > 0.0 {
                        axis + rng.gen_range(-spread..=spread)
                    } else {
                        axis
                    }
                })
                .collect()
        })
        .collect();
    Blob {
        samples: ids(prefix, count),
        rows,
    }
}

/// Places `count` points on a line from `start`, `step` apart along the
/// first axis.
///
/// # Examples
/// ```
/// use clade_test_support::fixtures::line;
///
/// let blob = line("n", 3, &[0.0, 2.0], 0.5);
/// assert_eq!(blob.rows, [vec![0.0, 2.0], vec![0.5, 2.0], vec![1.0, 2.0]]);
/// ```
#[must_use]
pub fn line(prefix: &str, count: usize, start: &[f32], step: f32) -> Blob {
    let mut offset = 0.0_f32;
    let rows = (0..count)
        .map(|_| {
            let mut row = start.to_vec();
            if let Some(first) = row.first_mut() {
                *first += offset;
            }
            offset += step;
            row
        })
        .collect();
    Blob {
        samples: ids(prefix, count),
        rows,
    }
}

/// Identifiers `<prefix>0 .. <prefix>{count - 1}`.
#[must_use]
pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|index| format!("{prefix}{index}")).collect()
}
