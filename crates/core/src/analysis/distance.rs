//! Histogram distance.
//!
//! Two binaries are compared function by function. Every function is turned
//! into a count vector over the sorted union of mnemonics seen in either
//! histogram; each (A, B) function pair gets `euclidean * angular`; the
//! resulting matrix is reduced by averaging row minima and column minima and
//! keeping the larger of the two.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use tracing::debug;

use crate::model::MnemonicHistogram;

/// Sorted union of all mnemonics appearing in either histogram.
pub fn mnemonic_basis<'a>(a: &'a MnemonicHistogram, b: &'a MnemonicHistogram) -> Vec<&'a str> {
    let mut basis: BTreeSet<&str> = a.mnemonics();
    basis.extend(b.mnemonics());
    basis.into_iter().collect()
}

/// One count vector per function (in function-name order) over `basis`.
pub fn function_vectors(histogram: &MnemonicHistogram, basis: &[&str]) -> Vec<Vec<f64>> {
    histogram
        .functions()
        .map(|(_, counts)| {
            basis.iter().map(|m| counts.get(*m).map(|c| f64::from(*c)).unwrap_or(0.0)).collect()
        })
        .collect()
}

/// L2 norm of the componentwise difference.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Map a cosine to `1 - 2 * acos(cos_phi) / pi`.
///
/// Same direction gives 1, orthogonal 0, opposite -1. The input is clamped
/// to `[-1, 1]` first since rounding can push it slightly outside.
pub fn rescale_cosine(cos_phi: f64) -> f64 {
    1.0 - 2.0 * cos_phi.clamp(-1.0, 1.0).acos() / PI
}

/// Angular term of the pair distance.
///
/// Vectors without any overlap (dot product of zero) are defined as exactly
/// 1.0 regardless of magnitude.
pub fn angular_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    if dot == 0.0 {
        return 1.0;
    }
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    rescale_cosine(dot / (norm_a * norm_b))
}

/// Distance between two function vectors.
pub fn pair_distance(a: &[f64], b: &[f64]) -> f64 {
    euclidean_distance(a, b) * angular_distance(a, b)
}

/// Row-major `rows x cols` matrix of pair distances.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute the pair distance of every row vector against every column vector.
    pub fn between(row_vectors: &[Vec<f64>], col_vectors: &[Vec<f64>]) -> Self {
        let mut values = Vec::with_capacity(row_vectors.len() * col_vectors.len());
        for a in row_vectors {
            for b in col_vectors {
                values.push(pair_distance(a, b));
            }
        }
        Self { rows: row_vectors.len(), cols: col_vectors.len(), values }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn transpose(&self) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                values.push(self.get(row, col));
            }
        }
        Self { rows: self.cols, cols: self.rows, values }
    }

    /// Smallest entry of every row.
    pub fn row_minima(&self) -> Vec<f64> {
        (0..self.rows).map(|r| self.row(r).iter().copied().fold(f64::INFINITY, f64::min)).collect()
    }

    /// Mean of the row minima; infinite for a matrix without entries.
    pub fn mean_row_min(&self) -> f64 {
        if self.rows == 0 || self.cols == 0 {
            return f64::INFINITY;
        }
        self.row_minima().iter().sum::<f64>() / self.rows as f64
    }

    /// `max(mean row minimum, mean column minimum)`.
    ///
    /// Every function on either side has to find some close partner on the
    /// other side for the result to be small.
    pub fn aggregate(&self) -> f64 {
        self.mean_row_min().max(self.transpose().mean_row_min())
    }
}

/// Dissimilarity of two histograms; lower is more similar.
///
/// Returns `f64::INFINITY` when either histogram has no functions.
pub fn histogram_distance(a: &MnemonicHistogram, b: &MnemonicHistogram) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    let basis = mnemonic_basis(a, b);
    let va = function_vectors(a, &basis);
    let vb = function_vectors(b, &basis);
    let matrix = DistanceMatrix::between(&va, &vb);
    let distance = matrix.aggregate();
    debug!(
        "distance over {} mnemonics, {}x{} functions: {distance}",
        basis.len(),
        matrix.rows(),
        matrix.cols()
    );
    distance
}
