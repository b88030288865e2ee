//! Joint probabilities (affinities) between observations for t-SNE.
//!
//! For each observation a Gaussian bandwidth is calibrated against its
//! neighbor distances so that the conditional distribution over neighbors has
//! the requested perplexity. The conditional probabilities are then
//! symmetrized and normalized into a sparse joint distribution.

use crate::neighbors::NeighborGraph;
use ndarray::parallel::prelude::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};
use tracing::{debug, warn};

/// Entropy tolerance for the bandwidth search.
const TOLERANCE: f64 = 1e-5;

/// Maximum bisection steps per observation.
const MAX_STEPS: usize = 200;

/// Symmetric joint probabilities stored as compressed sparse rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Affinities {
    /// Offsets into `columns`/`values` for each row, length `n + 1`
    offsets: Vec<usize>,

    /// Column index of each stored entry
    columns: Vec<usize>,

    /// Joint probability of each stored entry
    values: Vec<f64>,
}

impl Affinities {
    /// Number of rows (observations).
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Returns true when no observations are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the non-zero `(column, probability)` entries of row `i`.
    ///
    /// Rows at or past [`Affinities::len`] are empty.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = match self.offsets.get(i..i.saturating_add(2)) {
            Some(&[start, end]) => start..end,
            _ => 0..0,
        };
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Sum of all stored probabilities; 1 for any non-empty graph.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Computes symmetric t-SNE affinities from a neighbor graph.
///
/// # Arguments
/// * `graph` - Validated nearest-neighbor graph
/// * `perplexity` - Target perplexity of each conditional distribution
///
/// # Returns
/// Joint probabilities `P_ij = (p_j|i + p_i|j) / sum`, normalized to sum to 1.
pub fn compute_affinities(graph: &NeighborGraph, perplexity: f64) -> Affinities {
    let conditional = conditional_probabilities(graph, perplexity);
    symmetrize(graph, &conditional)
}

/// Calibrates each observation's bandwidth and returns the `(n, k)` matrix
/// of conditional probabilities `p_j|i`.
fn conditional_probabilities(graph: &NeighborGraph, perplexity: f64) -> Array2<f64> {
    let squared = graph.distances().mapv(|d| d * d);
    let mut probabilities = Array2::zeros(squared.dim());
    let target = perplexity.ln();

    let unconverged = squared
        .axis_iter(Axis(0))
        .into_par_iter()
        .zip(probabilities.axis_iter_mut(Axis(0)))
        .filter(|(row, _)| !row.is_empty())
        .map(|(row, mut out)| calibrate_row(row, target, &mut out))
        .filter(|&converged| !converged)
        .count();

    if unconverged > 0 {
        warn!("Bandwidth search did not converge for {unconverged} observations");
    }

    probabilities
}

/// Finds the precision `beta` for one observation by bisection and writes the
/// normalized conditional probabilities into `out`.
///
/// `squared` must hold the squared distances to the neighbors. Distances are
/// shifted by their minimum before exponentiation for numerical stability;
/// the shift cancels out in both the entropy and the normalized result.
///
/// Returns whether the entropy reached the target within tolerance.
fn calibrate_row(squared: ArrayView1<f64>, target: f64, out: &mut ArrayViewMut1<f64>) -> bool {
    let min = squared.iter().copied().fold(f64::INFINITY, f64::min);
    let mut beta = 1.0;
    let mut beta_min = 0.0;
    let mut beta_max = f64::INFINITY;
    let mut converged = false;

    for _ in 0..MAX_STEPS {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        Zip::from(&mut *out).and(&squared).for_each(|p, &d| {
            let shifted = d - min;
            *p = (-beta * shifted).exp();
            sum += *p;
            weighted += shifted * *p;
        });

        let entropy = sum.ln() + beta * weighted / sum;
        let diff = entropy - target;
        if diff.abs() < TOLERANCE {
            converged = true;
            break;
        }

        if diff > 0.0 {
            // Entropy too high: sharpen the kernel
            beta_min = beta;
            beta = if beta_max.is_infinite() {
                beta * 2.0
            } else {
                (beta + beta_max) / 2.0
            };
        } else {
            beta_max = beta;
            beta = (beta + beta_min) / 2.0;
        }
    }

    let sum = out.sum();
    out.mapv_inplace(|p| p / sum);
    converged
}

/// Builds `P = (C + C^T) / sum` in compressed sparse row form from the
/// conditional probability matrix `C`.
fn symmetrize(graph: &NeighborGraph, conditional: &Array2<f64>) -> Affinities {
    let n = graph.len();
    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];

    Zip::indexed(graph.indices())
        .and(conditional)
        .for_each(|(i, _), &j, &p| {
            let j = j as usize;
            rows[i].push((j, p));
            rows[j].push((i, p));
        });

    let mut offsets = Vec::with_capacity(n + 1);
    let mut columns = Vec::new();
    let mut values = Vec::new();
    offsets.push(0);

    for mut row in rows {
        row.sort_unstable_by_key(|&(j, _)| j);
        let start = columns.len();
        for (j, p) in row {
            // Edges listed from both endpoints collapse into one entry
            if columns.len() > start && columns.last() == Some(&j) {
                if let Some(value) = values.last_mut() {
                    *value += p;
                }
            } else {
                columns.push(j);
                values.push(p);
            }
        }
        offsets.push(columns.len());
    }

    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }

    debug!("Computed {} non-zero affinities for {n} observations", values.len());

    Affinities {
        offsets,
        columns,
        values,
    }
}
