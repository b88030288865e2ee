//! t-SNE gradient calculation.
//!
//! The gradient of the Kullback-Leibler divergence between the input
//! affinities P and the Student-t similarities Q of the embedding splits into
//! two parts:
//! - An attractive part over the sparse neighbor affinities
//! - A repulsive part over all pairs of points, normalized by the sum of the
//!   unnormalized similarities
//!
//! Repulsion is computed exactly, so a step costs O(n^2). Approximations such
//! as Barnes-Hut trees belong in a separate [`Stepper`](crate::Stepper).

use crate::affinity::Affinities;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

/// Calculates the t-SNE gradient for the current embedding.
///
/// # Arguments
/// * `y` - Current embedding coordinates as an n × d matrix
/// * `affinities` - Symmetric joint probabilities of the input space
/// * `exaggeration` - Multiplier applied to the attractive forces
///
/// # Returns
/// An n × d matrix with the gradient for each point. The constant factor 4 of
/// the analytic gradient is left out; it is absorbed by the learning rate.
pub fn tsne_grad(y: ArrayView2<f64>, affinities: &Affinities, exaggeration: f64) -> Array2<f64> {
    let mut grad = Array2::zeros(y.dim());
    let mut repulsive = Array2::<f64>::zeros(y.dim());

    // Attractive forces only touch stored neighbor affinities
    Zip::indexed(grad.rows_mut()).par_for_each(|i, mut force| {
        for (j, p) in affinities.row(i) {
            let (q, _) = student_t(y, i, j);
            let w = exaggeration * p * q;
            Zip::from(&mut force)
                .and(y.row(i))
                .and(y.row(j))
                .for_each(|f, &a, &b| *f += w * (a - b));
        }
    });

    // Each row reports its share of the normalization constant. The shares
    // are summed in row order so that repeated runs give identical results.
    let row_sums: Vec<f64> = repulsive
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(i, mut force)| {
            let mut row_sum = 0.0;
            for j in 0..y.nrows() {
                if i == j {
                    continue;
                }
                let (q, diff) = student_t(y, i, j);
                row_sum += q;
                let w = q * q;
                for (f, d) in force.iter_mut().zip(diff) {
                    *f += w * d;
                }
            }
            row_sum
        })
        .collect();
    let z: f64 = row_sums.iter().sum();

    if z > 0.0 {
        grad.scaled_add(-1.0 / z, &repulsive);
    }

    grad
}

/// Computes the unnormalized Student-t similarity between points `i` and `j`
/// along with their coordinate difference `y_i - y_j`.
fn student_t(y: ArrayView2<f64>, i: usize, j: usize) -> (f64, [f64; 2]) {
    let mut diff = [0.0; 2];
    let mut d_ij = 1.0;
    for (d, slot) in diff.iter_mut().enumerate().take(y.ncols()) {
        *slot = y[[i, d]] - y[[j, d]];
        d_ij += *slot * *slot;
    }
    (1.0 / d_ij, diff)
}
