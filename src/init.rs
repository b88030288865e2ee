//! Random starting layouts for the optimizer.

use crate::coordinates::{coordinates_view_mut, Layout};
use crate::TsneError;
use ndarray::Array2;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

/// Fills the first `n * 2` values of `buffer` with standard Normal draws.
///
/// Every value is an independent draw, so the result is a valid starting
/// layout under any [`Layout`]. The same `seed` always produces the same
/// values.
///
/// # Errors
/// * `TsneError::CoordinateBufferTooShort` - `buffer` holds fewer than
///   `n * 2` values
/// * `TsneError::Normal` - The Normal distribution cannot be constructed
pub fn randomize_start(n: usize, buffer: &mut [f64], seed: u64) -> Result<(), TsneError> {
    let mut y = coordinates_view_mut(buffer, n, Layout::PointMajor)?;
    let normal = Normal::new(0.0, 1.0)?;
    let mut rng = Mcg128Xsl64::seed_from_u64(seed);

    y.assign(&Array2::random_using(y.dim(), normal, &mut rng));
    Ok(())
}
