//! Gradient descent updates for t-SNE embeddings.
//!
//! Coordinates move with momentum, and every coordinate carries its own
//! adaptive gain: the gain grows while the gradient keeps pushing in the same
//! direction as the current velocity and shrinks when the two disagree.

use ndarray::{ArrayView2, ArrayViewMut2, Axis, Zip};

/// Lower bound for the per-coordinate gains.
const MIN_GAIN: f64 = 0.01;

/// Updates embedding coordinates using momentum and adaptive gains.
///
/// # Arguments
/// * `y` - Current embedding coordinates to update
/// * `grad` - Gradient for this iteration
/// * `gains` - Per-coordinate gain factors
/// * `velocities` - Per-coordinate velocity from the previous step
/// * `momentum` - Fraction of the previous velocity kept
/// * `lr` - Base learning rate
///
/// # Implementation Notes
/// - A gain increases by 0.2 when the gradient and velocity signs differ and
///   is multiplied by 0.8 otherwise, never dropping below 0.01
/// - `velocity = momentum * velocity - lr * gain * grad`, then `y += velocity`
///
/// # Panics
/// * If `grad`, `gains` or `velocities` have a different shape than `y`
pub fn update_embedding_gains(
    y: ArrayViewMut2<f64>,
    grad: ArrayView2<f64>,
    gains: ArrayViewMut2<f64>,
    velocities: ArrayViewMut2<f64>,
    momentum: f64,
    lr: f64,
) {
    Zip::from(y)
        .and(grad)
        .and(gains)
        .and(velocities)
        .par_for_each(|y, &grad, gain, velocity| {
            *gain = if (grad > 0.0) == (*velocity > 0.0) {
                *gain * 0.8
            } else {
                *gain + 0.2
            }
            .max(MIN_GAIN);
            *velocity = momentum * *velocity - lr * *gain * grad;
            *y += *velocity;
        });
}

/// Shifts the embedding so that every dimension has zero mean.
pub fn center_embedding(mut y: ArrayViewMut2<f64>) {
    if let Some(mean) = y.mean_axis(Axis(0)) {
        y -= &mean;
    }
}
