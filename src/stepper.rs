//! Single optimizer steps.
//!
//! The budgeted driver only decides how many steps to run. What one step does
//! is behind the [`Stepper`] trait, so the driver works the same with the
//! built-in exact optimizer, an accelerated one, or a test double.

use crate::gradient::tsne_grad;
use crate::schedule::find_schedule;
use crate::state::EmbeddingState;
use crate::update::{center_embedding, update_embedding_gains};
use ndarray::ArrayViewMut2;

/// Advances an embedding by exactly one optimizer iteration.
pub trait Stepper {
    /// Runs one step.
    ///
    /// # Arguments
    /// * `iteration` - Zero-based index of this step, used for schedules
    /// * `state` - Optimizer working memory, updated in place
    /// * `coordinates` - Current n × 2 embedding, updated in place
    fn step(&mut self, iteration: usize, state: &mut EmbeddingState, coordinates: ArrayViewMut2<f64>);
}

impl<F> Stepper for F
where
    F: FnMut(usize, &mut EmbeddingState, ArrayViewMut2<f64>),
{
    fn step(&mut self, iteration: usize, state: &mut EmbeddingState, coordinates: ArrayViewMut2<f64>) {
        self(iteration, state, coordinates);
    }
}

/// Standard t-SNE step with exact repulsion, early exaggeration, momentum
/// and adaptive gains.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradientStepper;

impl Stepper for GradientStepper {
    fn step(
        &mut self,
        iteration: usize,
        state: &mut EmbeddingState,
        mut coordinates: ArrayViewMut2<f64>,
    ) {
        let config = state.configuration();
        let schedule = find_schedule(config, iteration);
        let lr = config.learning_rate;

        let grad = tsne_grad(coordinates.view(), state.affinities(), schedule.exaggeration);

        let (gains, velocities) = state.buffers_mut();
        update_embedding_gains(
            coordinates.view_mut(),
            grad.view(),
            gains,
            velocities,
            schedule.momentum,
            lr,
        );
        center_embedding(coordinates);
    }
}
