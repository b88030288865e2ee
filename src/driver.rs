//! Budgeted optimizer driver.
//!
//! Decides how many optimizer steps run per call. Interactive callers want
//! each call to return quickly, so steps stop once a wall-clock budget is
//! spent. Reproducible callers want a fixed amount of work regardless of
//! machine load, so steps also stop at an iteration ceiling.

use crate::coordinates::coordinates_view_mut;
use crate::state::EmbeddingState;
use crate::stepper::Stepper;
use crate::TsneError;
use std::time::{Duration, Instant};
use tracing::debug;

/// Advances `state` and `coordinates` until `runtime` elapses or the state
/// reaches `max_iterations` completed steps.
///
/// The budget is checked only between whole steps. At least one step always
/// runs when the state is below `max_iterations`, even with a zero budget, so
/// repeated calls always make progress. A state already at or past
/// `max_iterations` is left untouched.
///
/// # Arguments
/// * `state` - Optimizer state to resume from
/// * `stepper` - Implementation of a single optimizer step
/// * `coordinates` - Caller-owned buffer of at least n × 2 values, laid out
///   as the state's [`Layout`](crate::Layout) says
/// * `runtime` - Wall-clock budget for this call
/// * `max_iterations` - Total iteration ceiling across all calls
///
/// # Returns
/// The number of steps performed by this call.
///
/// # Errors
/// * `TsneError::CoordinateBufferTooShort` - `coordinates` holds fewer than
///   n × 2 values
pub fn advance<S>(
    state: &mut EmbeddingState,
    stepper: &mut S,
    coordinates: &mut [f64],
    runtime: Duration,
    max_iterations: usize,
) -> Result<usize, TsneError>
where
    S: Stepper + ?Sized,
{
    let mut y = coordinates_view_mut(
        coordinates,
        state.observation_count(),
        state.configuration().layout,
    )?;

    let start = state.iteration_count();
    if start >= max_iterations {
        debug!("Iteration limit {max_iterations} already reached");
        return Ok(0);
    }

    let start_time = Instant::now();
    // An unrepresentable deadline means the budget never runs out
    let deadline = start_time.checked_add(runtime);

    loop {
        stepper.step(state.iteration_count(), state, y.view_mut());
        state.increment();

        if state.iteration_count() >= max_iterations
            || deadline.is_some_and(|deadline| Instant::now() >= deadline)
        {
            break;
        }
    }

    let performed = state.iteration_count() - start;
    debug!(
        "Ran {performed} iterations, {} total, in {:.2?}",
        state.iteration_count(),
        start_time.elapsed()
    );

    Ok(performed)
}
