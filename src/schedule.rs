//! Per-iteration optimizer schedule for t-SNE.
//!
//! Two quantities change over the course of the optimization:
//! - Early exaggeration multiplies the attractive forces so that clusters
//!   form quickly, then drops back to 1
//! - Momentum starts low while the layout is unstable, then increases
//!
//! Both switch at fixed iteration numbers taken from the [`Configuration`].

use crate::Configuration;

/// Schedule values applied during a single optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    /// Multiplier applied to the attractive part of the gradient.
    pub exaggeration: f64,

    /// Fraction of the previous velocity carried into the next update.
    pub momentum: f64,
}

/// Calculate the schedule for a given zero-based iteration.
///
/// # Arguments
/// * `config` - Exaggeration and momentum settings
/// * `itr` - Zero-based index of the step about to run
///
/// # Returns
/// A `Schedule` with the exaggeration and momentum for this step
pub fn find_schedule(config: &Configuration, itr: usize) -> Schedule {
    let exaggeration = if itr < config.stop_lying_iter {
        config.exaggeration_factor
    } else {
        1.0
    };

    let momentum = if itr < config.mom_switch_iter {
        config.start_momentum
    } else {
        config.final_momentum
    };

    Schedule {
        exaggeration,
        momentum,
    }
}
