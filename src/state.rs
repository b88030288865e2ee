//! Resumable optimizer state.
//!
//! An [`EmbeddingState`] holds everything the optimizer needs between calls
//! except the coordinates themselves, which stay in a caller-owned buffer.
//! This lets an embedding be advanced in many short increments, for example
//! once per animation frame, without starting over.

use crate::affinity::{compute_affinities, Affinities};
use crate::coordinates::EMBEDDING_DIMENSIONS;
use crate::driver::advance;
use crate::neighbors::NeighborGraph;
use crate::stepper::GradientStepper;
use crate::{perplexity_to_k, Configuration, TsneError};
use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use std::time::Duration;
use tracing::{debug, warn};

/// Working memory of a t-SNE run.
///
/// Cloning produces a fully independent copy, so a run can be forked and
/// both branches advanced separately.
#[derive(Clone, Debug)]
pub struct EmbeddingState {
    /// Number of optimizer steps completed
    iteration: usize,

    /// Number of observations, fixed at creation
    observations: usize,

    /// Neighbors per observation the state was built with
    neighbors: usize,

    /// Schedule, learning rate and layout
    config: Configuration,

    /// Symmetric input affinities
    affinities: Affinities,

    /// Per-coordinate adaptive gains, n × 2
    gains: Array2<f64>,

    /// Per-coordinate velocities, n × 2
    velocities: Array2<f64>,
}

impl EmbeddingState {
    /// Creates a state for `graph` with the given perplexity and default
    /// optimizer settings.
    ///
    /// # Errors
    /// See [`EmbeddingState::with_configuration`].
    pub fn new(graph: &NeighborGraph, perplexity: f64) -> Result<Self, TsneError> {
        Self::with_configuration(graph, Configuration::builder().perplexity(perplexity).build())
    }

    /// Creates a state for `graph` using the full configuration.
    ///
    /// The graph must list `perplexity_to_k(perplexity)` neighbors per
    /// observation, or `n - 1` if that is smaller.
    ///
    /// # Errors
    /// * `TsneError::InvalidPerplexity` - Perplexity is not a positive number
    /// * `TsneError::EmptyGraph` - The graph has no observations
    /// * `TsneError::NeighborCountMismatch` - The graph lists a different
    ///   number of neighbors than the perplexity requires
    pub fn with_configuration(
        graph: &NeighborGraph,
        config: Configuration,
    ) -> Result<Self, TsneError> {
        let perplexity = config.perplexity;
        if !perplexity.is_finite() || perplexity <= 0.0 {
            return Err(TsneError::InvalidPerplexity(perplexity));
        }

        let n = graph.len();
        if n == 0 {
            return Err(TsneError::EmptyGraph);
        }

        let k = perplexity_to_k(perplexity);
        let expected = if k > n - 1 {
            warn!("Perplexity {perplexity} needs {k} neighbors but only {} are available", n - 1);
            n - 1
        } else {
            k
        };

        let actual = graph.neighbors_per_observation();
        if actual != expected {
            return Err(TsneError::NeighborCountMismatch { expected, actual });
        }

        let affinities = compute_affinities(graph, perplexity);
        debug!("Initialized t-SNE state for {n} observations with {expected} neighbors");

        Ok(Self {
            iteration: 0,
            observations: n,
            neighbors: expected,
            config,
            affinities,
            gains: Array2::ones((n, EMBEDDING_DIMENSIONS)),
            velocities: Array2::zeros((n, EMBEDDING_DIMENSIONS)),
        })
    }

    /// Number of optimizer steps completed so far.
    pub fn iteration_count(&self) -> usize {
        self.iteration
    }

    /// Number of observations being embedded.
    pub fn observation_count(&self) -> usize {
        self.observations
    }

    /// Number of neighbors per observation used to build the affinities.
    pub fn neighbor_count(&self) -> usize {
        self.neighbors
    }

    /// Optimizer settings this state was created with.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Symmetric input affinities.
    pub fn affinities(&self) -> &Affinities {
        &self.affinities
    }

    /// Per-coordinate gains.
    pub fn gains(&self) -> ArrayView2<f64> {
        self.gains.view()
    }

    /// Per-coordinate velocities.
    pub fn velocities(&self) -> ArrayView2<f64> {
        self.velocities.view()
    }

    /// Mutable gains and velocities, for use by a [`Stepper`](crate::Stepper).
    pub fn buffers_mut(&mut self) -> (ArrayViewMut2<f64>, ArrayViewMut2<f64>) {
        (self.gains.view_mut(), self.velocities.view_mut())
    }

    /// Runs the built-in [`GradientStepper`] under a time and iteration
    /// budget. See [`advance`] for the exact contract.
    ///
    /// # Errors
    /// * `TsneError::CoordinateBufferTooShort` - `coordinates` holds fewer
    ///   than `n * 2` values
    pub fn advance(
        &mut self,
        coordinates: &mut [f64],
        runtime: Duration,
        max_iterations: usize,
    ) -> Result<usize, TsneError> {
        advance(self, &mut GradientStepper, coordinates, runtime, max_iterations)
    }

    /// Records one completed step.
    pub(crate) fn increment(&mut self) {
        self.iteration += 1;
    }
}
