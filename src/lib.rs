#![allow(clippy::multiple_crate_versions)]

//! # `tsne-stepper`: resumable, time-budgeted t-SNE
//!
//! This crate runs t-distributed stochastic neighbor embedding (t-SNE) in
//! small increments. Instead of one long call that returns a finished
//! embedding, the optimizer state lives in an [`EmbeddingState`] and is
//! advanced by [`advance`] under a wall-clock budget and an iteration
//! ceiling. This suits interactive front ends that redraw the layout after
//! every few steps.
//!
//! ## Key Features
//!
//! - Starts from a precomputed nearest-neighbor graph; neighbor search is
//!   left to a dedicated index
//! - Perplexity-calibrated, symmetric input affinities
//! - Early exaggeration, momentum and adaptive gains, as in the reference
//!   t-SNE optimizer
//! - Coordinates stay in a caller-owned `f64` buffer, in either dimension-major
//!   or point-major order
//! - States are cheap to fork with [`Clone`] for exploring several runs
//! - The single-step update is pluggable through the [`Stepper`] trait
//!
//! ## Examples
//!
//! Animating an embedding, a few milliseconds at a time:
//! ```rust,no_run
//! use std::time::Duration;
//! use tsne_stepper::{perplexity_to_k, randomize_start, EmbeddingState, NeighborGraph};
//!
//! # fn neighbors(k: usize) -> NeighborGraph { unimplemented!() }
//! let perplexity = 10.0;
//! let graph: NeighborGraph = neighbors(perplexity_to_k(perplexity));
//! let n = graph.len();
//!
//! let mut state = EmbeddingState::new(&graph, perplexity)?;
//! let mut y = vec![0.0; n * 2];
//! randomize_start(n, &mut y, 42)?;
//!
//! while state.iteration_count() < 1000 {
//!     state.advance(&mut y, Duration::from_millis(16), 1000)?;
//!     // redraw using `y`
//! }
//! # Ok::<(), tsne_stepper::TsneError>(())
//! ```
//!
//! Customizing the optimizer:
//! ```rust
//! use tsne_stepper::{Configuration, Layout};
//!
//! let config = Configuration::builder()
//!     .perplexity(30.0)
//!     .learning_rate(100.0)
//!     .stop_lying_iter(100)
//!     .layout(Layout::PointMajor)
//!     .build();
//! assert_eq!(config.exaggeration_factor, 12.0);
//! ```
//!
//! ## Configuration
//!
//! - `perplexity`: effective number of neighbors (default: 30)
//! - `exaggeration_factor`: attraction multiplier during early exaggeration
//!   (default: 12)
//! - `stop_lying_iter`: iteration at which exaggeration ends (default: 250)
//! - `mom_switch_iter`: iteration at which momentum switches (default: 250)
//! - `start_momentum` / `final_momentum`: momentum before and after the
//!   switch (default: 0.5 / 0.8)
//! - `learning_rate`: step size (default: 200)
//! - `layout`: memory order of the coordinate buffer (default:
//!   dimension-major)
//!
//! ## References
//!
//! [Visualizing Data using t-SNE](https://jmlr.org/papers/v9/vandermaaten08a.html).
//! van der Maaten, L., & Hinton, G. (2008).
//! Journal of Machine Learning Research, 9(86), 2579-2605.

// Submodule imports
mod affinity;
mod coordinates;
mod driver;
mod gradient;
mod init;
mod neighbors;
mod schedule;
mod state;
mod stepper;
mod update;

#[cfg(test)]
mod tests;

use bon::Builder;
use ndarray::ShapeError;
use ndarray_rand::rand_distr::NormalError;
use thiserror::Error;

pub use crate::affinity::Affinities;
pub use crate::coordinates::{Layout, EMBEDDING_DIMENSIONS};
pub use crate::driver::advance;
pub use crate::init::randomize_start;
pub use crate::neighbors::NeighborGraph;
pub use crate::state::EmbeddingState;
pub use crate::stepper::{GradientStepper, Stepper};

/// Configuration options for a t-SNE run.
///
/// Controls the perplexity, the optimizer schedule and the memory layout of
/// the coordinate buffer.
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Effective number of neighbors each point should consider
    #[builder(default = 30.0)]
    pub perplexity: f64,

    /// Multiplier applied to attractive forces during early exaggeration
    #[builder(default = 12.0)]
    pub exaggeration_factor: f64,

    /// Zero-based iteration at which early exaggeration ends
    #[builder(default = 250)]
    pub stop_lying_iter: usize,

    /// Zero-based iteration at which momentum switches to `final_momentum`
    #[builder(default = 250)]
    pub mom_switch_iter: usize,

    /// Momentum used before `mom_switch_iter`
    #[builder(default = 0.5)]
    pub start_momentum: f64,

    /// Momentum used from `mom_switch_iter` on
    #[builder(default = 0.8)]
    pub final_momentum: f64,

    /// Learning rate for the gradient updates
    #[builder(default = 200.0)]
    pub learning_rate: f64,

    /// Memory order of the caller's coordinate buffer
    #[builder(default)]
    pub layout: Layout,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            exaggeration_factor: 12.0,
            stop_lying_iter: 250,
            mom_switch_iter: 250,
            start_momentum: 0.5,
            final_momentum: 0.8,
            learning_rate: 200.0,
            layout: Layout::default(),
        }
    }
}

/// Returns the number of nearest neighbors needed for a given perplexity,
/// `ceil(3 * perplexity)`.
///
/// Negative or non-finite inputs saturate; validate the perplexity first.
pub fn perplexity_to_k(perplexity: f64) -> usize {
    (perplexity * 3.0).ceil() as usize
}

/// Creates a fresh optimizer state from a neighbor graph.
///
/// Equivalent to [`EmbeddingState::new`].
///
/// # Errors
/// * `TsneError::InvalidPerplexity` - Perplexity is not a positive number
/// * `TsneError::EmptyGraph` - The graph has no observations
/// * `TsneError::NeighborCountMismatch` - The graph does not list
///   `perplexity_to_k(perplexity)` neighbors (or `n - 1` for small graphs)
pub fn initialize(graph: &NeighborGraph, perplexity: f64) -> Result<EmbeddingState, TsneError> {
    EmbeddingState::new(graph, perplexity)
}

/// Errors that can occur while setting up or advancing a t-SNE run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TsneError {
    /// Perplexity is zero, negative or not finite
    #[error("Perplexity must be a positive number, got {0}")]
    InvalidPerplexity(f64),

    /// The neighbor graph has no observations
    #[error("The neighbor graph must contain at least one observation")]
    EmptyGraph,

    /// The neighbor graph lists a different number of neighbors than the
    /// perplexity requires
    #[error("Expected {expected} neighbors per observation, got {actual}")]
    NeighborCountMismatch {
        /// Neighbors required by the perplexity
        expected: usize,
        /// Neighbors listed in the graph
        actual: usize,
    },

    /// Neighbor index and distance matrices do not have the same shape
    #[error("Neighbor indices have shape {indices:?} but distances have shape {distances:?}")]
    InvalidNeighborShape {
        /// Shape of the index matrix
        indices: Vec<usize>,
        /// Shape of the distance matrix
        distances: Vec<usize>,
    },

    /// A neighbor index does not refer to an observation
    #[error("Observation {observation} lists neighbor {neighbor}, but there are only {observations} observations")]
    InvalidNeighborIndex {
        /// Observation owning the neighbor list
        observation: usize,
        /// Offending neighbor index
        neighbor: usize,
        /// Number of observations in the graph
        observations: usize,
    },

    /// An observation lists itself as a neighbor
    #[error("Observation {0} lists itself as a neighbor")]
    SelfNeighbor(usize),

    /// A neighbor distance is negative or too large to square
    #[error("Observation {observation} has invalid neighbor distance {distance}")]
    InvalidDistance {
        /// Observation owning the neighbor list
        observation: usize,
        /// Offending distance
        distance: f64,
    },

    /// The coordinate buffer cannot hold n × 2 values
    #[error("Coordinate buffer needs {expected} values, got {actual}")]
    CoordinateBufferTooShort {
        /// Values required
        expected: usize,
        /// Values provided
        actual: usize,
    },

    /// The coordinate buffer could not be viewed as a matrix
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Normal distribution creation failed
    #[error(transparent)]
    Normal(#[from] NormalError),
}
