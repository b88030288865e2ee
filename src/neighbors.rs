//! Validated nearest-neighbor graphs consumed by the t-SNE optimizer.
//!
//! The graph itself is produced elsewhere (an exact or approximate neighbor
//! index). This module only checks that what arrives is usable:
//! - Every observation has the same number of neighbors
//! - Neighbor indices refer to other observations in the dataset
//! - Distances are non-negative and their squares are finite

use crate::TsneError;
use ndarray::{Array2, ArrayView1, ArrayView2, Zip};

/// Per-observation nearest neighbors with their distances.
///
/// Row `i` of `indices` and `distances` describes the neighbors of
/// observation `i`, ordered as the neighbor index returned them.
#[derive(Clone, Debug)]
pub struct NeighborGraph {
    indices: Array2<u32>,
    distances: Array2<f64>,
}

impl NeighborGraph {
    /// Builds a graph from `(n, k)` index and distance matrices.
    ///
    /// # Errors
    /// * `TsneError::InvalidNeighborShape` - The two matrices differ in shape
    /// * `TsneError::InvalidNeighborIndex` - An index is not below `n`
    /// * `TsneError::SelfNeighbor` - An observation lists itself
    /// * `TsneError::InvalidDistance` - A distance is negative or its square is
    ///   not finite
    pub fn new(indices: Array2<u32>, distances: Array2<f64>) -> Result<Self, TsneError> {
        if indices.dim() != distances.dim() {
            return Err(TsneError::InvalidNeighborShape {
                indices: indices.shape().to_vec(),
                distances: distances.shape().to_vec(),
            });
        }

        let n = indices.nrows();
        for (observation, (row, dist_row)) in indices
            .outer_iter()
            .zip(distances.outer_iter())
            .enumerate()
        {
            validate_row(observation, n, row, dist_row)?;
        }

        Ok(Self { indices, distances })
    }

    /// Builds a graph from one `(neighbor, distance)` list per observation.
    ///
    /// # Errors
    /// * `TsneError::InvalidNeighborShape` - Lists have different lengths
    /// * Any error reported by [`NeighborGraph::new`]
    pub fn from_lists(lists: &[Vec<(u32, f64)>]) -> Result<Self, TsneError> {
        let n = lists.len();
        let k = lists.first().map_or(0, Vec::len);

        if let Some(ragged) = lists.iter().find(|list| list.len() != k) {
            return Err(TsneError::InvalidNeighborShape {
                indices: vec![n, k],
                distances: vec![n, ragged.len()],
            });
        }

        let mut indices = Array2::zeros((n, k));
        let mut distances = Array2::zeros((n, k));
        for (i, list) in lists.iter().enumerate() {
            for (j, &(neighbor, distance)) in list.iter().enumerate() {
                indices[[i, j]] = neighbor;
                distances[[i, j]] = distance;
            }
        }

        Self::new(indices, distances)
    }

    /// Number of observations in the graph.
    pub fn len(&self) -> usize {
        self.indices.nrows()
    }

    /// Returns true when the graph holds no observations.
    pub fn is_empty(&self) -> bool {
        self.indices.nrows() == 0
    }

    /// Number of neighbors listed for every observation.
    pub fn neighbors_per_observation(&self) -> usize {
        self.indices.ncols()
    }

    /// Neighbor indices as an `(n, k)` matrix.
    pub fn indices(&self) -> ArrayView2<u32> {
        self.indices.view()
    }

    /// Neighbor distances as an `(n, k)` matrix.
    pub fn distances(&self) -> ArrayView2<f64> {
        self.distances.view()
    }
}

/// Checks one observation's neighbor list against the graph invariants.
fn validate_row(
    observation: usize,
    n: usize,
    row: ArrayView1<u32>,
    distances: ArrayView1<f64>,
) -> Result<(), TsneError> {
    Zip::from(row)
        .and(distances)
        .fold(Ok(()), |acc, &neighbor, &distance| {
            acc?;
            if neighbor as usize >= n {
                return Err(TsneError::InvalidNeighborIndex {
                    observation,
                    neighbor: neighbor as usize,
                    observations: n,
                });
            }
            if neighbor as usize == observation {
                return Err(TsneError::SelfNeighbor(observation));
            }
            // Affinities work on squared distances, which must stay finite
            if !(distance * distance).is_finite() || distance < 0.0 {
                return Err(TsneError::InvalidDistance {
                    observation,
                    distance,
                });
            }
            Ok(())
        })
}
