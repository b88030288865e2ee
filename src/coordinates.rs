//! Views over caller-owned coordinate buffers.
//!
//! Coordinates live in a flat `f64` slice that the caller allocates and keeps.
//! The optimizer sees them as an n × 2 matrix regardless of how the two
//! dimensions are interleaved in memory.

use crate::TsneError;
use ndarray::{ArrayViewMut2, ShapeBuilder};

/// Dimensionality of every embedding produced by this crate.
pub const EMBEDDING_DIMENSIONS: usize = 2;

/// Memory order of a flat coordinate buffer.
///
/// A column-major 2 × n matrix, as used by R and Fortran callers, stores
/// each point's two coordinates next to each other and therefore needs
/// [`Layout::PointMajor`]. The default suits buffers that keep one
/// contiguous array per dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Layout {
    /// All coordinates of dimension 0, then all of dimension 1
    #[default]
    DimensionMajor,

    /// Both coordinates of point 0, then point 1, and so on
    PointMajor,
}

/// Borrows the first `n * 2` values of `buffer` as an n × 2 matrix.
///
/// # Errors
/// * `TsneError::CoordinateBufferTooShort` - `buffer` holds fewer than
///   `n * 2` values, or `n * 2` overflows `usize`
pub fn coordinates_view_mut(
    buffer: &mut [f64],
    n: usize,
    layout: Layout,
) -> Result<ArrayViewMut2<'_, f64>, TsneError> {
    let needed = n.checked_mul(EMBEDDING_DIMENSIONS);
    let expected = match needed {
        Some(expected) if buffer.len() >= expected => expected,
        // An overflowing size is reported as the largest possible request
        _ => {
            return Err(TsneError::CoordinateBufferTooShort {
                expected: needed.unwrap_or(usize::MAX),
                actual: buffer.len(),
            })
        }
    };

    let buffer = &mut buffer[..expected];
    let shape = (n, EMBEDDING_DIMENSIONS);
    let view = match layout {
        Layout::DimensionMajor => ArrayViewMut2::from_shape(shape.f(), buffer)?,
        Layout::PointMajor => ArrayViewMut2::from_shape(shape, buffer)?,
    };

    Ok(view)
}
