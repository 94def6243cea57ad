//! Mathematical utilities and decisions.

use euclid::{Point2D, Point3D, Vector3D};

mod aab;
pub use aab::*;
mod color;
pub use color::*;
mod grid;
pub use grid::*;

/// Coordinates that are not locked to the voxel grid.
///
/// Note: Because `GridCoordinate = i32` and `FreeCoordinate = f64`, we can
/// use `FreeCoordinate::from(some_grid_coordinate)` to convert them.
pub type FreeCoordinate = f64;

/// Unit-of-measure type for continuous positions within (or around) the voxel grid.
///
/// One unit is the edge length of a single voxel.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum World {}

/// Unit-of-measure type for texture coordinates, which span `0.0..=1.0` across a texture.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum TextureSpace {}

/// Position in continuous space.
pub type FreePoint = Point3D<FreeCoordinate, World>;

/// Vector in continuous space; a difference between [`FreePoint`]s, or a direction.
pub type FreeVector = Vector3D<FreeCoordinate, World>;

/// Texture coordinate; see [`TextureSpace`].
pub type Uv = Point2D<f32, TextureSpace>;

/// Small distance used to keep shadow rays from hitting the surface they start on and to
/// avoid division by zero.
pub const VOXEL_EPSILON: FreeCoordinate = 0.00001;

/// Edge length of a single voxel.
pub const VOXEL_UNIT_SIZE: FreeCoordinate = 1.0;

/// Distance from a voxel's centre within which a surface is considered to pass through
/// the voxel.
pub const VOXEL_ERR_UNITS: FreeCoordinate = VOXEL_UNIT_SIZE / (2.0 + VOXEL_EPSILON);

/// [`VOXEL_ERR_UNITS`] measured along a voxel's diagonal.
pub const VOXEL_DIAGONAL_ERR_UNITS: FreeCoordinate = 1.732_050_807_568_877_2 * VOXEL_ERR_UNITS;

/// Grid edge length used when nothing else is specified.
pub const DEFAULT_GRID_SIZE: GridCoordinate = 16;

/// Normalizes the vector, returning [`None`] if it is too short to have a meaningful
/// direction.
#[inline]
pub fn try_normalize(v: FreeVector) -> Option<FreeVector> {
    let length = v.length();
    if length > VOXEL_EPSILON && length.is_finite() {
        Some(v / length)
    } else {
        None
    }
}
