//! Voxel primitives: shapes simple enough to be sampled analytically.

use core::f64::consts::{PI, TAU};

use euclid::Vector3D;
use omnivox_base::math::{
    Aab, FreeCoordinate, FreePoint, FreeVector, GridCoordinate, GridPoint, GridSize,
    VOXEL_DIAGONAL_ERR_UNITS, VOXEL_EPSILON, VOXEL_ERR_UNITS, VOXEL_UNIT_SIZE, try_normalize,
    voxel_aab, voxel_aabb_list, voxel_center, voxel_sphere_list,
};
use omnivox_base::raycast::{Ray, intersect_aab, intersect_sphere};

use crate::renderable::{Sample, Shading};

/// Golden-angle increment of the Fibonacci sphere, `π(1 + √5)`.
const FIBONACCI_STEP: FreeCoordinate = PI * (1.0 + 2.236_067_977_499_79);

/// A single voxel, lit as an omnidirectional point.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct VoxelPoint {
    /// Any position within the voxel.
    pub position: FreePoint,
}

/// A sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct VoxelSphere {
    #[allow(missing_docs)]
    pub center: FreePoint,
    #[allow(missing_docs)]
    pub radius: FreeCoordinate,
    /// Maximum number of extra surface samples taken per voxel near the surface.
    pub samples_per_voxel: u32,
    /// Whether voxels inside the sphere are lit as well as those on its surface.
    pub fill: bool,
}

/// An axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct VoxelBox {
    #[allow(missing_docs)]
    pub aab: Aab,
    /// Whether voxels deep inside the box are lit as well as those near its faces.
    pub fill: bool,
}

// -------------------------------------------------------------------------------------------------

impl VoxelPoint {
    #[allow(missing_docs)]
    #[inline]
    pub fn new(position: FreePoint) -> Self {
        Self { position }
    }

    /// The voxel containing [`Self::position`], if its coordinates are representable.
    #[inline]
    pub fn cube(&self) -> Option<GridPoint> {
        self.position.floor().try_cast::<GridCoordinate>()
    }

    pub(crate) fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        self.cube()
            .and_then(|cube| grid.flat_index(cube))
            .into_iter()
            .collect()
    }

    /// Whether the voxel blocks `ray` between `VOXEL_EPSILON` and `far`.
    pub(crate) fn occludes(&self, ray: Ray, far: FreeCoordinate) -> bool {
        self.cube().is_some_and(|cube| {
            intersect_aab(ray, voxel_aab(cube))
                .and_then(|span| span.clip(VOXEL_EPSILON, far))
                .is_some()
        })
    }
}

impl VoxelSphere {
    /// A sphere with the default 6 samples per voxel and no fill.
    #[inline]
    pub fn new(center: FreePoint, radius: FreeCoordinate) -> Self {
        Self {
            center,
            radius,
            samples_per_voxel: 6,
            fill: false,
        }
    }

    pub(crate) fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        voxel_sphere_list(grid, self.center, self.radius + VOXEL_EPSILON, self.fill)
    }

    /// Whether the sphere, shrunk slightly so that rays leaving its own surface escape,
    /// blocks `ray` between `VOXEL_EPSILON` and `far`.
    pub(crate) fn occludes(&self, ray: Ray, far: FreeCoordinate) -> bool {
        intersect_sphere(ray, self.center, self.radius - VOXEL_EPSILON)
            .and_then(|span| span.clip(VOXEL_EPSILON, far))
            .is_some()
    }

    /// Number of points a Fibonacci sphere needs for about `samples_per_voxel` of them to
    /// fall within the solid angle of one voxel on the surface.
    fn fibonacci_count(&self) -> u32 {
        let max_angle = (0.5 * VOXEL_UNIT_SIZE / self.radius).min(1.0).asin();
        let solid_angle_fraction = (TAU * (1.0 - max_angle.cos())) / (4.0 * PI);
        let count = (FreeCoordinate::from(self.samples_per_voxel) / solid_angle_fraction).ceil();
        if count.is_finite() && count >= 1.0 {
            count.min(FreeCoordinate::from(u32::MAX)) as u32
        } else {
            1
        }
    }

    pub(crate) fn shading(&self, cube: GridPoint, emission_only: bool) -> Shading {
        let radius = self.radius;
        if radius.is_nan() || radius <= VOXEL_EPSILON {
            return Shading::Nothing;
        }
        let voxel_center = voxel_center(cube);
        let center_to_voxel = voxel_center - self.center;
        let square_distance = center_to_voxel.square_length();

        if square_distance <= VOXEL_ERR_UNITS {
            // The sphere's own centre voxel; only a sphere too small to have samples
            // elsewhere is drawn here, as a single point.
            return if radius <= VOXEL_DIAGONAL_ERR_UNITS {
                Shading::Point
            } else {
                Shading::Nothing
            };
        }
        if square_distance > radius * radius {
            return Shading::Nothing;
        }

        let Some(outward) = try_normalize(center_to_voxel) else {
            return Shading::Nothing;
        };
        let closest = Sample::untextured(self.center + outward * radius, outward);
        let shell_inner = radius - 1.25 * VOXEL_DIAGONAL_ERR_UNITS;
        if shell_inner > 0.0 && square_distance < shell_inner * shell_inner {
            return if self.fill {
                Shading::averaged(vec![closest])
            } else {
                Shading::Nothing
            };
        }

        let mut samples = vec![closest];
        if !emission_only {
            let voxel_box = voxel_aab(cube);
            let polar = outward.z.clamp(-1.0, 1.0).acos();
            let azimuth = outward.y.atan2(outward.x);
            let count = self.fibonacci_count();
            samples.extend(
                (0..self.samples_per_voxel.min(count))
                    .map(|i| fibonacci_direction(i, count, polar, azimuth))
                    .map(|direction| (self.center + direction * radius, direction))
                    .filter(|&(position, _)| voxel_box.contains(position))
                    .map(|(position, direction)| Sample::untextured(position, direction)),
            );
        }
        Shading::averaged(samples)
    }
}

/// Unit vector of the `index`th of `count` points of a Fibonacci sphere whose first point
/// has been rotated to the given polar and azimuthal angles.
fn fibonacci_direction(
    index: u32,
    count: u32,
    polar_offset: FreeCoordinate,
    azimuth_offset: FreeCoordinate,
) -> FreeVector {
    let k = FreeCoordinate::from(index) + 0.5;
    let polar = polar_offset + (1.0 - 2.0 * k / FreeCoordinate::from(count)).acos();
    let azimuth = azimuth_offset + FIBONACCI_STEP * k;
    Vector3D::new(
        azimuth.cos() * polar.sin(),
        azimuth.sin() * polar.sin(),
        polar.cos(),
    )
}

impl VoxelBox {
    /// An unfilled box.
    #[inline]
    pub fn new(aab: Aab) -> Self {
        Self { aab, fill: false }
    }

    pub(crate) fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        voxel_aabb_list(grid, self.aab, true)
    }

    pub(crate) fn occludes(&self, ray: Ray, far: FreeCoordinate) -> bool {
        intersect_aab(ray, self.aab)
            .and_then(|span| span.clip(VOXEL_EPSILON, far))
            .is_some()
    }

    /// Samples on the faces of the box near the voxel (or on every face, if filled), each
    /// counted in full.
    pub(crate) fn shading(&self, cube: GridPoint) -> Shading {
        let center = voxel_center(cube);
        if self.aab.is_empty() || !self.aab.contains(center) {
            return Shading::Nothing;
        }
        let lower = self.aab.lower_bounds();
        let upper = self.aab.upper_bounds();
        let faces: [(FreeVector, FreeCoordinate); 6] = [
            (Vector3D::new(-1.0, 0.0, 0.0), center.x - lower.x),
            (Vector3D::new(1.0, 0.0, 0.0), upper.x - center.x),
            (Vector3D::new(0.0, -1.0, 0.0), center.y - lower.y),
            (Vector3D::new(0.0, 1.0, 0.0), upper.y - center.y),
            (Vector3D::new(0.0, 0.0, -1.0), center.z - lower.z),
            (Vector3D::new(0.0, 0.0, 1.0), upper.z - center.z),
        ];
        let samples: Vec<Sample> = faces
            .into_iter()
            .filter(|&(_, distance)| self.fill || distance < VOXEL_DIAGONAL_ERR_UNITS)
            .map(|(normal, distance)| {
                Sample::untextured(center + normal * (distance + VOXEL_EPSILON), normal)
            })
            .collect();
        if samples.is_empty() {
            Shading::Nothing
        } else {
            Shading::Samples {
                samples,
                factor: Some(1.0),
            }
        }
    }
}
