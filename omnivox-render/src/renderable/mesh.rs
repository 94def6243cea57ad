//! Triangle meshes.

use core::f64::consts::{PI, TAU};
use std::sync::Arc;

use euclid::{Point2D, Size3D, Transform3D, Vector3D};
use omnivox_base::math::{
    Aab, FreeCoordinate, FreePoint, FreeVector, GridPoint, GridSize, Uv,
    VOXEL_DIAGONAL_ERR_UNITS, VOXEL_EPSILON, World, try_normalize, voxel_aab, voxel_aabb_list,
    voxel_center,
};
use omnivox_base::raycast::{Ray, intersect_aab, intersect_triangle};

use crate::renderable::{Sample, Shading};

/// Width of the falloff applied to samples of surfaces that pass in front of a voxel centre.
const FALLOFF_SIGMA: FreeCoordinate = VOXEL_DIAGONAL_ERR_UNITS / 10.0;

/// Indexed triangle geometry in its own coordinate system.
///
/// Every vertex has a position, a unit normal, and texture coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshGeometry {
    positions: Vec<FreePoint>,
    normals: Vec<FreeVector>,
    uvs: Vec<Uv>,
    triangles: Vec<[u32; 3]>,
}

/// A [`MeshGeometry`] placed in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshObject {
    geometry: Arc<MeshGeometry>,
    transform: Transform3D<FreeCoordinate, World, World>,
}

/// An error from constructing a [`MeshGeometry`].
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum MeshError {
    /// vertex attributes have different lengths: {positions} positions, {normals} normals, {uvs} texture coordinates
    LengthMismatch {
        /// Number of positions.
        positions: usize,
        /// Number of normals.
        normals: usize,
        /// Number of texture coordinates.
        uvs: usize,
    },
    /// triangle {triangle} refers to vertex {index}, which does not exist
    IndexOutOfRange {
        /// Index of the offending triangle.
        triangle: usize,
        /// The out-of-range vertex index.
        index: u32,
    },
}

impl std::error::Error for MeshError {}

impl MeshGeometry {
    /// Constructs geometry from vertex attributes and triangles of vertex indices.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(
        positions: Vec<FreePoint>,
        normals: Vec<FreeVector>,
        uvs: Vec<Uv>,
        triangles: Vec<[u32; 3]>,
    ) -> Result<Self, MeshError> {
        if positions.len() != normals.len() || positions.len() != uvs.len() {
            return Err(MeshError::LengthMismatch {
                positions: positions.len(),
                normals: normals.len(),
                uvs: uvs.len(),
            });
        }
        for (triangle, indices) in triangles.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::IndexOutOfRange { triangle, index });
            }
        }
        Ok(Self {
            positions,
            normals,
            uvs,
            triangles,
        })
    }

    /// A box centred on the origin, with 4 vertices per face so that each face has flat
    /// normals and texture coordinates covering the whole texture.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn cuboid(size: Size3D<FreeCoordinate, World>) -> Self {
        let half = Vector3D::<FreeCoordinate, World>::new(size.width, size.height, size.depth) * 0.5;
        let x = Vector3D::new(1.0, 0.0, 0.0);
        let y = Vector3D::new(0.0, 1.0, 0.0);
        let z = Vector3D::new(0.0, 0.0, 1.0);
        // (normal, u, v) with u × v = normal.
        let faces = [(x, y, z), (-x, z, y), (y, z, x), (-y, x, z), (z, x, y), (-z, y, x)];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut geometry = Self {
            positions: Vec::with_capacity(24),
            normals: Vec::with_capacity(24),
            uvs: Vec::with_capacity(24),
            triangles: Vec::with_capacity(12),
        };
        for (normal, u, v) in faces {
            let base = geometry.positions.len() as u32;
            for (su, sv) in corners {
                let p = (normal + u * su + v * sv).component_mul(half);
                geometry.positions.push(p.to_point());
                geometry.normals.push(normal);
                geometry
                    .uvs
                    .push(Point2D::new((su as f32 + 1.0) / 2.0, (sv as f32 + 1.0) / 2.0));
            }
            geometry.triangles.push([base, base + 1, base + 2]);
            geometry.triangles.push([base, base + 2, base + 3]);
        }
        geometry
    }

    /// A sphere centred on the origin, divided into `width_segments` slices around the
    /// vertical axis and `height_segments` stacks from pole to pole.
    ///
    /// At least 3 slices and 2 stacks are used.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn uv_sphere(radius: FreeCoordinate, width_segments: u32, height_segments: u32) -> Self {
        let w = width_segments.max(3);
        let h = height_segments.max(2);
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        for iy in 0..=h {
            let v = FreeCoordinate::from(iy) / FreeCoordinate::from(h);
            for ix in 0..=w {
                let u = FreeCoordinate::from(ix) / FreeCoordinate::from(w);
                let normal: FreeVector = Vector3D::new(
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                );
                positions.push((normal * radius).to_point());
                normals.push(normal);
                uvs.push(Point2D::new(u as f32, 1.0 - v as f32));
            }
        }
        let row = w + 1;
        let mut triangles = Vec::new();
        for iy in 0..h {
            for ix in 0..w {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    triangles.push([a, b, d]);
                }
                if iy != h - 1 {
                    triangles.push([b, c, d]);
                }
            }
        }
        Self {
            positions,
            normals,
            uvs,
            triangles,
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl MeshObject {
    /// Places the geometry in the world with no transformation.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(geometry: impl Into<Arc<MeshGeometry>>) -> Self {
        Self {
            geometry: geometry.into(),
            transform: Transform3D::identity(),
        }
    }

    /// Builder-style setter for [`Self::transform()`].
    #[must_use]
    #[inline]
    pub fn with_transform(mut self, transform: Transform3D<FreeCoordinate, World, World>) -> Self {
        self.transform = transform;
        self
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    /// Transformation from the geometry's coordinates to world coordinates.
    #[inline]
    pub fn transform(&self) -> Transform3D<FreeCoordinate, World, World> {
        self.transform
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn set_transform(&mut self, transform: Transform3D<FreeCoordinate, World, World>) {
        self.transform = transform;
    }

    pub(crate) fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        let points = self
            .geometry
            .positions
            .iter()
            .filter_map(|&p| self.transform.transform_point3d(p));
        match Aab::from_points(points) {
            Some(bounds) => voxel_aabb_list(grid, bounds, true),
            None => Vec::new(),
        }
    }

    /// Transforms every triangle into world space.
    ///
    /// Triangles with no area, or which the transform cannot map, are dropped.
    pub(crate) fn to_world(&self) -> WorldMesh {
        let normal_matrix: Transform3D<FreeCoordinate, World, World> = self
            .transform
            .inverse()
            .map_or(self.transform, |inverse| {
                Transform3D::from_arrays(inverse.to_arrays_transposed())
            });
        let geometry = &*self.geometry;
        let triangles: Vec<WorldTriangle> = geometry
            .triangles
            .iter()
            .filter_map(|&[i0, i1, i2]| {
                let indices = [i0 as usize, i1 as usize, i2 as usize];
                let positions = [
                    self.transform.transform_point3d(geometry.positions[indices[0]])?,
                    self.transform.transform_point3d(geometry.positions[indices[1]])?,
                    self.transform.transform_point3d(geometry.positions[indices[2]])?,
                ];
                let face_normal =
                    try_normalize((positions[1] - positions[0]).cross(positions[2] - positions[0]))?;
                let normals = indices.map(|i| {
                    try_normalize(normal_matrix.transform_vector3d(geometry.normals[i]))
                        .unwrap_or(face_normal)
                });
                Some(WorldTriangle {
                    positions,
                    normals,
                    face_normal,
                    uvs: indices.map(|i| geometry.uvs[i]),
                    bounds: Aab::from_lower_upper(
                        positions[0].min(positions[1]).min(positions[2]),
                        positions[0].max(positions[1]).max(positions[2]),
                    ),
                })
            })
            .collect();
        let bounds = triangles.iter().map(|t| t.bounds).reduce(Aab::union);
        WorldMesh { triangles, bounds }
    }
}

// -------------------------------------------------------------------------------------------------

/// A mesh flattened into world-space triangles, ready for sampling and ray tests from any
/// thread.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WorldMesh {
    triangles: Vec<WorldTriangle>,
    bounds: Option<Aab>,
}

#[derive(Clone, Debug, PartialEq)]
struct WorldTriangle {
    positions: [FreePoint; 3],
    normals: [FreeVector; 3],
    face_normal: FreeVector,
    uvs: [Uv; 3],
    bounds: Aab,
}

impl WorldMesh {
    pub(crate) fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        match self.bounds {
            Some(bounds) => voxel_aabb_list(grid, bounds, true),
            None => Vec::new(),
        }
    }

    /// One sample for every triangle whose closest point to the voxel centre is inside the
    /// voxel.
    pub(crate) fn shading(&self, cube: GridPoint) -> Shading {
        let voxel_box = voxel_aab(cube);
        let center = voxel_center(cube);
        let samples = self
            .triangles
            .iter()
            .filter(|t| t.bounds.intersects(voxel_box))
            .filter_map(|t| {
                let weights = closest_barycentric(center, t.positions);
                let position = interpolate(weights, t.positions.map(|p| p.to_vector())).to_point();
                if !voxel_box.contains(position) {
                    return None;
                }
                let normal = try_normalize(interpolate(weights, t.normals)).unwrap_or(t.face_normal);
                let uv = Point2D::new(
                    weights[0] as f32 * t.uvs[0].x
                        + weights[1] as f32 * t.uvs[1].x
                        + weights[2] as f32 * t.uvs[2].x,
                    weights[0] as f32 * t.uvs[0].y
                        + weights[1] as f32 * t.uvs[1].y
                        + weights[2] as f32 * t.uvs[2].y,
                );
                let to_surface = position - center;
                let behind_surface = try_normalize(to_surface)
                    .is_some_and(|direction| direction.dot(normal) >= VOXEL_EPSILON);
                let falloff = if behind_surface {
                    1.0
                } else {
                    let square_distance = to_surface.square_length();
                    (-0.5 * square_distance / (2.0 * FALLOFF_SIGMA * FALLOFF_SIGMA)).exp() as f32
                };
                Some(Sample {
                    position,
                    normal,
                    uv: Some(uv),
                    falloff,
                })
            })
            .collect();
        Shading::averaged(samples)
    }

    /// Whether any triangle blocks `ray` between `VOXEL_EPSILON` and `far`.
    pub(crate) fn occludes(&self, ray: Ray, far: FreeCoordinate) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        if intersect_aab(ray, bounds.expand(VOXEL_EPSILON))
            .and_then(|span| span.clip(VOXEL_EPSILON, far))
            .is_none()
        {
            return false;
        }
        self.triangles.iter().any(|t| {
            intersect_triangle(ray, t.positions).is_some_and(|t| t > VOXEL_EPSILON && t <= far)
        })
    }
}

fn interpolate(weights: [FreeCoordinate; 3], values: [FreeVector; 3]) -> FreeVector {
    values[0] * weights[0] + values[1] * weights[1] + values[2] * weights[2]
}

/// Barycentric weights of the point of triangle `[a, b, c]` closest to `p`.
fn closest_barycentric(p: FreePoint, [a, b, c]: [FreePoint; 3]) -> [FreeCoordinate; 3] {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return [1.0, 0.0, 0.0];
    }
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return [0.0, 1.0, 0.0];
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return [1.0 - v, v, 0.0];
    }
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return [0.0, 0.0, 1.0];
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return [1.0 - w, 0.0, w];
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return [0.0, 1.0 - w, w];
    }
    let denominator = (va + vb + vc).recip();
    let v = vb * denominator;
    let w = vc * denominator;
    [1.0 - v - w, v, w]
}
