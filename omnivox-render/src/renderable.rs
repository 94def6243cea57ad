//! Objects that can be drawn into the voxel grid and cast shadows.

use std::sync::atomic::{AtomicU64, Ordering};

use omnivox_base::math::{FreePoint, FreeVector, GridSize, Uv};

use crate::SharedMaterial;

mod fog;
pub use fog::{DEFAULT_FOG_SCATTERING, Fog, FogShape};
mod mesh;
pub use mesh::{MeshError, MeshGeometry, MeshObject};
pub(crate) use mesh::WorldMesh;
mod primitive;
pub use primitive::{VoxelBox, VoxelPoint, VoxelSphere};

// -------------------------------------------------------------------------------------------------

/// Identifies a [`Renderable`] within a [`Scene`](crate::Scene).
///
/// Every renderable constructed in this process gets a distinct id; clones keep the id,
/// which is how re-inserting a renderable replaces it instead of duplicating it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RenderableId(u64);

impl RenderableId {
    #[inline]
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

bitflags::bitflags! {
    /// Whether a [`Renderable`] takes part in shadowing.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct ShadowFlags: u8 {
        /// Blocks light travelling towards other renderables.
        const CASTS = 1 << 0;
        /// Has its lighting reduced by shadow casters.
        const RECEIVES = 1 << 1;
    }
}

impl Default for ShadowFlags {
    /// Both casts and receives.
    #[inline]
    fn default() -> Self {
        Self::all()
    }
}

/// An object in a [`Scene`](crate::Scene): a shape, the material it is made of, and how it
/// participates in shadowing.
///
/// Modifying a renderable through [`Renderable::kind_mut()`] or [`Renderable::set_material()`]
/// marks it dirty, so that any cached data derived from its geometry is recomputed on the
/// next [`Scene::snapshot()`](crate::Scene::snapshot).
#[derive(Clone, Debug)]
pub struct Renderable {
    id: RenderableId,
    kind: RenderableKind,
    material: SharedMaterial,
    shadow: ShadowFlags,
    dirty: bool,
}

/// The shape of a [`Renderable`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum RenderableKind {
    /// Triangles, sampled where they pass through voxels.
    Mesh(MeshObject),
    /// A single voxel.
    Point(VoxelPoint),
    /// An analytic sphere.
    Sphere(VoxelSphere),
    /// An analytic axis-aligned box.
    Box(VoxelBox),
}

impl From<MeshObject> for RenderableKind {
    #[inline]
    fn from(value: MeshObject) -> Self {
        Self::Mesh(value)
    }
}
impl From<VoxelPoint> for RenderableKind {
    #[inline]
    fn from(value: VoxelPoint) -> Self {
        Self::Point(value)
    }
}
impl From<VoxelSphere> for RenderableKind {
    #[inline]
    fn from(value: VoxelSphere) -> Self {
        Self::Sphere(value)
    }
}
impl From<VoxelBox> for RenderableKind {
    #[inline]
    fn from(value: VoxelBox) -> Self {
        Self::Box(value)
    }
}

impl Renderable {
    /// Creates a renderable with a new [`RenderableId`], casting and receiving shadows.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(kind: impl Into<RenderableKind>, material: impl Into<SharedMaterial>) -> Self {
        Self {
            id: RenderableId::next(),
            kind: kind.into(),
            material: material.into(),
            shadow: ShadowFlags::default(),
            dirty: true,
        }
    }

    /// Builder-style setter for [`Self::shadow()`].
    #[must_use]
    #[inline]
    pub fn with_shadow(mut self, shadow: ShadowFlags) -> Self {
        self.shadow = shadow;
        self
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn id(&self) -> RenderableId {
        self.id
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn kind(&self) -> &RenderableKind {
        &self.kind
    }

    /// Mutable access to the shape. Marks the renderable dirty.
    #[inline]
    pub fn kind_mut(&mut self) -> &mut RenderableKind {
        self.dirty = true;
        &mut self.kind
    }

    /// The material, whose alpha may be changed through any clone of the handle.
    #[inline]
    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    /// Replaces the material. Marks the renderable dirty.
    #[inline]
    pub fn set_material(&mut self, material: impl Into<SharedMaterial>) {
        self.dirty = true;
        self.material = material.into();
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn shadow(&self) -> ShadowFlags {
        self.shadow
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn set_shadow(&mut self, shadow: ShadowFlags) {
        self.shadow = shadow;
    }

    /// Returns whether the renderable has changed since the last snapshot of the scene
    /// containing it.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Returns the flat indices of the voxels of a grid of size `grid` that this renderable
    /// may contribute to, in ascending order.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        match &self.kind {
            RenderableKind::Mesh(mesh) => mesh.colliding_voxels(grid),
            RenderableKind::Point(point) => point.colliding_voxels(grid),
            RenderableKind::Sphere(sphere) => sphere.colliding_voxels(grid),
            RenderableKind::Box(aab) => aab.colliding_voxels(grid),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A point on the surface of a renderable at which lighting is evaluated.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Sample {
    /// Position of the sample in world space.
    pub position: FreePoint,
    /// Unit surface normal.
    pub normal: FreeVector,
    /// Texture coordinates, if the surface has them.
    pub uv: Option<Uv>,
    /// How much the sample counts towards the voxel colour, from 0 to 1.
    pub falloff: f32,
}

impl Sample {
    pub(crate) fn untextured(position: FreePoint, normal: FreeVector) -> Self {
        Self {
            position,
            normal,
            uv: None,
            falloff: 1.0,
        }
    }
}

/// How a renderable wants one voxel to be lit.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Shading {
    /// The renderable does not reach this voxel after all.
    Nothing,
    /// Light the voxel centre as an omnidirectional point.
    Point,
    /// Light each sample and combine them.
    Samples {
        samples: Vec<Sample>,
        /// Multiplier for each sample's contribution; if [`None`], the reciprocal of the
        /// number of samples, averaging them.
        factor: Option<f32>,
    },
}

impl Shading {
    pub(crate) fn averaged(samples: Vec<Sample>) -> Self {
        if samples.is_empty() {
            Shading::Nothing
        } else {
            Shading::Samples {
                samples,
                factor: None,
            }
        }
    }
}
