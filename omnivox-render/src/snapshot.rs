//! Immutable per-frame scene data shared with lighting workers.

use std::collections::BTreeMap;
use std::sync::Arc;

use omnivox_base::math::{FreeCoordinate, GridPoint, GridSize, Rgb};
use omnivox_base::raycast::Ray;

use crate::renderable::{Shading, WorldMesh};
use crate::{
    Flaws, Fog, Light, Material, RenderableId, ShadowFlags, VoxelBox, VoxelPoint, VoxelSphere,
};

/// Everything needed to light a frame, frozen at the moment it was taken from a
/// [`Scene`](crate::Scene).
///
/// Snapshots are read-only and may be shared among any number of threads.
#[derive(Debug)]
pub struct SceneSnapshot {
    grid: GridSize,
    entries: Vec<Entry>,
    /// Indices into `entries` of the renderables that cast shadows.
    casters: Vec<usize>,
    /// Lights other than ambient ones.
    pub(crate) lights: Vec<Light>,
    /// Sum of the ambient lights, if there are any.
    pub(crate) ambient: Option<Rgb>,
    pub(crate) fogs: Vec<Fog>,
    work: Vec<WorkItem>,
    flaws: Flaws,
}

/// A renderable as captured by a snapshot.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) id: RenderableId,
    pub(crate) shape: Shape,
    pub(crate) material: Material,
    pub(crate) shadow: ShadowFlags,
}

/// Geometry of a captured renderable.
#[derive(Debug)]
pub(crate) enum Shape {
    Mesh(Arc<WorldMesh>),
    Point(VoxelPoint),
    Sphere(VoxelSphere),
    Box(VoxelBox),
}

/// One voxel to be lit, and what may contribute to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkItem {
    index: usize,
    /// Indices into the snapshot's entries, in draw order.
    entries: Vec<usize>,
    fog: bool,
}

impl WorkItem {
    /// Flat index of the voxel.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn entries(&self) -> &[usize] {
        &self.entries
    }

    pub(crate) fn fog(&self) -> bool {
        self.fog
    }
}

impl Entry {
    /// Whether this entry blocks light along `ray` before `far`.
    fn occludes(&self, ray: Ray, far: FreeCoordinate) -> bool {
        match &self.shape {
            Shape::Mesh(mesh) => mesh.occludes(ray, far),
            Shape::Point(point) => point.occludes(ray, far),
            Shape::Sphere(sphere) => sphere.occludes(ray, far),
            Shape::Box(aab) => aab.occludes(ray, far),
        }
    }

    /// How much of the light this entry removes when it occludes.
    fn light_reduction(&self) -> f32 {
        match self.shape {
            Shape::Mesh(_) | Shape::Box(_) => 1.0,
            Shape::Point(_) | Shape::Sphere(_) => self.material.alpha(),
        }
    }

    /// Returns the shadow reduction this entry applies to `ray`, or zero.
    pub(crate) fn shadow(&self, ray: Ray, far: FreeCoordinate) -> f32 {
        if self.occludes(ray, far) {
            self.light_reduction()
        } else {
            0.0
        }
    }

    /// How this entry wants the voxel `cube` to be lit.
    pub(crate) fn shading(&self, cube: GridPoint) -> Shading {
        match &self.shape {
            Shape::Mesh(mesh) => mesh.shading(cube),
            Shape::Point(point) => {
                if point.cube() == Some(cube) {
                    Shading::Point
                } else {
                    Shading::Nothing
                }
            }
            Shape::Sphere(sphere) => sphere.shading(cube, self.material.is_emission_only()),
            Shape::Box(aab) => aab.shading(cube),
        }
    }

    fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        match &self.shape {
            Shape::Mesh(mesh) => mesh.colliding_voxels(grid),
            Shape::Point(point) => point.colliding_voxels(grid),
            Shape::Sphere(sphere) => sphere.colliding_voxels(grid),
            Shape::Box(aab) => aab.colliding_voxels(grid),
        }
    }
}

impl SceneSnapshot {
    pub(crate) fn new(
        grid: GridSize,
        entries: Vec<Entry>,
        lights: &[Light],
        fogs: Vec<Fog>,
    ) -> Self {
        let mut flaws = Flaws::empty();
        let mut work: BTreeMap<usize, WorkItem> = BTreeMap::new();
        let mut casters = Vec::new();
        for (entry_index, entry) in entries.iter().enumerate() {
            if !entry.material.is_visible() {
                continue;
            }
            if entry.material.is_missing_texture() {
                flaws |= Flaws::MISSING_TEXTURES;
            }
            if entry.shadow.contains(ShadowFlags::CASTS) {
                casters.push(entry_index);
            }
            for index in entry.colliding_voxels(grid) {
                work.entry(index)
                    .or_insert_with(|| WorkItem {
                        index,
                        entries: Vec::new(),
                        fog: false,
                    })
                    .entries
                    .push(entry_index);
            }
        }
        for fog in &fogs {
            for index in fog.colliding_voxels(grid) {
                work.entry(index)
                    .or_insert_with(|| WorkItem {
                        index,
                        entries: Vec::new(),
                        fog: false,
                    })
                    .fog = true;
            }
        }

        let ambient = lights
            .iter()
            .filter(|l| l.is_ambient())
            .map(|l| l.emission(0.0))
            .reduce(|a, b| a + b);

        Self {
            grid,
            entries,
            casters,
            lights: lights.iter().filter(|l| !l.is_ambient()).cloned().collect(),
            ambient,
            fogs,
            work: work.into_values().collect(),
            flaws,
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// The voxels that something may contribute to, in ascending index order.
    #[inline]
    pub fn work_items(&self) -> &[WorkItem] {
        &self.work
    }

    /// Flaws that any rendering of this snapshot will have, such as missing textures.
    #[inline]
    pub fn flaws(&self) -> Flaws {
        self.flaws
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn casters(&self) -> impl Iterator<Item = &Entry> {
        self.casters.iter().map(|&i| &self.entries[i])
    }
}
