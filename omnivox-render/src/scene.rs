//! The mutable scene graph.

use std::collections::HashMap;
use std::sync::Arc;

use omnivox_base::math::GridSize;

use crate::renderable::WorldMesh;
use crate::snapshot::{Entry, Shape};
use crate::{Fog, Light, LightId, Renderable, RenderableId, RenderableKind, SceneSnapshot};

/// The renderables, lights and fog to be drawn into a voxel grid.
///
/// A [`Scene`] is edited freely between frames; each frame, [`Scene::snapshot()`]
/// produces an immutable [`SceneSnapshot`] which is what actually gets rendered, so
/// rendering never observes a half-edited scene.
///
/// Renderables and lights are kept in insertion order, which is also the order their
/// contributions to a voxel are summed in. Any number of fog volumes may be present; where
/// they overlap, each glows and each dims light passing through it. Inserting a renderable or light whose id is
/// already present replaces the existing one in place.
#[derive(Debug)]
pub struct Scene {
    grid: GridSize,
    renderables: Vec<Renderable>,
    lights: Vec<Light>,
    fogs: Vec<Fog>,
    /// World-space triangles of mesh renderables as of the last snapshot.
    mesh_cache: HashMap<RenderableId, Arc<WorldMesh>>,
}

impl Scene {
    /// Creates an empty scene for a grid of the given size.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(grid: GridSize) -> Self {
        Self {
            grid,
            renderables: Vec::new(),
            lights: Vec::new(),
            fogs: Vec::new(),
            mesh_cache: HashMap::new(),
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Adds a renderable, or replaces the one with the same id.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn insert(&mut self, renderable: Renderable) -> RenderableId {
        let id = renderable.id();
        match self.renderables.iter_mut().find(|r| r.id() == id) {
            Some(existing) => {
                *existing = renderable;
                // Replacement may have new geometry even if it was cloned clean.
                self.mesh_cache.remove(&id);
            }
            None => self.renderables.push(renderable),
        }
        id
    }

    /// Removes and returns the renderable with the given id.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn remove(&mut self, id: RenderableId) -> Option<Renderable> {
        let position = self.renderables.iter().position(|r| r.id() == id)?;
        self.mesh_cache.remove(&id);
        Some(self.renderables.remove(position))
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn renderable(&self, id: RenderableId) -> Option<&Renderable> {
        self.renderables.iter().find(|r| r.id() == id)
    }

    /// Mutable access to a renderable, for animation.
    #[inline]
    pub fn renderable_mut(&mut self, id: RenderableId) -> Option<&mut Renderable> {
        self.renderables.iter_mut().find(|r| r.id() == id)
    }

    /// All renderables in insertion order.
    #[inline]
    pub fn renderables(&self) -> &[Renderable] {
        &self.renderables
    }

    /// Adds a light, or replaces the one with the same id.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn insert_light(&mut self, light: Light) -> LightId {
        let id = light.id();
        match self.lights.iter_mut().find(|l| l.id() == id) {
            Some(existing) => *existing = light,
            None => self.lights.push(light),
        }
        id
    }

    /// Removes and returns the light with the given id.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn remove_light(&mut self, id: LightId) -> Option<Light> {
        let position = self.lights.iter().position(|l| l.id() == id)?;
        Some(self.lights.remove(position))
    }

    /// Mutable access to a light, for animation.
    #[inline]
    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.iter_mut().find(|l| l.id() == id)
    }

    /// All lights in insertion order.
    #[inline]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Adds a fog volume.
    #[inline]
    pub fn insert_fog(&mut self, fog: Fog) {
        self.fogs.push(fog);
    }

    /// Removes and returns all fog volumes.
    #[inline]
    pub fn take_fogs(&mut self) -> Vec<Fog> {
        core::mem::take(&mut self.fogs)
    }

    /// All fog volumes in insertion order.
    #[inline]
    pub fn fogs(&self) -> &[Fog] {
        &self.fogs
    }

    /// Mutable access to the fog volumes, for animation.
    #[inline]
    pub fn fogs_mut(&mut self) -> &mut [Fog] {
        &mut self.fogs
    }

    /// Removes everything from the scene.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn clear(&mut self) {
        self.renderables.clear();
        self.lights.clear();
        self.fogs.clear();
        self.mesh_cache.clear();
    }

    /// Returns whether the scene has nothing in it.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty() && self.lights.is_empty() && self.fogs.is_empty()
    }

    /// Captures the current state of the scene for rendering.
    ///
    /// Mesh renderables are flattened to world-space triangles here; the result is reused
    /// by later snapshots until the renderable is next modified.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn snapshot(&mut self) -> Arc<SceneSnapshot> {
        let mut entries = Vec::with_capacity(self.renderables.len());
        for renderable in &mut self.renderables {
            let id = renderable.id();
            let shape = match renderable.kind() {
                RenderableKind::Mesh(mesh) => {
                    let world = match self.mesh_cache.get(&id) {
                        Some(world) if !renderable.is_dirty() => Arc::clone(world),
                        _ => {
                            let world = Arc::new(mesh.to_world());
                            self.mesh_cache.insert(id, Arc::clone(&world));
                            world
                        }
                    };
                    Shape::Mesh(world)
                }
                RenderableKind::Point(point) => Shape::Point(*point),
                RenderableKind::Sphere(sphere) => Shape::Sphere(*sphere),
                RenderableKind::Box(aab) => Shape::Box(*aab),
            };
            renderable.mark_clean();
            entries.push(Entry {
                id,
                shape,
                material: renderable.material().get(),
                shadow: renderable.shadow(),
            });
        }
        let renderables = &self.renderables;
        self.mesh_cache
            .retain(|id, _| renderables.iter().any(|r| r.id() == *id));

        Arc::new(SceneSnapshot::new(
            self.grid,
            entries,
            &self.lights,
            self.fogs.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, MeshGeometry, MeshObject, VoxelPoint};
    use euclid::{point3, size3};
    use omnivox_base::math::Rgb;
    use pretty_assertions::assert_eq;

    fn grid() -> GridSize {
        GridSize::new(4).unwrap()
    }

    fn point(x: f64) -> Renderable {
        Renderable::new(
            VoxelPoint::new(point3(x, 0.5, 0.5)),
            Material::lambert(Rgb::ONE),
        )
    }

    #[test]
    fn insert_same_id_replaces() {
        let mut scene = Scene::new(grid());
        let a = point(0.5);
        let id = scene.insert(a.clone());
        scene.insert(point(1.5));
        let mut moved = a;
        if let RenderableKind::Point(p) = moved.kind_mut() {
            p.position = point3(3.5, 0.5, 0.5);
        }
        assert_eq!(scene.insert(moved), id);
        assert_eq!(scene.renderables().len(), 2);
        assert_eq!(
            scene.renderables()[0].kind(),
            &RenderableKind::Point(VoxelPoint::new(point3(3.5, 0.5, 0.5)))
        );
    }

    #[test]
    fn insert_light_same_id_replaces() {
        let mut scene = Scene::new(grid());
        let light = Light::ambient(Rgb::ONE);
        scene.insert_light(light.clone());
        scene.insert_light(light.clone());
        assert_eq!(scene.lights().len(), 1);
        assert_eq!(scene.remove_light(light.id()).map(|l| l.id()), Some(light.id()));
        assert!(scene.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut scene = Scene::new(grid());
        let id = scene.insert(point(0.5));
        scene.insert(point(1.5));
        assert!(scene.remove(id).is_some());
        assert!(scene.remove(id).is_none());
        assert_eq!(scene.renderables().len(), 1);
        let fog = Fog::new(crate::FogShape::Box(grid().world_aab()));
        scene.insert_fog(fog.clone());
        scene.insert_fog(fog.clone());
        assert_eq!(scene.take_fogs().len(), 2);
        assert!(scene.fogs().is_empty());
        scene.insert_fog(fog);
        scene.clear();
        assert!(scene.is_empty());
    }

    #[test]
    fn snapshot_caches_clean_meshes() {
        let mut scene = Scene::new(grid());
        let id = scene.insert(Renderable::new(
            MeshObject::new(MeshGeometry::cuboid(size3(2.0, 2.0, 2.0))),
            Material::lambert(Rgb::ONE),
        ));
        let first = scene.snapshot();
        assert!(!scene.renderable(id).unwrap().is_dirty());
        let second = scene.snapshot();
        let (Shape::Mesh(a), Shape::Mesh(b)) = (&first.entries()[0].shape, &second.entries()[0].shape)
        else {
            panic!("expected meshes");
        };
        assert!(Arc::ptr_eq(a, b));

        scene.renderable_mut(id).unwrap().kind_mut();
        let third = scene.snapshot();
        let Shape::Mesh(c) = &third.entries()[0].shape else {
            panic!("expected mesh");
        };
        assert!(!Arc::ptr_eq(a, c));
    }

    #[test]
    fn snapshot_captures_material_alpha() {
        let mut scene = Scene::new(grid());
        let material = crate::SharedMaterial::new(Material::lambert(Rgb::ONE));
        let id = scene.insert(Renderable::new(
            VoxelPoint::new(point3(0.5, 0.5, 0.5)),
            material.clone(),
        ));
        material.set_alpha(0.5);
        let snapshot = scene.snapshot();
        material.set_alpha(1.0);
        assert_eq!(snapshot.entries()[0].material.alpha(), 0.5);
        assert_eq!(snapshot.entries()[0].id, id);
    }
}
