use core::f64::consts::PI;

use euclid::{Size3D, Transform3D, point3, size3};
use futures_core::future::BoxFuture;
use omnivox_base::math::{FreeCoordinate, FreePoint, Rgb, World};

use crate::lifecycle::wrong_options;
use crate::{
    AmbientLight, Attenuation, FrameInfo, Framebuffer, Light, LightId, LightKind, Material,
    MeshGeometry, MeshObject, PointLight, Renderable, RenderableId, RenderableKind, Scene,
    SceneContext, SceneOptions, VoxelScene,
};

/// Configuration of a [`ShadowScene`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ShadowOptions {
    /// Dimensions of the box that circles the grid.
    pub moving_box_size: Size3D<FreeCoordinate, World>,
    /// Angular speed of the box, in radians per second.
    pub moving_box_speed: FreeCoordinate,
    #[allow(missing_docs)]
    pub ambient_light_colour: Rgb,
    #[allow(missing_docs)]
    pub point_light_colour: Rgb,
    /// Position of the light; if [`None`], the middle of the top face of the grid.
    pub point_light_position: Option<FreePoint>,
    /// Falloff of the light; if [`None`], quadratic in the grid size.
    pub point_light_attenuation: Option<Attenuation>,
}

impl Default for ShadowOptions {
    #[inline]
    fn default() -> Self {
        Self {
            moving_box_size: size3(1.5, 2.0, 1.5),
            moving_box_speed: PI / 1.5,
            ambient_light_colour: Rgb::from_luminance(0.1),
            point_light_colour: Rgb::ONE,
            point_light_position: None,
            point_light_attenuation: None,
        }
    }
}

/// A box circling above a floor, casting a shadow on it from a point light.
#[derive(Debug)]
pub struct ShadowScene {
    context: SceneContext,
    options: ShadowOptions,
    scene: Scene,
    objects: Option<Objects>,
    time: f64,
}

#[derive(Debug)]
struct Objects {
    moving_box: RenderableId,
    light: LightId,
    ambient: LightId,
}

impl ShadowScene {
    /// Value of [`VoxelScene::kind()`] for this scene.
    pub const KIND: &'static str = "shadow";

    /// Creates an unloaded scene with default options.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(context: SceneContext) -> Self {
        Self {
            scene: Scene::new(context.grid()),
            context,
            options: ShadowOptions::default(),
            objects: None,
            time: 0.0,
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn options(&self) -> &ShadowOptions {
        &self.options
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    fn point_light(&self) -> PointLight {
        let size = FreeCoordinate::from(self.context.grid().edge());
        PointLight {
            position: self
                .options
                .point_light_position
                .unwrap_or(point3(size / 2.0, 0.0, size / 2.0)),
            colour: self.options.point_light_colour,
            attenuation: self
                .options
                .point_light_attenuation
                .unwrap_or(Attenuation::new((size * size) as f32, 1.0, 1.0)),
        }
    }

    /// Moves the box to where it is at the current time.
    fn place_moving_box(&mut self) {
        let Some(objects) = &self.objects else {
            return;
        };
        let half = FreeCoordinate::from(self.context.grid().edge()) / 2.0;
        let radius = half - 1.5;
        let angle = self.time * self.options.moving_box_speed;
        let transform = Transform3D::translation(
            (radius * angle.cos() + half).floor(),
            half - 1.0,
            (radius * angle.sin() + half).floor(),
        );
        let Some(renderable) = self.scene.renderable_mut(objects.moving_box) else {
            return;
        };
        // Leave the renderable clean when the box stays in the same voxels.
        let unchanged = matches!(
            renderable.kind(),
            RenderableKind::Mesh(mesh) if mesh.transform() == transform
        );
        if !unchanged && let RenderableKind::Mesh(mesh) = renderable.kind_mut() {
            mesh.set_transform(transform);
        }
    }
}

impl VoxelScene for ShadowScene {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn load(&mut self) {
        if self.objects.is_some() {
            return;
        }
        log::debug!("loading {} scene", Self::KIND);
        let size = FreeCoordinate::from(self.context.grid().edge());
        let half = size / 2.0;

        let light = self.scene.insert_light(Light::new(self.point_light()));
        let moving_box = self.scene.insert(Renderable::new(
            MeshObject::new(MeshGeometry::cuboid(self.options.moving_box_size)),
            Material::lambert(Rgb::ONE),
        ));
        self.scene.insert(Renderable::new(
            MeshObject::new(MeshGeometry::cuboid(size3(size, 2.0, size)))
                .with_transform(Transform3D::translation(half, size - 1.0, half)),
            Material::lambert(Rgb::ONE),
        ));
        let ambient = self
            .scene
            .insert_light(Light::ambient(self.options.ambient_light_colour));

        self.objects = Some(Objects {
            moving_box,
            light,
            ambient,
        });
        self.time = 0.0;
        self.place_moving_box();
    }

    fn unload(&mut self) {
        log::debug!("unloading {} scene", Self::KIND);
        self.clear();
    }

    fn is_loaded(&self) -> bool {
        self.objects.is_some()
    }

    fn set_options(&mut self, options: &SceneOptions) {
        let SceneOptions::Shadow(options) = options else {
            wrong_options(Self::KIND, options);
            return;
        };
        let resized = options.moving_box_size != self.options.moving_box_size;
        self.options = options.clone();

        let Some(objects) = &self.objects else {
            return;
        };
        let (moving_box, light, ambient) = (objects.moving_box, objects.light, objects.ambient);
        let point_light = self.point_light();
        if let Some(light) = self.scene.light_mut(light) {
            *light.kind_mut() = LightKind::Point(point_light);
        }
        if let Some(ambient) = self.scene.light_mut(ambient) {
            *ambient.kind_mut() = LightKind::Ambient(AmbientLight {
                colour: self.options.ambient_light_colour,
            });
        }
        if resized
            && let Some(renderable) = self.scene.renderable_mut(moving_box)
            && let RenderableKind::Mesh(mesh) = renderable.kind_mut()
        {
            *mesh = MeshObject::new(MeshGeometry::cuboid(self.options.moving_box_size))
                .with_transform(mesh.transform());
        }
    }

    fn clear(&mut self) {
        self.scene.clear();
        self.objects = None;
        self.time = 0.0;
    }

    fn render<'a>(&'a mut self, dt: f64, target: &'a mut Framebuffer) -> BoxFuture<'a, FrameInfo> {
        Box::pin(async move {
            if self.objects.is_none() {
                return FrameInfo::default();
            }
            self.place_moving_box();
            let snapshot = self.scene.snapshot();
            let info = self.context.dispatcher().dispatch(snapshot, target).await;
            self.time += dt;
            info
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dispatcher, FogOptions};
    use core::num::NonZeroUsize;
    use omnivox_base::math::GridSize;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn scene() -> ShadowScene {
        ShadowScene::new(SceneContext::new(
            GridSize::new(8).unwrap(),
            Arc::new(Dispatcher::new(NonZeroUsize::new(2))),
        ))
    }

    fn moving_geometry(scene: &ShadowScene) -> Arc<MeshGeometry> {
        let id = scene.objects.as_ref().unwrap().moving_box;
        match scene.scene.renderable(id).unwrap().kind() {
            RenderableKind::Mesh(mesh) => Arc::clone(mesh.geometry()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn renders_only_when_loaded() {
        let mut scene = scene();
        let mut fb = Framebuffer::new_cpu(GridSize::new(8).unwrap());
        assert_eq!(scene.render(0.1, &mut fb).await, FrameInfo::default());

        scene.load();
        let info = scene.render(0.1, &mut fb).await;
        assert!(info.voxels > 0);
        assert!(fb.as_cpu().unwrap().lit_voxel_count() > 0);
        assert_eq!(scene.time, 0.1);

        scene.unload();
        assert!(scene.scene().is_empty());
    }

    #[test]
    fn set_options_reuses_geometry_unless_resized() {
        let mut scene = scene();
        scene.load();
        let before = moving_geometry(&scene);

        let mut options = ShadowOptions {
            point_light_colour: Rgb::new(1.0, 0.0, 0.0),
            ..ShadowOptions::default()
        };
        scene.set_options(&options.clone().into());
        assert!(Arc::ptr_eq(&before, &moving_geometry(&scene)));
        assert_eq!(scene.scene().renderables().len(), 2);

        options.moving_box_size = size3(3.0, 3.0, 3.0);
        scene.set_options(&options.into());
        assert!(!Arc::ptr_eq(&before, &moving_geometry(&scene)));
        assert_eq!(scene.scene().renderables().len(), 2);
    }

    #[test]
    fn foreign_options_are_ignored() {
        let mut scene = scene();
        scene.set_options(&FogOptions::default().into());
        assert_eq!(scene.options(), &ShadowOptions::default());
    }

    #[test]
    fn box_orbits() {
        let mut scene = scene();
        scene.load();
        let id = scene.objects.as_ref().unwrap().moving_box;
        let position = |scene: &ShadowScene| match scene.scene.renderable(id).unwrap().kind() {
            RenderableKind::Mesh(mesh) => mesh.transform().transform_point3d(point3(0.0, 0.0, 0.0)),
            _ => None,
        };
        assert_eq!(position(&scene), Some(point3(6.0, 3.0, 4.0)));
        // An eighth of the way around the circle.
        scene.time = 0.375;
        scene.place_moving_box();
        assert_eq!(position(&scene), Some(point3(5.0, 3.0, 5.0)));
    }

    #[test]
    fn stationary_box_stays_clean() {
        let mut scene = scene();
        scene.load();
        let id = scene.objects.as_ref().unwrap().moving_box;
        scene.scene.snapshot();
        scene.place_moving_box();
        assert!(!scene.scene().renderable(id).unwrap().is_dirty());

        scene.time = 0.375;
        scene.place_moving_box();
        assert!(scene.scene().renderable(id).unwrap().is_dirty());
    }

    #[test]
    fn default_light_follows_grid() {
        let mut scene = scene();
        scene.load();
        let light = scene
            .scene()
            .lights()
            .iter()
            .find_map(|light| match light.kind() {
                LightKind::Point(point) => Some(point.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(light.position, point3(4.0, 0.0, 4.0));
        assert_eq!(light.attenuation, Attenuation::new(64.0, 1.0, 1.0));
    }

    #[tokio::test]
    async fn rebuild_keeps_a_loaded_scene_showing() {
        let options = ShadowOptions {
            moving_box_size: size3(2.0, 2.0, 2.0),
            ..ShadowOptions::default()
        };

        let mut unloaded = scene();
        unloaded.rebuild(&options.clone().into());
        assert!(!unloaded.is_loaded());

        let mut loaded = scene();
        loaded.load();
        loaded.rebuild(&options.clone().into());
        assert!(loaded.is_loaded());
        assert_eq!(loaded.options(), &options);
        let mut fb = Framebuffer::new_cpu(GridSize::new(8).unwrap());
        assert!(loaded.render(0.1, &mut fb).await.voxels > 0);
    }
}
