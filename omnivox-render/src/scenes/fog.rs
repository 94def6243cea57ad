use core::f64::consts::PI;

use euclid::point3;
use futures_core::future::BoxFuture;
use omnivox_base::math::{Aab, FreeCoordinate, FreePoint, Rgb};

use crate::lifecycle::wrong_options;
use crate::{
    AmbientLight, Attenuation, Fog, FogShape, FrameInfo, Framebuffer, Light, LightId, LightKind,
    PointLight, Scene, SceneContext, SceneOptions, VoxelScene,
};

/// Configuration of a [`FogScene`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct FogOptions {
    #[allow(missing_docs)]
    pub fog_colour: Rgb,
    /// Fraction of light the fog scatters per unit distance.
    pub fog_scattering: f32,
    #[allow(missing_docs)]
    pub ambient_light_colour: Rgb,
    #[allow(missing_docs)]
    pub point_light_colour: Rgb,
    /// Where the light starts; it is moved by the animation.
    pub point_light_position: FreePoint,
    #[allow(missing_docs)]
    pub point_light_attenuation: Attenuation,
}

impl Default for FogOptions {
    #[inline]
    fn default() -> Self {
        Self {
            fog_colour: Rgb::ONE,
            fog_scattering: 0.5,
            ambient_light_colour: Rgb::from_luminance(0.1),
            point_light_colour: Rgb::ONE,
            point_light_position: point3(4.0, 0.0, 4.0),
            point_light_attenuation: Attenuation::new(0.3, 0.0, 1.0),
        }
    }
}

/// A point light circling inside a grid filled with fog.
#[derive(Debug)]
pub struct FogScene {
    context: SceneContext,
    options: FogOptions,
    scene: Scene,
    lights: Option<(LightId, LightId)>,
    time: f64,
}

impl FogScene {
    /// Value of [`VoxelScene::kind()`] for this scene.
    pub const KIND: &'static str = "fog";

    /// Creates an unloaded scene with default options.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(context: SceneContext) -> Self {
        Self {
            scene: Scene::new(context.grid()),
            context,
            options: FogOptions::default(),
            lights: None,
            time: 0.0,
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn options(&self) -> &FogOptions {
        &self.options
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    fn fog(&self) -> Fog {
        let size = FreeCoordinate::from(self.context.grid().edge());
        Fog::new(FogShape::Box(Aab::new(0.0, size, 0.0, size, 0.0, size)))
            .with_colour(self.options.fog_colour)
            .with_scattering(self.options.fog_scattering)
    }

    /// Where the light is at the current time.
    fn light_position(&self) -> FreePoint {
        let half = FreeCoordinate::from(self.context.grid().edge()) / 2.0;
        let radius = half - 1.0;
        let angle = self.time * PI;
        point3(
            radius * angle.cos() + half,
            half,
            radius * angle.sin() + half,
        )
    }
}

impl VoxelScene for FogScene {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn load(&mut self) {
        if self.lights.is_some() {
            return;
        }
        log::debug!("loading {} scene", Self::KIND);
        let point = self.scene.insert_light(Light::new(PointLight {
            position: self.options.point_light_position,
            colour: self.options.point_light_colour,
            attenuation: self.options.point_light_attenuation,
        }));
        let ambient = self
            .scene
            .insert_light(Light::ambient(self.options.ambient_light_colour));
        self.scene.insert_fog(self.fog());
        self.lights = Some((point, ambient));
        self.time = 0.0;
    }

    fn unload(&mut self) {
        log::debug!("unloading {} scene", Self::KIND);
        self.clear();
    }

    fn is_loaded(&self) -> bool {
        self.lights.is_some()
    }

    fn set_options(&mut self, options: &SceneOptions) {
        let SceneOptions::Fog(options) = options else {
            wrong_options(Self::KIND, options);
            return;
        };
        self.options = options.clone();

        let Some((point, ambient)) = self.lights else {
            return;
        };
        for fog in self.scene.fogs_mut() {
            fog.set_colour(self.options.fog_colour);
            fog.set_scattering(self.options.fog_scattering);
        }
        if let Some(light) = self.scene.light_mut(point)
            && let LightKind::Point(light) = light.kind_mut()
        {
            light.colour = self.options.point_light_colour;
            light.attenuation = self.options.point_light_attenuation;
        }
        if let Some(light) = self.scene.light_mut(ambient) {
            *light.kind_mut() = LightKind::Ambient(AmbientLight {
                colour: self.options.ambient_light_colour,
            });
        }
    }

    fn clear(&mut self) {
        self.scene.clear();
        self.lights = None;
        self.time = 0.0;
    }

    fn render<'a>(&'a mut self, dt: f64, target: &'a mut Framebuffer) -> BoxFuture<'a, FrameInfo> {
        Box::pin(async move {
            let Some((point, _)) = self.lights else {
                return FrameInfo::default();
            };
            let position = self.light_position();
            if let Some(light) = self.scene.light_mut(point) {
                light.set_position(position);
            }
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
    use crate::{Dispatcher, ShadowOptions};
    use core::num::NonZeroUsize;
    use omnivox_base::math::GridSize;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn scene() -> FogScene {
        FogScene::new(SceneContext::new(
            GridSize::new(8).unwrap(),
            Arc::new(Dispatcher::new(NonZeroUsize::new(2))),
        ))
    }

    fn point_light(scene: &FogScene) -> PointLight {
        let (id, _) = scene.lights.unwrap();
        match scene.scene().lights().iter().find(|l| l.id() == id).unwrap().kind() {
            LightKind::Point(light) => light.clone(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn fog_glows_around_moving_light() {
        let mut scene = scene();
        scene.load();
        assert_eq!(scene.scene().fogs().len(), 1);

        let mut fb = Framebuffer::new_cpu(GridSize::new(8).unwrap());
        let info = scene.render(0.5, &mut fb).await;
        assert!(info.voxels > 0);
        assert!(fb.as_cpu().unwrap().lit_voxel_count() > 0);
        assert_eq!(point_light(&scene).position, point3(7.0, 4.0, 4.0));

        fb.clear(Rgb::ZERO);
        scene.render(0.5, &mut fb).await;
        let position = point_light(&scene).position;
        assert!((position - point3(4.0, 4.0, 7.0)).length() < 1e-9, "{position:?}");

        scene.unload();
        assert!(scene.scene().is_empty());
    }

    #[test]
    fn set_options_updates_in_place() {
        let mut scene = scene();
        scene.load();
        let options = FogOptions {
            fog_colour: Rgb::new(0.0, 0.0, 1.0),
            fog_scattering: 0.25,
            point_light_colour: Rgb::new(1.0, 0.5, 0.0),
            ..FogOptions::default()
        };
        scene.set_options(&options.into());

        let fog = &scene.scene().fogs()[0];
        assert_eq!(fog.colour(), Rgb::new(0.0, 0.0, 1.0));
        assert_eq!(fog.scattering(), 0.25);
        assert_eq!(point_light(&scene).colour, Rgb::new(1.0, 0.5, 0.0));
        assert_eq!(scene.scene().lights().len(), 2);
    }

    #[test]
    fn foreign_options_are_ignored() {
        let mut scene = scene();
        scene.set_options(&ShadowOptions::default().into());
        assert_eq!(scene.options(), &FogOptions::default());
    }

    #[tokio::test]
    async fn rebuild_keeps_a_loaded_scene_showing() {
        let mut scene = scene();
        scene.load();
        let options = FogOptions {
            fog_scattering: 0.25,
            ..FogOptions::default()
        };
        scene.rebuild(&options.into());
        assert!(scene.is_loaded());
        assert_eq!(scene.scene().fogs()[0].scattering(), 0.25);

        let mut fb = Framebuffer::new_cpu(GridSize::new(8).unwrap());
        assert!(scene.render(0.1, &mut fb).await.voxels > 0);
    }
}
