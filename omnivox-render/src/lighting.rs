//! Evaluation of light arriving at points and surface samples of a [`SceneSnapshot`].

use core::mem;

use omnivox_base::math::{FreeCoordinate, FreePoint, Rgb, Rgba, voxel_center};
use omnivox_base::raycast::Ray;

use crate::renderable::Shading;
use crate::snapshot::Shape;
use crate::{Material, RenderableId, Sample, SceneSnapshot, ShadowFlags, WorkItem};

impl SceneSnapshot {
    /// Computes the colour of a renderable drawn as a single omnidirectional point.
    ///
    /// Directional lights are applied without regard to any surface orientation.
    /// If `ambient` is true, the snapshot's ambient light is included as well.
    /// `exclude` is the renderable being lit, which does not shadow itself.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn voxel_lighting(
        &self,
        point: FreePoint,
        material: &Material,
        receives_shadows: bool,
        exclude: Option<RenderableId>,
        ambient: bool,
    ) -> Rgba {
        let mut colour = material.emission(None).to_rgb();
        for light in &self.lights {
            let Some(incident) = light.illuminate(point, self.grid()) else {
                continue;
            };
            let multiplier = if receives_shadows {
                self.light_multiplier(
                    Ray::new(point, incident.to_light),
                    incident.distance,
                    exclude,
                    true,
                )
            } else {
                1.0
            };
            if multiplier > 0.0 {
                colour += material.brdf_ambient(None, incident.colour * multiplier);
            }
        }
        if ambient && let Some(ambient) = self.ambient {
            colour += material.brdf_ambient(None, ambient);
        }
        colour.clamp().with_alpha(material.alpha())
    }

    /// Computes the colour of a renderable from lighting each of `samples` on its surface.
    ///
    /// Each sample's contribution is multiplied by `factor`, or by the reciprocal of the
    /// number of samples if `factor` is [`None`]. Lights behind a sample's surface do not
    /// reach it. Ambient light, if `ambient` is true, is always averaged over the samples.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn sample_lighting(
        &self,
        samples: &[Sample],
        factor: Option<f32>,
        material: &Material,
        receives_shadows: bool,
        exclude: Option<RenderableId>,
        ambient: bool,
    ) -> Rgba {
        if samples.is_empty() {
            return Rgb::ZERO.with_alpha(material.alpha());
        }
        let average = 1.0 / samples.len() as f32;
        let factor = factor.unwrap_or(average);

        let mut colour = Rgb::ZERO;
        for sample in samples {
            let mut contribution = material.emission(sample.uv).to_rgb() * sample.falloff;
            for light in &self.lights {
                let Some(incident) = light.illuminate(sample.position, self.grid()) else {
                    continue;
                };
                if incident.to_light.dot(sample.normal) <= 0.0 {
                    continue;
                }
                let multiplier = if receives_shadows {
                    self.light_multiplier(
                        Ray::new(sample.position, incident.to_light),
                        incident.distance,
                        exclude,
                        true,
                    )
                } else {
                    1.0
                };
                if multiplier > 0.0 {
                    contribution += material.brdf(
                        incident.to_light,
                        sample.normal,
                        sample.uv,
                        incident.colour * multiplier * sample.falloff,
                    ) * sample.falloff;
                }
            }
            colour += contribution * factor;
        }

        if ambient && let Some(ambient) = self.ambient {
            let sum: Rgb = samples
                .iter()
                .map(|sample| material.brdf_ambient(sample.uv, ambient) * sample.falloff)
                .sum();
            colour += sum * average;
        }
        colour.clamp().with_alpha(material.alpha())
    }

    /// Returns how much of a light survives travelling along `ray` (whose direction should
    /// be a unit vector) from its origin to the ray parameter `far`.
    ///
    /// Starts at 1 and subtracts the reduction of every shadow caster the ray passes
    /// through, and of every fog volume if `include_fog` is true. The result is not clamped and may
    /// be negative; callers treat anything not above zero as total shadow.
    ///
    /// The renderable `exclude` does not shadow itself, unless it is a mesh, whose
    /// triangles may shadow each other.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn light_multiplier(
        &self,
        ray: Ray,
        far: FreeCoordinate,
        exclude: Option<RenderableId>,
        include_fog: bool,
    ) -> f32 {
        let mut multiplier = 1.0;
        for caster in self.casters() {
            if Some(caster.id) == exclude && !matches!(caster.shape, Shape::Mesh(_)) {
                continue;
            }
            multiplier -= caster.shadow(ray, far);
        }
        if include_fog {
            for fog in &self.fogs {
                multiplier -= fog.light_reduction(ray, far);
            }
        }
        multiplier
    }

    /// Light scattered towards the viewer by the fog volumes containing `point`.
    ///
    /// Only point and spot lights illuminate fog; each one whose path from the light to
    /// `point` is not blocked by shadow casters adds its full colour. Fog does not shadow
    /// this path. Each containing volume contributes separately, clamped.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn fog_lighting(&self, point: FreePoint) -> Rgb {
        let mut containing = self.fogs.iter().filter(|fog| fog.contains(point)).peekable();
        if containing.peek().is_none() {
            return Rgb::ZERO;
        }
        let mut sum = Rgb::ZERO;
        for light in self.lights.iter().filter(|light| light.lights_fog()) {
            let (Some(position), Some(incident)) =
                (light.position(), light.illuminate(point, self.grid()))
            else {
                continue;
            };
            let ray = Ray::new(position, -incident.to_light);
            if self.light_multiplier(ray, incident.distance, None, false) <= 0.0 {
                continue;
            }
            sum += incident.colour;
        }
        containing.fold(Rgb::ZERO, |total, fog| {
            total + (fog.colour() * sum * fog.scattering()).clamp()
        })
    }

    /// Computes the colour to be added to the voxel of `item`.
    ///
    /// Each visible renderable's colour is clamped and weighted by its alpha before being
    /// summed in draw order. Ambient light is counted once per voxel, by the first
    /// renderable that draws anything there. The sum is not clamped.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn shade_voxel(&self, item: &WorkItem) -> Rgb {
        let Some(cube) = self.grid().point_of(item.index()) else {
            return Rgb::ZERO;
        };
        let center = voxel_center(cube);
        let mut ambient_pending = true;
        let mut colour = Rgb::ZERO;

        for &entry_index in item.entries() {
            let entry = &self.entries()[entry_index];
            let material = &entry.material;
            if !material.is_visible() {
                continue;
            }
            let receives = entry.shadow.contains(ShadowFlags::RECEIVES);
            let exclude = Some(entry.id);
            let lit = match entry.shading(cube) {
                Shading::Nothing => continue,
                Shading::Point => self.voxel_lighting(
                    center,
                    material,
                    receives,
                    exclude,
                    mem::replace(&mut ambient_pending, false),
                ),
                Shading::Samples { samples, factor } => self.sample_lighting(
                    &samples,
                    factor,
                    material,
                    receives,
                    exclude,
                    mem::replace(&mut ambient_pending, false),
                ),
            };
            if lit.alpha() > 0.0 {
                colour += lit.to_rgb().clamp() * lit.alpha();
            }
        }

        if item.fog() {
            colour += self.fog_lighting(center);
        }
        colour
    }
}
