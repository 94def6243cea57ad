//! Surface response to light.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use omnivox_base::math::{FreeVector, Rgb, Rgba, Uv};

use crate::Texture;

/// How a surface reflects and emits light.
///
/// Materials are plain values; to share one among several renderables and animate its
/// alpha, wrap it in a [`SharedMaterial`].
///
/// When serialized, the variant is written as a `"type"` field and colours as packed
/// `0xRRGGBB` integers. Textures are not serialized.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Material {
    /// Diffuse reflection with optional self-emission.
    Lambert(LambertMaterial),
    /// A surface that glows with its own colour and brightens under light.
    Emission(EmissionMaterial),
}

/// Parameters of [`Material::Lambert`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct LambertMaterial {
    /// Diffuse reflectance.
    pub colour: Rgb,
    /// Light emitted regardless of lighting.
    pub emissive: Rgb,
    /// Opacity, from 0 to 1.
    pub alpha: f32,
    /// Multiplies [`Self::colour`] where texture coordinates are available.
    #[serde(skip)]
    pub texture: Option<Texture>,
}

/// Parameters of [`Material::Emission`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct EmissionMaterial {
    /// Emitted colour.
    pub colour: Rgb,
    /// Opacity, from 0 to 1.
    pub alpha: f32,
    /// Multiplies [`Self::colour`] where texture coordinates are available.
    #[serde(skip)]
    pub texture: Option<Texture>,
}

impl Default for LambertMaterial {
    #[inline]
    fn default() -> Self {
        Self {
            colour: Rgb::ONE,
            emissive: Rgb::ZERO,
            alpha: 1.0,
            texture: None,
        }
    }
}

impl Default for EmissionMaterial {
    #[inline]
    fn default() -> Self {
        Self {
            colour: Rgb::ONE,
            alpha: 1.0,
            texture: None,
        }
    }
}

impl From<LambertMaterial> for Material {
    #[inline]
    fn from(value: LambertMaterial) -> Self {
        Material::Lambert(value)
    }
}
impl From<EmissionMaterial> for Material {
    #[inline]
    fn from(value: EmissionMaterial) -> Self {
        Material::Emission(value)
    }
}

impl Material {
    /// A diffuse material of the given colour.
    #[inline]
    pub fn lambert(colour: Rgb) -> Self {
        Material::Lambert(LambertMaterial {
            colour,
            ..LambertMaterial::default()
        })
    }

    /// An emission-only material of the given colour.
    #[inline]
    pub fn glowing(colour: Rgb) -> Self {
        Material::Emission(EmissionMaterial {
            colour,
            ..EmissionMaterial::default()
        })
    }

    /// Opacity, clamped to `0.0..=1.0`.
    #[inline]
    pub fn alpha(&self) -> f32 {
        let alpha = match self {
            Material::Lambert(m) => m.alpha,
            Material::Emission(m) => m.alpha,
        };
        alpha.clamp(0.0, 1.0)
    }

    /// Replaces the opacity.
    #[inline]
    pub fn set_alpha(&mut self, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        match self {
            Material::Lambert(m) => m.alpha = alpha,
            Material::Emission(m) => m.alpha = alpha,
        }
    }

    /// Returns whether the material is opaque enough to be displayed at all, i.e.
    /// whether its alpha is at least one 8-bit step.
    ///
    /// Invisible materials are skipped by both lighting and shadow evaluation.
    #[inline]
    pub fn is_visible(&self) -> bool {
        (self.alpha() * 255.0).round() >= 1.0
    }

    /// Returns whether the material only emits light, in which case sampling it at more
    /// than one point per voxel gains nothing.
    #[inline]
    pub fn is_emission_only(&self) -> bool {
        matches!(self, Material::Emission(_))
    }

    /// The texture, if any.
    #[inline]
    pub fn texture(&self) -> Option<&Texture> {
        match self {
            Material::Lambert(m) => m.texture.as_ref(),
            Material::Emission(m) => m.texture.as_ref(),
        }
    }

    /// Returns whether the material has a texture that has not been loaded yet.
    #[inline]
    pub fn is_missing_texture(&self) -> bool {
        self.texture().is_some_and(|t| !t.is_loaded())
    }

    /// Base colour at the given texture coordinates, with the material's alpha.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn albedo(&self, uv: Option<Uv>) -> Rgba {
        let colour = match self {
            Material::Lambert(m) => m.colour,
            Material::Emission(m) => m.colour,
        };
        let colour = match (uv, self.texture()) {
            (Some(uv), Some(texture)) => colour * texture.sample(uv),
            _ => colour,
        };
        colour.with_alpha(self.alpha())
    }

    /// Light emitted by the surface itself, with the material's alpha.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn emission(&self, uv: Option<Uv>) -> Rgba {
        match self {
            Material::Lambert(m) => m.emissive.with_alpha(self.alpha()),
            Material::Emission(_) => self.albedo(uv),
        }
    }

    /// Response to light arriving from every direction.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn brdf_ambient(&self, uv: Option<Uv>, light: Rgb) -> Rgb {
        let albedo = self.albedo(uv).to_rgb();
        match self {
            Material::Lambert(_) => albedo * light,
            Material::Emission(_) => albedo + light,
        }
    }

    /// Response to light arriving from `to_light` (a unit vector pointing from the
    /// surface towards the light) at a surface with the given unit `normal`.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn brdf(&self, to_light: FreeVector, normal: FreeVector, uv: Option<Uv>, light: Rgb) -> Rgb {
        let cosine = to_light.dot(normal).clamp(0.0, 1.0) as f32;
        self.brdf_ambient(uv, light) * cosine
    }
}

// -------------------------------------------------------------------------------------------------

/// A [`Material`] shared by reference among any number of renderables.
///
/// Everything but the alpha is fixed when the handle is created; the alpha may be changed
/// at any time through any clone of the handle, and takes effect on the next frame.
#[derive(Clone)]
pub struct SharedMaterial(Arc<SharedInner>);

struct SharedInner {
    material: Material,
    /// Bits of an `f32`.
    alpha: AtomicU32,
}

impl SharedMaterial {
    /// Wraps a material for sharing.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(material: impl Into<Material>) -> Self {
        let material = material.into();
        let alpha = AtomicU32::new(material.alpha().to_bits());
        Self(Arc::new(SharedInner { material, alpha }))
    }

    /// Current opacity.
    #[inline]
    pub fn alpha(&self) -> f32 {
        f32::from_bits(self.0.alpha.load(Ordering::Relaxed))
    }

    /// Changes the opacity of every renderable using this material.
    #[inline]
    pub fn set_alpha(&self, alpha: f32) {
        let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        self.0.alpha.store(alpha.to_bits(), Ordering::Relaxed);
    }

    /// Returns a copy of the material with its current alpha.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn get(&self) -> Material {
        let mut material = self.0.material.clone();
        material.set_alpha(self.alpha());
        material
    }

    /// Returns whether both handles refer to the same material.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Material> for SharedMaterial {
    #[inline]
    fn from(value: Material) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SharedMaterial {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedMaterial").field(&self.get()).finish()
    }
}

impl PartialEq for SharedMaterial {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
