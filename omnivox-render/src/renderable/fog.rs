//! Participating media.

use omnivox_base::math::{
    Aab, FreeCoordinate, FreePoint, GridSize, Rgb, VOXEL_EPSILON, voxel_aabb_list,
    voxel_sphere_list,
};
use omnivox_base::raycast::{Ray, Span, intersect_aab, intersect_sphere};

/// Scattering of a [`Fog`] when none is specified.
pub const DEFAULT_FOG_SCATTERING: f32 = 0.1;

/// A volume of fog, which both glows with the light passing through it and dims that light.
///
/// A scene contains at most one fog.
///
/// ```
/// # extern crate omnivox_render as omnivox;
/// use omnivox::{Fog, FogShape};
/// use omnivox::math::Aab;
///
/// let fog = Fog::new(FogShape::Box(Aab::new(0.0, 8.0, 0.0, 8.0, 0.0, 8.0)));
/// assert_eq!(
///     serde_json::to_string(&fog).unwrap(),
///     r#"{"shape":"box","min":[0.0,0.0,0.0],"max":[8.0,8.0,8.0],"colour":16777215,"scattering":0.1}"#
/// );
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fog {
    #[serde(flatten)]
    shape: FogShape,
    #[serde(default = "white")]
    colour: Rgb,
    #[serde(default = "default_scattering")]
    scattering: f32,
}

/// The region occupied by a [`Fog`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
#[non_exhaustive]
pub enum FogShape {
    #[allow(missing_docs)]
    Box(Aab),
    #[allow(missing_docs)]
    Sphere {
        center: FreePoint,
        radius: FreeCoordinate,
    },
}

fn white() -> Rgb {
    Rgb::ONE
}
fn default_scattering() -> f32 {
    DEFAULT_FOG_SCATTERING
}

impl Fog {
    /// White fog with the default scattering.
    #[inline]
    pub fn new(shape: FogShape) -> Self {
        Self {
            shape,
            colour: Rgb::ONE,
            scattering: DEFAULT_FOG_SCATTERING,
        }
    }

    /// Builder-style setter for [`Self::colour()`].
    #[must_use]
    #[inline]
    pub fn with_colour(mut self, colour: Rgb) -> Self {
        self.colour = colour;
        self
    }

    /// Builder-style setter for [`Self::scattering()`].
    #[must_use]
    #[inline]
    pub fn with_scattering(mut self, scattering: f32) -> Self {
        self.set_scattering(scattering);
        self
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn shape(&self) -> FogShape {
        self.shape
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn set_shape(&mut self, shape: FogShape) {
        self.shape = shape;
    }

    /// Colour the fog takes on when lit, clamped to `0.0..=1.0`.
    #[inline]
    pub fn colour(&self) -> Rgb {
        self.colour.clamp()
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn set_colour(&mut self, colour: Rgb) {
        self.colour = colour;
    }

    /// Fraction of light removed per unit of path length through the fog, from 0 to 1.
    #[inline]
    pub fn scattering(&self) -> f32 {
        if self.scattering.is_nan() {
            0.0
        } else {
            self.scattering.clamp(0.0, 1.0)
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn set_scattering(&mut self, scattering: f32) {
        self.scattering = scattering;
    }

    /// Returns the flat indices of the voxels of `grid` inside the fog, in ascending order.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn colliding_voxels(&self, grid: GridSize) -> Vec<usize> {
        match self.shape {
            FogShape::Box(aab) => voxel_aabb_list(grid, aab, true),
            FogShape::Sphere { center, radius } => voxel_sphere_list(grid, center, radius, true),
        }
    }

    /// Returns whether the point is inside the fog, including its boundary.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        match self.shape {
            FogShape::Box(aab) => aab.contains(point),
            FogShape::Sphere { center, radius } => {
                (point - center).square_length() <= radius * radius
            }
        }
    }

    /// How much light travelling along `ray` is dimmed by the fog before reaching the ray
    /// parameter `far`: the scattering times the length of the path inside the fog.
    ///
    /// The path starts at the ray origin if that is inside the fog. The result is not
    /// limited to 1.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn light_reduction(&self, ray: Ray, far: FreeCoordinate) -> f32 {
        let span: Option<Span> = match self.shape {
            FogShape::Box(aab) => intersect_aab(ray, aab),
            FogShape::Sphere { center, radius } => intersect_sphere(ray, center, radius),
        };
        let length = span
            .and_then(|span| span.clip(VOXEL_EPSILON, far))
            .map_or(0.0, Span::length);
        self.scattering() * length as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use omnivox_base::math::GridPoint;
    use pretty_assertions::assert_eq;

    fn unit_fog() -> Fog {
        Fog::new(FogShape::Box(Aab::new(2.0, 4.0, 0.0, 8.0, 0.0, 8.0))).with_scattering(0.25)
    }

    #[test]
    fn reduction_through_box() {
        let fog = unit_fog();
        let ray = Ray::new([0.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        assert_eq!(fog.light_reduction(ray, 10.0), 0.5);
        // Ending inside the fog.
        assert_eq!(fog.light_reduction(ray, 3.0), 0.25);
        // Ending before the fog.
        assert_eq!(fog.light_reduction(ray, 1.0), 0.0);
    }

    #[test]
    fn reduction_from_inside() {
        let fog = unit_fog();
        let ray = Ray::new([3.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let reduction = fog.light_reduction(ray, 10.0);
        assert!((reduction - 0.25).abs() < 1e-5, "{reduction}");
    }

    #[test]
    fn reduction_scales_with_scattering() {
        let ray = Ray::new([0.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let once = unit_fog().light_reduction(ray, 10.0);
        let twice = unit_fog().with_scattering(0.5).light_reduction(ray, 10.0);
        assert_eq!(twice, 2.0 * once);
    }

    #[test]
    fn sphere_fog() {
        let fog = Fog::new(FogShape::Sphere {
            center: point3(4.0, 4.0, 4.0),
            radius: 2.0,
        })
        .with_scattering(1.0);
        assert!(fog.contains(point3(5.0, 4.0, 4.0)));
        assert!(!fog.contains(point3(6.5, 4.0, 4.0)));
        let ray = Ray::new([0.0, 4.0, 4.0], [1.0, 0.0, 0.0]);
        assert_eq!(fog.light_reduction(ray, 100.0), 4.0);
        let grid = GridSize::new(8).unwrap();
        let center_index = grid.flat_index(GridPoint::new(4, 4, 4)).unwrap();
        assert!(fog.colliding_voxels(grid).contains(&center_index));
    }

    #[test]
    fn scattering_is_clamped() {
        assert_eq!(unit_fog().with_scattering(3.0).scattering(), 1.0);
        assert_eq!(unit_fog().with_scattering(-1.0).scattering(), 0.0);
        assert_eq!(unit_fog().with_scattering(f32::NAN).scattering(), 0.0);
    }

    #[test]
    fn serde_round_trip() {
        let fog = Fog::new(FogShape::Sphere {
            center: point3(1.0, 2.0, 3.0),
            radius: 1.5,
        })
        .with_colour(Rgb::new(1.0, 0.0, 0.0))
        .with_scattering(0.75);
        let json = serde_json::to_string(&fog).unwrap();
        assert_eq!(
            json,
            r#"{"shape":"sphere","center":[1.0,2.0,3.0],"radius":1.5,"colour":16711680,"scattering":0.75}"#
        );
        assert_eq!(serde_json::from_str::<Fog>(&json).unwrap(), fog);

        let partial: Fog =
            serde_json::from_str(r#"{"shape":"box","min":[0,0,0],"max":[1,1,1]}"#).unwrap();
        assert_eq!(partial.colour(), Rgb::ONE);
        assert_eq!(partial.scattering(), DEFAULT_FOG_SCATTERING);
    }
}
