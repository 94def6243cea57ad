//! Light sources.

use core::f64::consts::FRAC_PI_4;
use std::sync::atomic::{AtomicU64, Ordering};

use omnivox_base::math::{
    FreeCoordinate, FreePoint, FreeVector, GridSize, Rgb, VOXEL_EPSILON, try_normalize,
};

/// Identifies a [`Light`] within a [`Scene`](crate::Scene).
///
/// Every light constructed or deserialized in this process gets a distinct id; clones
/// keep the id, which is how re-inserting a light replaces it instead of duplicating it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LightId(u64);

impl LightId {
    #[inline]
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A light source in a scene.
///
/// ```
/// # extern crate omnivox_render as omnivox;
/// use omnivox::Light;
/// use omnivox::math::{FreePoint, Rgb};
///
/// let light = Light::point(FreePoint::new(4.0, 0.0, 4.0), Rgb::ONE);
/// // Default attenuation is 1 / (1 + d).
/// assert_eq!(light.emission(1.0), Rgb::new(0.5, 0.5, 0.5));
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Light {
    #[serde(skip, default = "LightId::next")]
    id: LightId,
    #[serde(flatten)]
    kind: LightKind,
}

/// The kinds of [`Light`], with their parameters.
///
/// Serialized with a `"type"` field naming the variant.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LightKind {
    /// Radiates in all directions from a point.
    Point(PointLight),
    /// Lights everything equally from everywhere, and is never shadowed.
    Ambient(AmbientLight),
    /// Radiates from a point within a cone.
    Spot(SpotLight),
    /// Parallel rays from infinitely far away.
    Directional(DirectionalLight),
}

/// Parameters of [`LightKind::Point`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct PointLight {
    #[allow(missing_docs)]
    pub position: FreePoint,
    #[allow(missing_docs)]
    pub colour: Rgb,
    #[allow(missing_docs)]
    pub attenuation: Attenuation,
}

/// Parameters of [`LightKind::Ambient`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct AmbientLight {
    #[allow(missing_docs)]
    pub colour: Rgb,
}

/// Parameters of [`LightKind::Spot`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct SpotLight {
    #[allow(missing_docs)]
    pub position: FreePoint,
    /// Axis of the cone. Need not be normalized.
    pub direction: FreeVector,
    #[allow(missing_docs)]
    pub colour: Rgb,
    /// Full angle, in radians, of the cone within which the light is at full strength.
    pub inner_angle: FreeCoordinate,
    /// Full angle, in radians, of the cone outside which there is no light.
    /// Treated as at least [`Self::inner_angle`].
    pub outer_angle: FreeCoordinate,
    /// Falloff with distance. The result is never allowed to exceed 1.
    pub attenuation: Attenuation,
}

/// Parameters of [`LightKind::Directional`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct DirectionalLight {
    /// Direction in which the light travels. Need not be normalized.
    pub direction: FreeVector,
    #[allow(missing_docs)]
    pub colour: Rgb,
}

/// Coefficients of the falloff `1 / (constant + linear·d + quadratic·d²)` of light with
/// distance `d`.
///
/// Negative coefficients are treated as zero.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[expect(clippy::exhaustive_structs)]
pub struct Attenuation {
    #[allow(missing_docs)]
    pub quadratic: f32,
    #[allow(missing_docs)]
    pub linear: f32,
    #[allow(missing_docs)]
    pub constant: f32,
}

/// Light arriving at a point from one [`Light`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Incident {
    /// Unit vector from the lit point towards the light.
    pub to_light: FreeVector,
    /// Distance to the light, for bounding shadow rays.
    pub distance: FreeCoordinate,
    /// Attenuated colour of the light at the point.
    pub colour: Rgb,
}

// -------------------------------------------------------------------------------------------------

impl Default for PointLight {
    #[inline]
    fn default() -> Self {
        Self {
            position: FreePoint::origin(),
            colour: Rgb::ONE,
            attenuation: Attenuation::default(),
        }
    }
}

impl Default for AmbientLight {
    #[inline]
    fn default() -> Self {
        Self { colour: Rgb::ONE }
    }
}

impl Default for SpotLight {
    #[inline]
    fn default() -> Self {
        Self {
            position: FreePoint::origin(),
            direction: FreeVector::new(0.0, -1.0, 0.0),
            colour: Rgb::ONE,
            inner_angle: 0.0,
            outer_angle: FRAC_PI_4,
            attenuation: Attenuation::default(),
        }
    }
}

impl Default for DirectionalLight {
    #[inline]
    fn default() -> Self {
        Self {
            direction: FreeVector::new(0.0, -1.0, 0.0),
            colour: Rgb::ONE,
        }
    }
}

impl Default for Attenuation {
    #[inline]
    fn default() -> Self {
        Self {
            quadratic: 0.0,
            linear: 1.0,
            constant: 1.0,
        }
    }
}

impl Attenuation {
    /// No falloff at all.
    pub const NONE: Self = Self {
        quadratic: 0.0,
        linear: 0.0,
        constant: 1.0,
    };

    /// Constructs an [`Attenuation`], replacing negative or NaN coefficients with zero.
    #[inline]
    pub fn new(quadratic: f32, linear: f32, constant: f32) -> Self {
        Self {
            quadratic: quadratic.max(0.0),
            linear: linear.max(0.0),
            constant: constant.max(0.0),
        }
    }

    /// The factor by which light is multiplied after travelling `distance`.
    #[inline]
    pub fn factor(&self, distance: FreeCoordinate) -> f32 {
        let d = distance as f32;
        let denominator = self.constant.max(0.0)
            + self.linear.max(0.0) * d
            + self.quadratic.max(0.0) * d * d;
        denominator.max(VOXEL_EPSILON as f32).recip()
    }
}

impl From<PointLight> for LightKind {
    #[inline]
    fn from(value: PointLight) -> Self {
        LightKind::Point(value)
    }
}
impl From<AmbientLight> for LightKind {
    #[inline]
    fn from(value: AmbientLight) -> Self {
        LightKind::Ambient(value)
    }
}
impl From<SpotLight> for LightKind {
    #[inline]
    fn from(value: SpotLight) -> Self {
        LightKind::Spot(value)
    }
}
impl From<DirectionalLight> for LightKind {
    #[inline]
    fn from(value: DirectionalLight) -> Self {
        LightKind::Directional(value)
    }
}

impl Light {
    /// Creates a light with a new [`LightId`].
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(kind: impl Into<LightKind>) -> Self {
        Self {
            id: LightId::next(),
            kind: kind.into(),
        }
    }

    /// A point light with default attenuation.
    #[inline]
    pub fn point(position: FreePoint, colour: Rgb) -> Self {
        Self::new(PointLight {
            position,
            colour,
            attenuation: Attenuation::default(),
        })
    }

    /// An ambient light.
    #[inline]
    pub fn ambient(colour: Rgb) -> Self {
        Self::new(AmbientLight { colour })
    }

    /// A directional light travelling in `direction`.
    #[inline]
    pub fn directional(direction: FreeVector, colour: Rgb) -> Self {
        Self::new(DirectionalLight { direction, colour })
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn id(&self) -> LightId {
        self.id
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    /// Mutable access to the parameters, for animation. The id is unchanged.
    #[inline]
    pub fn kind_mut(&mut self) -> &mut LightKind {
        &mut self.kind
    }

    /// Moves a point or spot light. Other lights have no position and are unaffected.
    #[inline]
    pub fn set_position(&mut self, position: FreePoint) {
        match &mut self.kind {
            LightKind::Point(l) => l.position = position,
            LightKind::Spot(l) => l.position = position,
            LightKind::Ambient(_) | LightKind::Directional(_) => {}
        }
    }

    /// Returns whether this is an ambient light.
    #[inline]
    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient(_))
    }

    /// Returns whether this light illuminates fog volumes.
    #[inline]
    pub fn lights_fog(&self) -> bool {
        matches!(self.kind, LightKind::Point(_) | LightKind::Spot(_))
    }

    /// Position of a point or spot light.
    #[inline]
    pub fn position(&self) -> Option<FreePoint> {
        match &self.kind {
            LightKind::Point(l) => Some(l.position),
            LightKind::Spot(l) => Some(l.position),
            LightKind::Ambient(_) | LightKind::Directional(_) => None,
        }
    }

    /// Clamped colour of the light after travelling `distance`, ignoring direction.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn emission(&self, distance: FreeCoordinate) -> Rgb {
        match &self.kind {
            LightKind::Point(l) => (l.colour.clamp() * l.attenuation.factor(distance)).clamp(),
            LightKind::Spot(l) => l.colour.clamp() * l.attenuation.factor(distance).min(1.0),
            LightKind::Ambient(AmbientLight { colour })
            | LightKind::Directional(DirectionalLight { colour, .. }) => colour.clamp(),
        }
    }

    /// Computes the light arriving at `point` in a grid of size `grid`.
    ///
    /// Returns [`None`] for ambient lights, which have no direction.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn illuminate(&self, point: FreePoint, grid: GridSize) -> Option<Incident> {
        match &self.kind {
            LightKind::Ambient(_) => None,
            LightKind::Point(l) => {
                let (to_light, distance) = towards(point, l.position);
                Some(Incident {
                    to_light,
                    distance,
                    colour: self.emission(distance),
                })
            }
            LightKind::Spot(l) => {
                let (to_light, distance) = towards(point, l.position);
                let axis = try_normalize(l.direction).unwrap_or(FreeVector::new(0.0, -1.0, 0.0));
                let outer = l.outer_angle.max(l.inner_angle);
                let cos_inner = (l.inner_angle / 2.0).cos();
                let cos_outer = (outer / 2.0).cos();
                let cosine = (-to_light).dot(axis);
                let cone = ((cosine - cos_outer) / (cos_inner - cos_outer).max(VOXEL_EPSILON))
                    .clamp(0.0, 1.0);
                Some(Incident {
                    to_light,
                    distance,
                    colour: self.emission(distance) * (cone * cone) as f32,
                })
            }
            LightKind::Directional(l) => Some(Incident {
                to_light: try_normalize(-l.direction).unwrap_or(FreeVector::new(0.0, 1.0, 0.0)),
                distance: 100.0 * FreeCoordinate::from(grid.edge()),
                colour: l.colour.clamp(),
            }),
        }
    }
}

/// Unit direction and distance from `from` to `to`, with the distance kept above zero.
fn towards(from: FreePoint, to: FreePoint) -> (FreeVector, FreeCoordinate) {
    let v = to - from;
    let distance = v.length().max(VOXEL_EPSILON);
    (v / distance, distance)
}
