use core::fmt;

use euclid::{Point3D, Size3D, Vector3D};

use crate::math::{FreeCoordinate, FreePoint, FreeVector, World};

/// Axis-Aligned Box data type.
///
/// Note that this has continuous coordinates, and a discrete analogue exists as
/// [`GridAab`](crate::math::GridAab).
///
/// Serialized as `{"min": [x, y, z], "max": [x, y, z]}`.
#[derive(Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "AabSer", into = "AabSer")]
pub struct Aab {
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// The [`Aab`] of zero size at the origin.
    pub const ZERO: Aab = Aab {
        lower_bounds: Point3D::new(0., 0., 0.),
        upper_bounds: Point3D::new(0., 0., 0.),
    };

    /// Constructs an [`Aab`] from individual coordinates.
    #[inline]
    pub fn new(
        lx: FreeCoordinate,
        hx: FreeCoordinate,
        ly: FreeCoordinate,
        hy: FreeCoordinate,
        lz: FreeCoordinate,
        hz: FreeCoordinate,
    ) -> Self {
        Self::from_lower_upper(Point3D::new(lx, ly, lz), Point3D::new(hx, hy, hz))
    }

    /// Constructs an [`Aab`] from two opposite corner points.
    ///
    /// The points need not be in order; each axis of the result spans the two points'
    /// coordinates on that axis.
    ///
    /// ```
    /// # extern crate omnivox_base as omnivox;
    /// use omnivox::math::Aab;
    ///
    /// assert_eq!(
    ///     Aab::from_lower_upper([2.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
    ///     Aab::new(1.0, 2.0, 0.0, 1.0, 0.0, 1.0),
    /// );
    /// ```
    #[inline]
    pub fn from_lower_upper(a: impl Into<FreePoint>, b: impl Into<FreePoint>) -> Self {
        let a = a.into();
        let b = b.into();
        Self {
            lower_bounds: a.min(b),
            upper_bounds: a.max(b),
        }
    }

    /// Constructs an [`Aab`] with the given center and total size.
    #[inline]
    pub fn from_center_size(center: FreePoint, size: Size3D<FreeCoordinate, World>) -> Self {
        let half = size.to_vector() * 0.5;
        Self::from_lower_upper(center - half, center + half)
    }

    /// The most negative corner of the box.
    #[inline]
    pub const fn lower_bounds(&self) -> FreePoint {
        self.lower_bounds
    }

    /// The most positive corner of the box.
    #[inline]
    pub const fn upper_bounds(&self) -> FreePoint {
        self.upper_bounds
    }

    /// Size of the box in each axis; equivalent to
    /// `self.upper_bounds() - self.lower_bounds()`.
    #[inline]
    pub fn size(&self) -> Size3D<FreeCoordinate, World> {
        Size3D::from(self.upper_bounds - self.lower_bounds)
    }

    /// The center of the enclosed volume.
    ///
    /// ```
    /// # extern crate omnivox_base as omnivox;
    /// use omnivox::math::{Aab, FreePoint};
    ///
    /// let aab = Aab::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
    /// assert_eq!(aab.center(), FreePoint::new(1.5, 3.5, 5.5));
    /// ```
    #[inline]
    pub fn center(&self) -> FreePoint {
        (self.lower_bounds + self.upper_bounds.to_vector()) * 0.5
    }

    /// Returns whether the box has zero volume.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let size = self.size();
        !(size.width > 0.0 && size.height > 0.0 && size.depth > 0.0)
    }

    /// Returns whether this AAB, including the boundary, contains the point.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        let l = self.lower_bounds;
        let u = self.upper_bounds;
        (l.x..=u.x).contains(&point.x)
            && (l.y..=u.y).contains(&point.y)
            && (l.z..=u.z).contains(&point.z)
    }

    /// Returns whether this AAB, including the boundary, intersects the other AAB.
    #[inline]
    pub fn intersects(&self, other: Aab) -> bool {
        let lower = self.lower_bounds.max(other.lower_bounds);
        let upper = self.upper_bounds.min(other.upper_bounds);
        lower.x <= upper.x && lower.y <= upper.y && lower.z <= upper.z
    }

    /// Returns the smallest box containing both boxes.
    #[inline]
    #[must_use]
    pub fn union(self, other: Aab) -> Self {
        Self {
            lower_bounds: self.lower_bounds.min(other.lower_bounds),
            upper_bounds: self.upper_bounds.max(other.upper_bounds),
        }
    }

    /// Returns the smallest box containing every point yielded by the iterator,
    /// or [`None`] if there are none.
    #[inline]
    pub fn from_points(points: impl IntoIterator<Item = FreePoint>) -> Option<Self> {
        points
            .into_iter()
            .map(|p| Self::from_lower_upper(p, p))
            .reduce(Self::union)
    }

    /// Translate this box by the specified offset.
    #[inline]
    #[must_use]
    pub fn translate(self, offset: FreeVector) -> Self {
        Self {
            lower_bounds: self.lower_bounds + offset,
            upper_bounds: self.upper_bounds + offset,
        }
    }

    /// Enlarges the AAB by moving each face outward by the specified distance (or inward
    /// if negative).
    ///
    /// If this would result in a negative or NaN size, produces a zero size AAB located
    /// at the center point of `self`.
    ///
    /// ```
    /// # extern crate omnivox_base as omnivox;
    /// use omnivox::math::Aab;
    ///
    /// assert_eq!(
    ///     Aab::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0).expand(0.25),
    ///     Aab::new(0.75, 2.25, 2.75, 4.25, 4.75, 6.25)
    /// );
    /// ````
    #[must_use]
    #[inline]
    pub fn expand(self, distance: FreeCoordinate) -> Self {
        let distance_vec = Vector3D::splat(distance);
        let lower_bounds = self.lower_bounds - distance_vec;
        let upper_bounds = self.upper_bounds + distance_vec;
        if lower_bounds.x <= upper_bounds.x
            && lower_bounds.y <= upper_bounds.y
            && lower_bounds.z <= upper_bounds.z
        {
            Self {
                lower_bounds,
                upper_bounds,
            }
        } else {
            let center = self.center();
            Self {
                lower_bounds: center,
                upper_bounds: center,
            }
        }
    }

    /// Returns the point within the box that is closest to `point`.
    #[inline]
    pub fn clamp_point(&self, point: FreePoint) -> FreePoint {
        point.clamp(self.lower_bounds, self.upper_bounds)
    }
}

impl fmt::Debug for Aab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Aab {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("Aab")
            .field(&(l.x..=u.x))
            .field(&(l.y..=u.y))
            .field(&(l.z..=u.z))
            .finish()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct AabSer {
    min: [FreeCoordinate; 3],
    max: [FreeCoordinate; 3],
}

impl From<AabSer> for Aab {
    fn from(value: AabSer) -> Self {
        Aab::from_lower_upper(value.min, value.max)
    }
}
impl From<Aab> for AabSer {
    fn from(value: Aab) -> Self {
        AabSer {
            min: value.lower_bounds.to_array(),
            max: value.upper_bounds.to_array(),
        }
    }
}
