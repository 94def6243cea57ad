use crate::math::{FreeCoordinate, FreePoint, FreeVector};

/// A ray; a half-infinite line segment (sometimes used as finite by the length of the
/// direction vector).
#[allow(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// The sole endpoint of the ray.
    pub origin: FreePoint,

    /// The direction in which the ray extends infinitely.
    ///
    /// The meaning, if any, of the magnitude of this vector depends on context;
    /// the intersection functions in [`crate::raycast`] measure distances in multiples of
    /// it, so a unit vector gives distances in voxels.
    pub direction: FreeVector,
}

impl Ray {
    /// Constructs a [`Ray`] from convertible types (e.g. tuples or 3-element arrays).
    /// Other than the use of [`Into`], this is equivalent to a struct literal.
    ///
    /// ```
    /// # extern crate omnivox_base as omnivox;
    /// use omnivox::euclid::{point3, vec3};
    /// use omnivox::raycast::Ray;
    ///
    /// assert_eq!(
    ///     Ray::new([1., 2., 3.], [4., 5., 6.]),
    ///     Ray {
    ///         origin: point3(1., 2., 3.),
    ///         direction: vec3(4., 5., 6.),
    ///     }
    /// );
    /// ```
    #[allow(clippy::missing_inline_in_public_items)] // is generic already
    pub fn new(origin: impl Into<FreePoint>, direction: impl Into<FreeVector>) -> Self {
        Self {
            origin: origin.into(),
            direction: direction.into(),
        }
    }

    /// Returns the point `origin + direction * t`.
    #[must_use]
    #[inline]
    pub fn at(self, t: FreeCoordinate) -> FreePoint {
        self.origin + self.direction * t
    }

    /// Scale the ray's direction vector by the given factor.
    #[must_use]
    #[inline]
    pub fn scale_direction(self, scale: FreeCoordinate) -> Self {
        Self {
            origin: self.origin,
            direction: self.direction * scale,
        }
    }

    /// Moves the origin `t` direction-lengths along the ray.
    #[must_use]
    #[inline]
    pub fn advance(self, t: FreeCoordinate) -> Self {
        Self {
            origin: self.at(t),
            direction: self.direction,
        }
    }

    /// Translate the ray by the specified offset.
    #[must_use]
    #[inline]
    pub fn translate(self, offset: FreeVector) -> Self {
        Self {
            origin: self.origin + offset,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point3, vec3};

    #[test]
    fn at_and_advance() {
        let ray = Ray::new([1., 0., 0.], [0., 2., 0.]);
        assert_eq!(ray.at(1.5), point3(1., 3., 0.));
        assert_eq!(ray.advance(0.5), Ray::new([1., 1., 0.], [0., 2., 0.]));
        assert_eq!(ray.scale_direction(0.5).direction, vec3(0., 1., 0.));
    }
}
