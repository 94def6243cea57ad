//! Ray intersection tests against the shapes that cast shadows.
//!
//! All distances are measured in multiples of [`Ray::direction`]'s length, and only hits
//! with `t >= 0` (in front of the origin) are reported.

use crate::math::{Aab, FreeCoordinate, FreePoint, VOXEL_EPSILON};

mod ray;
pub use ray::Ray;

// -------------------------------------------------------------------------------------------------

/// The span of a ray inside a shape.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Span {
    /// Ray parameter at which the ray enters the shape; `0` if the origin is inside.
    pub enter: FreeCoordinate,
    /// Ray parameter at which the ray leaves the shape.
    pub exit: FreeCoordinate,
}

impl Span {
    /// Restricts the span to `near..=far`, returning [`None`] if nothing remains.
    #[must_use]
    #[inline]
    pub fn clip(self, near: FreeCoordinate, far: FreeCoordinate) -> Option<Self> {
        let enter = self.enter.max(near);
        let exit = self.exit.min(far);
        (enter <= exit).then_some(Self { enter, exit })
    }

    /// `exit - enter`.
    #[must_use]
    #[inline]
    pub fn length(self) -> FreeCoordinate {
        self.exit - self.enter
    }
}

/// Intersects the ray with an axis-aligned box using the slab method.
///
/// ```
/// # extern crate omnivox_base as omnivox;
/// use omnivox::math::Aab;
/// use omnivox::raycast::{Ray, Span, intersect_aab};
///
/// let aab = Aab::new(2.0, 3.0, 0.0, 1.0, 0.0, 1.0);
/// let ray = Ray::new([0.0, 0.5, 0.5], [1.0, 0.0, 0.0]);
/// assert_eq!(intersect_aab(ray, aab), Some(Span { enter: 2.0, exit: 3.0 }));
/// ```
#[allow(clippy::missing_inline_in_public_items)]
pub fn intersect_aab(ray: Ray, aab: Aab) -> Option<Span> {
    let mut enter = FreeCoordinate::NEG_INFINITY;
    let mut exit = FreeCoordinate::INFINITY;
    let lower = aab.lower_bounds().to_array();
    let upper = aab.upper_bounds().to_array();
    let origin = ray.origin.to_array();
    let direction = ray.direction.to_array();
    for axis in 0..3 {
        if direction[axis] == 0.0 {
            if origin[axis] < lower[axis] || origin[axis] > upper[axis] {
                return None;
            }
            continue;
        }
        let inverse = direction[axis].recip();
        let mut t0 = (lower[axis] - origin[axis]) * inverse;
        let mut t1 = (upper[axis] - origin[axis]) * inverse;
        if t0 > t1 {
            core::mem::swap(&mut t0, &mut t1);
        }
        enter = enter.max(t0);
        exit = exit.min(t1);
    }
    if exit < enter.max(0.0) {
        return None;
    }
    Some(Span {
        enter: enter.max(0.0),
        exit,
    })
}

/// Intersects the ray with a solid ball.
#[allow(clippy::missing_inline_in_public_items)]
pub fn intersect_sphere(ray: Ray, center: FreePoint, radius: FreeCoordinate) -> Option<Span> {
    let a = ray.direction.square_length();
    if a == 0.0 || radius.is_nan() || radius <= 0.0 {
        return None;
    }
    let to_origin = ray.origin - center;
    let half_b = to_origin.dot(ray.direction);
    let c = to_origin.square_length() - radius * radius;
    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let exit = (-half_b + root) / a;
    if exit < 0.0 {
        return None;
    }
    Some(Span {
        enter: ((-half_b - root) / a).max(0.0),
        exit,
    })
}

/// Intersects the ray with a triangle (Möller–Trumbore), returning the ray parameter of
/// the hit. Both faces are hit.
#[allow(clippy::missing_inline_in_public_items)]
pub fn intersect_triangle(ray: Ray, [v0, v1, v2]: [FreePoint; 3]) -> Option<FreeCoordinate> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let p = ray.direction.cross(edge2);
    let determinant = edge1.dot(p);
    if determinant.abs() < VOXEL_EPSILON * VOXEL_EPSILON {
        return None;
    }
    let inverse = determinant.recip();
    let s = ray.origin - v0;
    let u = s.dot(p) * inverse;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inverse;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inverse;
    (t >= 0.0).then_some(t)
}
