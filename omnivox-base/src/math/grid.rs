//! Integer voxel grid coordinates and the mapping between grid cells and space.

use core::fmt;
use core::ops::RangeInclusive;

use euclid::{Point3D, Vector3D};

use crate::math::{Aab, FreeCoordinate, FreePoint, VOXEL_ERR_UNITS, VOXEL_UNIT_SIZE, World};

/// Coordinates that are locked to the voxel grid.
pub type GridCoordinate = i32;

/// Position of a voxel in the grid.
pub type GridPoint = Point3D<GridCoordinate, World>;

/// Difference between [`GridPoint`]s.
pub type GridVector = Vector3D<GridCoordinate, World>;

/// The edge length `N` of a cubic voxel grid of `N`×`N`×`N` voxels.
///
/// Voxel `(x, y, z)` occupies the unit cube whose lower corner is `(x, y, z)`, and voxels
/// are stored in flat buffers in `x`-major order: index `x·N² + y·N + z`.
#[derive(Clone, Copy, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "GridCoordinate", into = "GridCoordinate")]
pub struct GridSize(GridCoordinate);

impl GridSize {
    /// Constructs a [`GridSize`], returning [`None`] if `edge` is not positive.
    #[inline]
    pub const fn new(edge: GridCoordinate) -> Option<Self> {
        if edge > 0 { Some(Self(edge)) } else { None }
    }

    /// The edge length in voxels.
    #[inline]
    pub const fn edge(self) -> GridCoordinate {
        self.0
    }

    /// The total number of voxels in the grid, `N³`.
    #[inline]
    pub const fn voxel_count(self) -> usize {
        let n = self.0 as usize;
        n * n * n
    }

    /// Returns whether `point` names a voxel of this grid.
    #[inline]
    pub fn contains(self, point: GridPoint) -> bool {
        let range = 0..self.0;
        range.contains(&point.x) && range.contains(&point.y) && range.contains(&point.z)
    }

    /// Returns the flat buffer index of the voxel at `point`, or [`None`] if it is outside
    /// the grid.
    ///
    /// ```
    /// # extern crate omnivox_base as omnivox;
    /// use omnivox::math::{GridPoint, GridSize};
    ///
    /// let size = GridSize::new(4).unwrap();
    /// assert_eq!(size.flat_index(GridPoint::new(1, 2, 3)), Some(16 + 8 + 3));
    /// assert_eq!(size.flat_index(GridPoint::new(4, 0, 0)), None);
    /// ```
    #[inline]
    pub fn flat_index(self, point: GridPoint) -> Option<usize> {
        if self.contains(point) {
            let n = self.0 as usize;
            Some((point.x as usize * n + point.y as usize) * n + point.z as usize)
        } else {
            None
        }
    }

    /// Inverse of [`GridSize::flat_index()`].
    #[inline]
    #[expect(clippy::cast_possible_wrap, reason = "index is less than voxel_count()")]
    pub fn point_of(self, index: usize) -> Option<GridPoint> {
        if index >= self.voxel_count() {
            return None;
        }
        let n = self.0 as usize;
        Some(GridPoint::new(
            (index / (n * n)) as GridCoordinate,
            (index / n % n) as GridCoordinate,
            (index % n) as GridCoordinate,
        ))
    }

    /// Iterates over every voxel in flat index order.
    #[inline]
    pub fn points(self) -> impl Iterator<Item = GridPoint> + Clone {
        let n = self.0;
        (0..n).flat_map(move |x| {
            (0..n).flat_map(move |y| (0..n).map(move |z| GridPoint::new(x, y, z)))
        })
    }

    /// The whole grid as a [`GridAab`].
    #[inline]
    pub const fn bounds(self) -> GridAab {
        GridAab {
            lower: Point3D::new(0, 0, 0),
            upper: Point3D::new(self.0 - 1, self.0 - 1, self.0 - 1),
        }
    }

    /// The continuous volume spanned by the grid.
    #[inline]
    pub fn world_aab(self) -> Aab {
        let e = FreeCoordinate::from(self.0) * VOXEL_UNIT_SIZE;
        Aab::new(0.0, e, 0.0, e, 0.0, e)
    }
}

impl fmt::Debug for GridSize {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GridSize({n}×{n}×{n})", n = self.0)
    }
}

impl TryFrom<GridCoordinate> for GridSize {
    type Error = &'static str;
    #[inline]
    fn try_from(edge: GridCoordinate) -> Result<Self, Self::Error> {
        Self::new(edge).ok_or("grid size must be positive")
    }
}

impl From<GridSize> for GridCoordinate {
    #[inline]
    fn from(size: GridSize) -> Self {
        size.0
    }
}

impl Default for GridSize {
    #[inline]
    fn default() -> Self {
        Self(super::DEFAULT_GRID_SIZE)
    }
}

/// The centre point of the voxel at `cube`.
#[inline]
pub fn voxel_center(cube: GridPoint) -> FreePoint {
    cube.to_f64() + Vector3D::splat(VOXEL_UNIT_SIZE / 2.0)
}

/// The unit cube of space occupied by the voxel at `cube`.
#[inline]
pub fn voxel_aab(cube: GridPoint) -> Aab {
    let lower: FreePoint = cube.to_f64();
    Aab::from_lower_upper(lower, lower + Vector3D::splat(VOXEL_UNIT_SIZE))
}

/// An inclusive box of grid cells.
///
/// Unlike [`Aab`], whose bounds are continuous, `GridAab { lower: 0, upper: 0 }` contains
/// exactly one voxel. A `GridAab` may be empty, in which case some `upper` component is
/// less than the corresponding `lower` component.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct GridAab {
    lower: GridPoint,
    upper: GridPoint,
}

impl GridAab {
    /// Constructs a [`GridAab`] from inclusive lower and upper cells.
    #[inline]
    pub const fn from_lower_upper_inclusive(lower: GridPoint, upper: GridPoint) -> Self {
        Self { lower, upper }
    }

    /// Returns the cells from the floor of `aab`'s lower corner to the ceiling of its upper
    /// corner, inclusive.
    ///
    /// Coordinates outside the range of [`GridCoordinate`] saturate.
    #[inline]
    pub fn rounded_outward(aab: Aab) -> Self {
        let l = aab.lower_bounds().floor();
        let u = aab.upper_bounds().ceil();
        Self {
            lower: Point3D::new(l.x as i32, l.y as i32, l.z as i32),
            upper: Point3D::new(u.x as i32, u.y as i32, u.z as i32),
        }
    }

    /// Inclusive lower corner.
    #[inline]
    pub const fn lower(&self) -> GridPoint {
        self.lower
    }

    /// Inclusive upper corner.
    #[inline]
    pub const fn upper(&self) -> GridPoint {
        self.upper
    }

    /// Returns whether the box contains no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.upper.x < self.lower.x || self.upper.y < self.lower.y || self.upper.z < self.lower.z
    }

    /// Returns whether the box includes the cell at `point`.
    #[inline]
    pub fn contains(&self, point: GridPoint) -> bool {
        self.x_range().contains(&point.x)
            && self.y_range().contains(&point.y)
            && self.z_range().contains(&point.z)
    }

    /// Returns the intersection of `self` and `other`, which may be empty.
    #[inline]
    #[must_use]
    pub fn intersection(self, other: GridAab) -> Self {
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Iterates over the cells of this box in `x`-major order.
    #[inline]
    pub fn points(self) -> impl Iterator<Item = GridPoint> + Clone {
        let (ys, zs) = (self.y_range(), self.z_range());
        self.x_range().flat_map(move |x| {
            let zs = zs.clone();
            ys.clone()
                .flat_map(move |y| zs.clone().map(move |z| GridPoint::new(x, y, z)))
        })
    }

    fn x_range(&self) -> RangeInclusive<GridCoordinate> {
        self.lower.x..=self.upper.x
    }
    fn y_range(&self) -> RangeInclusive<GridCoordinate> {
        self.lower.y..=self.upper.y
    }
    fn z_range(&self) -> RangeInclusive<GridCoordinate> {
        self.lower.z..=self.upper.z
    }
}

impl fmt::Debug for GridAab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GridAab")
            .field(&self.x_range())
            .field(&self.y_range())
            .field(&self.z_range())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------

/// Returns the flat indices of the voxels of `size` that an object occupying `aab` may
/// touch, in ascending order.
///
/// The candidate range runs from the floor of the lower corner to the ceiling of the upper
/// corner, clipped to the grid. If `fill` is false, only the voxels on the outer shell of that
/// range are listed.
#[allow(clippy::missing_inline_in_public_items)]
pub fn voxel_aabb_list(size: GridSize, aab: Aab, fill: bool) -> Vec<usize> {
    let range = GridAab::rounded_outward(aab).intersection(size.bounds());
    if range.is_empty() {
        return Vec::new();
    }
    let (lower, upper) = (range.lower(), range.upper());
    range
        .points()
        .filter(|p| {
            fill || p.x == lower.x
                || p.x == upper.x
                || p.y == lower.y
                || p.y == upper.y
                || p.z == lower.z
                || p.z == upper.z
        })
        .filter_map(|p| size.flat_index(p))
        .collect()
}

/// Returns the flat indices of the voxels of `size` whose centres lie on the surface of
/// the sphere, in ascending order.
///
/// A centre is on the surface if its distance from it is less than [`VOXEL_ERR_UNITS`].
/// If `fill` is true, centres inside the sphere are included too.
#[allow(clippy::missing_inline_in_public_items)]
pub fn voxel_sphere_list(
    size: GridSize,
    center: FreePoint,
    radius: FreeCoordinate,
    fill: bool,
) -> Vec<usize> {
    if radius.is_nan() || radius < 0.0 {
        return Vec::new();
    }
    let bounding = Aab::from_lower_upper(
        center - Vector3D::splat(radius),
        center + Vector3D::splat(radius),
    );
    let range = GridAab::rounded_outward(bounding).intersection(size.bounds());
    if range.is_empty() {
        return Vec::new();
    }
    range
        .points()
        .filter(|&p| {
            let distance_to_surface = (voxel_center(p) - center).length() - radius;
            if fill {
                distance_to_surface < VOXEL_ERR_UNITS
            } else {
                distance_to_surface.abs() < VOXEL_ERR_UNITS
            }
        })
        .filter_map(|p| size.flat_index(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn size(n: GridCoordinate) -> GridSize {
        GridSize::new(n).unwrap()
    }

    #[test]
    fn zero_size_rejected() {
        assert_eq!(GridSize::new(0), None);
        assert_eq!(GridSize::new(-3), None);
    }

    #[test]
    fn flat_index_inverse() {
        let s = size(5);
        for (i, p) in s.points().enumerate() {
            assert_eq!(s.flat_index(p), Some(i));
            assert_eq!(s.point_of(i), Some(p));
        }
        assert_eq!(s.point_of(125), None);
    }

    #[test]
    fn grid_size_serde_validates() {
        assert_eq!(serde_json::from_str::<GridSize>("8").unwrap(), size(8));
        assert!(serde_json::from_str::<GridSize>("0").is_err());
    }

    #[test]
    fn grid_size_debug() {
        assert_eq!(format!("{:?}", size(8)), "GridSize(8×8×8)");
    }

    #[test]
    fn aabb_list_rounds_outward() {
        let s = size(4);
        let aab = Aab::new(1.25, 1.75, 2.0, 2.0, 0.25, 0.75);
        let expected: Vec<usize> = [(1, 2, 0), (1, 2, 1), (2, 2, 0), (2, 2, 1)]
            .into_iter()
            .map(|(x, y, z)| s.flat_index(GridPoint::new(x, y, z)).unwrap())
            .collect();
        assert_eq!(voxel_aabb_list(s, aab, true), expected);
    }

    #[test]
    fn aabb_list_clipped_to_grid() {
        let s = size(2);
        let aab = Aab::new(-5.0, 0.5, -5.0, 0.5, -5.0, 10.0);
        assert_eq!(voxel_aabb_list(s, aab, true).len(), 8);
        let outside = Aab::new(3.0, 4.0, 3.0, 4.0, 3.0, 4.0);
        assert_eq!(voxel_aabb_list(s, outside, true), Vec::<usize>::new());
    }

    #[rstest::rstest]
    fn aabb_list_shell(#[values(false, true)] fill: bool) {
        let s = size(5);
        let list = voxel_aabb_list(s, Aab::new(0.0, 4.0, 0.0, 4.0, 0.0, 4.0), fill);
        assert!(list.windows(2).all(|w| w[0] < w[1]));
        let center = s.flat_index(GridPoint::new(2, 2, 2)).unwrap();
        if fill {
            assert_eq!(list.len(), 125);
            assert!(list.contains(&center));
        } else {
            assert_eq!(list.len(), 125 - 27);
            assert!(!list.contains(&center));
        }
    }

    #[test]
    fn sphere_list_surface_only() {
        let s = size(8);
        let center = FreePoint::new(4.0, 4.0, 4.0);
        let list = voxel_sphere_list(s, center, 3.0, false);
        assert!(!list.is_empty());
        for &i in &list {
            let d = (voxel_center(s.point_of(i).unwrap()) - center).length();
            assert!((d - 3.0).abs() < VOXEL_ERR_UNITS, "{d}");
        }
        assert!(!list.contains(&s.flat_index(GridPoint::new(3, 3, 3)).unwrap()));
    }

    #[test]
    fn sphere_list_fill_includes_interior() {
        let s = size(8);
        let center = FreePoint::new(4.0, 4.0, 4.0);
        let shell = voxel_sphere_list(s, center, 3.0, false);
        let filled = voxel_sphere_list(s, center, 3.0, true);
        assert!(filled.contains(&s.flat_index(GridPoint::new(3, 3, 3)).unwrap()));
        assert!(shell.iter().all(|i| filled.contains(i)));
        assert!(filled.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sphere_list_negative_radius() {
        assert_eq!(
            voxel_sphere_list(size(3), FreePoint::new(1.0, 1.0, 1.0), -1.0, true),
            Vec::<usize>::new()
        );
    }

    #[test]
    fn voxel_center_and_aab() {
        let p = GridPoint::new(2, 0, 1);
        assert_eq!(voxel_center(p), FreePoint::new(2.5, 0.5, 1.5));
        assert_eq!(voxel_aab(p), Aab::new(2.0, 3.0, 0.0, 1.0, 1.0, 2.0));
    }
}
