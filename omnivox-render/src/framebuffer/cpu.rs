use omnivox_base::math::{
    Aab, FreeCoordinate, FreePoint, GridPoint, GridSize, Rgb, voxel_aabb_list, voxel_sphere_list,
};

use crate::BlendMode;

/// A colour for every voxel of a grid, stored in host memory.
///
/// Every stored colour has each channel in `0.0..=1.0`.
#[derive(Clone, PartialEq)]
pub struct CpuFramebuffer {
    grid: GridSize,
    voxels: Box<[Rgb]>,
}

impl CpuFramebuffer {
    /// Creates a black framebuffer.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(grid: GridSize) -> Self {
        Self {
            grid,
            voxels: vec![Rgb::ZERO; grid.voxel_count()].into_boxed_slice(),
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// All voxel colours, in flat index order.
    #[inline]
    pub fn voxels(&self) -> &[Rgb] {
        &self.voxels
    }

    /// Returns the colour of the voxel at `cube`, or [`None`] if it is outside the grid.
    #[inline]
    pub fn get(&self, cube: GridPoint) -> Option<Rgb> {
        self.grid.flat_index(cube).map(|i| self.voxels[i])
    }

    /// Replaces the colour of a voxel. Coordinates outside the grid are ignored.
    #[inline]
    pub fn set_voxel(&mut self, cube: GridPoint, colour: Rgb) {
        if let Some(index) = self.grid.flat_index(cube) {
            self.voxels[index] = colour.clamp();
        }
    }

    /// Adds to the colour of a voxel, clamping the result. Coordinates outside the grid
    /// are ignored.
    #[inline]
    pub fn add_to_voxel(&mut self, cube: GridPoint, colour: Rgb) {
        if let Some(index) = self.grid.flat_index(cube) {
            self.add_at_index(index, colour);
        }
    }

    pub(crate) fn add_at_index(&mut self, index: usize, colour: Rgb) {
        if let Some(voxel) = self.voxels.get_mut(index) {
            *voxel = (*voxel + colour).clamp();
        }
    }

    fn blend_at_index(&mut self, index: usize, colour: Rgb, mode: BlendMode) {
        match mode {
            BlendMode::Overwrite => {
                if let Some(voxel) = self.voxels.get_mut(index) {
                    *voxel = colour.clamp();
                }
            }
            BlendMode::Additive => self.add_at_index(index, colour),
        }
    }

    /// Sets every voxel to `colour`.
    #[inline]
    pub fn clear(&mut self, colour: Rgb) {
        self.voxels.fill(colour.clamp());
    }

    /// Blends `colours`, which must have one entry per voxel, into this framebuffer.
    pub(crate) fn draw_colours(&mut self, colours: &[Rgb], mode: BlendMode) {
        match mode {
            BlendMode::Overwrite => {
                for (voxel, &colour) in self.voxels.iter_mut().zip(colours) {
                    *voxel = colour.clamp();
                }
            }
            BlendMode::Additive => {
                for (voxel, &colour) in self.voxels.iter_mut().zip(colours) {
                    *voxel = (*voxel + colour).clamp();
                }
            }
        }
    }

    /// Multiplies every voxel by `factor`.
    #[inline]
    pub fn multiply(&mut self, factor: f32) {
        for voxel in &mut self.voxels {
            *voxel = (*voxel * factor).clamp();
        }
    }

    /// Draws the voxel containing `point`.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn draw_point(&mut self, point: FreePoint, colour: Rgb, mode: BlendMode) {
        let Some(cube) = point.floor().try_cast::<i32>() else {
            return;
        };
        if let Some(index) = self.grid.flat_index(cube) {
            self.blend_at_index(index, colour, mode);
        }
    }

    /// Draws the voxels overlapping `aab`; only its outer shell unless `fill` is true.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn draw_aab(&mut self, aab: Aab, colour: Rgb, fill: bool, mode: BlendMode) {
        for index in voxel_aabb_list(self.grid, aab, fill) {
            self.blend_at_index(index, colour, mode);
        }
    }

    /// Draws the voxels on the surface of a sphere; also its interior if `fill` is true.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn draw_sphere(
        &mut self,
        center: FreePoint,
        radius: FreeCoordinate,
        colour: Rgb,
        fill: bool,
        mode: BlendMode,
    ) {
        for index in voxel_sphere_list(self.grid, center, radius, fill) {
            self.blend_at_index(index, colour, mode);
        }
    }

    /// Number of voxels that are not black.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn lit_voxel_count(&self) -> usize {
        self.voxels.iter().filter(|c| !c.is_black()).count()
    }
}

// manual impl avoids printing the entire grid
impl core::fmt::Debug for CpuFramebuffer {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpuFramebuffer")
            .field("grid", &self.grid)
            .field("lit", &self.lit_voxel_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use pretty_assertions::assert_eq;

    fn fb() -> CpuFramebuffer {
        CpuFramebuffer::new(GridSize::new(4).unwrap())
    }

    #[test]
    fn additive_clamps() {
        let mut fb = fb();
        fb.clear(Rgb::new(0.6, 0.0, 0.0));
        fb.add_to_voxel(point3(1, 2, 3), Rgb::new(0.6, 0.0, 0.0));
        assert_eq!(fb.get(point3(1, 2, 3)), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(fb.get(point3(0, 0, 0)), Some(Rgb::new(0.6, 0.0, 0.0)));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut fb = fb();
        fb.set_voxel(point3(4, 0, 0), Rgb::ONE);
        fb.add_to_voxel(point3(-1, 0, 0), Rgb::ONE);
        fb.draw_point(point3(0.5, 9.0, 0.5), Rgb::ONE, BlendMode::Overwrite);
        assert_eq!(fb.lit_voxel_count(), 0);
        assert_eq!(fb.get(point3(4, 0, 0)), None);
    }

    #[test]
    fn draw_shapes() {
        let mut fb = fb();
        fb.draw_point(point3(3.9, 0.1, 2.5), Rgb::ONE, BlendMode::Overwrite);
        assert_eq!(fb.get(point3(3, 0, 2)), Some(Rgb::ONE));

        let mut fb = self::fb();
        fb.draw_aab(
            Aab::new(0.0, 4.0, 0.0, 4.0, 0.0, 4.0),
            Rgb::ONE,
            false,
            BlendMode::Additive,
        );
        // Everything but the 2×2×2 core.
        assert_eq!(fb.lit_voxel_count(), 64 - 8);

        let mut fb = self::fb();
        fb.draw_sphere(point3(2.0, 2.0, 2.0), 1.0, Rgb::ONE, true, BlendMode::Overwrite);
        assert!(fb.get(point3(1, 1, 1)).is_some_and(|c| c == Rgb::ONE));
    }

    #[test]
    fn set_voxel_clamps() {
        let mut fb = fb();
        fb.set_voxel(point3(0, 0, 0), Rgb::new(2.0, -1.0, 0.5));
        assert_eq!(fb.get(point3(0, 0, 0)), Some(Rgb::new(1.0, 0.0, 0.5)));
    }
}
