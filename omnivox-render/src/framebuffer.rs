//! Full-grid colour buffers that scenes render into.

use core::fmt;
use std::sync::Arc;

use omnivox_base::math::{GridPoint, GridSize, Rgb};

use crate::Flaws;

mod cpu;
pub use cpu::CpuFramebuffer;
mod kernel;
pub use kernel::{BufferId, GpuBuffer, KernelDevice, SoftwareKernelDevice};

/// How a colour drawn into a framebuffer combines with the colour already there.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[expect(clippy::exhaustive_enums)]
pub enum BlendMode {
    /// The new colour replaces the old.
    #[default]
    Overwrite,
    /// The colours are summed, and each channel clamped to 1.
    Additive,
}

/// A colour for every voxel of a grid, stored either in host memory or on a
/// [`KernelDevice`].
///
/// Per-voxel operations are only available on CPU framebuffers, and compositing only on GPU
/// framebuffers. Requesting an operation the framebuffer does not support, or combining
/// framebuffers of different grid sizes, logs an error and does nothing except record
/// [`Flaws::INVALID_OPERATION`], which can be collected with [`Framebuffer::take_flaws()`].
pub struct Framebuffer {
    grid: GridSize,
    storage: Storage,
    flaws: Flaws,
}

enum Storage {
    Cpu(CpuFramebuffer),
    Gpu(GpuBuffer),
}

impl Framebuffer {
    /// Creates a black framebuffer in host memory.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new_cpu(grid: GridSize) -> Self {
        Self {
            grid,
            storage: Storage::Cpu(CpuFramebuffer::new(grid)),
            flaws: Flaws::empty(),
        }
    }

    /// Creates a black framebuffer on `device`.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new_gpu(grid: GridSize, device: &Arc<dyn KernelDevice>) -> Self {
        Self {
            grid,
            storage: Storage::Gpu(GpuBuffer::filled(device, grid.voxel_count(), Rgb::ZERO)),
            flaws: Flaws::empty(),
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Returns whether this framebuffer is stored on a [`KernelDevice`].
    #[inline]
    pub fn is_gpu(&self) -> bool {
        matches!(self.storage, Storage::Gpu(_))
    }

    /// The CPU framebuffer, if this is one.
    #[inline]
    pub fn as_cpu(&self) -> Option<&CpuFramebuffer> {
        match &self.storage {
            Storage::Cpu(cpu) => Some(cpu),
            Storage::Gpu(_) => None,
        }
    }

    /// The CPU framebuffer, if this is one, for drawing with its helpers.
    #[inline]
    pub fn as_cpu_mut(&mut self) -> Option<&mut CpuFramebuffer> {
        match &mut self.storage {
            Storage::Cpu(cpu) => Some(cpu),
            Storage::Gpu(_) => None,
        }
    }

    /// The device buffer, if this is a GPU framebuffer.
    #[inline]
    pub fn gpu_buffer(&self) -> Option<&GpuBuffer> {
        match &self.storage {
            Storage::Cpu(_) => None,
            Storage::Gpu(buffer) => Some(buffer),
        }
    }

    /// Copies all voxel colours to host memory, in flat index order.
    ///
    /// Returns black if a device buffer could not be read.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn to_colours(&self) -> Vec<Rgb> {
        match &self.storage {
            Storage::Cpu(cpu) => cpu.voxels().to_vec(),
            Storage::Gpu(buffer) => buffer
                .read_back()
                .unwrap_or_else(|| vec![Rgb::ZERO; self.grid.voxel_count()]),
        }
    }

    /// Replaces the colour of one voxel of a CPU framebuffer.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn set_voxel(&mut self, cube: GridPoint, colour: Rgb) {
        match &mut self.storage {
            Storage::Cpu(cpu) => cpu.set_voxel(cube, colour),
            Storage::Gpu(_) => self.violation(format_args!("set_voxel on a GPU framebuffer")),
        }
    }

    /// Adds to the colour of one voxel of a CPU framebuffer, clamping the result.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn add_to_voxel(&mut self, cube: GridPoint, colour: Rgb) {
        match &mut self.storage {
            Storage::Cpu(cpu) => cpu.add_to_voxel(cube, colour),
            Storage::Gpu(_) => self.violation(format_args!("add_to_voxel on a GPU framebuffer")),
        }
    }

    /// Sets every voxel to `colour`.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn clear(&mut self, colour: Rgb) {
        match &mut self.storage {
            Storage::Cpu(cpu) => cpu.clear(colour),
            Storage::Gpu(buffer) => {
                *buffer = GpuBuffer::filled(buffer.device(), buffer.len(), colour.clamp());
            }
        }
    }

    /// Multiplies every voxel by `factor`, clamping the result.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn multiply(&mut self, factor: f32) {
        let replacement = match &mut self.storage {
            Storage::Cpu(cpu) => {
                cpu.multiply(factor);
                return;
            }
            Storage::Gpu(buffer) => buffer.multiply(factor),
        };
        self.replace_gpu(replacement, "multiply");
    }

    /// Blends every voxel of `other` into this framebuffer.
    ///
    /// Either framebuffer may be CPU or GPU; transfers between them are made as needed.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn draw_framebuffer(&mut self, other: &Framebuffer, mode: BlendMode) {
        let grid = self.grid;
        if other.grid != grid {
            self.violation(format_args!(
                "draw_framebuffer from grid {:?} into grid {grid:?}",
                other.grid
            ));
            return;
        }
        let replacement = match (&mut self.storage, &other.storage) {
            (Storage::Cpu(target), Storage::Cpu(source)) => {
                target.draw_colours(source.voxels(), mode);
                return;
            }
            (Storage::Cpu(target), Storage::Gpu(source)) => {
                if let Some(colours) = source.read_back() {
                    target.draw_colours(&colours, mode);
                    return;
                }
                None
            }
            (Storage::Gpu(target), Storage::Cpu(source)) => {
                let uploaded = GpuBuffer::upload(target.device(), source.voxels());
                match mode {
                    BlendMode::Overwrite => Some(uploaded),
                    BlendMode::Additive => target.add(&uploaded),
                }
            }
            (Storage::Gpu(target), Storage::Gpu(source)) => match mode {
                BlendMode::Overwrite => source.copy(),
                BlendMode::Additive => target.add(source),
            },
        };
        self.replace_gpu(replacement, "draw_framebuffer");
    }

    /// Replaces the contents of this GPU framebuffer with `a * (1 - alpha) + b * alpha`,
    /// where `alpha` is clamped to `0.0..=1.0`.
    ///
    /// All three framebuffers must be GPU framebuffers of the same grid size.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn composite(&mut self, a: &Framebuffer, b: &Framebuffer, alpha: f32) {
        let (Some(a_buffer), Some(b_buffer)) = (a.gpu_buffer(), b.gpu_buffer()) else {
            self.violation(format_args!("composite with a CPU framebuffer as input"));
            return;
        };
        if !self.is_gpu() {
            self.violation(format_args!("composite into a CPU framebuffer"));
            return;
        }
        let grid = self.grid;
        if a.grid != grid || b.grid != grid {
            self.violation(format_args!(
                "composite of grids {:?} and {:?} into grid {grid:?}",
                a.grid, b.grid
            ));
            return;
        }
        let alpha = if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        };
        let replacement = b_buffer.combine(a_buffer, alpha);
        self.replace_gpu(replacement, "composite");
    }

    /// Returns the flaws recorded since the last call, and forgets them.
    #[inline]
    pub fn take_flaws(&mut self) -> Flaws {
        core::mem::take(&mut self.flaws)
    }

    pub(crate) fn add_flaws(&mut self, flaws: Flaws) {
        self.flaws |= flaws;
    }

    /// Installs the result of a device operation, or records its failure.
    fn replace_gpu(&mut self, replacement: Option<GpuBuffer>, operation: &str) {
        match replacement {
            Some(new) if self.is_gpu() => self.storage = Storage::Gpu(new),
            _ => self.violation(format_args!("{operation} failed on device buffers")),
        }
    }

    fn violation(&mut self, message: fmt::Arguments<'_>) {
        log::error!("invalid framebuffer operation: {message}");
        self.flaws |= Flaws::INVALID_OPERATION;
    }
}

impl From<CpuFramebuffer> for Framebuffer {
    #[inline]
    fn from(cpu: CpuFramebuffer) -> Self {
        Self {
            grid: cpu.grid(),
            storage: Storage::Cpu(cpu),
            flaws: Flaws::empty(),
        }
    }
}

impl fmt::Debug for Framebuffer {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ds = f.debug_struct("Framebuffer");
        ds.field("grid", &self.grid);
        match &self.storage {
            Storage::Cpu(cpu) => ds.field("cpu", cpu),
            Storage::Gpu(buffer) => ds.field("gpu", buffer),
        };
        ds.field("flaws", &self.flaws).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn grid() -> GridSize {
        GridSize::new(2).unwrap()
    }

    fn device() -> Arc<dyn KernelDevice> {
        Arc::new(SoftwareKernelDevice::new())
    }

    fn filled(gpu: Option<&Arc<dyn KernelDevice>>, colour: Rgb) -> Framebuffer {
        let mut fb = match gpu {
            Some(device) => Framebuffer::new_gpu(grid(), device),
            None => Framebuffer::new_cpu(grid()),
        };
        fb.clear(colour);
        fb
    }

    #[rstest]
    fn additive_blend_clamps(#[values(false, true)] target_gpu: bool, #[values(false, true)] source_gpu: bool) {
        let device = device();
        let mut target = filled(target_gpu.then_some(&device), Rgb::new(0.6, 0.0, 0.0));
        let source = filled(source_gpu.then_some(&device), Rgb::new(0.6, 0.0, 0.0));
        target.draw_framebuffer(&source, BlendMode::Additive);
        assert_eq!(target.to_colours(), vec![Rgb::new(1.0, 0.0, 0.0); 8]);
        assert_eq!(target.take_flaws(), Flaws::empty());
    }

    #[rstest]
    fn overwrite(#[values(false, true)] target_gpu: bool, #[values(false, true)] source_gpu: bool) {
        let device = device();
        let mut target = filled(target_gpu.then_some(&device), Rgb::ONE);
        let source = filled(source_gpu.then_some(&device), Rgb::new(0.0, 0.25, 0.0));
        target.draw_framebuffer(&source, BlendMode::Overwrite);
        assert_eq!(target.to_colours(), vec![Rgb::new(0.0, 0.25, 0.0); 8]);
    }

    #[test]
    fn composite_boundaries() {
        let device = device();
        let a = filled(Some(&device), Rgb::new(1.0, 0.0, 0.25));
        let b = filled(Some(&device), Rgb::new(0.0, 1.0, 0.75));
        let mut out = Framebuffer::new_gpu(grid(), &device);

        out.composite(&a, &b, 0.0);
        assert_eq!(out.to_colours(), a.to_colours());
        out.composite(&a, &b, 1.0);
        assert_eq!(out.to_colours(), b.to_colours());
        out.composite(&a, &b, 0.5);
        assert_eq!(out.to_colours(), vec![Rgb::new(0.5, 0.5, 0.5); 8]);
        assert_eq!(out.take_flaws(), Flaws::empty());
        assert_eq!(device.live_buffers(), 3);
    }

    #[test]
    fn contract_violations_are_no_ops() {
        let device = device();
        let mut gpu = filled(Some(&device), Rgb::ZERO);
        gpu.set_voxel(point3(0, 0, 0), Rgb::ONE);
        gpu.add_to_voxel(point3(0, 0, 0), Rgb::ONE);
        assert_eq!(gpu.to_colours(), vec![Rgb::ZERO; 8]);
        assert_eq!(gpu.take_flaws(), Flaws::INVALID_OPERATION);
        assert_eq!(gpu.take_flaws(), Flaws::empty());

        let mut cpu = filled(None, Rgb::ZERO);
        let other = filled(None, Rgb::ONE);
        cpu.composite(&other, &other, 0.5);
        assert_eq!(cpu.to_colours(), vec![Rgb::ZERO; 8]);
        assert_eq!(cpu.take_flaws(), Flaws::INVALID_OPERATION);

        let big = Framebuffer::new_cpu(GridSize::new(3).unwrap());
        cpu.draw_framebuffer(&big, BlendMode::Overwrite);
        assert_eq!(cpu.take_flaws(), Flaws::INVALID_OPERATION);
    }

    #[test]
    fn gpu_framebuffer_does_not_leak() {
        let device = device();
        let mut fb = Framebuffer::new_gpu(grid(), &device);
        let cpu = filled(None, Rgb::new(0.25, 0.0, 0.0));
        for _ in 0..4 {
            fb.clear(Rgb::ZERO);
            fb.draw_framebuffer(&cpu, BlendMode::Additive);
            fb.multiply(2.0);
        }
        assert_eq!(device.live_buffers(), 1);
        assert_eq!(fb.to_colours(), vec![Rgb::new(0.5, 0.0, 0.0); 8]);
        drop(fb);
        assert_eq!(device.live_buffers(), 0);
    }
}
