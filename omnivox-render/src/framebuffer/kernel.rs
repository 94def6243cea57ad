//! Facade over a device that stores colour buffers and runs numeric kernels on them.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use omnivox_base::math::Rgb;

/// Identifies a buffer owned by a [`KernelDevice`].
///
/// Ids are not reused: once a buffer is released, its id stays invalid even if the device
/// reuses the storage.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BufferId {
    index: u32,
    generation: u32,
}

/// A device that owns colour buffers and transforms them with numeric kernels.
///
/// Every transforming operation produces a new buffer and leaves its inputs unchanged;
/// releasing buffers that are no longer needed is the caller's responsibility. Most code
/// should use [`GpuBuffer`], which does this automatically.
///
/// Operations given an id that is not live, or buffers of different lengths, log the
/// problem and return [`None`] or `false`.
pub trait KernelDevice: Send + Sync + fmt::Debug {
    /// Creates a buffer of `len` voxels all set to `colour`.
    fn create_filled(&self, len: usize, colour: Rgb) -> BufferId;

    /// Creates a buffer holding a copy of `data`.
    fn upload(&self, data: &[Rgb]) -> BufferId;

    /// Copies a buffer's contents back to host memory.
    fn read_back(&self, id: BufferId) -> Option<Vec<Rgb>>;

    /// Returns a new buffer containing `a + b`, clamped to `0.0..=1.0`.
    fn add(&self, a: BufferId, b: BufferId) -> Option<BufferId>;

    /// Returns a new buffer with the same contents as `id`.
    fn copy(&self, id: BufferId) -> Option<BufferId>;

    /// Returns a new buffer containing `a * alpha + b * (1 - alpha)`.
    fn combine(&self, a: BufferId, b: BufferId, alpha: f32) -> Option<BufferId>;

    /// Returns a new buffer containing `id * factor`, clamped to `0.0..=1.0`.
    fn multiply(&self, id: BufferId, factor: f32) -> Option<BufferId>;

    /// Frees a buffer. Returns whether it was live.
    fn release(&self, id: BufferId) -> bool;

    /// Number of buffers created and not yet released.
    fn live_buffers(&self) -> usize;
}

// -------------------------------------------------------------------------------------------------

/// Owning handle to a buffer on a [`KernelDevice`], released when dropped.
///
/// Transforming operations return a new handle; replacing the old handle with it releases
/// the old buffer.
pub struct GpuBuffer {
    id: BufferId,
    len: usize,
    device: Arc<dyn KernelDevice>,
}

impl GpuBuffer {
    /// Creates a buffer of `len` voxels all set to `colour`.
    #[inline]
    pub fn filled(device: &Arc<dyn KernelDevice>, len: usize, colour: Rgb) -> Self {
        Self {
            id: device.create_filled(len, colour),
            len,
            device: Arc::clone(device),
        }
    }

    /// Creates a buffer holding a copy of `data`.
    #[inline]
    pub fn upload(device: &Arc<dyn KernelDevice>, data: &[Rgb]) -> Self {
        Self {
            id: device.upload(data),
            len: data.len(),
            device: Arc::clone(device),
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Number of voxels in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn device(&self) -> &Arc<dyn KernelDevice> {
        &self.device
    }

    /// Copies the contents back to host memory.
    #[inline]
    pub fn read_back(&self) -> Option<Vec<Rgb>> {
        self.device.read_back(self.id)
    }

    /// Returns a new buffer containing `self + other`, clamped.
    #[inline]
    pub fn add(&self, other: &GpuBuffer) -> Option<GpuBuffer> {
        let id = self.device.add(self.id, self.compatible(other)?.id)?;
        Some(self.wrap(id))
    }

    /// Returns a new buffer with the same contents.
    #[inline]
    pub fn copy(&self) -> Option<GpuBuffer> {
        let id = self.device.copy(self.id)?;
        Some(self.wrap(id))
    }

    /// Returns a new buffer containing `self * alpha + other * (1 - alpha)`.
    #[inline]
    pub fn combine(&self, other: &GpuBuffer, alpha: f32) -> Option<GpuBuffer> {
        let id = self
            .device
            .combine(self.id, self.compatible(other)?.id, alpha)?;
        Some(self.wrap(id))
    }

    /// Returns a new buffer containing `self * factor`, clamped.
    #[inline]
    pub fn multiply(&self, factor: f32) -> Option<GpuBuffer> {
        let id = self.device.multiply(self.id, factor)?;
        Some(self.wrap(id))
    }

    fn wrap(&self, id: BufferId) -> GpuBuffer {
        GpuBuffer {
            id,
            len: self.len,
            device: Arc::clone(&self.device),
        }
    }

    fn compatible<'a>(&self, other: &'a GpuBuffer) -> Option<&'a GpuBuffer> {
        if Arc::ptr_eq(&self.device, &other.device) {
            Some(other)
        } else {
            log::error!("buffers {:?} and {:?} belong to different devices", self.id, other.id);
            None
        }
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.device.release(self.id);
    }
}

impl fmt::Debug for GpuBuffer {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("id", &self.id)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// [`KernelDevice`] that runs its kernels on the CPU.
///
/// Useful where no accelerator is available, and for tests, since it keeps exact count of
/// the buffers it holds.
#[derive(Debug, Default)]
pub struct SoftwareKernelDevice {
    arena: Mutex<Arena>,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    data: Option<Box<[Rgb]>>,
}

impl Arena {
    fn insert(&mut self, data: Box<[Rgb]>) -> BufferId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            BufferId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                data: Some(data),
            });
            BufferId {
                index,
                generation: 0,
            }
        }
    }

    fn get(&self, id: BufferId) -> Option<&[Rgb]> {
        let found = self
            .slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_deref());
        if found.is_none() {
            log::warn!("use of stale or unknown buffer {id:?}");
        }
        found
    }

    fn remove(&mut self, id: BufferId) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.data.is_some() => {
                slot.data = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
                true
            }
            _ => {
                log::warn!("release of stale or unknown buffer {id:?}");
                false
            }
        }
    }

    /// Applies `f` to corresponding voxels of two equal-length buffers.
    fn zip_with(
        &mut self,
        a: BufferId,
        b: BufferId,
        f: impl Fn(Rgb, Rgb) -> Rgb,
    ) -> Option<BufferId> {
        let (a_data, b_data) = (self.get(a)?, self.get(b)?);
        if a_data.len() != b_data.len() {
            log::error!(
                "buffer length mismatch: {a:?} has {} voxels, {b:?} has {}",
                a_data.len(),
                b_data.len()
            );
            return None;
        }
        let result = a_data.iter().zip(b_data).map(|(&x, &y)| f(x, y)).collect();
        Some(self.insert(result))
    }

    fn map(&mut self, id: BufferId, f: impl Fn(Rgb) -> Rgb) -> Option<BufferId> {
        let result = self.get(id)?.iter().map(|&x| f(x)).collect();
        Some(self.insert(result))
    }
}

impl SoftwareKernelDevice {
    #[allow(missing_docs)]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn arena(&self) -> MutexGuard<'_, Arena> {
        // Arena operations cannot panic partway through, so poisoning is harmless.
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KernelDevice for SoftwareKernelDevice {
    fn create_filled(&self, len: usize, colour: Rgb) -> BufferId {
        self.arena().insert(vec![colour; len].into_boxed_slice())
    }

    fn upload(&self, data: &[Rgb]) -> BufferId {
        self.arena().insert(data.into())
    }

    fn read_back(&self, id: BufferId) -> Option<Vec<Rgb>> {
        self.arena().get(id).map(<[Rgb]>::to_vec)
    }

    fn add(&self, a: BufferId, b: BufferId) -> Option<BufferId> {
        self.arena().zip_with(a, b, |x, y| (x + y).clamp())
    }

    fn copy(&self, id: BufferId) -> Option<BufferId> {
        self.arena().map(id, |x| x)
    }

    fn combine(&self, a: BufferId, b: BufferId, alpha: f32) -> Option<BufferId> {
        self.arena()
            .zip_with(a, b, |x, y| x * alpha + y * (1.0 - alpha))
    }

    fn multiply(&self, id: BufferId, factor: f32) -> Option<BufferId> {
        self.arena().map(id, |x| (x * factor).clamp())
    }

    fn release(&self, id: BufferId) -> bool {
        self.arena().remove(id)
    }

    fn live_buffers(&self) -> usize {
        self.arena().live
    }
}
