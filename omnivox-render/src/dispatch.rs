//! Spreading per-voxel lighting work across threads.

use core::fmt;
use core::num::NonZeroUsize;
use core::ops::Range;
use std::sync::Arc;

use futures_util::future::join_all;
use omnivox_base::math::Rgb;

use crate::{BlendMode, CpuFramebuffer, Flaws, Framebuffer, SceneSnapshot};

/// Splits the work of lighting a [`SceneSnapshot`] into contiguous chunks, evaluates them
/// (on a thread pool, if the `auto-threads` feature is enabled), and adds the results
/// into a [`Framebuffer`].
pub struct Dispatcher {
    chunks: NonZeroUsize,
    #[cfg(feature = "auto-threads")]
    pool: Option<rayon::ThreadPool>,
}

/// Statistics about a rendered frame.
///
/// The [`Default`] value is the zero value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct FrameInfo {
    /// Number of voxels that were lit.
    pub voxels: usize,
    /// Number of chunks the work was divided into.
    pub chunks: usize,
    /// Deficiencies of the frame.
    pub flaws: Flaws,
}

impl FrameInfo {
    /// A frame in which nothing was lit, but which has the given flaws.
    #[inline]
    pub fn with_flaws(flaws: Flaws) -> Self {
        Self {
            flaws,
            ..Self::default()
        }
    }
}

impl core::ops::Add for FrameInfo {
    type Output = Self;
    #[inline]
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}
impl core::ops::AddAssign<FrameInfo> for FrameInfo {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.voxels += other.voxels;
        self.chunks += other.chunks;
        self.flaws |= other.flaws;
    }
}
impl core::iter::Sum for FrameInfo {
    #[inline]
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        let mut sum = Self::default();
        for part in iter {
            sum += part;
        }
        sum
    }
}

impl fmt::Display for FrameInfo {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let &Self {
            voxels,
            chunks,
            flaws,
        } = self;
        write!(f, "{voxels} voxels in {chunks} chunks")?;
        if !flaws.is_empty() {
            write!(f, " ({flaws})")?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

impl Dispatcher {
    /// Creates a dispatcher that divides each frame into `threads` chunks, or as many as
    /// the machine has available parallelism if [`None`].
    ///
    /// If the `auto-threads` feature is enabled, a thread pool of that size is started. If
    /// the pool cannot be started, chunks are evaluated on the calling thread instead.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(threads: Option<NonZeroUsize>) -> Self {
        let chunks = threads
            .or_else(|| std::thread::available_parallelism().ok())
            .unwrap_or(NonZeroUsize::MIN);

        #[cfg(feature = "auto-threads")]
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(chunks.get())
            .thread_name(|i| format!("omnivox-light-{i}"))
            .panic_handler(|_| log::warn!("a lighting worker panicked"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(error) => {
                log::warn!("could not start lighting thread pool, using calling thread: {error}");
                None
            }
        };

        Self {
            chunks,
            #[cfg(feature = "auto-threads")]
            pool,
        }
    }

    /// Number of chunks each frame's work is divided into, at most.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.get()
    }

    /// Lights every work item of `snapshot` and adds the results into `target`.
    ///
    /// Completes only once every chunk has either reported its results or been lost; lost
    /// chunks are reported as [`Flaws::UNFINISHED`].
    #[allow(clippy::missing_inline_in_public_items)]
    pub async fn dispatch(
        &self,
        snapshot: Arc<SceneSnapshot>,
        target: &mut Framebuffer,
    ) -> FrameInfo {
        let mut flaws = snapshot.flaws();
        if snapshot.grid() != target.grid() {
            log::error!(
                "cannot render snapshot of grid {:?} into framebuffer of grid {:?}",
                snapshot.grid(),
                target.grid()
            );
            return FrameInfo::with_flaws(flaws | Flaws::INVALID_OPERATION);
        }

        let ranges = chunk_ranges(snapshot.work_items().len(), self.chunk_count());
        let results = self.run_chunks(&snapshot, &ranges).await;

        let mut scratch = None;
        let deposit: &mut CpuFramebuffer = match target.as_cpu_mut() {
            Some(cpu) => cpu,
            None => scratch.insert(CpuFramebuffer::new(snapshot.grid())),
        };
        let mut voxels = 0;
        for (range, result) in ranges.iter().zip(results) {
            let Some(colours) = result else {
                log::warn!("lighting chunk {range:?} was lost");
                flaws |= Flaws::UNFINISHED;
                continue;
            };
            for (item, colour) in snapshot.work_items()[range.clone()].iter().zip(colours) {
                deposit.add_at_index(item.index(), colour);
            }
            voxels += range.len();
        }
        if let Some(scratch) = scratch {
            target.draw_framebuffer(&Framebuffer::from(scratch), BlendMode::Additive);
        }

        let info = FrameInfo {
            voxels,
            chunks: ranges.len(),
            flaws,
        };
        log::trace!("dispatched frame: {info}");
        info
    }

    /// Evaluates each range of work items, returning [`None`] for chunks that were lost.
    async fn run_chunks(
        &self,
        snapshot: &Arc<SceneSnapshot>,
        ranges: &[Range<usize>],
    ) -> Vec<Option<Vec<Rgb>>> {
        #[cfg(feature = "auto-threads")]
        if let Some(pool) = &self.pool {
            let receivers = ranges.iter().map(|range| {
                let (sender, receiver) = futures_channel::oneshot::channel();
                let snapshot = Arc::clone(snapshot);
                let range = range.clone();
                pool.spawn(move || {
                    // If the receiver is gone, nobody wants the result.
                    let _ = sender.send(shade_chunk(&snapshot, range));
                });
                receiver
            });
            return join_all(receivers)
                .await
                .into_iter()
                .map(Result::ok)
                .collect();
        }

        let inline = ranges
            .iter()
            .map(|range| async move { Some(shade_chunk(snapshot, range.clone())) });
        join_all(inline).await
    }
}

impl fmt::Debug for Dispatcher {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ds = f.debug_struct("Dispatcher");
        ds.field("chunks", &self.chunks);
        #[cfg(feature = "auto-threads")]
        ds.field("threaded", &self.pool.is_some());
        ds.finish()
    }
}

fn shade_chunk(snapshot: &SceneSnapshot, range: Range<usize>) -> Vec<Rgb> {
    snapshot.work_items()[range]
        .iter()
        .map(|item| snapshot.shade_voxel(item))
        .collect()
}

/// Divides `0..len` into `min(chunks, len)` contiguous, nonempty ranges whose lengths
/// differ by at most one.
fn chunk_ranges(len: usize, chunks: usize) -> Vec<Range<usize>> {
    let count = chunks.min(len);
    (0..count)
        .map(|i| (i * len / count)..((i + 1) * len / count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Light, Material, Renderable, Scene, VoxelBox, VoxelPoint};
    use euclid::point3;
    use omnivox_base::math::{Aab, GridSize};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 4, vec![])]
    #[case(3, 4, vec![0..1, 1..2, 2..3])]
    #[case(10, 3, vec![0..3, 3..6, 6..10])]
    #[case(5, 0, vec![])]
    #[case(8, 1, vec![0..8])]
    fn ranges(#[case] len: usize, #[case] chunks: usize, #[case] expected: Vec<Range<usize>>) {
        assert_eq!(chunk_ranges(len, chunks), expected);
    }

    fn scene() -> Scene {
        let mut scene = Scene::new(GridSize::new(6).unwrap());
        scene.insert(Renderable::new(
            VoxelBox::new(Aab::new(1.0, 4.0, 0.0, 2.0, 1.0, 5.0)),
            Material::lambert(Rgb::new(0.5, 0.5, 1.0)),
        ));
        scene.insert(Renderable::new(
            VoxelPoint::new(point3(5.5, 5.5, 5.5)),
            Material::glowing(Rgb::ONE),
        ));
        scene.insert_light(Light::point(point3(3.0, 5.0, 3.0), Rgb::ONE));
        scene.insert_light(Light::ambient(Rgb::new(0.1, 0.1, 0.1)));
        scene
    }

    #[rstest]
    #[tokio::test]
    async fn chunking_does_not_change_result(#[values(1, 2, 3, 7)] threads: usize) {
        let snapshot = scene().snapshot();
        let single = Dispatcher::new(NonZeroUsize::new(1));
        let multi = Dispatcher::new(NonZeroUsize::new(threads));

        let mut expected = Framebuffer::new_cpu(snapshot.grid());
        single.dispatch(Arc::clone(&snapshot), &mut expected).await;
        let mut actual = Framebuffer::new_cpu(snapshot.grid());
        let info = multi.dispatch(Arc::clone(&snapshot), &mut actual).await;

        assert_eq!(actual.to_colours(), expected.to_colours());
        assert_eq!(info.voxels, snapshot.work_items().len());
        assert_eq!(info.chunks, threads.min(info.voxels));
        assert_eq!(info.flaws, Flaws::empty());
    }

    #[tokio::test]
    async fn dispatch_into_gpu_framebuffer() {
        let snapshot = scene().snapshot();
        let dispatcher = Dispatcher::new(NonZeroUsize::new(2));
        let device: Arc<dyn crate::KernelDevice> = Arc::new(crate::SoftwareKernelDevice::new());
        let mut cpu = Framebuffer::new_cpu(snapshot.grid());
        let mut gpu = Framebuffer::new_gpu(snapshot.grid(), &device);
        dispatcher.dispatch(Arc::clone(&snapshot), &mut cpu).await;
        dispatcher.dispatch(snapshot, &mut gpu).await;
        assert_eq!(gpu.to_colours(), cpu.to_colours());
        assert_eq!(device.live_buffers(), 1);
    }

    #[tokio::test]
    async fn grid_mismatch_is_rejected() {
        let snapshot = scene().snapshot();
        let mut target = Framebuffer::new_cpu(GridSize::new(2).unwrap());
        let info = Dispatcher::new(None).dispatch(snapshot, &mut target).await;
        assert_eq!(info.flaws, Flaws::INVALID_OPERATION);
        assert_eq!(info.voxels, 0);
    }

    #[test]
    fn frame_info_sum() {
        let total: FrameInfo = [
            FrameInfo {
                voxels: 3,
                chunks: 1,
                flaws: Flaws::empty(),
            },
            FrameInfo {
                voxels: 4,
                chunks: 2,
                flaws: Flaws::UNFINISHED,
            },
        ]
        .into_iter()
        .sum();
        assert_eq!(
            total,
            FrameInfo {
                voxels: 7,
                chunks: 3,
                flaws: Flaws::UNFINISHED
            }
        );
        assert_eq!(total.to_string(), "7 voxels in 3 chunks (UNFINISHED)");
    }
}
