//! Presenting scenes, and crossfading between them when the scene type changes.

use core::mem;
use core::num::NonZeroUsize;
use std::sync::Arc;

use omnivox_base::math::{GridSize, Rgb};

use crate::{
    BlendMode, Dispatcher, FrameInfo, Framebuffer, KernelDevice, SceneContext, SceneOptions,
    VoxelScene,
};

/// Configuration of a [`Compositor`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct CompositorOptions {
    /// Edge length of the voxel grid.
    pub grid_size: GridSize,
    /// Duration in seconds of the crossfade between scenes of different types.
    pub crossfade_time: f64,
    /// Number of lighting threads, or [`None`] to use the available parallelism.
    pub threads: Option<NonZeroUsize>,
}

impl Default for CompositorOptions {
    #[inline]
    fn default() -> Self {
        Self {
            grid_size: GridSize::default(),
            crossfade_time: 1.0,
            threads: None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// State of the transition between the previous scene and the current one.
///
/// The transition is advanced by the [`Compositor`] once per frame, but can be driven
/// independently of rendering.
#[derive(Debug, Default)]
#[non_exhaustive]
pub enum Crossfade {
    /// Only the current scene is shown.
    #[default]
    Idle,
    /// The `previous` scene is being faded out while the current one fades in.
    Fading {
        /// The scene being faded out.
        previous: Box<dyn VoxelScene>,
        /// Seconds since the crossfade began.
        counter: f64,
    },
}

impl Crossfade {
    #[allow(missing_docs)]
    #[inline]
    pub fn is_fading(&self) -> bool {
        matches!(self, Crossfade::Fading { .. })
    }

    /// Starts fading out `outgoing`.
    ///
    /// If a crossfade was already in progress, the scene it was fading out is returned so
    /// that the caller can unload it.
    #[allow(clippy::missing_inline_in_public_items)]
    #[must_use]
    pub fn begin(&mut self, outgoing: Box<dyn VoxelScene>) -> Option<Box<dyn VoxelScene>> {
        match mem::replace(
            self,
            Crossfade::Fading {
                previous: outgoing,
                counter: 0.0,
            },
        ) {
            Crossfade::Idle => None,
            Crossfade::Fading { previous, .. } => Some(previous),
        }
    }

    /// Weight of the current scene, from 0 at the start of a crossfade lasting
    /// `total_time` seconds to 1 at its end and while idle.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn alpha(&self, total_time: f64) -> f32 {
        match *self {
            Crossfade::Idle => 1.0,
            Crossfade::Fading { .. } if total_time <= 0.0 => 1.0,
            Crossfade::Fading { counter, .. } => (counter / total_time).clamp(0.0, 1.0) as f32,
        }
    }

    /// Advances the crossfade by `dt` seconds.
    ///
    /// If the crossfade has now lasted `total_time`, it ends and the outgoing scene is
    /// returned for the caller to unload.
    #[allow(clippy::missing_inline_in_public_items)]
    #[must_use]
    pub fn advance(&mut self, dt: f64, total_time: f64) -> Option<Box<dyn VoxelScene>> {
        let Crossfade::Fading { counter, .. } = self else {
            return None;
        };
        *counter += dt;
        if *counter < total_time {
            return None;
        }
        match mem::take(self) {
            Crossfade::Fading { previous, .. } => Some(previous),
            Crossfade::Idle => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Renders the current scene each frame into an output framebuffer, crossfading from the
/// previous scene whenever the type of scene changes.
///
/// ```
/// # extern crate omnivox_render as omnivox;
/// use std::sync::Arc;
/// use omnivox::{Compositor, CompositorOptions, KernelDevice, SceneOptions, SoftwareKernelDevice};
///
/// let device: Arc<dyn KernelDevice> = Arc::new(SoftwareKernelDevice::new());
/// let mut compositor = Compositor::new(&CompositorOptions::default(), device);
/// compositor.apply_options(SceneOptions::default());
/// let info = pollster::block_on(compositor.render(1.0 / 30.0));
/// assert!(info.voxels > 0);
/// ```
#[derive(Debug)]
pub struct Compositor {
    context: SceneContext,
    device: Arc<dyn KernelDevice>,
    cpu_previous: Framebuffer,
    cpu_current: Framebuffer,
    gpu_previous: Framebuffer,
    gpu_current: Framebuffer,
    gpu_output: Framebuffer,
    output: Framebuffer,
    current: Option<Box<dyn VoxelScene>>,
    crossfade: Crossfade,
    crossfade_time: f64,
}

impl Compositor {
    /// Creates a compositor with no scene, allocating its framebuffers on `device`.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn new(options: &CompositorOptions, device: Arc<dyn KernelDevice>) -> Self {
        let grid = options.grid_size;
        Self {
            context: SceneContext::new(grid, Arc::new(Dispatcher::new(options.threads))),
            cpu_previous: Framebuffer::new_cpu(grid),
            cpu_current: Framebuffer::new_cpu(grid),
            gpu_previous: Framebuffer::new_gpu(grid, &device),
            gpu_current: Framebuffer::new_gpu(grid, &device),
            gpu_output: Framebuffer::new_gpu(grid, &device),
            output: Framebuffer::new_cpu(grid),
            device,
            current: None,
            crossfade: Crossfade::Idle,
            crossfade_time: options.crossfade_time.max(0.0),
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn context(&self) -> &SceneContext {
        &self.context
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn device(&self) -> &Arc<dyn KernelDevice> {
        &self.device
    }

    /// The most recently rendered frame, a CPU framebuffer.
    #[inline]
    pub fn output(&self) -> &Framebuffer {
        &self.output
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn current_scene(&self) -> Option<&dyn VoxelScene> {
        self.current.as_deref()
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn crossfade(&self) -> &Crossfade {
        &self.crossfade
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn crossfade_time(&self) -> f64 {
        self.crossfade_time
    }

    /// Sets the duration of crossfades. Negative values are treated as zero.
    ///
    /// A crossfade in progress keeps its elapsed time.
    #[inline]
    pub fn set_crossfade_time(&mut self, seconds: f64) {
        self.crossfade_time = seconds.max(0.0);
    }

    /// Loads `scene` and makes it current.
    ///
    /// If the previous scene was of a different type, it is faded out; otherwise it is
    /// unloaded immediately.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn set_scene(&mut self, mut scene: Box<dyn VoxelScene>) {
        scene.load();
        let Some(mut outgoing) = self.current.replace(scene) else {
            return;
        };
        if self.current.as_ref().map(|s| s.kind()) == Some(outgoing.kind()) {
            outgoing.unload();
            return;
        }
        log::debug!("crossfading from {} scene", outgoing.kind());
        if let Some(mut abandoned) = self.crossfade.begin(outgoing) {
            abandoned.unload();
        }
    }

    /// Configures the current scene with `options` if it is of the same type, or switches
    /// to a new scene built from them.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn apply_options(&mut self, options: SceneOptions) {
        if let Some(current) = &mut self.current
            && current.kind() == options.kind()
        {
            current.set_options(&options);
            return;
        }
        let scene = options.build(self.context.clone());
        self.set_scene(scene);
    }

    /// Advances the animation by `dt` seconds and renders a frame into [`Self::output()`].
    #[allow(clippy::missing_inline_in_public_items)]
    pub async fn render(&mut self, dt: f64) -> FrameInfo {
        let Self {
            cpu_previous,
            cpu_current,
            gpu_previous,
            gpu_current,
            gpu_output,
            output,
            current,
            crossfade,
            crossfade_time,
            ..
        } = self;

        output.clear(Rgb::ZERO);
        let Some(current) = current else {
            return FrameInfo::with_flaws(output.take_flaws());
        };

        let alpha = crossfade.alpha(*crossfade_time);
        let mut info = match crossfade {
            Crossfade::Idle if current.renders_to_cpu_only() => {
                current.render(dt, output).await
            }
            Crossfade::Idle => {
                let info = render_layer(&mut **current, dt, cpu_current, gpu_current).await;
                output.draw_framebuffer(gpu_current, BlendMode::Overwrite);
                info
            }
            Crossfade::Fading { previous, .. } => {
                let mut info =
                    render_layer(&mut **previous, dt, cpu_previous, gpu_previous).await;
                info += render_layer(&mut **current, dt, cpu_current, gpu_current).await;
                gpu_output.composite(gpu_previous, gpu_current, alpha);
                output.draw_framebuffer(gpu_output, BlendMode::Overwrite);
                info.flaws |= gpu_output.take_flaws();
                info
            }
        };
        info.flaws |= output.take_flaws();

        if let Some(mut finished) = crossfade.advance(dt, *crossfade_time) {
            log::debug!("crossfade from {} scene finished", finished.kind());
            finished.unload();
        }
        log::trace!("composited frame: {info}");
        info
    }
}

/// Renders `scene` alone into `gpu`, by way of `cpu` if the scene requires it.
async fn render_layer(
    scene: &mut dyn VoxelScene,
    dt: f64,
    cpu: &mut Framebuffer,
    gpu: &mut Framebuffer,
) -> FrameInfo {
    let mut info = if scene.renders_to_cpu_only() {
        cpu.clear(Rgb::ZERO);
        let info = scene.render(dt, cpu).await;
        gpu.draw_framebuffer(cpu, BlendMode::Overwrite);
        info
    } else {
        gpu.clear(Rgb::ZERO);
        scene.render(dt, gpu).await
    };
    info.flaws |= cpu.take_flaws() | gpu.take_flaws();
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FogOptions, FogScene, ShadowOptions, ShadowScene, SoftwareKernelDevice};
    use pretty_assertions::assert_eq;

    fn context() -> SceneContext {
        SceneContext::new(
            GridSize::new(4).unwrap(),
            Arc::new(Dispatcher::new(NonZeroUsize::new(1))),
        )
    }

    fn compositor(crossfade_time: f64) -> (Compositor, Arc<dyn KernelDevice>) {
        let device: Arc<dyn KernelDevice> = Arc::new(SoftwareKernelDevice::new());
        let options = CompositorOptions {
            grid_size: GridSize::new(4).unwrap(),
            crossfade_time,
            threads: NonZeroUsize::new(2),
        };
        (Compositor::new(&options, Arc::clone(&device)), device)
    }

    fn counter(crossfade: &Crossfade) -> Option<f64> {
        match crossfade {
            Crossfade::Idle => None,
            Crossfade::Fading { counter, .. } => Some(*counter),
        }
    }

    #[test]
    fn crossfade_transitions() {
        let mut crossfade = Crossfade::default();
        assert_eq!(crossfade.alpha(1.0), 1.0);
        assert!(crossfade.advance(0.5, 1.0).is_none());

        assert!(crossfade.begin(Box::new(ShadowScene::new(context()))).is_none());
        assert_eq!(crossfade.alpha(1.0), 0.0);
        assert!(crossfade.advance(0.5, 1.0).is_none());
        assert_eq!(crossfade.alpha(1.0), 0.5);

        // Lengthening the crossfade keeps the elapsed time.
        assert_eq!(crossfade.alpha(2.0), 0.25);
        assert_eq!(counter(&crossfade), Some(0.5));

        let finished = crossfade.advance(0.5, 1.0).unwrap();
        assert_eq!(finished.kind(), ShadowScene::KIND);
        assert!(!crossfade.is_fading());
    }

    #[test]
    fn zero_time_crossfade_completes_immediately() {
        let mut crossfade = Crossfade::default();
        assert!(crossfade.begin(Box::new(FogScene::new(context()))).is_none());
        assert_eq!(crossfade.alpha(0.0), 1.0);
        assert!(crossfade.advance(0.0, 0.0).is_some());
    }

    #[test]
    fn begin_while_fading_returns_abandoned_scene() {
        let mut crossfade = Crossfade::default();
        assert!(crossfade.begin(Box::new(FogScene::new(context()))).is_none());
        assert!(crossfade.advance(0.25, 1.0).is_none());
        let abandoned = crossfade.begin(Box::new(ShadowScene::new(context()))).unwrap();
        assert_eq!(abandoned.kind(), FogScene::KIND);
        assert_eq!(counter(&crossfade), Some(0.0));
    }

    #[test]
    fn negative_crossfade_time_is_zero() {
        let (mut compositor, _) = compositor(1.0);
        compositor.set_crossfade_time(-3.0);
        assert_eq!(compositor.crossfade_time(), 0.0);
    }

    #[tokio::test]
    async fn no_scene_renders_black() {
        let (mut compositor, _) = compositor(1.0);
        assert_eq!(compositor.render(0.1).await, FrameInfo::default());
        assert_eq!(compositor.output().as_cpu().unwrap().lit_voxel_count(), 0);
    }

    #[tokio::test]
    async fn same_kind_options_do_not_crossfade() {
        let (mut compositor, _) = compositor(1.0);
        compositor.apply_options(ShadowOptions::default().into());
        compositor.apply_options(
            ShadowOptions {
                point_light_colour: Rgb::new(0.0, 1.0, 0.0),
                ..ShadowOptions::default()
            }
            .into(),
        );
        assert!(!compositor.crossfade().is_fading());
        let info = compositor.render(0.1).await;
        assert!(info.voxels > 0);
        assert_eq!(info.flaws, crate::Flaws::empty());
    }

    #[tokio::test]
    async fn switching_kind_crossfades_then_settles() {
        let (mut compositor, device) = compositor(0.5);
        compositor.apply_options(ShadowOptions::default().into());
        compositor.render(0.1).await;
        assert_eq!(device.live_buffers(), 3);

        compositor.apply_options(FogOptions::default().into());
        assert!(compositor.crossfade().is_fading());
        assert_eq!(compositor.current_scene().map(|s| s.kind()), Some(FogScene::KIND));

        for _ in 0..4 {
            let info = compositor.render(0.25).await;
            assert_eq!(info.flaws, crate::Flaws::empty());
            assert_eq!(device.live_buffers(), 3);
        }
        assert!(!compositor.crossfade().is_fading());
        assert!(compositor.output().as_cpu().unwrap().lit_voxel_count() > 0);
    }
}
