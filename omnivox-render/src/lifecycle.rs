//! The lifecycle shared by all scene types, and their configuration.

use core::fmt;
use std::sync::Arc;

use futures_core::future::BoxFuture;
use omnivox_base::math::GridSize;

use crate::scenes::{FogOptions, FogScene, ShadowOptions, ShadowScene};
use crate::{DecodeError, Dispatcher, FrameInfo, Framebuffer};

/// What every scene type is given to render with.
#[derive(Clone, Debug)]
pub struct SceneContext {
    grid: GridSize,
    dispatcher: Arc<Dispatcher>,
}

impl SceneContext {
    #[allow(missing_docs)]
    #[inline]
    pub fn new(grid: GridSize, dispatcher: Arc<Dispatcher>) -> Self {
        Self { grid, dispatcher }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

/// Configuration of one of the built-in scene types.
///
/// Serialized with a `"kind"` field naming the scene type; every other field may be
/// omitted to use its default.
///
/// ```
/// # extern crate omnivox_render as omnivox;
/// use omnivox::SceneOptions;
///
/// let options = SceneOptions::from_json(r#"{"kind": "fog", "fog_scattering": 0.25}"#).unwrap();
/// assert_eq!(options.kind(), "fog");
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SceneOptions {
    #[allow(missing_docs)]
    Shadow(ShadowOptions),
    #[allow(missing_docs)]
    Fog(FogOptions),
}

impl SceneOptions {
    /// Name of the scene type these options are for.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            SceneOptions::Shadow(_) => ShadowScene::KIND,
            SceneOptions::Fog(_) => FogScene::KIND,
        }
    }

    /// Parses options from JSON.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(json).map_err(DecodeError::Json)
    }

    /// Creates a scene of the kind these options are for, configured with them.
    ///
    /// The scene is not yet loaded.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn build(&self, context: SceneContext) -> Box<dyn VoxelScene> {
        let mut scene: Box<dyn VoxelScene> = match self {
            SceneOptions::Shadow(_) => Box::new(ShadowScene::new(context)),
            SceneOptions::Fog(_) => Box::new(FogScene::new(context)),
        };
        scene.set_options(self);
        scene
    }
}

impl Default for SceneOptions {
    #[inline]
    fn default() -> Self {
        SceneOptions::Shadow(ShadowOptions::default())
    }
}

impl From<ShadowOptions> for SceneOptions {
    #[inline]
    fn from(value: ShadowOptions) -> Self {
        SceneOptions::Shadow(value)
    }
}
impl From<FogOptions> for SceneOptions {
    #[inline]
    fn from(value: FogOptions) -> Self {
        SceneOptions::Fog(value)
    }
}

/// A kind of animated scene that can be loaded, configured and rendered into a
/// [`Framebuffer`].
///
/// This trait is object-safe so that the compositor can switch between scene types at run
/// time. Therefore, [`Self::render()`] returns a boxed future.
pub trait VoxelScene: Send + fmt::Debug {
    /// Name of this scene type, matching [`SceneOptions::kind()`].
    fn kind(&self) -> &'static str;

    /// Builds the scene's contents from its current options, if they are not built
    /// already.
    fn load(&mut self);

    /// Releases the scene's contents. A later [`Self::load()`] builds them again.
    fn unload(&mut self);

    /// Returns whether the scene's contents are built, so that it renders something.
    fn is_loaded(&self) -> bool;

    /// Applies new options.
    ///
    /// This is cheap enough to call every frame; contents are only rebuilt if options that
    /// determine their geometry changed. Options for another kind of scene are logged and
    /// ignored.
    fn set_options(&mut self, options: &SceneOptions);

    /// Discards the scene's contents and applies new options, building the contents again
    /// from those options if the scene was loaded.
    fn rebuild(&mut self, options: &SceneOptions) {
        let loaded = self.is_loaded();
        self.clear();
        self.set_options(options);
        if loaded {
            self.load();
        }
    }

    /// Discards the scene's contents, which are rebuilt on the next [`Self::load()`].
    fn clear(&mut self);

    /// Returns whether this scene can only render into CPU framebuffers, so compositing
    /// its output requires a transfer.
    fn renders_to_cpu_only(&self) -> bool {
        true
    }

    /// Advances the scene's animation by `dt` seconds and adds a frame into `target`.
    ///
    /// A scene that is not loaded renders nothing.
    fn render<'a>(&'a mut self, dt: f64, target: &'a mut Framebuffer) -> BoxFuture<'a, FrameInfo>;
}

/// Logs options that do not belong to the scene they were given to.
pub(crate) fn wrong_options(scene: &'static str, options: &SceneOptions) {
    log::error!(
        "{scene} scene given options for {} scene; ignoring them",
        options.kind()
    );
}
