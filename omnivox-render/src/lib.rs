//! Lighting and compositing of animated scenes for volumetric voxel displays.
//!
//! A [`Scene`] holds [`Renderable`]s, [`Light`]s and any number of [`Fog`] volumes. Each frame, a
//! [`Dispatcher`] takes an immutable [`SceneSnapshot`] of it, lights every voxel that some
//! renderable may affect, and adds the results into a [`Framebuffer`]. The [`Compositor`]
//! drives scene types implementing [`VoxelScene`] and crossfades between them.
//!
//! ## Package features
//!
//! This package, `omnivox-render`, defines the following feature flags:
//!
//! * `"auto-threads"` (enabled by default):
//!   Light voxels on a dedicated [`rayon`] thread pool owned by each [`Dispatcher`].
//!   This feature does not affect the public API, only performance and dependencies.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]
#![warn(clippy::missing_inline_in_public_items)]

pub use omnivox_base::{math, raycast, util};

// -------------------------------------------------------------------------------------------------

mod compositor;
pub use compositor::{Compositor, CompositorOptions, Crossfade};

mod dispatch;
pub use dispatch::{Dispatcher, FrameInfo};

mod flaws;
pub use flaws::Flaws;

mod framebuffer;
pub use framebuffer::{
    BlendMode, BufferId, CpuFramebuffer, Framebuffer, GpuBuffer, KernelDevice,
    SoftwareKernelDevice,
};

mod lifecycle;
pub use lifecycle::{SceneContext, SceneOptions, VoxelScene};

mod light;
pub use light::{
    AmbientLight, Attenuation, DirectionalLight, Incident, Light, LightId, LightKind, PointLight,
    SpotLight,
};

mod lighting;

mod material;
pub use material::{EmissionMaterial, LambertMaterial, Material, SharedMaterial};

mod renderable;
pub use renderable::{
    DEFAULT_FOG_SCATTERING, Fog, FogShape, MeshError, MeshGeometry, MeshObject, Renderable,
    RenderableId, RenderableKind, Sample, ShadowFlags, VoxelBox, VoxelPoint, VoxelSphere,
};

mod scene;
pub use scene::Scene;

pub mod scenes;
pub use scenes::{FogOptions, FogScene, ShadowOptions, ShadowScene};

mod snapshot;
pub use snapshot::{SceneSnapshot, WorkItem};

mod texture;
pub use texture::{Texture, TextureError};

// -------------------------------------------------------------------------------------------------

/// An error indicating that a scene description could not be decoded.
#[derive(Debug, displaydoc::Display)]
#[non_exhaustive]
pub enum DecodeError {
    /// The JSON was malformed or did not describe a value of the expected type.
    #[displaydoc("invalid scene description: {0}")]
    Json(serde_json::Error),
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Json(e) => Some(e),
        }
    }
}

/// Adds `from_json()` to types whose JSON form is shared with other processes.
macro_rules! impl_from_json {
    ($($t:ty),*) => {
        $(
            impl $t {
                #[doc = concat!("Parses a [`", stringify!($t), "`] from JSON.")]
                #[allow(clippy::missing_inline_in_public_items)]
                pub fn from_json(json: &str) -> Result<Self, DecodeError> {
                    serde_json::from_str(json).map_err(DecodeError::Json)
                }
            }
        )*
    };
}
impl_from_json!(Light, Fog, Material);
