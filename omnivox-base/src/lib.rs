//! This library is an internal component of [`omnivox-render`],
//! which defines the colour, geometry, and voxel-grid types shared by the renderer.
//! Do not depend on this library; use the reexports from `omnivox-render` instead.
//!
//! [`omnivox-render`]: https://crates.io/crates/omnivox-render/

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]
#![warn(clippy::missing_inline_in_public_items)]

/// Do not use this module directly; its contents are re-exported from `omnivox-render`.
pub mod math;

/// Do not use this module directly; its contents are re-exported from `omnivox-render`.
pub mod raycast;

/// Do not use this module directly; its contents are re-exported from `omnivox-render`.
pub mod util;

// reexport for convenience of our tests
#[doc(hidden)]
pub use euclid;
