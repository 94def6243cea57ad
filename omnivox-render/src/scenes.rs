//! Built-in scene types.
//!
//! These are small demonstration scenes, each animating a handful of renderables and
//! lights; they are mostly useful for exercising the compositor and for benchmarks.

mod fog;
pub use fog::{FogOptions, FogScene};
mod shadow;
pub use shadow::{ShadowOptions, ShadowScene};
