//! Color data types. This module is private but reexported by its parent.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, MulAssign};

use euclid::{Vector3D, vec3};

/// A floating-point RGB color value.
///
/// * Each color component must have a nonnegative, non-NaN value.
///   Constructors replace negative or NaN components with zero.
///   Depending on the application, they may be considered to have a nominal
///   range of 0 to 1, or unbounded; [`Rgb::clamp()`] restricts them to the nominal range.
/// * Color components are linear (gamma = 1).
///
/// When serialized, colors are written as a packed `0xRRGGBB` integer, which quantizes
/// each component to 8 bits.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(into = "u32", from = "u32")]
pub struct Rgb(Vector3D<f32, Intensity>);

/// A floating-point RGBA color value.
///
/// * The RGB components obey the same rules as [`Rgb`].
/// * The alpha is not premultiplied, and is kept within 0 to 1.
#[derive(Clone, Copy, PartialEq)]
pub struct Rgba {
    rgb: Rgb,
    alpha: f32,
}

/// Unit-of-measure type for vectors that contain color channels.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum Intensity {}

#[inline]
fn sanitize(c: f32) -> f32 {
    // `max` discards NaN in favor of the other operand.
    c.max(0.0)
}

impl Rgb {
    /// Black; the constant equal to `Rgb::new(0., 0., 0.)`.
    pub const ZERO: Rgb = Rgb(vec3(0.0, 0.0, 0.0));
    /// Nominal white; the constant equal to `Rgb::new(1., 1., 1.)`.
    pub const ONE: Rgb = Rgb(vec3(1.0, 1.0, 1.0));

    /// Constructs a color from components.
    /// Negative or NaN components are replaced with zero.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self(vec3(sanitize(r), sanitize(g), sanitize(b)))
    }

    /// Constructs a shade of gray (components all equal).
    #[inline]
    pub fn from_luminance(luminance: f32) -> Self {
        Self::new(luminance, luminance, luminance)
    }

    /// Adds an alpha component to produce an [Rgba] color.
    #[inline]
    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            rgb: self,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }
    /// Adds an alpha component of `1.0` (fully opaque) to produce an [Rgba] color.
    #[inline]
    pub const fn with_alpha_one(self) -> Rgba {
        Rgba {
            rgb: self,
            alpha: 1.0,
        }
    }

    /// Returns the red color component. Values are linear (gamma = 1).
    #[inline]
    pub const fn red(self) -> f32 {
        self.0.x
    }
    /// Returns the green color component. Values are linear (gamma = 1).
    #[inline]
    pub const fn green(self) -> f32 {
        self.0.y
    }
    /// Returns the blue color component. Values are linear (gamma = 1).
    #[inline]
    pub const fn blue(self) -> f32 {
        self.0.z
    }

    /// Clamp each component to lie within the range 0 to 1, inclusive.
    #[inline]
    #[must_use]
    pub fn clamp(self) -> Self {
        Self(self.0.map(|c| c.min(1.0)))
    }

    /// Returns whether every component is zero.
    #[inline]
    pub fn is_black(self) -> bool {
        self == Self::ZERO
    }

    /// Returns the largest component.
    #[inline]
    pub fn max_component(self) -> f32 {
        self.red().max(self.green()).max(self.blue())
    }

    /// Converts this color to the packed `0xRRGGBB` representation, clamping each component
    /// to 0–1 and rounding it to 8 bits.
    ///
    /// ```
    /// # extern crate omnivox_base as omnivox;
    /// use omnivox::math::Rgb;
    ///
    /// assert_eq!(Rgb::new(1.0, 0.5, 0.0).to_packed(), 0xFF8000);
    /// assert_eq!(Rgb::new(2.0, 0.0, 0.0).to_packed(), 0xFF0000);
    /// ```
    #[inline]
    pub fn to_packed(self) -> u32 {
        let [r, g, b] = self.to_linear8();
        u32::from_be_bytes([0, r, g, b])
    }

    /// Converts the packed `0xRRGGBB` representation to a color.
    /// Bits above the lowest 24 are ignored.
    #[inline]
    pub fn from_packed(packed: u32) -> Self {
        let [_, r, g, b] = packed.to_be_bytes();
        Self::from_linear8([r, g, b])
    }

    /// Converts this color to 8 bits per component without gamma encoding.
    #[inline]
    pub fn to_linear8(self) -> [u8; 3] {
        [
            component_to_linear8(self.red()),
            component_to_linear8(self.green()),
            component_to_linear8(self.blue()),
        ]
    }

    /// Converts 8-bits-per-component linear values to a color.
    #[inline]
    pub fn from_linear8(rgb: [u8; 3]) -> Self {
        Self(vec3(
            component_from_linear8(rgb[0]),
            component_from_linear8(rgb[1]),
            component_from_linear8(rgb[2]),
        ))
    }
}

impl Rgba {
    /// Transparent black (all components zero).
    pub const TRANSPARENT: Rgba = Rgba {
        rgb: Rgb::ZERO,
        alpha: 0.0,
    };
    /// Black; identical to `Rgba::new(0.0, 0.0, 0.0, 1.0)` except for being a constant.
    pub const BLACK: Rgba = Rgb::ZERO.with_alpha_one();
    /// White; identical to `Rgba::new(1.0, 1.0, 1.0, 1.0)` except for being a constant.
    pub const WHITE: Rgba = Rgb::ONE.with_alpha_one();

    /// Constructs a color from components.
    /// Negative or NaN color components become zero, and alpha is clamped to 0–1.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgb::new(r, g, b).with_alpha(a)
    }

    /// Returns the alpha component.
    ///
    /// Note that the RGB components are not premultiplied by alpha.
    #[inline]
    pub const fn alpha(self) -> f32 {
        self.alpha
    }

    /// Discards the alpha component to produce an RGB color.
    #[inline]
    pub const fn to_rgb(self) -> Rgb {
        self.rgb
    }

    /// Applies a function to the RGB portion of this color.
    #[must_use]
    #[inline]
    pub fn map_rgb(self, f: impl FnOnce(Rgb) -> Rgb) -> Self {
        f(self.rgb).with_alpha(self.alpha)
    }

    /// Returns the RGB components multiplied by alpha, after clamping them to 0–1.
    ///
    /// This is the form in which a color is added into a framebuffer.
    #[inline]
    pub fn premultiplied_clamped(self) -> Rgb {
        self.rgb.clamp() * self.alpha
    }

    /// Returns whether a color with this alpha should be drawn at all; that is, whether its
    /// alpha survives rounding to 8 bits.
    #[inline]
    pub fn is_visible(self) -> bool {
        (self.alpha * 255.0).round() >= 1.0
    }
}

impl fmt::Debug for Rgb {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rgb")
            .field(&self.red())
            .field(&self.green())
            .field(&self.blue())
            .finish()
    }
}
impl fmt::Debug for Rgba {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rgba")
            .field(&self.rgb.red())
            .field(&self.rgb.green())
            .field(&self.rgb.blue())
            .field(&self.alpha)
            .finish()
    }
}

impl Default for Rgb {
    /// Black.
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Rgb> for u32 {
    #[inline]
    fn from(value: Rgb) -> Self {
        value.to_packed()
    }
}
impl From<u32> for Rgb {
    #[inline]
    fn from(value: u32) -> Self {
        Self::from_packed(value)
    }
}
impl From<[f32; 3]> for Rgb {
    #[inline]
    fn from(value: [f32; 3]) -> Self {
        let [r, g, b] = value;
        Self::new(r, g, b)
    }
}
impl From<Rgb> for [f32; 3] {
    #[inline]
    fn from(value: Rgb) -> Self {
        value.0.to_array()
    }
}

impl Add<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}
impl AddAssign<Rgb> for Rgb {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}
/// Multiplies two color values componentwise.
impl Mul<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, other: Rgb) -> Self {
        Self(self.0.component_mul(other.0))
    }
}
/// Multiplies this color value by a scalar. Negative or NaN scalars produce black.
impl Mul<f32> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        let scalar = sanitize(scalar);
        Self(self.0.map(|c| sanitize(c * scalar)))
    }
}
impl MulAssign<f32> for Rgb {
    #[inline]
    fn mul_assign(&mut self, scalar: f32) {
        *self = *self * scalar;
    }
}

impl Sum for Rgb {
    #[inline]
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Rgb::ZERO, |a, b| a + b)
    }
}

#[inline]
fn component_to_linear8(c: f32) -> u8 {
    // out of range values will be clamped by `as u8`
    (c * 255.0).round() as u8
}

#[inline]
fn component_from_linear8(c: u8) -> f32 {
    f32::from(c) / 255.0
}
