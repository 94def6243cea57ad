//! Image textures sampled by materials.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::thread;

use omnivox_base::math::{Rgb, Uv};
use omnivox_base::util::ErrorChain;

/// A shared, immutable RGB image which may not have been loaded yet.
///
/// A [`Texture`] created with [`Texture::pending()`] can be handed to materials
/// immediately and filled in later, exactly once, when its data becomes available.
/// Until then, and forever if loading fails, [`Texture::sample()`] returns white, so an
/// unloaded texture leaves the material's own colour unchanged.
///
/// Clones share the same image; two textures are equal only if they are clones of each
/// other.
#[derive(Clone, Default)]
pub struct Texture(Arc<OnceLock<TextureData>>);

struct TextureData {
    width: usize,
    height: usize,
    /// Row-major: texel `(u, v)` is at `v * width + u`.
    texels: Box<[Rgb]>,
}

impl Texture {
    /// Creates a texture with no data yet.
    #[inline]
    pub fn pending() -> Self {
        Self::default()
    }

    /// Creates a texture from row-major texel data.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn from_texels(width: usize, height: usize, texels: Vec<Rgb>) -> Result<Self, TextureError> {
        let texture = Self::pending();
        texture.fill(width, height, texels)?;
        Ok(texture)
    }

    /// Decodes a PNG image into a new texture.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn from_png(bytes: &[u8]) -> Result<Self, TextureError> {
        let texture = Self::pending();
        texture.fill_from_png(bytes)?;
        Ok(texture)
    }

    /// Supplies the data of a [pending](Self::pending) texture.
    ///
    /// Returns [`TextureError::AlreadyLoaded`] if the texture already has data, in which
    /// case the existing data is kept.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn fill(&self, width: usize, height: usize, texels: Vec<Rgb>) -> Result<(), TextureError> {
        if width == 0 || height == 0 || texels.len() != width * height {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                len: texels.len(),
            });
        }
        self.0
            .set(TextureData {
                width,
                height,
                texels: texels.into_boxed_slice(),
            })
            .map_err(|_| TextureError::AlreadyLoaded)
    }

    /// Decodes a PNG image and supplies it as the data of a [pending](Self::pending)
    /// texture.
    ///
    /// Colour channels are read as linear values; alpha, if present, is ignored.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn fill_from_png(&self, bytes: &[u8]) -> Result<(), TextureError> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder.read_info().map_err(TextureError::Png)?;
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer).map_err(TextureError::Png)?;

        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                return Err(TextureError::UnsupportedColorType(info.color_type));
            }
        };
        let width = info.width as usize;
        let height = info.height as usize;
        let texels = buffer[..info.buffer_size()]
            .chunks_exact(info.line_size)
            .flat_map(|line| line.chunks_exact(channels).take(width))
            .map(|texel| match *texel {
                [l] | [l, _] => Rgb::from_linear8([l, l, l]),
                [r, g, b, ..] => Rgb::from_linear8([r, g, b]),
                _ => Rgb::ONE,
            })
            .collect();
        self.fill(width, height, texels)
    }

    /// Reads and decodes the PNG file at `path` on a new thread, then supplies it as the
    /// data of this texture.
    ///
    /// Failures are logged rather than returned, and leave the texture sampling as white.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn spawn_load_png(&self, path: impl Into<PathBuf>) -> thread::JoinHandle<()> {
        let texture = self.clone();
        let path = path.into();
        thread::spawn(move || {
            let result = std::fs::read(&path)
                .map_err(TextureError::Io)
                .and_then(|bytes| texture.fill_from_png(&bytes));
            match result {
                Ok(()) => log::debug!("loaded texture {}", path.display()),
                Err(error) => log::warn!(
                    "texture {} left untextured: {}",
                    path.display(),
                    ErrorChain(&error)
                ),
            }
        })
    }

    /// Returns whether the texture's data is available.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.0.get().is_some()
    }

    /// Returns the width and height in texels, if loaded.
    #[inline]
    pub fn size(&self) -> Option<(usize, usize)> {
        self.0.get().map(|data| (data.width, data.height))
    }

    /// Returns the texel nearest to `uv`, or white if the texture is not loaded.
    ///
    /// Coordinates are clamped to `0.0..=1.0`; `(0, 0)` is the first texel of the first row.
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn sample(&self, uv: Uv) -> Rgb {
        let Some(data) = self.0.get() else {
            return Rgb::ONE;
        };
        let u = uv.x.clamp(0.0, 1.0);
        let v = uv.y.clamp(0.0, 1.0);
        let u_index = (u * (data.width - 1) as f32).floor() as usize;
        let v_index = (v * (data.height - 1) as f32).floor() as usize;
        data.texels
            .get(v_index * data.width + u_index)
            .copied()
            .unwrap_or(Rgb::ONE)
    }
}

impl PartialEq for Texture {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Texture {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() {
            Some((width, height)) => write!(f, "Texture({width}×{height})"),
            None => write!(f, "Texture(pending)"),
        }
    }
}

/// An error from loading a [`Texture`].
#[derive(Debug, displaydoc::Display)]
#[non_exhaustive]
pub enum TextureError {
    /// failed to read image file
    Io(std::io::Error),

    /// failed to decode PNG image
    Png(png::DecodingError),

    /// PNG colour type {0:?} is not supported
    UnsupportedColorType(png::ColorType),

    /// {width}×{height} texture cannot hold {len} texels
    SizeMismatch {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Number of texels provided.
        len: usize,
    },

    /// texture was already loaded
    AlreadyLoaded,
}

impl std::error::Error for TextureError {
    #[allow(clippy::missing_inline_in_public_items)]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::Io(e) => Some(e),
            TextureError::Png(e) => Some(e),
            TextureError::UnsupportedColorType(_)
            | TextureError::SizeMismatch { .. }
            | TextureError::AlreadyLoaded => None,
        }
    }
}
