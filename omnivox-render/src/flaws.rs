use core::fmt;

bitflags::bitflags! {
    /// Deficiencies of a rendered frame.
    ///
    /// This type describes the ways in which a frame could fail to accurately
    /// represent the scene it was rendered from.
    ///
    /// It is a [`bitflags`] generated bit-flag type. *Note: We make no guarantees that
    /// the numeric value of flags will stay the same across versions*; please treat this
    /// as a set of named values only.
    ///
    /// The [empty](Self::empty) set means no flaws are present.
    #[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
    pub struct Flaws: u16 {
        /// Some voxels were not lit because a chunk of lighting work was lost before it
        /// could report its results.
        const UNFINISHED = 1 << 0;

        /// The rendering has a flaw not otherwise classified.
        const OTHER = 1 << 1;

        /// A framebuffer operation was requested that the framebuffer does not support,
        /// such as compositing into a CPU framebuffer, and it was skipped.
        const INVALID_OPERATION = 1 << 2;

        /// Surfaces that should have textures rather than a solid color don't, because
        /// the texture has not been loaded.
        const MISSING_TEXTURES = 1 << 3;
    }
}

impl Default for Flaws {
    /// Equivalent to [`Self::empty()`].
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Flaws {
    /// Displays the flags as text like “`UNFINISHED | INVALID_OPERATION`".
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Flaws::default().to_string(), "");

        assert_eq!(Flaws::UNFINISHED.to_string(), "UNFINISHED");
        assert_eq!(
            (Flaws::UNFINISHED | Flaws::INVALID_OPERATION).to_string(),
            "UNFINISHED | INVALID_OPERATION"
        );
    }
}
