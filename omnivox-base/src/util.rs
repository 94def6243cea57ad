//! Tools that we could imagine being in the Rust standard library, but aren't.

use core::error::Error;
use core::fmt;

pub mod log;

// -------------------------------------------------------------------------------------------------

/// Formatting wrapper which prints an [`Error`] together with its
/// `source()` chain, with at least one newline between each.
///
/// The text begins with the [`fmt::Display`] format of the error.
#[derive(Clone, Copy, Debug)]
#[expect(clippy::exhaustive_structs)]
pub struct ErrorChain<'a>(pub &'a (dyn Error + 'a));

impl fmt::Display for ErrorChain<'_> {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut error = self.0;
        // The error's own message is expected NOT to contain the sources itself.
        write!(fmt, "{error}")?;
        while let Some(source) = error.source() {
            error = source;
            write!(fmt, "\n\nCaused by:\n    {error}")?;
        }
        Ok(())
    }
}

#[doc(hidden)] // for use in internal tests only
#[allow(clippy::missing_inline_in_public_items)]
pub fn assert_send_sync<T: Send + Sync>() {
    // We don't need to do anything in this function; the call to it having been successfully
    // compiled is the assertion.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;
    impl Error for Inner {}
    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "png data truncated")
        }
    }

    #[derive(Debug)]
    struct Outer(Inner);
    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }
    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "failed to load texture")
        }
    }

    #[test]
    fn error_chain() {
        assert_eq!(
            format!("{}", ErrorChain(&Outer(Inner))),
            "failed to load texture\n\nCaused by:\n    png data truncated"
        );
    }
}
