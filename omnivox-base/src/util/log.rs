//! Logging conventions shared by the omnivox crates and their host programs.

/// Provides the recommended log filter for programs which want to exclude particularly noisy
/// details of omnivox's dependencies.
///
/// The guiding principle for this filtering is that at [`log::Level::Debug`] or lower level,
/// there should be no messages produced every frame unless something is wrong. The renderer's
/// own per-frame statistics are logged at [`log::Level::Trace`] and are kept.
#[allow(clippy::missing_inline_in_public_items)]
pub fn standard_filter(metadata: &log::Metadata<'_>) -> bool {
    let target = metadata.target();

    !(target.starts_with("rayon") // thread pool lifecycle chatter
        || target.starts_with("mio::") // tokio's reactor, when the host uses it
        || target.starts_with("tokio::")
        || target.starts_with("png::"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter() {
        assert!(!standard_filter(
            &log::Metadata::builder().target("rayon_core::registry").build()
        ));
        assert!(standard_filter(
            &log::Metadata::builder()
                .target("omnivox_render::dispatch")
                .build()
        ));
        assert!(standard_filter(
            &log::Metadata::builder().target("some_random_crate").build()
        ));
    }
}
