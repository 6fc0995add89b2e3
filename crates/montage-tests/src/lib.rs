//! Integration test crate for Montage.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple montage crates to verify they work together.

#[cfg(test)]
mod playback;

#[cfg(test)]
mod timeline;

/// Install a test subscriber honoring `RUST_LOG`. Safe to call from
/// every test; only the first call wins.
#[cfg(test)]
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
