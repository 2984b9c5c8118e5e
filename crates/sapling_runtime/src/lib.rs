//! Sapling Runtime
//!
//! Embedding entry points for sapling_core trees:
//!
//! - [`init`] installs a `tracing` subscriber configured from `RUST_LOG`
//! - [`RenderLoop`] drives a [`RootNode`](sapling_core::RootNode) frame by frame
//! - [`InvalidationHandle`] lets other threads schedule rerenders

pub mod error;
pub mod render_loop;

pub use sapling_core;

pub use error::{Result, RuntimeError};
pub use render_loop::{InvalidationHandle, RenderLoop};

/// Initialize the Sapling runtime
///
/// Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`
/// (defaulting to `info`). Fails if a global subscriber is already set.
pub fn init() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing::debug!("sapling runtime initialized");
    Ok(())
}
