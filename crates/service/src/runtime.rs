//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so the server crate only needs
//! `service::runtime::ensure_env`.

use std::path::Path;

/// Ensure expected directories exist; warn on missing optional ones.
pub async fn ensure_env(frontend_dir: &str, locations_file: &Path) -> anyhow::Result<()> {
    common::env::ensure_env(frontend_dir, locations_file).await
}
