//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Ensure expected directories exist; warn on missing optional ones.
///
/// The data directory is not created here: the location store creates it
/// with owner-only permissions on first write.
pub async fn ensure_env(frontend_dir: &str, data_file: &Path) -> anyhow::Result<()> {
    if tokio::fs::metadata(frontend_dir).await.is_err() {
        warn!(%frontend_dir, "frontend assets directory not found; static assets may 404");
    }
    if let Some(parent) = data_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        match tokio::fs::metadata(parent).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(anyhow::anyhow!("{} exists and is not a directory", parent.display()));
            }
            Ok(_) => {}
            Err(_) => warn!(data_dir = %parent.display(), "data directory missing; it will be created on first write"),
        }
    }
    Ok(())
}
