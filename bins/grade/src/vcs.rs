// Version-control and build steps, delegated to external tools
use crate::engine::run_status;
use grade_common::error::Recoverable;
use std::path::Path;
use tracing::info;

/// `git clone <url> <local_path>`
pub async fn clone(url: &str, local_path: &Path) -> Result<i32, Recoverable> {
    let path = local_path.to_string_lossy();
    info!(url, path = %path, "Cloning");
    Ok(run_status("git", &["clone", url, &path]).await?)
}

/// `git -C <local_path> pull`
pub async fn pull(local_path: &Path) -> Result<i32, Recoverable> {
    let path = local_path.to_string_lossy();
    info!(path = %path, "Pulling");
    Ok(run_status("git", &["-C", &path, "pull"]).await?)
}

/// The generic build step: `make -C <local_path>`
pub async fn build(local_path: &Path) -> Result<i32, Recoverable> {
    let path = local_path.to_string_lossy();
    info!(path = %path, "Building");
    Ok(run_status("make", &["-C", &path]).await?)
}
