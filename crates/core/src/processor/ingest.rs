//! Expansion of user-supplied paths into candidate files.

use std::path::PathBuf;

use tracing::{debug, warn};

/// Expands directories recursively and returns every file found, sorted.
///
/// Paths that cannot be read are logged and skipped.
pub async fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack: Vec<PathBuf> = paths.to_vec();

    while let Some(path) = stack.pop() {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable path");
                continue;
            }
        };

        if metadata.is_file() {
            files.push(path);
            continue;
        }
        if !metadata.is_dir() {
            continue;
        }

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => stack.push(entry.path()),
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Directory listing interrupted");
                    break;
                }
            }
        }
    }

    files.sort();
    files.dedup();
    debug!(requested = paths.len(), found = files.len(), "Expanded input paths");
    files
}
