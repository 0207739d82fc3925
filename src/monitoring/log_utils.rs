//! Housekeeping for the rolling log directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;
use tracing::{info, warn};

use super::LOG_FILE_NAME;

/// Total size above which a warning is logged (50MB).
const MAX_LOG_SIZE: u64 = 50 * 1024 * 1024;

/// Daily files kept by `prune_logs` (one week).
pub const MAX_LOG_FILES: usize = 7;

fn rolled_log_files(log_dir: &Path) -> anyhow::Result<Vec<(PathBuf, u64, SystemTime)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(log_dir).with_context(|| format!("reading {}", log_dir.display()))? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .map_or(false, |name| name.to_string_lossy().starts_with(LOG_FILE_NAME));
        if !path.is_file() || !is_log {
            continue;
        }
        let metadata = fs::metadata(&path)?;
        files.push((path, metadata.len(), metadata.modified()?));
    }
    Ok(files)
}

/// Logs the size of the log directory, warning when it grows too large.
pub fn check_log_directory(log_dir: &str) -> anyhow::Result<u64> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(log_path)?;
        info!(target: "log_management", "Created log directory: {}", log_dir);
        return Ok(0);
    }

    let files = rolled_log_files(log_path)?;
    let total_size: u64 = files.iter().map(|(_, size, _)| size).sum();

    if total_size > MAX_LOG_SIZE {
        warn!(
            target: "log_management",
            total_size_mb = total_size / (1024 * 1024),
            max_size_mb = MAX_LOG_SIZE / (1024 * 1024),
            "Log directory size exceeds recommended maximum"
        );
    } else {
        info!(
            target: "log_management",
            total_size_kb = total_size / 1024,
            log_count = files.len(),
            "Log directory size within limits"
        );
    }
    Ok(total_size)
}

/// Removes all but the `keep` most recently modified log files.
pub fn prune_logs(log_dir: &str, keep: usize) -> anyhow::Result<usize> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        return Ok(0);
    }

    let mut files = rolled_log_files(log_path)?;
    files.sort_by(|a, b| b.2.cmp(&a.2));

    let mut removed = 0;
    for (path, _, _) in files.iter().skip(keep) {
        info!(target: "log_management", path = %path.display(), "Removing old log file");
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(
                    target: "log_management",
                    path = %path.display(),
                    error = %e,
                    "Failed to remove old log file"
                )
            }
        }
    }
    Ok(removed)
}
