//! Path utilities

use std::path::{Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Rewrite `\` separators to `/` so keys look the same as on Unix.
#[cfg(windows)]
fn normalize_key(rel: PathBuf) -> PathBuf {
    PathBuf::from(rel.to_string_lossy().replace('\\', "/"))
}

/// On Unix `\` is an ordinary filename byte; the relative path is the key as-is.
#[cfg(not(windows))]
fn normalize_key(rel: PathBuf) -> PathBuf {
    rel
}

/// Map key for a walked file: path relative to `root`, `/`-separated. A root that is itself a
/// file is keyed by its file name.
pub fn key_for(path: &Path, root: &Path) -> PathBuf {
    match path_relative_to(path, root) {
        Some(rel) if !rel.as_os_str().is_empty() => normalize_key(rel),
        _ => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}
