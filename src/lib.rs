//! Treesum: concurrent content digests for every regular file under a directory.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::DigestError;
pub use pipeline::{CancelToken, UnitTracker};
pub use types::*;

use log::debug;
use std::path::Path;

/// Result alias used by public treesum API
pub type Result<T> = std::result::Result<T, DigestError>;

/// Single entry point: digest every regular file under `root` and return path → digest.
///
/// - Keys are relative to `root` (`a.txt`, `sub/b.txt`); symlinks and other non-regular entries
///   are skipped.
/// - Returns the first error seen (an unreadable file or an unlistable directory) and no map.
///   Outstanding work is cancelled and every thread is joined before this returns.
/// - An empty tree is an empty map, not an error.
///
/// ```ignore
/// let opts = treesum::DigestOpts { topology: treesum::Topology::Pool(8), ..Default::default() };
/// let map = treesum::digest_dir(Path::new("."), &opts)?;
/// ```
pub fn digest_dir(root: &Path, opts: &DigestOpts) -> Result<DigestMap> {
    digest_dir_with_cancel(root, opts, &CancelToken::new())
}

/// Like [`digest_dir`], but the run can be abandoned from another thread with
/// [`CancelToken::cancel`]; it then returns [`DigestError::Cancelled`] unless a real failure was
/// seen first. The token is raised when the call returns, so use a fresh one per call.
pub fn digest_dir_with_cancel(
    root: &Path,
    opts: &DigestOpts,
    cancel: &CancelToken,
) -> Result<DigestMap> {
    digest_dir_tracked(root, opts, cancel, &UnitTracker::new())
}

/// Like [`digest_dir_with_cancel`], recording every thread the run spawns in `tracker`.
/// After return, `tracker.live() == 0`.
pub fn digest_dir_tracked(
    root: &Path,
    opts: &DigestOpts,
    cancel: &CancelToken,
    tracker: &UnitTracker,
) -> Result<DigestMap> {
    let opts = Opts::from(opts);
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);
    pipeline::collect_digests(root, &opts, cancel, tracker)
}
