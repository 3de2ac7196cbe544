//! Public and internal types for the treesum API and pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::DigestError;
use crate::utils::config::WorkerLimits;

/// Fixed-size content digest. The width depends on the algorithm that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileDigest {
    Md5([u8; 16]),
    Blake3([u8; 32]),
}

impl FileDigest {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileDigest::Md5(b) => b.as_slice(),
            FileDigest::Blake3(b) => b.as_slice(),
        }
    }

    /// Lowercase hex, as printed by the CLI.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            FileDigest::Md5(_) => DigestAlgorithm::Md5,
            FileDigest::Blake3(_) => DigestAlgorithm::Blake3,
        }
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Outcome of digesting one discovered file. Produced exactly once per file by a worker and
/// consumed by the aggregator.
#[derive(Debug)]
pub struct FileResult {
    /// Key path (relative to the walked root).
    pub path: PathBuf,
    pub digest: Result<FileDigest, DigestError>,
}

/// Map of path → digest for a digested tree.
///
/// Keys are relative to the root passed to [`digest_dir`](crate::digest_dir) (`sub/b.txt`).
/// Insertion order is meaningless; sort the keys for display.
pub type DigestMap = HashMap<PathBuf, FileDigest>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Blake3,
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            other => Err(DigestError::Config(format!("unknown algorithm `{other}`"))),
        }
    }
}

/// How file paths are fanned out to digest workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// One thread per discovered file. Simple; peak concurrency equals the number of files in
    /// flight.
    PerFile,
    /// Fixed number of workers pulling from the shared path channel.
    Pool(usize),
}

impl Default for Topology {
    fn default() -> Self {
        Topology::Pool(WorkerLimits::DEFAULT_POOL_SIZE)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::PerFile => write!(f, "per-file"),
            Topology::Pool(n) => write!(f, "pool({n})"),
        }
    }
}

/// Directory iteration strategy for the walk thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalkMode {
    /// walkdir on the walk thread.
    #[default]
    Serial,
    /// jwalk; directory reads run on its own rayon pool.
    Parallel,
}

/// Lib-only options for [`digest_dir`](crate::digest_dir).
#[derive(Clone, Debug, Default)]
pub struct DigestOpts {
    /// Worker topology. Default: a pool of [`WorkerLimits::DEFAULT_POOL_SIZE`].
    pub topology: Topology,
    pub algorithm: DigestAlgorithm,
    pub walk_mode: WalkMode,
    /// Give up (and cancel everything) after this long.
    pub timeout: Option<Duration>,
    /// Capacity of the path and result channels. When None, [`WorkerLimits::CHANNEL_CAP`].
    pub channel_cap: Option<usize>,
}

impl From<&DigestOpts> for Opts {
    fn from(o: &DigestOpts) -> Self {
        Opts {
            topology: o.topology,
            algorithm: o.algorithm,
            walk_mode: o.walk_mode,
            timeout: o.timeout,
            channel_cap: o.channel_cap,
            json: false,
            verbose: false,
        }
    }
}

/// Full options (CLI). Use [`DigestOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    pub topology: Topology,
    pub algorithm: DigestAlgorithm,
    pub walk_mode: WalkMode,
    pub timeout: Option<Duration>,
    pub channel_cap: Option<usize>,
    /// Print the map as a JSON object instead of `<hex>  <path>` lines.
    pub json: bool,
    pub verbose: bool,
}
