use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::DigestAlgorithm;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TopologyArg {
    /// Fixed-size worker pool (see --workers).
    Pool,
    /// One thread per file.
    PerFile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Md5,
    Blake3,
}

impl From<AlgorithmArg> for DigestAlgorithm {
    fn from(a: AlgorithmArg) -> Self {
        match a {
            AlgorithmArg::Md5 => DigestAlgorithm::Md5,
            AlgorithmArg::Blake3 => DigestAlgorithm::Blake3,
        }
    }
}

/// Concurrent content digests for every file in a directory tree.
#[derive(Clone, Parser)]
#[command(name = "treesum")]
#[command(about = "Print `<digest>  <path>` for every regular file under DIR, sorted by path.")]
pub struct Cli {
    /// Directory to digest. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Worker topology.
    #[arg(long, short = 't', value_enum)]
    pub topology: Option<TopologyArg>,

    /// Pool size for the `pool` topology.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Digest algorithm.
    #[arg(long, short = 'a', value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// List directories in parallel.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,

    /// Give up after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub timeout: Option<u64>,

    /// Print a JSON object of path → digest instead of lines.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
