//! Load `.treesum.toml` from a directory (CLI only). Lib callers pass [`DigestOpts`](crate::DigestOpts) directly.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::utils::config::PackagePaths;
use crate::{DigestAlgorithm, Opts, Topology};

#[derive(Debug, Default, Deserialize)]
pub struct TreesumToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    /// `"pool"` or `"per-file"`.
    topology: Option<String>,
    workers: Option<usize>,
    algorithm: Option<DigestAlgorithm>,
    parallel_walk: Option<bool>,
    /// Seconds.
    timeout: Option<u64>,
    json: Option<bool>,
    verbose: Option<bool>,
}

/// Load the config file from `dir` if present. Returns None if file missing or unreadable.
pub fn load_treesum_toml(dir: &Path) -> Option<TreesumToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_treesum_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_treesum_toml(s: &str) -> Result<TreesumToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &TreesumToml, opts: &mut Opts) {
    let sec = &file.settings;
    match sec.topology.as_deref() {
        Some("per-file") => opts.topology = Topology::PerFile,
        Some("pool") => opts.topology = Topology::Pool(pool_size_or_default(opts.topology)),
        Some(other) => log::warn!("Ignoring unknown topology `{other}` in config file"),
        None => {}
    }
    if let (Some(n), Topology::Pool(_)) = (sec.workers, opts.topology) {
        opts.topology = Topology::Pool(n);
    }
    apply_file_opt!(sec, opts, algorithm => algorithm);
    if let Some(parallel) = sec.parallel_walk {
        opts.walk_mode = if parallel {
            crate::WalkMode::Parallel
        } else {
            crate::WalkMode::Serial
        };
    }
    if let Some(secs) = sec.timeout {
        opts.timeout = Some(Duration::from_secs(secs));
    }
    apply_file_opt!(sec, opts, json => json);
    apply_file_opt!(sec, opts, verbose => verbose);
}

fn pool_size_or_default(current: Topology) -> usize {
    match current {
        Topology::Pool(n) => n,
        Topology::PerFile => crate::utils::config::WorkerLimits::DEFAULT_POOL_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file = parse_treesum_toml(
            r#"
            [settings]
            topology = "pool"
            workers = 7
            algorithm = "blake3"
            parallel_walk = true
            timeout = 30
            "#,
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.topology, Topology::Pool(7));
        assert_eq!(opts.algorithm, DigestAlgorithm::Blake3);
        assert_eq!(opts.walk_mode, crate::WalkMode::Parallel);
        assert_eq!(opts.timeout, Some(Duration::from_secs(30)));
        assert!(!opts.json);
    }

    #[test]
    fn per_file_ignores_workers() {
        let file = parse_treesum_toml(
            r#"
            [settings]
            topology = "per-file"
            workers = 3
            "#,
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.topology, Topology::PerFile);
    }

    #[test]
    fn empty_file_leaves_opts_alone() {
        let file = parse_treesum_toml("").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.topology, Topology::default());
        assert_eq!(opts.algorithm, DigestAlgorithm::Md5);
    }
}
