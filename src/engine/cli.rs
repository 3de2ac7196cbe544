//! CLI command handler: merge config file and flags, digest, print sorted results.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::Write;
use std::time::Duration;

use crate::engine::arg_parser::{Cli, TopologyArg};
use crate::engine::report::{write_json, write_lines};
use crate::utils::config::WorkerLimits;
use crate::utils::{apply_file_to_opts, load_treesum_toml, setup_logging};
use crate::{CancelToken, Opts, Topology, UnitTracker, WalkMode, pipeline};

/// Build opts: defaults, then `.treesum.toml` in the target dir, then CLI flags.
pub fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_treesum_toml(&cli.dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    opts
}

fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    let pool_size = |current: Topology| match current {
        Topology::Pool(n) => n,
        Topology::PerFile => WorkerLimits::DEFAULT_POOL_SIZE,
    };
    match cli.topology {
        Some(TopologyArg::PerFile) => opts.topology = Topology::PerFile,
        Some(TopologyArg::Pool) => opts.topology = Topology::Pool(pool_size(opts.topology)),
        None => {}
    }
    if let Some(n) = cli.workers {
        match opts.topology {
            Topology::Pool(_) => opts.topology = Topology::Pool(n as usize),
            Topology::PerFile => warn!("--workers has no effect with the per-file topology"),
        }
    }
    if let Some(a) = cli.algorithm {
        opts.algorithm = a.into();
    }
    if let Some(p) = cli.parallel_walk {
        opts.walk_mode = if p { WalkMode::Parallel } else { WalkMode::Serial };
    }
    if let Some(secs) = cli.timeout {
        opts.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(j) = cli.json {
        opts.json = j;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
}

/// Digest `cli.dir` and print the results. Ctrl+C cancels the run.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    setup_logging(opts.verbose);

    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_handler.cancel();
    })
    .context("set Ctrl+C handler")?;

    debug!("Digesting directory...");
    let tracker = UnitTracker::new();
    let map = pipeline::collect_digests(&cli.dir, &opts, &cancel, &tracker)
        .with_context(|| format!("digest {}", cli.dir.display()))?;
    debug!("{} files digested", map.len());

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    if opts.json {
        write_json(&mut out, &map)?;
    } else {
        write_lines(&mut out, &map).context("write results")?;
    }
    out.flush().context("flush stdout")?;
    Ok(())
}
