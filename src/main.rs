//! Treesum CLI: digest every regular file under a directory and print the sorted results.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use treesum::engine::arg_parser::Cli;
use treesum::engine::handle_run;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
