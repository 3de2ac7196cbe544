use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::pipeline::workers::{WorkerContext, topology_for};
use crate::pipeline::{self, CancelToken, PipelineTuning, UnitTracker};
use crate::{DigestError, DigestMap, Opts, Result};

/// Start the walk + digest pipeline. Returns receivers and handles; caller aggregates from
/// `result_rx` and must join `walk_handle` and `worker_handles` when done.
pub fn run_pipeline(
    root: &Path,
    tuning: &PipelineTuning,
    cancel: &CancelToken,
    tracker: &UnitTracker,
) -> pipeline::PipelineHandles {
    let channels = pipeline::create_pipeline_channels(root, tuning, cancel, tracker);

    let walk_handle =
        pipeline::spawn_walk_thread(channels.path_tx, channels.walk_outcome_tx, channels.ctx);

    let worker_ctx = WorkerContext {
        root: Arc::new(root.to_path_buf()),
        algorithm: tuning.algorithm,
        cancel: cancel.clone(),
        tracker: tracker.clone(),
    };
    // Workers own the only result senders from here on; the channel closes when they exit.
    let worker_handles = topology_for(tuning.topology).spawn(
        channels.path_rx,
        channels.result_tx,
        worker_ctx,
    );

    pipeline::PipelineHandles {
        result_rx: channels.result_rx,
        walk_outcome_rx: channels.walk_outcome_rx,
        walk_handle,
        worker_handles,
        cancel: cancel.clone(),
    }
}

/// Shut down the pipeline: raise the token so every blocked unit wakes, then join walk and
/// workers. Runs on success too; by then everything has finished and the joins are immediate.
pub fn shutdown_pipeline_handles(
    cancel: &CancelToken,
    walk_handle: JoinHandle<()>,
    worker_handles: Vec<JoinHandle<()>>,
) -> Result<()> {
    cancel.cancel();
    let walk = walk_handle.join();
    let mut worker_panicked = false;
    for h in worker_handles {
        worker_panicked |= h.join().is_err();
    }
    walk.map_err(|_| DigestError::Panicked("walk"))?;
    if worker_panicked {
        return Err(DigestError::Panicked("digest worker"));
    }
    Ok(())
}

/// Main orchestrator: walk → path channel → workers (digest) → result channel → map.
///
/// Blocks until the map is complete or the first error is seen, then cancels and joins every
/// thread it started before returning. `tracker` records those threads.
pub fn collect_digests(
    root: &Path,
    opts: &Opts,
    cancel: &CancelToken,
    tracker: &UnitTracker,
) -> Result<DigestMap> {
    let tuning = PipelineTuning::from_opts(opts);
    debug!(
        "Digesting {} with topology {}, {:?} walk, {:?}",
        root.display(),
        tuning.topology,
        tuning.walk_mode,
        tuning.algorithm
    );

    let pipeline::PipelineHandles {
        result_rx,
        walk_outcome_rx,
        walk_handle,
        worker_handles,
        cancel,
    } = run_pipeline(root, &tuning, cancel, tracker);

    let aggregated = pipeline::aggregate(&result_rx, &walk_outcome_rx, &cancel, opts.timeout);
    // Unblocks any worker still trying to send after an early return.
    drop(result_rx);
    let joined = shutdown_pipeline_handles(&cancel, walk_handle, worker_handles);
    debug!(
        "main: pipeline joined, {} units spawned, {} still live",
        tracker.spawned(),
        tracker.live()
    );

    let map = aggregated?;
    joined?;
    Ok(map)
}
