//! Pipeline context and tuning: channels, shared state passed into the walk thread, and the
//! unit tracker that proves every spawned thread has exited.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crate::pipeline::CancelToken;
use crate::utils::config::WorkerLimits;
use crate::utils::fd_limit::cap_pool_size;
use crate::{DigestAlgorithm, DigestError, FileResult, Opts, Topology, WalkMode};

/// Tuning resolved from options and the FD limit.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    pub topology: Topology,
    pub walk_mode: WalkMode,
    pub algorithm: DigestAlgorithm,
    /// Capacity for path and result channels.
    pub channel_cap: usize,
}

impl PipelineTuning {
    pub fn from_opts(opts: &Opts) -> Self {
        let topology = match opts.topology {
            Topology::Pool(n) => Topology::Pool(cap_pool_size(n)),
            Topology::PerFile => Topology::PerFile,
        };
        Self {
            topology,
            walk_mode: opts.walk_mode,
            algorithm: opts.algorithm,
            channel_cap: opts.channel_cap.unwrap_or(WorkerLimits::CHANNEL_CAP).max(1),
        }
    }
}

/// Counts concurrent units (walker, dispatcher, workers) as they start and exit.
///
/// After the orchestrator returns, `live()` is 0: everything it spawned has been joined.
#[derive(Clone, Debug, Default)]
pub struct UnitTracker {
    spawned: Arc<AtomicUsize>,
    exited: Arc<AtomicUsize>,
}

impl UnitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit. The returned guard marks it exited when dropped (including on panic).
    pub fn enter(&self) -> UnitGuard {
        self.spawned.fetch_add(1, Ordering::AcqRel);
        UnitGuard {
            exited: Arc::clone(&self.exited),
        }
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Acquire)
    }

    pub fn exited(&self) -> usize {
        self.exited.load(Ordering::Acquire)
    }

    pub fn live(&self) -> usize {
        self.spawned().saturating_sub(self.exited())
    }
}

#[must_use]
pub struct UnitGuard {
    exited: Arc<AtomicUsize>,
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        self.exited.fetch_add(1, Ordering::AcqRel);
    }
}

/// What the walk thread reports once it stops: number of paths sent, or the walk error.
pub type WalkOutcome = Result<usize, DigestError>;

/// Shared context for the walk thread.
pub struct PipelineContext {
    pub root: PathBuf,
    pub walk_mode: WalkMode,
    pub cancel: CancelToken,
    pub tracker: UnitTracker,
}

/// Handles returned by [`run_pipeline`](crate::pipeline::run_pipeline): the aggregator reads
/// `result_rx` and `walk_outcome_rx`; the orchestrator joins the rest.
pub struct PipelineHandles {
    pub result_rx: Receiver<FileResult>,
    pub walk_outcome_rx: Receiver<WalkOutcome>,
    pub walk_handle: JoinHandle<()>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub cancel: CancelToken,
}

/// Channels for the pipeline. Walk thread gets path_tx and walk_outcome_tx; workers get
/// path_rx and result_tx.
pub struct PipelineChannels {
    pub path_tx: Sender<PathBuf>,
    pub path_rx: Receiver<PathBuf>,
    pub result_tx: Sender<FileResult>,
    pub result_rx: Receiver<FileResult>,
    pub walk_outcome_tx: Sender<WalkOutcome>,
    pub walk_outcome_rx: Receiver<WalkOutcome>,
    pub ctx: PipelineContext,
}

pub fn create_pipeline_channels(
    root: &Path,
    tuning: &PipelineTuning,
    cancel: &CancelToken,
    tracker: &UnitTracker,
) -> PipelineChannels {
    let (path_tx, path_rx) = bounded::<PathBuf>(tuning.channel_cap);
    let (result_tx, result_rx) = bounded::<FileResult>(tuning.channel_cap);
    // One slot: the walk never blocks on reporting its outcome.
    let (walk_outcome_tx, walk_outcome_rx) = bounded::<WalkOutcome>(1);

    let ctx = PipelineContext {
        root: root.to_path_buf(),
        walk_mode: tuning.walk_mode,
        cancel: cancel.clone(),
        tracker: tracker.clone(),
    };

    PipelineChannels {
        path_tx,
        path_rx,
        result_tx,
        result_rx,
        walk_outcome_tx,
        walk_outcome_rx,
        ctx,
    }
}
