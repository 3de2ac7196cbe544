//! Digest workers: read paths from the path channel, digest the file, emit a [`FileResult`].
//!
//! Two fan-out shapes share the same per-file work ([`digest_one`]) and the same cancellation
//! rules; only peak concurrency differs.

use crossbeam_channel::{Receiver, Sender, select};
use log::debug;
use std::any::Any;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::hashing::digest_file;
use crate::engine::tools::key_for;
use crate::pipeline::{CancelToken, UnitTracker};
use crate::{DigestAlgorithm, FileResult, Topology};

/// Everything a worker needs besides its channels.
#[derive(Clone)]
pub struct WorkerContext {
    pub root: Arc<PathBuf>,
    pub algorithm: DigestAlgorithm,
    pub cancel: CancelToken,
    pub tracker: UnitTracker,
}

/// A fan-out strategy. `spawn` starts the units that drain `path_rx` into `result_tx` and
/// returns their handles. Every unit must exit once `path_rx` is closed and drained, or once
/// the cancel token is raised.
pub trait WorkerTopology {
    fn spawn(
        &self,
        path_rx: Receiver<PathBuf>,
        result_tx: Sender<FileResult>,
        ctx: WorkerContext,
    ) -> Vec<JoinHandle<()>>;
}

/// Fixed-size pool: `size` workers pulling from the shared path channel.
pub struct FixedPool {
    pub size: usize,
}

/// One thread per discovered file, spawned by a dispatcher that joins them all before exiting.
pub struct PerFileWorkers;

/// Topology object for a [`Topology`] setting.
pub fn topology_for(topology: Topology) -> Box<dyn WorkerTopology> {
    match topology {
        Topology::Pool(size) => Box::new(FixedPool { size: size.max(1) }),
        Topology::PerFile => Box::new(PerFileWorkers),
    }
}

/// Read, digest and emit one file. Returns false when the result could not be delivered
/// (cancelled or the aggregator is gone) and the caller should stop.
fn digest_one(abs_path: &Path, result_tx: &Sender<FileResult>, ctx: &WorkerContext) -> bool {
    let key = key_for(abs_path, &ctx.root);
    let digest = digest_file(abs_path, &key, ctx.algorithm);
    let result = FileResult { path: key, digest };
    select! {
        send(result_tx, result) -> res => res.is_ok(),
        recv(ctx.cancel.done()) -> _ => false,
    }
}

/// Wait for the next path, or None when the channel is closed or the run is cancelled.
fn next_path(path_rx: &Receiver<PathBuf>, cancel: &CancelToken) -> Option<PathBuf> {
    if cancel.is_cancelled() {
        return None;
    }
    select! {
        recv(path_rx) -> msg => msg.ok(),
        recv(cancel.done()) -> _ => None,
    }
}

/// Single pool worker loop.
fn pool_worker_loop(path_rx: Receiver<PathBuf>, result_tx: Sender<FileResult>, ctx: WorkerContext) {
    while let Some(abs_path) = next_path(&path_rx, &ctx.cancel) {
        if !digest_one(&abs_path, &result_tx, &ctx) {
            break;
        }
    }
    drop(result_tx);
}

impl WorkerTopology for FixedPool {
    fn spawn(
        &self,
        path_rx: Receiver<PathBuf>,
        result_tx: Sender<FileResult>,
        ctx: WorkerContext,
    ) -> Vec<JoinHandle<()>> {
        debug!("Spawning {} digest workers", self.size);
        (0..self.size)
            .map(|_| {
                let path_rx = path_rx.clone();
                let result_tx = result_tx.clone();
                let ctx = ctx.clone();
                let guard = ctx.tracker.enter();
                thread::spawn(move || {
                    let _guard = guard;
                    pool_worker_loop(path_rx, result_tx, ctx)
                })
            })
            .collect()
    }
}

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Finished per-file threads are joined once this many handles are outstanding.
const REAP_AT: usize = 256;

/// Join the handles that have already finished and keep the rest. The first panic payload is
/// kept in `panicked`.
fn reap_finished(handles: &mut Vec<JoinHandle<()>>, panicked: &mut Option<PanicPayload>) {
    let (done, running): (Vec<_>, Vec<_>) =
        std::mem::take(handles).into_iter().partition(|h| h.is_finished());
    *handles = running;
    for h in done {
        if let Err(payload) = h.join() {
            panicked.get_or_insert(payload);
        }
    }
}

/// Join every remaining handle, then re-raise the first panic so the dispatcher's own join
/// reports it the same way a pool worker's would.
fn join_all(handles: Vec<JoinHandle<()>>, mut panicked: Option<PanicPayload>) {
    for h in handles {
        if let Err(payload) = h.join() {
            panicked.get_or_insert(payload);
        }
    }
    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
}

/// Dispatcher loop for [`PerFileWorkers`]: one thread per path, all joined before returning.
fn per_file_dispatch_loop(
    path_rx: Receiver<PathBuf>,
    result_tx: Sender<FileResult>,
    ctx: WorkerContext,
) {
    let mut handles = Vec::new();
    let mut panicked = None;
    while let Some(abs_path) = next_path(&path_rx, &ctx.cancel) {
        let result_tx = result_tx.clone();
        let worker_ctx = ctx.clone();
        let guard = ctx.tracker.enter();
        handles.push(thread::spawn(move || {
            let _guard = guard;
            digest_one(&abs_path, &result_tx, &worker_ctx);
        }));
        if handles.len() >= REAP_AT {
            reap_finished(&mut handles, &mut panicked);
        }
    }
    drop(result_tx);
    debug!("per-file dispatcher: joining {} workers", handles.len());
    join_all(handles, panicked);
}

impl WorkerTopology for PerFileWorkers {
    fn spawn(
        &self,
        path_rx: Receiver<PathBuf>,
        result_tx: Sender<FileResult>,
        ctx: WorkerContext,
    ) -> Vec<JoinHandle<()>> {
        debug!("Spawning per-file dispatcher");
        let guard = ctx.tracker.enter();
        vec![thread::spawn(move || {
            let _guard = guard;
            per_file_dispatch_loop(path_rx, result_tx, ctx)
        })]
    }
}
