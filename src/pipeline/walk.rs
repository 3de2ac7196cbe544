//! Walk thread: enumerate regular files under the root and feed them to the path channel.

use crossbeam_channel::{Sender, select};
use log::debug;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::{DigestError, WalkMode};

use super::context::{PipelineContext, WalkOutcome};

/// One item from a directory iterator: a regular file to digest, an entry to skip (directory,
/// symlink, device), or a listing error.
pub enum WalkItem {
    File(PathBuf),
    Skip,
    Err(DigestError),
}

/// Convert a walkdir result into [`WalkItem`].
pub fn to_item_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkItem {
    match r {
        Ok(entry) if entry.file_type().is_file() => WalkItem::File(entry.into_path()),
        Ok(_) => WalkItem::Skip,
        Err(err) => WalkItem::Err(err.into()),
    }
}

/// Convert a jwalk result into [`WalkItem`].
pub fn to_item_jwalk(r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkItem {
    match r {
        Ok(mut entry) => match entry.read_children_error.take() {
            Some(err) => WalkItem::Err(err.into()),
            None if entry.file_type().is_file() => WalkItem::File(entry.path()),
            None => WalkItem::Skip,
        },
        Err(err) => WalkItem::Err(err.into()),
    }
}

/// The root must exist before either iterator starts; both report a missing root differently.
fn check_root(ctx: &PipelineContext) -> Result<(), DigestError> {
    std::fs::symlink_metadata(&ctx.root)
        .map(|_| ())
        .map_err(|source| DigestError::Walk {
            path: Some(ctx.root.clone()),
            source,
        })
}

fn walkdir_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkItem>> {
    use walkdir::WalkDir;
    Box::new(
        WalkDir::new(&ctx.root)
            .follow_links(false)
            .into_iter()
            .map(to_item_walkdir),
    )
}

fn jwalk_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkItem>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    Box::new(
        jwalk::WalkDir::new(&ctx.root)
            .follow_links(false)
            .skip_hidden(false)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .into_iter()
            .map(to_item_jwalk),
    )
}

/// Spawn the walk thread. It reports its outcome on `walk_outcome_tx` and then drops `path_tx`
/// so the workers see the channel close.
pub fn spawn_walk_thread(
    path_tx: Sender<PathBuf>,
    walk_outcome_tx: Sender<WalkOutcome>,
    ctx: PipelineContext,
) -> JoinHandle<()> {
    let guard = ctx.tracker.enter();
    thread::spawn(move || {
        let _guard = guard;
        let outcome = check_root(&ctx).and_then(|()| {
            let iter: Box<dyn Iterator<Item = WalkItem>> = match ctx.walk_mode {
                WalkMode::Parallel => jwalk_iter(&ctx),
                WalkMode::Serial => walkdir_iter(&ctx),
            };
            run_walk_loop(&path_tx, &ctx, iter)
        });
        // One-slot channel, never blocks; the receiver may already be gone.
        let _ = walk_outcome_tx.send(outcome);
        drop(path_tx);
    })
}

/// Consume `iter`, sending each regular file on `path_tx`.
///
/// Stops at the first listing error and returns it. Stops quietly (returning the count so far)
/// once the cancel token is raised; the aggregator owns the reported error in that case.
pub fn run_walk_loop<I>(path_tx: &Sender<PathBuf>, ctx: &PipelineContext, iter: I) -> WalkOutcome
where
    I: Iterator<Item = WalkItem>,
{
    let mut count = 0_usize;
    for item in iter {
        if ctx.cancel.is_cancelled() {
            debug!("walk: cancelled after {count} paths");
            return Ok(count);
        }
        match item {
            WalkItem::File(path) => {
                select! {
                    send(path_tx, path) -> res => {
                        if res.is_err() {
                            // Every worker is gone; nothing left to feed.
                            return Ok(count);
                        }
                        count += 1;
                    }
                    recv(ctx.cancel.done()) -> _ => {
                        debug!("walk: cancelled after {count} paths");
                        return Ok(count);
                    }
                }
            }
            WalkItem::Skip => {}
            WalkItem::Err(err) => {
                debug!("walk: aborting on {err}");
                return Err(err);
            }
        }
    }
    debug!("walk: done, {count} paths");
    Ok(count)
}
