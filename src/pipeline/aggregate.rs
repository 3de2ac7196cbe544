//! Aggregator: build the digest map from results as they arrive; first failure wins.

use crossbeam_channel::{Receiver, after, never, select};
use log::{debug, warn};
use std::time::Duration;

use crate::pipeline::CancelToken;
use crate::pipeline::context::WalkOutcome;
use crate::{DigestError, DigestMap, FileResult, Result};

/// Consume `result_rx` until it closes, racing against the walk outcome, the cancel token and
/// the optional timeout.
///
/// On the first failed [`FileResult`], walk error, external cancel or timeout, the token is
/// raised and the error returned at once without waiting for in-flight workers. Results that
/// were already queued are not looked at. The partially built map is dropped on error.
pub fn aggregate(
    result_rx: &Receiver<FileResult>,
    walk_outcome_rx: &Receiver<WalkOutcome>,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<DigestMap> {
    let fail = |err: DigestError| -> Result<DigestMap> {
        warn!("{err}");
        cancel.cancel();
        Err(err)
    };

    let deadline = timeout.map(after).unwrap_or_else(never);
    let idle = never::<WalkOutcome>();
    let mut walk_done = false;
    let mut map = DigestMap::new();

    loop {
        let walk_rx = if walk_done { &idle } else { walk_outcome_rx };
        select! {
            recv(result_rx) -> msg => match msg {
                Ok(FileResult { path, digest: Ok(digest) }) => {
                    map.insert(path, digest);
                }
                Ok(FileResult { digest: Err(err), .. }) => return fail(err),
                // All workers have exited.
                Err(_) => break,
            },
            recv(walk_rx) -> msg => {
                match msg {
                    Ok(Err(err)) => return fail(err),
                    Ok(Ok(count)) => debug!("aggregate: walk finished with {count} paths"),
                    // Walk thread gone without reporting; treated like a clean finish.
                    Err(_) => {}
                }
                walk_done = true;
            },
            recv(cancel.done()) -> _ => {
                debug!("aggregate: cancelled externally");
                return Err(DigestError::Cancelled);
            },
            recv(deadline) -> _ => {
                // Timeout is always Some here; `never()` fires no messages.
                return fail(DigestError::TimedOut(timeout.unwrap_or_default()));
            },
        }
    }

    // Workers only close the result channel after the walk has dropped the path channel, and
    // the walk reports its outcome first, so it is already queued (or the walk thread is gone).
    if !walk_done && let Ok(Err(err)) = walk_outcome_rx.recv() {
        return fail(err);
    }
    if cancel.is_cancelled() {
        return Err(DigestError::Cancelled);
    }

    debug!("aggregate: {} digests", map.len());
    Ok(map)
}
