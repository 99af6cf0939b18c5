use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::LinkId;

/// Counts `REPLCONF ACK` replies for the `WAIT` currently in progress.
///
/// Only one round runs at a time: a second `WAIT` queues on `gate` until the
/// first has returned. Acknowledgements arriving while no round is active
/// are dropped.
#[derive(Debug, Default)]
pub(crate) struct AckTracker {
    gate: tokio::sync::Mutex<()>,
    round: Mutex<Option<Round>>,
}

#[derive(Debug)]
struct Round {
    acked: HashSet<LinkId>,
    progress: watch::Sender<usize>,
}

impl AckTracker {
    /// Open a round, run `request` (which asks the replicas to acknowledge),
    /// then wait until `needed` distinct links have answered or `timeout`
    /// elapses. Returns the number of links that answered.
    pub(crate) async fn collect<F>(&self, needed: usize, timeout: Duration, request: F) -> usize
    where
        F: FnOnce(),
    {
        let _exclusive = self.gate.lock().await;

        let (progress, mut rx) = watch::channel(0);
        *self.round.lock() = Some(Round {
            acked: HashSet::new(),
            progress,
        });

        request();

        let reached = async {
            while *rx.borrow_and_update() < needed {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };
        if tokio::time::timeout(timeout, reached).await.is_err() {
            debug!(needed, ?timeout, "ack round timed out");
        }

        self.round
            .lock()
            .take()
            .map_or(0, |round| round.acked.len())
    }

    /// Count an acknowledgement from `link`. Returns `false` when no round
    /// is active and the acknowledgement was discarded.
    pub(crate) fn record(&self, link: LinkId) -> bool {
        let mut round = self.round.lock();
        match round.as_mut() {
            Some(round) => {
                if round.acked.insert(link) {
                    round.progress.send_replace(round.acked.len());
                }
                true
            }
            None => false,
        }
    }
}
