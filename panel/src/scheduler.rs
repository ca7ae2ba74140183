use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// What prompted a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Boot,
    Timer,
    Button,
}

/// Handle the button path uses to ask for a refresh. Backed by a
/// bounded(1) channel: a request landing while one is already pending
/// coalesces into it instead of queueing.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<RefreshReason>,
}

pub fn refresh_channel() -> (RefreshHandle, mpsc::Receiver<RefreshReason>) {
    let (tx, rx) = mpsc::channel(1);
    (RefreshHandle { tx }, rx)
}

impl RefreshHandle {
    pub fn request(&self, reason: RefreshReason) {
        match self.tx.try_send(reason) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(?reason, "refresh already pending, coalescing");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(?reason, "refresh loop is gone, dropping request");
            }
        }
    }
}

/// One full reconciliation: remote reads, cache replace, render, push.
#[allow(async_fn_in_trait)]
pub trait Reconcile {
    async fn reconcile(&mut self, reason: RefreshReason);
}

/// Serialization point for the panel. Exactly one reconciliation is
/// ever in flight; a boot reconciliation runs before the first timer
/// arms, and the interval is measured from the end of each run, not
/// aligned to the wall clock. Shutdown is only observed between
/// reconciliations, so in-flight work drains first.
pub async fn run_refresh_loop<R: Reconcile>(
    worker: &mut R,
    requests: &mut mpsc::Receiver<RefreshReason>,
    interval: Duration,
    shutdown: &mut watch::Receiver<bool>,
) {
    let mut reason = RefreshReason::Boot;
    loop {
        worker.reconcile(reason).await;

        reason = tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            request = requests.recv() => match request {
                Some(request) => request,
                None => return,
            },
            _ = tokio::time::sleep(interval) => RefreshReason::Timer,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingWorker {
        runs: Vec<RefreshReason>,
        busy_for: Duration,
    }

    impl CountingWorker {
        fn busy_for(busy_for: Duration) -> Self {
            Self {
                runs: Vec::new(),
                busy_for,
            }
        }
    }

    impl Reconcile for CountingWorker {
        async fn reconcile(&mut self, reason: RefreshReason) {
            self.runs.push(reason);
            tokio::time::sleep(self.busy_for).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn boot_reconciliation_runs_before_any_trigger() {
        let (_handle, mut requests) = refresh_channel();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut worker = CountingWorker::busy_for(Duration::from_millis(10));

        let driver = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            shutdown_tx.send(true).unwrap();
        };
        tokio::join!(
            run_refresh_loop(
                &mut worker,
                &mut requests,
                Duration::from_secs(60),
                &mut shutdown
            ),
            driver
        );

        assert_eq!(worker.runs, vec![RefreshReason::Boot]);
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_during_a_run_coalesce_to_one_follow_up() {
        let (handle, mut requests) = refresh_channel();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut worker = CountingWorker::busy_for(Duration::from_millis(100));

        let driver = async {
            // Land a burst of triggers while the boot reconciliation is
            // still in flight.
            tokio::time::sleep(Duration::from_millis(10)).await;
            for _ in 0..5 {
                handle.request(RefreshReason::Button);
            }
            handle.request(RefreshReason::Timer);
            // Let the boot run and the single follow-up finish.
            tokio::time::sleep(Duration::from_millis(300)).await;
            shutdown_tx.send(true).unwrap();
        };

        tokio::join!(
            run_refresh_loop(
                &mut worker,
                &mut requests,
                Duration::from_secs(60),
                &mut shutdown
            ),
            driver
        );

        assert_eq!(worker.runs, vec![RefreshReason::Boot, RefreshReason::Button]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_rearms_from_the_end_of_each_run() {
        let (_handle, mut requests) = refresh_channel();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut worker = CountingWorker::busy_for(Duration::from_millis(0));

        let driver = async {
            tokio::time::sleep(Duration::from_secs(20)).await;
            shutdown_tx.send(true).unwrap();
        };
        tokio::join!(
            run_refresh_loop(
                &mut worker,
                &mut requests,
                Duration::from_secs(15),
                &mut shutdown
            ),
            driver
        );

        // Boot at t=0, one timer tick at t=15; the next would land at
        // t=30, past the shutdown.
        assert_eq!(worker.runs, vec![RefreshReason::Boot, RefreshReason::Timer]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_request_runs_immediately() {
        let (handle, mut requests) = refresh_channel();
        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let mut worker = CountingWorker::busy_for(Duration::from_millis(5));

        let driver = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.request(RefreshReason::Button);
            tokio::time::sleep(Duration::from_secs(1)).await;
            shutdown_tx.send(true).unwrap();
        };
        tokio::join!(
            run_refresh_loop(
                &mut worker,
                &mut requests,
                Duration::from_secs(60),
                &mut shutdown
            ),
            driver
        );

        assert_eq!(worker.runs, vec![RefreshReason::Boot, RefreshReason::Button]);
    }
}
