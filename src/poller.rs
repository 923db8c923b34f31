use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A set of independently scheduled polling tasks sharing one shutdown
/// signal, so teardown cancels them all together.
///
/// Each tick gets a monotonically increasing sequence number and the work
/// future is spawned rather than awaited in the loop: ticks can overlap and
/// resolve out of issuance order, which is exactly why appliers discard
/// responses older than the last applied sequence.
pub struct PollerSet {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl PollerSet {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Schedule `poll(seq)` every `interval` until shutdown.
    pub fn spawn<F, Fut>(&mut self, name: &'static str, interval: Duration, poll: F)
    where
        F: Fn(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.shutdown.subscribe();
        self.handles.push(tokio::spawn(async move {
            let mut seq: u64 = 0;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        seq += 1;
                        tokio::spawn(poll(seq));
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            debug!(name, "poller stopped");
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// Spawn a one-shot task tied to the same shutdown lifetime.
    pub fn spawn_once<Fut>(&mut self, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(task));
    }

    /// Cancel every scheduled task and wait for the loops to wind down.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

impl Default for PollerSet {
    fn default() -> Self {
        Self::new()
    }
}
