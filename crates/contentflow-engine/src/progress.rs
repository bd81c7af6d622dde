//! Simulated progress for in-flight stage calls
//!
//! Remote stages report nothing until they finish, so progress is estimated:
//! one point per `timeout / 95`, holding at 95 until the response arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Highest value reached while waiting.
pub const PROGRESS_CEILING: u8 = 95;
/// Value published once the stage succeeds.
pub const PROGRESS_DONE: u8 = 100;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEstimator {
    timeout: Duration,
}

impl ProgressEstimator {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Tick interval sized so 95 ticks span the timeout.
    #[must_use]
    pub fn interval(&self) -> Duration {
        (self.timeout / u32::from(PROGRESS_CEILING)).max(MIN_INTERVAL)
    }

    /// Progress after `elapsed`, capped at [`PROGRESS_CEILING`].
    ///
    /// ```rust
    /// use contentflow_engine::progress::ProgressEstimator;
    /// use std::time::Duration;
    ///
    /// let estimator = ProgressEstimator::new(Duration::from_secs(95));
    /// assert_eq!(estimator.progress_at(Duration::from_millis(10_500)), 10);
    /// assert_eq!(estimator.progress_at(Duration::from_secs(600)), 95);
    /// ```
    #[must_use]
    pub fn progress_at(&self, elapsed: Duration) -> u8 {
        let ticks = elapsed.as_nanos() / self.interval().as_nanos();
        u8::try_from(ticks.min(u128::from(PROGRESS_CEILING))).unwrap_or(PROGRESS_CEILING)
    }

    /// Start ticking on the current tokio runtime.
    #[must_use]
    pub fn start(&self) -> ProgressHandle {
        let (sender, _) = watch::channel(0u8);
        let sender = Arc::new(sender);
        let token = CancellationToken::new();
        let interval = self.interval();

        let task = tokio::spawn({
            let sender = Arc::clone(&sender);
            let token = token.clone();
            async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => break,
                        _ = ticker.tick() => {
                            if step(&sender) >= PROGRESS_CEILING {
                                break;
                            }
                        }
                    }
                }
            }
        });

        ProgressHandle {
            sender,
            token,
            task: Some(task),
        }
    }
}

/// Add one point below the ceiling; returns the resulting value.
fn step(sender: &watch::Sender<u8>) -> u8 {
    sender.send_if_modified(|value| {
        if *value < PROGRESS_CEILING {
            *value += 1;
            true
        } else {
            false
        }
    });
    *sender.borrow()
}

/// A running estimate. Dropping the handle stops the ticker.
#[derive(Debug)]
pub struct ProgressHandle {
    sender: Arc<watch::Sender<u8>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    #[must_use]
    pub fn value(&self) -> u8 {
        *self.sender.borrow()
    }

    /// Advance one point by hand, independent of the timer.
    pub fn tick(&self) -> u8 {
        step(&self.sender)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.sender.subscribe()
    }

    /// Stop ticking and publish 100.
    pub fn complete(&mut self) -> u8 {
        self.stop();
        self.sender.send_replace(PROGRESS_DONE);
        PROGRESS_DONE
    }

    /// Stop ticking, keeping the last value.
    pub fn cancel(&mut self) {
        self.stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_spans_timeout() {
        let estimator = ProgressEstimator::new(Duration::from_millis(9_500));
        assert_eq!(estimator.interval(), Duration::from_millis(100));
        assert_eq!(estimator.progress_at(Duration::ZERO), 0);
        assert_eq!(estimator.progress_at(Duration::from_millis(99)), 0);
        assert_eq!(estimator.progress_at(Duration::from_millis(100)), 1);
        assert_eq!(estimator.progress_at(Duration::from_millis(9_500)), 95);
        assert_eq!(estimator.progress_at(Duration::from_secs(60)), 95);
    }

    #[test]
    fn test_zero_timeout_does_not_divide_by_zero() {
        let estimator = ProgressEstimator::new(Duration::ZERO);
        assert_eq!(estimator.interval(), MIN_INTERVAL);
        assert_eq!(estimator.progress_at(Duration::from_secs(1)), 95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_the_clock() {
        let handle = ProgressEstimator::new(Duration::from_millis(9_500)).start();

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(handle.value(), 10);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(handle.value(), PROGRESS_CEILING);
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_publishes_done_and_stops() {
        let mut handle = ProgressEstimator::new(Duration::from_millis(9_500)).start();
        let receiver = handle.subscribe();

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(handle.complete(), PROGRESS_DONE);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*receiver.borrow(), PROGRESS_DONE);
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_freezes_value() {
        let mut handle = ProgressEstimator::new(Duration::from_millis(9_500)).start();

        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.cancel();
        let frozen = handle.value();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.value(), frozen);
        assert_eq!(frozen, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_tick_caps_at_ceiling() {
        let mut handle = ProgressEstimator::new(Duration::from_secs(3_600)).start();
        handle.cancel();
        for _ in 0..200 {
            handle.tick();
        }
        assert_eq!(handle.value(), PROGRESS_CEILING);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_the_timer() {
        let handle = ProgressEstimator::new(Duration::from_millis(950)).start();
        let mut receiver = handle.subscribe();
        drop(handle);

        assert!(receiver.changed().await.is_err());
    }
}
