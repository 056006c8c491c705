//! Timer handles backed by Tokio tasks.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a scheduled one-shot or periodic callback.
///
/// The callback stops firing once the handle is cancelled or dropped.
/// Must be created from within a Tokio runtime.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Run `callback` once after `delay`.
    pub fn after<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            callback();
        });
        Self { task }
    }

    /// Run `callback` every `period`, first one period from now.
    ///
    /// Late ticks are delayed rather than bunched up. A zero period runs
    /// every millisecond.
    pub fn every<F>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        Self { task }
    }

    /// Stop the timer. Safe to call more than once.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// True once a one-shot timer has fired or the timer was cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_after_fires_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let timer = TimerHandle::after(Duration::from_millis(20), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.is_finished());
    }

    #[tokio::test]
    async fn test_cancel_prevents_callback() {
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let timer = TimerHandle::after(Duration::from_millis(50), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_ticks_until_dropped() {
        let ticks = Arc::new(AtomicU32::new(0));
        let t = ticks.clone();
        let timer = TimerHandle::every(Duration::from_millis(30), move || {
            t.fetch_add(1, Ordering::SeqCst);
        });

        // No immediate tick.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected at least 2 ticks, got {}", seen);

        drop(timer);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_every_with_zero_period_still_ticks() {
        let ticks = Arc::new(AtomicU32::new(0));
        let t = ticks.clone();
        let timer = TimerHandle::every(Duration::ZERO, move || {
            t.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!timer.is_finished());
        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }
}
