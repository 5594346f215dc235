//! One-shot expiry timer.
//!
//! At most one timer is outstanding: arming replaces the previous timer,
//! and a replaced timer never fires even if its sleep already elapsed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

#[derive(Default)]
struct Armed {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct ExpiryScheduler {
    armed: Arc<Mutex<Armed>>,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_expire` once after `duration`, cancelling any earlier timer.
    ///
    /// A zero duration fires on the next turn of the runtime. Must be called
    /// from within a tokio runtime; otherwise nothing is armed.
    pub fn arm<F>(&self, duration: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "No async runtime available, expiry timer not armed");
                return;
            }
        };

        let mut armed = self.armed.lock();
        if let Some(previous) = armed.handle.take() {
            previous.abort();
        }
        armed.generation += 1;
        let generation = armed.generation;
        let slot = Arc::clone(&self.armed);

        debug!(delay_ms = duration.as_millis() as u64, generation, "Arming expiry timer");
        armed.handle = Some(runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            {
                let mut armed = slot.lock();
                if armed.generation != generation {
                    return;
                }
                armed.handle = None;
            }
            debug!(generation, "Expiry timer fired");
            on_expire();
        }));
    }

    /// Disarm without firing. No-op when nothing is armed.
    pub fn cancel(&self) {
        let mut armed = self.armed.lock();
        // Bump the generation so a timer already past its sleep stands down
        armed.generation += 1;
        if let Some(handle) = armed.handle.take() {
            debug!("Cancelling expiry timer");
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.lock().handle.is_some()
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let make = move || {
            let c = Arc::clone(&c);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_duration() {
        let scheduler = ExpiryScheduler::new();
        let (count, make) = counter();

        scheduler.arm(Duration::from_secs(10), make());
        assert!(scheduler.is_armed());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let scheduler = ExpiryScheduler::new();
        let (count, make) = counter();

        scheduler.arm(Duration::from_secs(10), make());
        tokio::time::sleep(Duration::from_secs(5)).await;
        scheduler.arm(Duration::from_secs(20), make());

        // The old deadline passes without firing
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let scheduler = ExpiryScheduler::new();
        let (count, make) = counter();

        scheduler.arm(Duration::from_secs(10), make());
        scheduler.cancel();
        assert!(!scheduler.is_armed());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let scheduler = ExpiryScheduler::new();
        scheduler.cancel();
        scheduler.cancel();
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_fires_promptly() {
        let scheduler = ExpiryScheduler::new();
        let (count, make) = counter();

        scheduler.arm(Duration::ZERO, make());
        // Not run synchronously inside arm
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_arm_without_runtime_does_not_panic() {
        let scheduler = ExpiryScheduler::new();
        let (count, make) = counter();
        scheduler.arm(Duration::from_secs(1), make());
        assert!(!scheduler.is_armed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
