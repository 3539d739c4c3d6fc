//! Cooperative pause gate and pause-aware timeout accounting.
//!
//! Every retry/poll loop in this crate consults the gate at the top of each
//! iteration. An external operator may flip the gate from another thread at
//! any time; suspension adds wall-clock delay but never corrupts in-flight
//! counters. Timeouts are tracked on an [`ActiveTimer`] that is credited with
//! time spent paused, so a long pause cannot expire a detection window on its
//! own.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Process-wide suspend flag shared by every blocking loop of a run.
///
/// Cloning produces another handle to the same gate. The gate performs no
/// world actions; it only suspends the calling thread.
#[derive(Clone, Default)]
pub struct PauseGate {
    inner: Arc<GateInner>,
}

#[derive(Default)]
struct GateInner {
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend the run at the next poll point.
    pub fn pause(&self) {
        let mut paused = self.lock();
        if !*paused {
            debug!("run paused");
        }
        *paused = true;
    }

    /// Clear the suspend flag and wake blocked loops.
    pub fn resume(&self) {
        let mut paused = self.lock();
        if *paused {
            debug!("run resumed");
        }
        *paused = false;
        self.inner.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.lock()
    }

    /// Block until the suspend flag is clear.
    ///
    /// Returns the wall-clock time spent blocked, zero when the gate was
    /// open. Callers holding a timeout credit the returned duration into
    /// their [`ActiveTimer`].
    pub fn wait_if_paused(&self) -> Duration {
        let mut paused = self.lock();
        if !*paused {
            return Duration::ZERO;
        }
        let blocked_at = Instant::now();
        while *paused {
            paused = self
                .inner
                .resumed
                .wait(paused)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let blocked = blocked_at.elapsed();
        debug!(blocked_ms = blocked.as_millis() as u64, "pause released");
        blocked
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.inner
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A deadline measured in active (unpaused) time.
#[derive(Debug, Clone)]
pub struct ActiveTimer {
    started: Instant,
    limit: Duration,
    credited: Duration,
}

impl ActiveTimer {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
            credited: Duration::ZERO,
        }
    }

    /// Exclude `paused` from this timer's elapsed time.
    pub fn credit(&mut self, paused: Duration) {
        self.credited += paused;
    }

    /// Active time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed().saturating_sub(self.credited)
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn open_gate_does_not_block() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
        assert_eq!(gate.wait_if_paused(), Duration::ZERO);
    }

    #[test]
    fn wait_blocks_until_resumed_and_reports_blocked_time() {
        let gate = PauseGate::new();
        gate.pause();

        let resumer = gate.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            resumer.resume();
        });

        let blocked = gate.wait_if_paused();
        handle.join().expect("resumer thread");
        assert!(blocked >= Duration::from_millis(40), "blocked {blocked:?}");
        assert!(!gate.is_paused());
    }

    #[test]
    fn credited_pause_time_does_not_expire_the_timer() {
        let mut timer = ActiveTimer::new(Duration::from_millis(50));
        thread::sleep(Duration::from_millis(60));
        // Pretend the entire sleep was spent paused.
        timer.credit(Duration::from_millis(60));
        assert!(!timer.expired(), "elapsed {:?}", timer.elapsed());
    }

    #[test]
    fn uncredited_time_expires_the_timer() {
        let timer = ActiveTimer::new(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(20));
        assert!(timer.expired());
    }
}
