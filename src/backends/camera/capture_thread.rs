// SPDX-License-Identifier: GPL-3.0-only

//! Dedicated threads for frame capture
//!
//! A capture source pumps frames on its own thread so the blocking dequeue
//! never runs on the async runtime. The thread owns everything it captures
//! with (device, stream, sink); [`CaptureThread::stop`] raises the
//! [`StopSignal`] and joins, so the device is closed once it returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Granularity of [`StopSignal::sleep`]
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Stop request shared between a capture thread and its owner
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Sleep for `duration` unless a stop is requested first
    ///
    /// Returns false if the sleep was cut short by a stop request.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// A running capture thread
pub struct CaptureThread {
    name: String,
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

impl CaptureThread {
    /// Spawn `body` on a new thread
    ///
    /// `body` must return soon after `stop.is_stopped()` becomes true. An
    /// error ends the thread early and is logged; the frame sink moved into
    /// `body` is dropped with it, which tells the consumer the stream ended.
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(&StopSignal) -> Result<(), String> + Send + 'static,
    {
        let stop = StopSignal::default();
        let thread_stop = stop.clone();
        let thread_name = name.to_string();

        info!(name, "Spawning capture thread");
        let handle = thread::spawn(move || {
            match body(&thread_stop) {
                Ok(()) => debug!(name = %thread_name, "Capture thread finished"),
                Err(e) => warn!(name = %thread_name, error = %e, "Capture thread failed"),
            }
        });

        Self {
            name: name.to_string(),
            stop,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread body is still executing
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request a stop and wait for the thread to exit
    pub fn stop(&mut self) {
        self.stop.raise();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!(name = %self.name, "Capture thread panicked");
        } else {
            debug!(name = %self.name, "Capture thread joined");
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_stop_joins_running_thread() {
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_clone = Arc::clone(&ticks);

        let mut capture = CaptureThread::spawn("ticker", move |stop| {
            while stop.sleep(Duration::from_millis(2)) {
                ticks_clone.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        });

        thread::sleep(Duration::from_millis(30));
        assert!(capture.is_running());
        capture.stop();
        assert!(!capture.is_running());

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(15));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_failed_body_ends_thread() {
        let mut capture = CaptureThread::spawn("broken", |_| Err("no device".to_string()));
        thread::sleep(Duration::from_millis(20));
        assert!(!capture.is_running());
        capture.stop();
    }

    #[test]
    fn test_sleep_returns_early_on_stop() {
        let stop = StopSignal::default();
        let remote = stop.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.raise();
        });

        let start = Instant::now();
        assert!(!stop.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        waker.join().unwrap();
    }

    #[test]
    fn test_sleep_completes_without_stop() {
        assert!(StopSignal::default().sleep(Duration::from_millis(5)));
    }
}
