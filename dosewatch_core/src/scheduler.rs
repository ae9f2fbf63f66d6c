//! Periodic tick scheduler for the engine.
//!
//! A cancellable once-per-second task bound to a shared engine. Mutators
//! already recompute synchronously, so the ticker only drives time
//! passage: countdown decay, risk transitions, and the idle-gap
//! auto-split. Stopping the ticker is the only cancellation concept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::engine::Engine;

/// Handle to a running tick loop; dropping it stops the loop
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a tick loop over a shared engine
    pub fn spawn(engine: Arc<Mutex<Engine>>, period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            tracing::debug!("Tick loop started (period {:?})", period);
            while !stop_flag.load(Ordering::Relaxed) {
                {
                    let mut engine = engine.lock().expect("engine poisoned");
                    engine.tick();
                }
                std::thread::sleep(period);
            }
            tracing::debug!("Tick loop stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Spawn with the standard one-second period
    pub fn spawn_per_second(engine: Arc<Mutex<Engine>>) -> Self {
        Self::spawn(engine, Duration::from_secs(1))
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
