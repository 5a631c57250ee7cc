//! The cooperative world thread.
//!
//! The host runtime owns one single-threaded executor per world; every read
//! of ECS state must happen on it. [`WorldThread`] models that executor as
//! a dedicated OS thread with a job queue: queued jobs are drained to
//! completion before each fixed-rate world tick, so the component store is
//! never touched mid-tick from outside.
//!
//! Jobs run to completion — there is no mid-run cancellation. Callers that
//! need a result pair the job with a one-shot channel and time out on their
//! own side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::world::HostWorld;

/// A unit of work scheduled onto the world thread.
pub type WorldJob = Box<dyn FnOnce(&HostWorld) + Send + 'static>;

/// A cloneable handle for posting jobs to a running [`WorldThread`].
#[derive(Clone)]
pub struct WorldHandle {
    world: Arc<HostWorld>,
    tx: mpsc::Sender<WorldJob>,
    running: Arc<AtomicBool>,
}

impl WorldHandle {
    /// The world this handle schedules onto.
    #[must_use]
    pub fn world(&self) -> &Arc<HostWorld> {
        &self.world
    }

    /// Post a job onto the world thread's cooperative queue.
    ///
    /// Returns `false` if the thread has already stopped; the job is
    /// dropped in that case.
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce(&HostWorld) + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            warn!(world = self.world.id(), "world thread gone, job dropped");
            return false;
        }
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// A dedicated thread that owns a world's tick loop and job queue.
pub struct WorldThread {
    handle: WorldHandle,
    join: Option<JoinHandle<()>>,
}

impl WorldThread {
    /// Spawn the world thread at the given tick rate.
    pub fn spawn(world: Arc<HostWorld>, tick_rate: f64) -> Self {
        let (tx, rx) = mpsc::channel::<WorldJob>();
        let running = Arc::new(AtomicBool::new(true));

        let handle = WorldHandle {
            world: world.clone(),
            tx,
            running: running.clone(),
        };

        let thread_world = world.clone();
        let thread_running = running.clone();
        let tick_duration = Duration::from_secs_f64(1.0 / tick_rate.max(1.0));

        let join = std::thread::Builder::new()
            .name(format!("world-{}", world.id()))
            .spawn(move || {
                info!(
                    world = thread_world.id(),
                    tick_rate, "world thread started"
                );
                while thread_running.load(Ordering::Relaxed) {
                    let deadline = Instant::now() + tick_duration;

                    // Drain queued jobs until the next tick is due.
                    loop {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        match rx.recv_timeout(remaining) {
                            Ok(job) => job(&thread_world),
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => {
                                debug!(world = thread_world.id(), "job queue closed");
                                return;
                            }
                        }
                    }

                    thread_world.tick();
                }
                info!(world = thread_world.id(), "world thread stopped");
            })
            .expect("failed to spawn world thread");

        Self {
            handle,
            join: Some(join),
        }
    }

    /// A handle for scheduling jobs from other threads.
    #[must_use]
    pub fn handle(&self) -> WorldHandle {
        self.handle.clone()
    }

    /// Stop the thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.handle.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for WorldThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;
    use crate::clock::FixedClock;

    fn make_world() -> Arc<HostWorld> {
        HostWorld::new("w", "Test", Arc::new(FixedClock::new(0, 1.0)))
    }

    #[test]
    fn test_jobs_run_on_world_thread() {
        let world = make_world();
        let mut thread = WorldThread::spawn(world, 100.0);
        let handle = thread.handle();

        let (tx, rx) = channel();
        assert!(handle.execute(move |world| {
            let _ = tx.send(world.id().to_string());
        }));

        let id = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(id, "w");
        thread.stop();
    }

    #[test]
    fn test_ticks_advance_while_idle() {
        let world = make_world();
        let mut thread = WorldThread::spawn(world.clone(), 200.0);
        std::thread::sleep(Duration::from_millis(100));
        thread.stop();
        assert!(world.tick_count() > 0);
    }

    #[test]
    fn test_execute_after_stop_is_rejected() {
        let world = make_world();
        let mut thread = WorldThread::spawn(world, 100.0);
        thread.stop();
        let handle = thread.handle();
        assert!(!handle.is_running());
        assert!(!handle.execute(|_| {}));
    }
}
