//! C4 — WorkExecutor: a bounded worker pool with quiescence detection.
//!
//! Grounded on `features/points_to/infrastructure/parallel_andersen.rs`'s
//! hand-rolled `SegQueue` (`Mutex<VecDeque<T>>`) — this codebase does not
//! depend on `crossbeam`, so a condvar-guarded `Mutex<VecDeque<Job>>` is the
//! idiom to follow rather than reaching for a work-stealing queue. Unlike
//! `parallel_andersen.rs`'s polling-based termination, §5 requires
//! quiescence to be awaited "via a counting primitive (no busy-wait)", so
//! completion here blocks on a `Condvar` instead of spinning.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::error::SolverError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    not_empty: Condvar,
    in_flight: AtomicU64,
    quiescent_lock: Mutex<()>,
    quiescent: Condvar,
    shutdown: AtomicBool,
    fault: Mutex<Option<SolverError>>,
}

/// Bounded worker pool consuming path-edge and value-propagation tasks
/// (§5). Tasks are arbitrary closures so `TabulationEngine`/`ValueComputation`
/// can capture whatever shared `Arc` state they need without this module
/// knowing about path edges or jump functions at all.
pub struct WorkExecutor {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkExecutor {
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            in_flight: AtomicU64::new(0),
            quiescent_lock: Mutex::new(()),
            quiescent: Condvar::new(),
            shutdown: AtomicBool::new(false),
            fault: Mutex::new(None),
        });

        let workers = (0..num_threads)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Schedule a task. May be called from within a running task (workers
    /// enqueue further work; they never block waiting on each other).
    pub fn submit(&self, job: Job) {
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        self.shared.queue.lock().push_back(job);
        self.shared.not_empty.notify_one();
    }

    /// Block until the queue is empty and no task is in flight. Returns the
    /// first client-function fault observed, if any (§7).
    pub fn await_completion(&self) -> Result<(), SolverError> {
        let mut guard = self.shared.quiescent_lock.lock();
        while !self.is_quiescent() {
            self.shared.quiescent.wait(&mut guard);
        }
        if let Some(err) = self.shared.fault.lock().take() {
            return Err(err);
        }
        Ok(())
    }

    fn is_quiescent(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) == 0 && self.shared.queue.lock().is_empty()
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkExecutor {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.not_empty.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.shutdown.load(Ordering::SeqCst) {
                    break None;
                }
                shared.not_empty.wait(&mut queue);
            }
        };

        let Some(job) = job else { return };

        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            let mut fault = shared.fault.lock();
            if fault.is_none() {
                *fault = Some(SolverError::from_panic_payload(payload));
            }
        }

        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _guard = shared.quiescent_lock.lock();
        shared.quiescent.notify_all();
    }
}
