//! Hand-rolled worker pool: a fixed set of threads draining a FIFO
//! task queue, with a `drain()` barrier and a cooperative abort flag.
//!
//! `rayon`'s `par_iter()` (the teacher's original parallelism tool)
//! doesn't expose a persistent queue, a drain barrier, or cooperative
//! abort — batch mode needs all three (§4.6), so this is built directly
//! on `std::sync::{Mutex, Condvar}` and `std::thread` instead.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    queue_cv: Condvar,
    active: Mutex<usize>,
    idle_cv: Condvar,
    shutdown: AtomicBool,
    abort: AtomicBool,
}

/// A bounded set of worker threads that pull closures off a shared
/// FIFO queue. Dropping the pool joins every thread after signalling
/// shutdown.
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            active: Mutex::new(0),
            idle_cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
            abort: AtomicBool::new(false),
        });

        let handles = (0..num_threads)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Self { shared, handles }
    }

    /// Queue a task. Ignored once the pool is shutting down or an
    /// abort has been raised, so a `stop_on_error` batch stops
    /// accepting new work as soon as the flag flips.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.shutdown.load(Ordering::SeqCst) || self.shared.abort.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(Box::new(task));
        }
        self.shared.queue_cv.notify_one();
    }

    /// Raise the cooperative abort flag; already-queued tasks whose
    /// closures check `is_aborted()` can bail early, and `submit` stops
    /// accepting new work immediately.
    pub fn abort(&self) {
        self.shared.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.abort.load(Ordering::SeqCst)
    }

    /// Block until the queue is empty and no worker is mid-task.
    pub fn drain(&self) {
        let mut active = self.shared.active.lock().unwrap();
        loop {
            let queue_empty = self.shared.queue.lock().unwrap().is_empty();
            if queue_empty && *active == 0 {
                return;
            }
            active = self.shared.idle_cv.wait(active).unwrap();
        }
    }

    /// Signal shutdown and join every worker thread. Any tasks still
    /// queued when this is called are dropped unrun.
    pub fn shutdown(mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.queue_cv.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if shared.shutdown.load(Ordering::SeqCst) {
                    break None;
                }
                queue = shared.queue_cv.wait(queue).unwrap();
            }
        };

        let Some(task) = task else { return };

        {
            let mut active = shared.active.lock().unwrap();
            *active += 1;
        }

        task();

        {
            let mut active = shared.active.lock().unwrap();
            *active -= 1;
            if *active == 0 && shared.queue.lock().unwrap().is_empty() {
                shared.idle_cv.notify_all();
            }
        }
    }
}
