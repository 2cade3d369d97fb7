//! Fixed-size worker pool with one-shot result handles
//!
//! Workers pull closures from a single FIFO queue guarded by a mutex and
//! condition variable. [`AsyncExecutor::submit`] returns a [`TaskHandle`]
//! that resolves exactly once. After shutdown, queued tasks are dropped and
//! their handles resolve to [`SimilarityError::ThreadingError`].

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::{Condvar, Mutex};

use crate::algorithms::base::panic_message;
use crate::error::SimilarityError;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
}

/// Future-style handle for a submitted task.
#[must_use = "a task handle does nothing unless waited on"]
pub struct TaskHandle<T> {
    rx: Receiver<Result<T, SimilarityError>>,
}

impl<T> TaskHandle<T> {
    /// A handle that is already resolved.
    pub fn ready(result: Result<T, SimilarityError>) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block until the task finishes.
    pub fn wait(self) -> Result<T, SimilarityError> {
        self.rx.recv().unwrap_or_else(|_| {
            Err(SimilarityError::ThreadingError(
                "task was dropped before it ran".to_string(),
            ))
        })
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ready", &!self.rx.is_empty())
            .finish()
    }
}

/// Worker-thread pool consuming a shared FIFO task queue.
pub struct AsyncExecutor {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    thread_count: usize,
}

impl Default for AsyncExecutor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AsyncExecutor {
    /// Start `threads` workers; 0 means one per available core.
    pub fn new(threads: usize) -> Self {
        let thread_count = if threads == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            threads
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("textsim-worker-{index}"))
                .spawn(move || worker_loop(&shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::warn!(index, error = %e, "failed to spawn worker thread"),
            }
        }

        let thread_count = workers.len();
        tracing::info!(threads = thread_count, "executor started");

        Self {
            shared,
            workers: Mutex::new(workers),
            thread_count,
        }
    }

    /// Queue `job` for execution on a worker thread.
    pub fn submit<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SimilarityError> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let task: Task = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
                Err(SimilarityError::Unknown(format!(
                    "task panicked: {}",
                    panic_message(&*payload)
                )))
            });
            let _ = tx.send(result);
        });

        {
            let mut state = self.shared.state.lock();
            if state.shutdown || self.thread_count == 0 {
                return TaskHandle::ready(Err(SimilarityError::ThreadingError(
                    "executor is shut down".to_string(),
                )));
            }
            state.tasks.push_back(task);
        }
        self.shared.available.notify_one();

        TaskHandle { rx }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Tasks queued but not yet picked up by a worker.
    pub fn pending_tasks(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Stop accepting work, reject queued tasks and join the workers.
    ///
    /// Tasks already running finish normally. Idempotent.
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            std::mem::take(&mut state.tasks)
        };
        self.shared.available.notify_all();

        let rejected = dropped.len();
        // Dropping the closures drops their senders, resolving the handles
        drop(dropped);

        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::warn!("worker thread panicked during shutdown");
            }
        }

        tracing::info!(rejected, "executor shut down");
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(task) = state.tasks.pop_front() {
                    break task;
                }
                shared.available.wait(&mut state);
            }
        };
        task();
    }
}
