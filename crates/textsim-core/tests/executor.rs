//! Executor shutdown and ordering tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use textsim_core::{AsyncExecutor, SimilarityError};

#[test]
fn test_single_worker_runs_fifo() {
    let executor = AsyncExecutor::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let order = Arc::clone(&order);
            executor.submit(move || {
                order.lock().push(i);
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle.wait().unwrap();
    }

    assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
}

#[test]
fn test_shutdown_rejects_queued_and_finishes_running() {
    let executor = AsyncExecutor::new(1);
    let started = Arc::new(Barrier::new(2));
    let finished = Arc::new(AtomicUsize::new(0));

    let running = {
        let started = Arc::clone(&started);
        let finished = Arc::clone(&finished);
        executor.submit(move || {
            started.wait();
            thread::sleep(Duration::from_millis(50));
            finished.fetch_add(1, Ordering::SeqCst);
            Ok("done")
        })
    };
    started.wait();

    let queued: Vec<_> = (0..5).map(|_| executor.submit(|| Ok("never"))).collect();
    assert_eq!(executor.pending_tasks(), 5);

    executor.shutdown();

    assert_eq!(running.wait(), Ok("done"));
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    for handle in queued {
        assert!(matches!(handle.wait(), Err(SimilarityError::ThreadingError(_))));
    }
    assert_eq!(executor.pending_tasks(), 0);
}

#[test]
fn test_workers_run_concurrently() {
    let executor = AsyncExecutor::new(3);
    let barrier = Arc::new(Barrier::new(3));

    // Each task blocks until all three are running at once
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            executor.submit(move || {
                barrier.wait();
                Ok(i)
            })
        })
        .collect();
    let total: i32 = handles.into_iter().map(|h| h.wait().unwrap()).sum();
    assert_eq!(total, 3);
}

#[test]
fn test_drop_joins_workers() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let executor = AsyncExecutor::new(2);
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            let handle = executor.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            handle.wait().unwrap();
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[test]
fn test_ready_handle() {
    let handle = textsim_core::TaskHandle::ready(Ok(5u32));
    assert_eq!(handle.wait(), Ok(5));
}
