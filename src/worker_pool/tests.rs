use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error("action failed: {0}")]
    Action(String),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

fn pool(capacity: usize) -> WorkerPool<TestError> {
    WorkerPool::new("test", capacity)
        .unwrap()
        .with_poll_interval(Duration::from_millis(5))
}

fn wait_until_idle(pool: &WorkerPool<TestError>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.stats().available_slots != pool.capacity() || pool.stats().pending > 0 {
        assert!(Instant::now() < deadline, "pool never became idle");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_rejects_zero_capacity() {
    let result: Result<WorkerPool<TestError>, _> = WorkerPool::new("empty", 0);
    assert!(matches!(result, Err(PoolError::InvalidCapacity)));
}

#[test]
fn test_threads_are_created_lazily() {
    let pool = pool(4);
    let stats = pool.stats();
    assert_eq!(stats.live_workers, 0);
    assert_eq!(stats.available_slots, 4);
    assert_eq!(stats.status, PoolStatus::Open);
}

#[test]
fn test_wait_without_actions_returns_immediately() {
    let pool = pool(2);
    let started = Instant::now();
    pool.wait_for_drain().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!pool.is_working());
}

#[test]
fn test_every_action_runs_exactly_once() {
    let pool = pool(4);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    pool.wait_for_drain().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 100);
    pool.shutdown();
}

#[test]
fn test_never_exceeds_capacity() {
    let pool = pool(3);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..24 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        pool.submit(move || {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert!(pool.stats().live_workers <= 3);
    }

    pool.wait_for_drain().unwrap();
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_capacity_of_one_is_sequential() {
    let pool = pool(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for index in 0..10 {
        let order = Arc::clone(&order);
        pool.submit(move || {
            order.lock().push(index);
            Ok(())
        })
        .unwrap();
    }

    pool.wait_for_drain().unwrap();
    assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_only_first_failure_surfaces() {
    let pool = pool(1);
    pool.submit(|| Err(TestError::Action("first".to_string())))
        .unwrap();
    pool.submit(|| Err(TestError::Action("second".to_string())))
        .unwrap();

    let error = pool.wait_for_drain().unwrap_err();
    assert_eq!(error.to_string(), "action failed: first");
    assert!(pool.has_failed());

    wait_until_idle(&pool);
    // The second failure was logged and dropped
    assert!(pool.wait_for_drain().is_ok());
    assert!(pool.failure_rx.try_recv().is_err());
}

#[test]
fn test_worker_keeps_pulling_after_a_failure() {
    let pool = pool(1);
    let counter = Arc::new(AtomicUsize::new(0));

    pool.submit(|| Err(TestError::Action("boom".to_string())))
        .unwrap();
    for _ in 0..3 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    assert!(pool.wait_for_drain().is_err());
    wait_until_idle(&pool);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_panicking_action_is_reported_as_failure() {
    let pool = pool(2);
    pool.submit(|| panic!("template exploded")).unwrap();

    let error = pool.wait_for_drain().unwrap_err();
    assert!(matches!(
        error,
        TestError::Pool(PoolError::ActionPanicked(ref message)) if message == "template exploded"
    ));
}

#[test]
fn test_shutdown_drops_pending_actions() {
    let pool = pool(1);
    let counter = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = channel::bounded(1);

    pool.submit(move || {
        started_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));
        Ok(())
    })
    .unwrap();
    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    started_rx.recv().unwrap();
    pool.shutdown();

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    let stats = pool.stats();
    assert_eq!(stats.status, PoolStatus::Closed);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.live_workers, 0);
}

#[test]
fn test_shutdown_is_idempotent() {
    let pool = pool(2);
    pool.submit(|| Ok(())).unwrap();
    pool.wait_for_drain().unwrap();

    pool.shutdown();
    let first = pool.stats();
    pool.shutdown();
    assert_eq!(pool.stats(), first);
}

#[test]
fn test_submit_after_shutdown_is_rejected() {
    let pool = pool(2);
    pool.shutdown();
    let result = pool.submit(|| Ok(()));
    assert!(matches!(result, Err(TestError::Pool(PoolError::Closed))));
}

#[test]
fn test_run_scoped_returns_body_value_after_drain() {
    let counter = Arc::new(AtomicUsize::new(0));
    let task_counter = Arc::clone(&counter);

    let value = pool(2)
        .run_scoped(|pool| {
            for _ in 0..10 {
                let counter = Arc::clone(&task_counter);
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
            }
            Ok("done")
        })
        .unwrap();

    assert_eq!(value, "done");
    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[test]
fn test_run_scoped_propagates_first_failure() {
    let result: Result<(), TestError> = pool(2).run_scoped(|pool| {
        pool.submit(|| Err(TestError::Action("compile failed".to_string())))?;
        Ok(())
    });

    assert_eq!(result.unwrap_err().to_string(), "action failed: compile failed");
}

#[test]
fn test_run_scoped_shuts_down_when_body_fails() {
    let counter = Arc::new(AtomicUsize::new(0));
    let task_counter = Arc::clone(&counter);

    let result: Result<(), TestError> = pool(1).run_scoped(|pool| {
        pool.submit(|| {
            thread::sleep(Duration::from_millis(20));
            Ok(())
        })?;
        let counter = Arc::clone(&task_counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })?;
        Err(TestError::Action("body gave up".to_string()))
    });

    assert_eq!(result.unwrap_err().to_string(), "action failed: body gave up");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
