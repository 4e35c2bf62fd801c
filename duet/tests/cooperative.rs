use duet::routine::{self, Routine, Step, yield_now};
use duet::{Error, RuntimeBuilder, Scheduler, Status, Strategy, Task, TaskError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// Yields `yields` times, then finishes with `"done"`.
fn countdown(yields: usize) -> impl Routine<Output = &'static str> {
    let mut left = yields;

    routine::from_fn(move || {
        if left == 0 {
            return Ok(Step::Done("done"));
        }
        left -= 1;
        Ok(Step::Yield)
    })
}

/// Records `label` on every step, for `steps` steps.
fn recorder(label: &'static str, log: Arc<Mutex<Vec<&'static str>>>, steps: usize) -> impl Routine<Output = ()> {
    let mut left = steps;

    routine::from_fn(move || {
        log.lock().unwrap().push(label);
        left -= 1;
        Ok(if left == 0 { Step::Done(()) } else { Step::Yield })
    })
}

fn explode() -> u32 {
    panic!("frame dropped")
}

#[test]
fn test_routine_advances_once_per_tick() {
    let mut scheduler = Scheduler::new();

    let task = scheduler.spawn(countdown(3));
    assert_eq!(task.strategy(), Strategy::Cooperative);
    assert_eq!(task.status(), Status::Pending);

    for _ in 0..3 {
        scheduler.tick();
        assert_eq!(task.status(), Status::Running);
    }

    scheduler.tick();
    assert_eq!(task.status(), Status::Success);
    assert_eq!(task.result(), Some(&"done"));
    assert!(scheduler.is_idle());
}

#[test]
fn test_tick_counters() {
    let mut scheduler = Scheduler::new();

    scheduler.spawn(countdown(1));
    scheduler.spawn(routine::from_fn(|| Err::<Step<()>, _>(anyhow::anyhow!("bad step"))));
    assert_eq!(scheduler.len(), 2);

    let first = scheduler.tick();
    assert_eq!(first.registered, 2);
    assert_eq!(first.advanced, 2);
    assert_eq!(first.completed, 0);
    assert_eq!(first.faulted, 1);
    assert_eq!(first.remaining, 1);

    let second = scheduler.tick();
    assert_eq!(second.registered, 0);
    assert_eq!(second.advanced, 1);
    assert_eq!(second.completed, 1);
    assert_eq!(second.remaining, 0);

    let idle = scheduler.tick();
    assert_eq!(idle.advanced, 0);
}

#[test]
fn test_routines_run_in_registration_order() {
    let mut scheduler = Scheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    scheduler.spawn(recorder("a", log.clone(), 2));
    scheduler.spawn(recorder("b", log.clone(), 1));
    scheduler.spawn(recorder("c", log.clone(), 2));

    assert_eq!(scheduler.run_until_idle(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "a", "c"]);
}

#[test]
fn test_registration_during_tick_runs_next_tick() {
    let mut scheduler = Scheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let child = Arc::new(Mutex::new(None));
    let parent = {
        let log = log.clone();
        let child = child.clone();
        routine::from_fn(move || {
            log.lock().unwrap().push("parent");
            let task = duet::task::spawn_routine(recorder("child", log.clone(), 1))?;
            *child.lock().unwrap() = Some(task);
            Ok(Step::Done(()))
        })
    };

    scheduler.spawn(parent);

    let tick = scheduler.tick();
    assert_eq!(tick.advanced, 1);
    assert_eq!(tick.remaining, 1);
    assert_eq!(*log.lock().unwrap(), vec!["parent"]);

    let child = child.lock().unwrap().take().unwrap();
    assert_eq!(child.status(), Status::Pending);

    scheduler.tick();
    assert_eq!(*log.lock().unwrap(), vec!["parent", "child"]);
    assert_eq!(child.status(), Status::Success);
}

#[test]
fn test_routine_error_faults_task() {
    let mut scheduler = Scheduler::new();

    let task = scheduler
        .task()
        .log_errors(false)
        .spawn(routine::from_fn(|| Err::<Step<u32>, _>(anyhow::anyhow!("bad step"))));

    scheduler.tick();

    assert_eq!(task.status(), Status::Faulted);
    assert_eq!(task.fault().unwrap().to_string(), "bad step");
}

#[test]
fn test_routine_panic_faults_task() {
    let mut scheduler = Scheduler::new();

    let task = scheduler.task().log_errors(false).spawn_future(async {
        yield_now().await;
        explode()
    });

    scheduler.tick();
    assert_eq!(task.status(), Status::Running);

    let tick = scheduler.tick();
    assert_eq!(tick.faulted, 1);

    let fault = task.fault().unwrap();
    assert!(fault.is_panic());
    assert_eq!(fault.to_string(), "frame dropped");
}

#[test]
fn test_wait_on_driver_fails_fast() {
    let mut scheduler = Scheduler::new();

    let task = scheduler.spawn(countdown(1));

    match task.wait() {
        Err(Error::WaitOnDriver(id)) => assert_eq!(id, task.id()),
        other => panic!("unexpected wait result: {other:?}"),
    }
    assert!(matches!(
        task.wait_timeout(std::time::Duration::from_millis(1)),
        Err(Error::WaitOnDriver(_))
    ));

    scheduler.run_until_idle();

    // Terminal tasks can be waited on from anywhere.
    assert_eq!(task.wait().unwrap(), Status::Success);
}

#[test]
fn test_wait_from_another_thread() {
    let mut scheduler = Scheduler::new();

    let task = scheduler.spawn(countdown(5));

    let waiter = {
        let task = task.clone();
        thread::spawn(move || task.wait().unwrap())
    };

    scheduler.run_until(&task);

    assert_eq!(waiter.join().unwrap(), Status::Success);
}

#[test]
fn test_cancelled_routine_is_not_advanced() {
    let mut scheduler = Scheduler::new();
    let steps = Arc::new(AtomicUsize::new(0));

    let counter = steps.clone();
    let task = scheduler.spawn(routine::from_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Step::<()>::Yield)
    }));

    scheduler.tick();
    assert_eq!(steps.load(Ordering::SeqCst), 1);

    assert!(task.cancel());
    assert_eq!(task.status(), Status::Cancelled);

    let tick = scheduler.tick();
    assert_eq!(tick.advanced, 0);
    assert_eq!(tick.dropped, 1);
    assert_eq!(tick.remaining, 0);
    assert_eq!(steps.load(Ordering::SeqCst), 1);
    assert_eq!(task.status(), Status::Cancelled);
}

#[test]
fn test_cancel_during_final_step_counts_as_advanced() {
    let mut scheduler = Scheduler::new();
    let slot: Arc<Mutex<Option<Task<u32>>>> = Arc::new(Mutex::new(None));

    let own = slot.clone();
    let task = scheduler.spawn(routine::from_fn(move || {
        if let Some(task) = own.lock().unwrap().as_ref() {
            assert!(task.cancel());
        }
        Ok(Step::Done(1u32))
    }));
    *slot.lock().unwrap() = Some(task.clone());

    let tick = scheduler.tick();

    assert_eq!(tick.advanced, 1);
    assert_eq!(tick.completed, 0);
    assert_eq!(tick.faulted, 0);
    assert_eq!(tick.dropped, 0);
    assert_eq!(tick.remaining, 0);
    assert_eq!(task.status(), Status::Cancelled);
    assert!(task.result().is_none());
}

#[test]
fn test_scheduler_drop_faults_live_tasks() {
    let mut scheduler = Scheduler::new();

    let live = scheduler.task().log_errors(false).spawn(countdown(10));
    scheduler.tick();
    let queued = scheduler.task().log_errors(false).spawn(countdown(10));

    let handle = scheduler.handle().clone();
    drop(scheduler);

    for task in [&live, &queued] {
        assert_eq!(task.status(), Status::Faulted);
        let fault = task.fault().unwrap();
        assert!(matches!(fault.downcast_ref::<Error>(), Some(Error::SchedulerClosed)));
    }

    let late = handle.task().log_errors(false).spawn(countdown(0));
    assert_eq!(late.status(), Status::Faulted);
    assert!(matches!(late.get(), Err(TaskError::Faulted(_))));
}

#[test]
fn test_register_from_another_thread() {
    let mut scheduler = Scheduler::new();
    let handle = scheduler.handle().clone();

    let task = thread::spawn(move || handle.spawn(countdown(0))).join().unwrap();
    assert_eq!(task.status(), Status::Pending);

    let tick = scheduler.tick();
    assert_eq!(tick.registered, 1);
    assert_eq!(task.status(), Status::Success);
}

#[test]
fn test_routine_awaits_background_task() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();
    let mut scheduler = rt.scheduler();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let loader = rt.run(move || {
        gate_rx.recv().unwrap();
        21
    });

    let report = scheduler.spawn_future({
        let loader = loader.clone();
        async move {
            let status = loader.completion().await;
            (status, loader.result().map(|v| v * 2))
        }
    });

    for _ in 0..5 {
        scheduler.tick();
    }
    assert_eq!(report.status(), Status::Running);

    gate_tx.send(()).unwrap();
    scheduler.run_until(&report);

    assert_eq!(report.result(), Some(&(Status::Success, Some(42))));
}

#[test]
fn test_awaiting_task_handle() {
    let mut scheduler = Scheduler::new();

    let first = scheduler.spawn(countdown(2));
    let second = scheduler.spawn_future({
        let first = first.clone();
        async move { first.await }
    });

    scheduler.run_until(&second);

    assert_eq!(first.status(), Status::Success);
    assert_eq!(second.result(), Some(&Status::Success));
}

#[test]
fn test_wait_routine_composes() {
    let mut scheduler = Scheduler::new();

    let first = scheduler.spawn(countdown(3));
    let waiter = scheduler.spawn(first.wait_routine());

    scheduler.run_until(&waiter);

    assert_eq!(first.status(), Status::Success);
    assert_eq!(waiter.result(), Some(&Status::Success));
}

#[test]
fn test_wait_routine_sees_cancellation() {
    let mut scheduler = Scheduler::new();

    let first = scheduler.spawn(countdown(100));
    let waiter = scheduler.spawn(first.wait_routine());

    scheduler.tick();
    first.cancel();
    scheduler.tick();

    assert_eq!(waiter.result(), Some(&Status::Cancelled));
}

#[test]
fn test_try_spawn_future() {
    let mut scheduler = Scheduler::new();

    let ok = scheduler.task().try_spawn_future(async { Ok::<_, anyhow::Error>(1) });
    let err = scheduler
        .task()
        .log_errors(false)
        .try_spawn_future(async { Err::<u32, _>(anyhow::anyhow!("nope")) });

    scheduler.run_until_idle();

    assert_eq!(ok.result(), Some(&1));
    assert_eq!(err.fault().unwrap().to_string(), "nope");
}
