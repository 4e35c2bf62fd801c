use duet::routine::{self, Step};
use duet::{AnyTask, Error, RuntimeBuilder, Scheduler, Status, Strategy, Task, TaskSet};
use std::sync::mpsc;

#[test]
fn test_wait_all_mixed_types() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();

    let number = rt.run(|| 1u32);
    let text = rt.run(|| String::from("two"));
    let ready = Task::from_value(3.0f64);

    let mut set = TaskSet::new();
    set.insert(number.clone());
    set.insert(text.clone());
    set.insert(ready);
    assert_eq!(set.len(), 3);

    let finished = set.wait_all().unwrap();

    assert_eq!(finished.len(), 3);
    assert!(finished.iter().all(|(_, status)| *status == Status::Success));
    assert!(set.is_empty());
    assert_eq!(number.result(), Some(&1));
    assert_eq!(text.result().map(String::as_str), Some("two"));
}

#[test]
fn test_wait_any_returns_first_finished() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let slow = rt.run(move || gate_rx.recv().unwrap());
    let ready = Task::from_value(1);

    let mut set = TaskSet::new();
    set.insert(slow.clone());
    set.insert(ready.clone());

    assert_eq!(set.wait_any().unwrap(), Some((ready.id(), Status::Success)));
    assert_eq!(set.len(), 1);

    gate_tx.send(()).unwrap();
    assert_eq!(set.wait_any().unwrap(), Some((slow.id(), Status::Success)));
    assert_eq!(set.wait_any().unwrap(), None);
}

#[test]
fn test_cancel_all() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    let (_gate_tx, gate_rx) = mpsc::channel::<()>();
    let blocked = rt.run(move || {
        let _ = gate_rx.recv();
    });
    let queued = rt.run(|| 2);

    let mut set = TaskSet::new();
    set.insert(blocked.clone());
    set.insert(queued.clone());

    set.cancel_all();

    assert!(set.is_empty());
    assert_eq!(blocked.status(), Status::Cancelled);
    assert_eq!(queued.status(), Status::Cancelled);
}

#[test]
fn test_drop_cancels_remaining() {
    let mut scheduler = Scheduler::new();
    let endless = scheduler.spawn(routine::from_fn(|| Ok(Step::<()>::Yield)));

    {
        let mut set = TaskSet::new();
        set.insert(endless.clone());
    }

    assert_eq!(endless.status(), Status::Cancelled);

    let tick = scheduler.tick();
    assert_eq!(tick.dropped, 1);
}

#[test]
fn test_wait_any_on_driver_fails_fast() {
    let scheduler = Scheduler::new();
    let task = scheduler.spawn(routine::from_fn(|| Ok(Step::Done(1))));

    let mut set = TaskSet::new();
    set.insert(task.clone());

    assert!(matches!(set.wait_any(), Err(Error::WaitOnDriver(id)) if id == task.id()));
    assert!(matches!(set.wait_all(), Err(Error::WaitOnDriver(_))));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_join_next_from_routine() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();
    let mut scheduler = rt.scheduler();

    let mut set = TaskSet::new();
    set.insert(rt.run(|| 1));
    set.insert(rt.run(|| 2));

    let collector = scheduler.spawn_future(async move {
        let mut finished = 0;
        while let Some((_, status)) = set.join_next().await {
            assert_eq!(status, Status::Success);
            finished += 1;
        }
        finished
    });

    scheduler.run_until(&collector);

    assert_eq!(collector.result(), Some(&2));
}

#[test]
fn test_iter_exposes_untyped_view() {
    let mut set = TaskSet::new();
    set.insert(Task::from_value(1));
    set.insert(Task::<String>::from_error(anyhow::anyhow!("nope")));

    let statuses: Vec<_> = set.iter().map(AnyTask::status).collect();
    assert_eq!(statuses, vec![Status::Success, Status::Faulted]);

    assert!(set.iter().all(|task| task.strategy() == Strategy::Custom));
    assert_eq!(set.iter().filter_map(AnyTask::fault).count(), 1);
}
