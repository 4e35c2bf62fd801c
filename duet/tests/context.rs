use duet::routine::{self, Step};
use duet::{Error, RuntimeBuilder, Scheduler, Status, Strategy, task};

#[test]
fn test_free_functions_need_a_runtime() {
    assert!(matches!(task::run(|| 1), Err(Error::NoRuntime)));
    assert!(matches!(task::try_run(|| Ok::<_, Error>(1)), Err(Error::NoRuntime)));
    assert!(matches!(task::run_with(Strategy::Custom, || 1), Err(Error::NoRuntime)));
}

#[test]
fn test_free_functions_need_a_scheduler() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    rt.enter(|| {
        assert!(matches!(task::spawn_future(async { 1 }), Err(Error::NoScheduler)));
        assert!(matches!(
            task::spawn_routine(routine::from_fn(|| Ok(Step::Done(1)))),
            Err(Error::NoScheduler)
        ));
    });
}

#[test]
fn test_enter_installs_runtime() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    let answer = rt.enter(|| task::run(|| 21 * 2)).unwrap();

    assert_eq!(answer.wait().unwrap(), Status::Success);
    assert_eq!(answer.result(), Some(&42));

    // The runtime is only current inside `enter`.
    assert!(matches!(task::run(|| 1), Err(Error::NoRuntime)));
}

#[test]
fn test_nested_enter_restores_previous_runtime() {
    let outer = RuntimeBuilder::new().worker_threads(1).thread_name("outer").build().unwrap();
    let inner = RuntimeBuilder::new().worker_threads(1).thread_name("inner").build().unwrap();

    let name = || std::thread::current().name().map(str::to_owned);

    let (first, second) = outer.enter(|| {
        let first = inner.enter(|| task::run(name)).unwrap();
        let second = task::run(name).unwrap();
        (first, second)
    });

    first.wait().unwrap();
    second.wait().unwrap();

    assert!(first.result().unwrap().as_deref().unwrap().starts_with("inner-"));
    assert!(second.result().unwrap().as_deref().unwrap().starts_with("outer-"));
}

#[test]
fn test_routine_starts_background_work() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();
    let mut scheduler = rt.scheduler();

    let report = scheduler.spawn_future(async {
        let job = task::run(|| 6 * 7)?;
        job.completion().await;
        Ok::<_, Error>(job.result().copied())
    });

    scheduler.run_until(&report);

    assert!(matches!(report.result(), Some(Ok(Some(42)))));
}

#[test]
fn test_plain_scheduler_has_no_runtime() {
    let mut scheduler = Scheduler::new();

    let attempt = scheduler.spawn_future(async { task::run(|| 1).map(|_| ()) });
    scheduler.tick();

    assert!(matches!(attempt.result(), Some(Err(Error::NoRuntime))));
}

#[test]
fn test_background_work_sees_its_runtime() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();

    let outer = rt.try_run(|| {
        let inner = task::run_with(Strategy::Custom, || 5)?;
        Ok::<_, Error>(inner.result().copied())
    });

    outer.wait().unwrap();
    assert_eq!(outer.result(), Some(&Some(5)));
}
