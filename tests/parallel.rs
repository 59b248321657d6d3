use std::sync::Arc;

use cmdflow::{
    Command, CommandError, CommandEventKind, CommandRef, LifecycleState, Parallel, ResultStatus,
    SuspendableCommand,
};
use cmdflow_test_utils::{EventRecorder, TestCommand, init_tracing, start_log};

fn refs(cmds: &[&Arc<TestCommand>]) -> Vec<CommandRef> {
    cmds.iter().map(|c| Arc::clone(c) as CommandRef).collect()
}

#[test]
fn test_all_children_start_immediately() {
    init_tracing();
    let cmds: Vec<_> = (0..4)
        .map(|i| TestCommand::asynchronous(&format!("c{i}")).shared())
        .collect();
    let group = Parallel::new(cmds.iter().map(|c| c.clone() as CommandRef).collect());

    group.execute().unwrap();
    for c in &cmds {
        assert_eq!(c.executions(), 1);
        assert_eq!(c.phase(), LifecycleState::Active);
    }
    assert_eq!(group.active_count(), 4);

    // Finish out of order; only the last one completes the group.
    for i in [2, 0, 3] {
        cmds[i].force_complete_with(i);
        assert_eq!(group.phase(), LifecycleState::Active);
    }
    cmds[1].force_complete_with(1usize);

    assert_eq!(group.phase(), LifecycleState::Completed);
    assert_eq!(group.finished(), 4);
    let data = group.result().and_then(|r| r.data()).unwrap();
    let mut values: Vec<usize> = data.all::<usize>().iter().map(|v| **v).collect();
    values.sort();
    assert_eq!(values, vec![0, 1, 2, 3]);
}

#[test]
fn test_empty_parallel_completes_immediately() {
    init_tracing();
    let group = Parallel::new(Vec::new());
    group.execute().unwrap();

    let result = group.result().unwrap();
    assert_eq!(result.status(), ResultStatus::Completed);
    assert!(result.value().is_none());
    assert!(group.data().is_empty());
}

#[test]
fn test_sync_children_complete_group_inline() {
    init_tracing();
    let log = start_log();
    let a = TestCommand::sync_value("a", 1u8).logging_to(&log).shared();
    let b = TestCommand::sync_value("b", 2u8).logging_to(&log).shared();
    let group = Parallel::new(refs(&[&a, &b]));

    group.execute().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(group.phase(), LifecycleState::Completed);
}

#[test]
fn test_skip_failures_completes_with_surviving_value() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let group = Parallel::builder()
        .skip_failures(true)
        .commands(refs(&[&a, &b]))
        .build();
    let recorder = EventRecorder::attach(group.events());

    group.execute().unwrap();
    a.force_fail("a broke");
    assert_eq!(group.phase(), LifecycleState::Active);

    b.force_complete_with(7i32);
    assert_eq!(recorder.kinds(), vec![CommandEventKind::Completed]);

    let data = recorder.last_result().and_then(|r| r.data()).unwrap();
    assert_eq!(data.get::<i32>().as_deref(), Some(&7));
    let last = data.last().unwrap();
    assert_eq!(last.downcast_ref::<i32>(), Some(&7));
}

#[test]
fn test_failure_cancels_siblings() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let c = TestCommand::asynchronous("c").shared();
    let group = Parallel::new(refs(&[&a, &b, &c]));

    group.execute().unwrap();
    b.force_fail("b broke");

    assert_eq!(group.phase(), LifecycleState::Failed);
    assert_eq!(a.cancellations(), 1);
    assert_eq!(c.cancellations(), 1);
    assert_eq!(b.cancellations(), 0);

    let err = group.result().unwrap().error().cloned().unwrap();
    let exception = err.exception().unwrap();
    assert_eq!(exception.target().map(|t| t.id), Some(b.id()));
    assert_eq!(exception.executor().id, group.id());
}

#[test]
fn test_raising_child_stops_remaining_starts() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::raising("b", "bad").shared();
    let c = TestCommand::asynchronous("c").shared();
    let group = Parallel::new(refs(&[&a, &b, &c]));

    group.execute().unwrap();

    assert_eq!(group.phase(), LifecycleState::Failed);
    assert_eq!(a.cancellations(), 1);
    assert_eq!(c.executions(), 0);
}

#[test]
fn test_added_command_starts_while_running() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let late = TestCommand::asynchronous("late").shared();
    let group = Parallel::new(refs(&[&a]));

    group.execute().unwrap();
    group.add_command(late.clone());
    assert_eq!(late.executions(), 1);

    a.force_complete(None);
    assert_eq!(group.phase(), LifecycleState::Active);
    late.force_complete(None);
    assert_eq!(group.phase(), LifecycleState::Completed);
}

#[test]
fn test_added_command_before_execute_waits() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let group = Parallel::new(Vec::new());
    group.add_command(a.clone());
    assert_eq!(a.executions(), 0);

    group.execute().unwrap();
    assert_eq!(a.executions(), 1);
}

#[test]
fn test_cancel_reaches_every_active_child() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let group = Parallel::new(refs(&[&a, &b]));
    let recorder = EventRecorder::attach(group.events());

    group.execute().unwrap();
    group.cancel().unwrap();

    assert_eq!(a.phase(), LifecycleState::Cancelled);
    assert_eq!(b.phase(), LifecycleState::Cancelled);
    assert_eq!(recorder.kinds(), vec![CommandEventKind::Cancelled]);

    // Children finishing late no longer reach the group.
    assert!(!a.force_complete(None));
    assert_eq!(group.phase(), LifecycleState::Cancelled);
}

#[test]
fn test_suspend_skips_children_already_suspended() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let group = Parallel::new(refs(&[&a, &b]));
    group.execute().unwrap();

    use cmdflow::SuspendableCommand;
    SuspendableCommand::suspend(&*a).unwrap();
    group.suspend().unwrap();

    assert_eq!(a.suspensions(), 1);
    assert_eq!(b.suspensions(), 1);
    assert!(group.is_suspended());

    group.resume().unwrap();
    assert_eq!(a.resumptions(), 1);
    assert_eq!(b.resumptions(), 1);
}

#[test]
fn test_group_is_as_cancellable_as_weakest_child() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").not_cancellable().shared();
    let group = Parallel::new(refs(&[&a, &b]));

    assert!(group.is_cancellable());
    group.execute().unwrap();
    assert!(!group.is_cancellable());
    assert!(matches!(group.cancel(), Err(CommandError::Usage(_))));

    b.force_complete(None);
    assert!(group.is_cancellable());
    group.cancel().unwrap();
    assert_eq!(a.cancellations(), 1);
}

#[test]
fn test_completion_while_suspended_is_reported_on_resume() {
    init_tracing();
    let d = TestCommand::asynchronous("d").shared();
    let group = Parallel::new(refs(&[&d]));
    let recorder = EventRecorder::attach(group.events());

    group.execute().unwrap();
    group.suspend().unwrap();
    let c = TestCommand::asynchronous("c").shared();
    group.add_command(c.clone());
    assert_eq!(c.executions(), 1);

    SuspendableCommand::resume(&*d).unwrap();
    d.force_complete_with(1u8);
    c.force_complete_with(2u8);
    assert_eq!(group.active_count(), 0);
    assert_eq!(group.phase(), LifecycleState::Suspended);
    assert!(group.result().is_none());

    group.resume().unwrap();
    assert_eq!(group.phase(), LifecycleState::Completed);
    let data = group.result().and_then(|r| r.data()).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(
        recorder.kinds(),
        vec![
            CommandEventKind::Suspended,
            CommandEventKind::Resumed,
            CommandEventKind::Completed,
        ]
    );
}
