use std::sync::Arc;

use cmdflow::{
    Command, CommandError, CommandEventKind, CommandRef, LifecycleState, LightAdapter,
    LightCommand, Parallel, Proxy, Result, ResultStatus, Sequence, value,
};
use cmdflow_test_utils::{EventRecorder, TestCommand, init_tracing};

/// Triples the most recent `u32` in scope.
struct Triple;

impl LightCommand for Triple {
    type Input = Arc<u32>;
    type Output = u64;

    fn run(&self, input: Arc<u32>) -> Result<u64> {
        Ok(u64::from(*input) * 3)
    }
}

/// Sums every `u64` in scope.
struct Total;

impl LightCommand for Total {
    type Input = Vec<Arc<u64>>;
    type Output = String;

    fn run(&self, values: Vec<Arc<u64>>) -> Result<String> {
        let sum: u64 = values.iter().map(|v| **v).sum();
        Ok(format!("total={sum}"))
    }
}

fn light<C: LightCommand>(command: C) -> CommandRef {
    Arc::new(LightAdapter::new(command))
}

#[test]
fn test_nested_groups_share_data() {
    init_tracing();
    let inner = Sequence::builder()
        .name("inner")
        .command(light(Triple))
        .build();
    let outer = Sequence::builder()
        .name("outer")
        .data(value(5u32))
        .command(Arc::clone(&inner) as CommandRef)
        .command(light(Total))
        .build();

    outer.execute().unwrap();
    assert_eq!(inner.phase(), LifecycleState::Completed);
    assert_eq!(outer.phase(), LifecycleState::Completed);

    // The inner scope falls back to the outer one and ends up inside it.
    let inner_data = inner.result().and_then(|r| r.data()).unwrap();
    let outer_data = outer.result().and_then(|r| r.data()).unwrap();
    assert!(Arc::ptr_eq(&inner_data.parent().unwrap(), &outer_data));
    assert_eq!(inner_data.get::<u32>().as_deref(), Some(&5));

    assert_eq!(outer_data.get::<u64>().as_deref(), Some(&15));
    assert_eq!(
        outer_data.get::<String>().as_deref().map(String::as_str),
        Some("total=15")
    );
}

#[test]
fn test_cancel_reaches_grandchildren() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let c = TestCommand::asynchronous("c").shared();
    let par = Parallel::new(vec![Arc::clone(&a) as CommandRef, Arc::clone(&b) as CommandRef]);
    let seq = Sequence::new(vec![Arc::clone(&par) as CommandRef, Arc::clone(&c) as CommandRef]);
    let recorder = EventRecorder::attach(par.events());

    seq.execute().unwrap();
    assert_eq!(a.executions(), 1);
    assert_eq!(b.executions(), 1);

    seq.cancel().unwrap();
    assert_eq!(seq.phase(), LifecycleState::Cancelled);
    assert_eq!(par.phase(), LifecycleState::Cancelled);
    assert_eq!(a.cancellations(), 1);
    assert_eq!(b.cancellations(), 1);
    assert_eq!(c.executions(), 0);
    assert_eq!(recorder.kinds(), vec![CommandEventKind::Cancelled]);
}

#[test]
fn test_grandchild_cancellation_propagates_up() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let c = TestCommand::asynchronous("c").shared();
    let par = Parallel::new(vec![Arc::clone(&a) as CommandRef, Arc::clone(&b) as CommandRef]);
    let seq = Sequence::new(vec![Arc::clone(&par) as CommandRef, Arc::clone(&c) as CommandRef]);

    seq.execute().unwrap();
    a.force_cancel();

    assert_eq!(par.phase(), LifecycleState::Cancelled);
    assert_eq!(seq.phase(), LifecycleState::Cancelled);
    assert_eq!(b.cancellations(), 1);
    assert_eq!(c.executions(), 0);
}

#[test]
fn test_failure_chain_through_nesting() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let par = Parallel::builder()
        .name("inner")
        .command(Arc::clone(&a) as CommandRef)
        .command(Arc::clone(&b) as CommandRef)
        .build();
    let seq = Sequence::builder()
        .name("outer")
        .command(Arc::clone(&par) as CommandRef)
        .build();

    seq.execute().unwrap();
    b.force_fail("boom");

    assert_eq!(a.cancellations(), 1);
    assert_eq!(par.phase(), LifecycleState::Failed);
    let result = seq.result().unwrap();
    assert_eq!(result.status(), ResultStatus::Failed);

    let err = result.error().unwrap();
    let outer = err.exception().unwrap();
    assert_eq!(outer.executor().name, "outer");
    assert_eq!(outer.target().unwrap().name, "inner");

    let inner = outer.cause().exception().unwrap();
    assert_eq!(inner.executor().name, "inner");
    assert_eq!(inner.target().unwrap().name, "b");
    assert!(matches!(err.root_cause(), CommandError::Failed(msg) if msg == "boom"));
    assert!(!err.is_timeout());
}

#[test]
fn test_proxy_value_lands_in_group_scope() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let proxy = Proxy::wrap(Arc::clone(&a) as CommandRef).build();
    let par = Parallel::new(vec![Arc::clone(&proxy) as CommandRef]);

    par.execute().unwrap();
    assert_eq!(proxy.phase(), LifecycleState::Active);

    a.force_complete_with(7u8);
    assert_eq!(proxy.phase(), LifecycleState::Completed);
    assert_eq!(par.phase(), LifecycleState::Completed);
    let data = par.result().and_then(|r| r.data()).unwrap();
    assert_eq!(data.get::<u8>().as_deref(), Some(&7));
}

#[test]
fn test_suspend_and_resume_reach_grandchildren() {
    init_tracing();
    let a = TestCommand::asynchronous("a").shared();
    let b = TestCommand::asynchronous("b").shared();
    let par = Parallel::new(vec![Arc::clone(&a) as CommandRef, Arc::clone(&b) as CommandRef]);
    let seq = Sequence::new(vec![Arc::clone(&par) as CommandRef]);

    seq.execute().unwrap();
    seq.suspend().unwrap();
    assert!(seq.is_suspended());
    assert!(par.is_suspended());
    assert_eq!((a.suspensions(), b.suspensions()), (1, 1));

    seq.resume().unwrap();
    assert_eq!(par.phase(), LifecycleState::Active);
    assert_eq!((a.resumptions(), b.resumptions()), (1, 1));

    a.force_complete(None);
    b.force_complete(None);
    assert_eq!(seq.phase(), LifecycleState::Completed);
}

#[test]
fn test_uncancellable_grandchild_blocks_cancel() {
    init_tracing();
    let a = TestCommand::asynchronous("a").not_cancellable().shared();
    let par = Parallel::new(vec![Arc::clone(&a) as CommandRef]);
    let seq = Sequence::new(vec![Arc::clone(&par) as CommandRef]);

    seq.execute().unwrap();
    assert!(!seq.is_cancellable());
    assert!(matches!(seq.cancel(), Err(CommandError::Usage(_))));
    assert_eq!(seq.phase(), LifecycleState::Active);
}
