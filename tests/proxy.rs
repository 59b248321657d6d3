use std::sync::Arc;
use std::time::{Duration, Instant};

use cmdflow::{
    Command, CommandError, CommandEventKind, CommandId, CommandRef, CommandType, Commands,
    DataScope, DefaultLifecycle, FnCommand, LifecycleState, Proxy, Result, ResultStatus, Value,
    value,
};
use cmdflow_test_utils::{EventRecorder, TestCommand, init_tracing, with_timeout};
use tokio::sync::mpsc;

#[derive(Debug)]
struct Greet {
    id: CommandId,
    greeting: String,
}

impl Command for Greet {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> String {
        "greet".to_string()
    }

    fn execute(&self) -> Result<Option<Value>> {
        Ok(Some(value(self.greeting.clone())))
    }
}

fn greet_lifecycle() -> Arc<DefaultLifecycle> {
    Arc::new(DefaultLifecycle::new().register(|data: &DataScope| -> Result<Greet> {
        let name = data
            .get::<String>()
            .ok_or(CommandError::MissingInput("String"))?;
        Ok(Greet {
            id: CommandId::next(),
            greeting: format!("hello {name}"),
        })
    }))
}

#[test]
fn test_wrap_round_trip() {
    init_tracing();
    let cmd: CommandRef = Arc::new(FnCommand::new("foo", || Ok(Some(value("foo".to_string())))));
    let proxy = Commands::new().wrap(cmd).execute().unwrap();

    let result = proxy.result().unwrap();
    assert_eq!(result.status(), ResultStatus::Completed);
    assert_eq!(result.value_as::<String>().as_deref().map(String::as_str), Some("foo"));
    assert_eq!(result.command_id(), proxy.id());
}

#[test]
fn test_proxy_forwards_async_completion() {
    init_tracing();
    let target = TestCommand::asynchronous("target").shared();
    let proxy = Proxy::wrap(target.clone()).name("wrapper").build();
    let recorder = EventRecorder::attach(proxy.events());

    proxy.execute().unwrap();
    assert_eq!(proxy.phase(), LifecycleState::Active);
    assert_eq!(proxy.name(), "wrapper");

    target.force_complete_with(99u64);
    assert_eq!(recorder.kinds(), vec![CommandEventKind::Completed]);
    assert_eq!(
        recorder.last_result().and_then(|r| r.value_as::<u64>()).as_deref(),
        Some(&99)
    );
}

#[test]
fn test_proxy_without_target_or_type_is_usage_error() {
    init_tracing();
    let proxy = Proxy::builder().build();
    let err = proxy.execute().unwrap_err();
    assert!(matches!(err, CommandError::Usage(_)));
    assert_eq!(proxy.phase(), LifecycleState::Idle);
}

#[test]
fn test_type_is_instantiated_from_data_scope() {
    init_tracing();
    let lifecycle = greet_lifecycle();
    assert!(lifecycle.knows(&CommandType::of::<Greet>()));
    assert!(!lifecycle.knows(&CommandType::of::<u8>()));

    let proxy = Proxy::for_type::<Greet>()
        .lifecycle(lifecycle)
        .data(value("world".to_string()))
        .build();
    assert!(proxy.target().is_none());

    proxy.execute().unwrap();

    let result = proxy.result().unwrap();
    assert_eq!(
        result.value_as::<String>().as_deref().map(String::as_str),
        Some("hello world")
    );
    assert_eq!(proxy.target().map(|t| t.name()), Some("greet".to_string()));
}

#[test]
fn test_instantiation_failure_has_no_target() {
    init_tracing();
    // No "String" in the data scope, so the factory fails.
    let proxy = Proxy::for_type::<Greet>().lifecycle(greet_lifecycle()).build();
    proxy.execute().unwrap();

    assert_eq!(proxy.phase(), LifecycleState::Failed);
    let err = proxy.result().unwrap().error().cloned().unwrap();
    let exception = err.exception().unwrap();
    assert!(exception.target().is_none());
    assert_eq!(exception.executor().id, proxy.id());
    assert!(matches!(err.root_cause(), CommandError::MissingInput("String")));
}

#[test]
fn test_unknown_type_fails_with_instantiation_error() {
    init_tracing();
    let proxy = Proxy::of_type(CommandType::of::<Greet>()).build();
    proxy.execute().unwrap();

    let err = proxy.result().unwrap().error().cloned().unwrap();
    assert!(matches!(err.root_cause(), CommandError::Instantiation(_)));
}

#[test]
fn test_raising_target_fails_proxy() {
    init_tracing();
    let target = TestCommand::raising("target", "kaput").shared();
    let proxy = Proxy::wrap(target.clone()).build();
    proxy.execute().unwrap();

    let err = proxy.result().unwrap().error().cloned().unwrap();
    assert_eq!(err.exception().unwrap().target().map(|t| t.id), Some(target.id()));
    assert!(!err.is_timeout());
}

#[test]
fn test_cancel_proxy_cancels_target() {
    init_tracing();
    let target = TestCommand::asynchronous("target").shared();
    let proxy = Proxy::wrap(target.clone()).build();
    proxy.execute().unwrap();

    proxy.cancel().unwrap();
    assert_eq!(target.cancellations(), 1);
    assert_eq!(proxy.phase(), LifecycleState::Cancelled);
}

#[test]
fn test_timeout_without_runtime_is_usage_error() {
    init_tracing();
    let target = TestCommand::asynchronous("target").shared();
    let proxy = Proxy::wrap(target.clone())
        .timeout(Duration::from_millis(100))
        .build();

    let err = proxy.execute().unwrap_err();
    assert!(matches!(err, CommandError::Usage(_)));
    assert_eq!(target.executions(), 0);
}

#[tokio::test]
async fn test_timeout_cancels_target_and_fails() {
    init_tracing();
    let target = TestCommand::asynchronous("never-finishes").shared();
    let proxy = Proxy::wrap(target.clone())
        .timeout(Duration::from_millis(100))
        .build();

    let (tx, mut rx) = mpsc::unbounded_channel();
    proxy.events().on_error(move |err| {
        let _ = tx.send(err.clone());
    });

    let started = Instant::now();
    proxy.execute().unwrap();
    assert!(proxy.timer_armed());

    let err = with_timeout(rx.recv()).await.expect("proxy failed");
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(200), "fired late: {elapsed:?}");
    assert!(err.is_timeout());
    assert_eq!(err.timeout(), Some(Duration::from_millis(100)));

    let exception = err.exception().unwrap();
    assert_eq!(exception.executor().id, proxy.id());
    assert_eq!(exception.target().map(|t| t.id), Some(target.id()));

    assert_eq!(target.cancellations(), 1);
    assert_eq!(target.phase(), LifecycleState::Cancelled);
    assert_eq!(proxy.phase(), LifecycleState::Failed);
}

#[tokio::test]
async fn test_completion_disarms_timeout() {
    init_tracing();
    let target = TestCommand::asynchronous("quick").shared();
    let proxy = Proxy::wrap(target.clone())
        .timeout(Duration::from_millis(50))
        .build();

    proxy.execute().unwrap();
    target.force_complete(None);
    assert!(!proxy.timer_armed());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(proxy.phase(), LifecycleState::Completed);
    assert_eq!(target.cancellations(), 0);
}

#[tokio::test]
async fn test_sync_target_never_arms_timeout() {
    init_tracing();
    let target = TestCommand::sync_value("sync", 1u8).shared();
    let proxy = Proxy::wrap(target).timeout(Duration::from_millis(50)).build();

    proxy.execute().unwrap();
    assert_eq!(proxy.phase(), LifecycleState::Completed);
    assert!(!proxy.timer_armed());
}

#[tokio::test]
async fn test_suspend_disarms_and_resume_rearms_timeout() {
    init_tracing();
    let target = TestCommand::asynchronous("slow").shared();
    let proxy = Proxy::wrap(target.clone())
        .timeout(Duration::from_millis(80))
        .build();

    proxy.execute().unwrap();
    proxy.suspend().unwrap();
    assert!(!proxy.timer_armed());
    assert_eq!(target.phase(), LifecycleState::Suspended);

    // Longer than the timeout: nothing fires while suspended.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(proxy.phase(), LifecycleState::Suspended);

    proxy.resume().unwrap();
    assert!(proxy.timer_armed());
    assert_eq!(target.phase(), LifecycleState::Active);

    target.force_complete(None);
    assert_eq!(proxy.phase(), LifecycleState::Completed);
    assert!(!proxy.timer_armed());
}
