use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cmdflow::{
    AsyncCommand, CancellableCommand, Command, CommandError, CommandEvents, CommandId,
    CommandState, LifecycleState, Result, SuspendableCommand, Value,
};

use crate::StartLog;

#[derive(Debug, Clone)]
enum Behaviour {
    /// Finish inside `execute` with this value.
    Sync(Option<Value>),
    /// Return an error from `execute`.
    Raise(String),
    /// Start, then wait for `force_*` calls.
    Async,
}

/// A scripted command for tests.
///
/// - `sync` / `raising` commands finish inside `execute`;
/// - `asynchronous` commands stay active until the test drives them with
///   `force_complete`, `force_fail` or `force_cancel`.
///
/// Every start, cancel, suspend and resume is counted.
#[derive(Debug)]
pub struct TestCommand {
    state: CommandState,
    behaviour: Behaviour,
    cancellable: bool,
    suspendable: bool,
    log: Option<StartLog>,
    executions: AtomicUsize,
    cancellations: AtomicUsize,
    suspensions: AtomicUsize,
    resumptions: AtomicUsize,
}

impl TestCommand {
    fn with_behaviour(name: &str, behaviour: Behaviour) -> Self {
        Self {
            state: CommandState::new(name),
            behaviour,
            cancellable: true,
            suspendable: true,
            log: None,
            executions: AtomicUsize::new(0),
            cancellations: AtomicUsize::new(0),
            suspensions: AtomicUsize::new(0),
            resumptions: AtomicUsize::new(0),
        }
    }

    pub fn sync(name: &str, value: Option<Value>) -> Self {
        Self::with_behaviour(name, Behaviour::Sync(value))
    }

    pub fn sync_value<T: std::any::Any + Send + Sync>(name: &str, value: T) -> Self {
        Self::sync(name, Some(Arc::new(value)))
    }

    pub fn raising(name: &str, message: &str) -> Self {
        Self::with_behaviour(name, Behaviour::Raise(message.to_string()))
    }

    pub fn asynchronous(name: &str) -> Self {
        Self::with_behaviour(name, Behaviour::Async)
    }

    pub fn not_cancellable(mut self) -> Self {
        self.cancellable = false;
        self.suspendable = false;
        self
    }

    pub fn not_suspendable(mut self) -> Self {
        self.suspendable = false;
        self
    }

    pub fn logging_to(mut self, log: &StartLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn phase(&self) -> LifecycleState {
        self.state.phase()
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub fn suspensions(&self) -> usize {
        self.suspensions.load(Ordering::SeqCst)
    }

    pub fn resumptions(&self) -> usize {
        self.resumptions.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> &CommandEvents {
        self.state.events()
    }

    pub fn force_complete(&self, value: Option<Value>) -> bool {
        self.state.complete(value)
    }

    pub fn force_complete_with<T: std::any::Any + Send + Sync>(&self, value: T) -> bool {
        self.force_complete(Some(Arc::new(value)))
    }

    pub fn force_fail(&self, message: &str) -> bool {
        self.state.fail(CommandError::failed(message))
    }

    /// Cancel from the inside, as if the command gave up on its own.
    pub fn force_cancel(&self) -> bool {
        self.state.cancel()
    }

    fn record_start(&self) {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.state.name().to_string());
        }
    }
}

impl Command for TestCommand {
    fn id(&self) -> CommandId {
        self.state.id()
    }

    fn name(&self) -> String {
        self.state.name().to_string()
    }

    fn execute(&self) -> Result<Option<Value>> {
        match &self.behaviour {
            Behaviour::Sync(value) => {
                self.record_start();
                Ok(value.clone())
            }
            Behaviour::Raise(message) => {
                self.record_start();
                Err(CommandError::failed(message.clone()))
            }
            Behaviour::Async => {
                if self.state.begin_execute() {
                    self.record_start();
                }
                Ok(None)
            }
        }
    }

    fn as_async(&self) -> Option<&dyn AsyncCommand> {
        match self.behaviour {
            Behaviour::Async => Some(self),
            _ => None,
        }
    }
}

impl AsyncCommand for TestCommand {
    fn phase(&self) -> LifecycleState {
        self.state.phase()
    }

    fn events(&self) -> &CommandEvents {
        self.state.events()
    }

    fn as_cancellable(&self) -> Option<&dyn CancellableCommand> {
        if self.cancellable { Some(self) } else { None }
    }
}

impl CancellableCommand for TestCommand {
    fn cancel(&self) -> Result<()> {
        if self.state.cancel() {
            self.cancellations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn as_suspendable(&self) -> Option<&dyn SuspendableCommand> {
        if self.suspendable { Some(self) } else { None }
    }
}

impl SuspendableCommand for TestCommand {
    fn suspend(&self) -> Result<()> {
        if self.state.suspend() {
            self.suspensions.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        if self.state.resume() {
            self.resumptions.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.state.is_suspended()
    }
}
