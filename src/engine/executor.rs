// src/engine/executor.rs

//! The executor base: child tracking, signal forwarding and outcome routing.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, info, warn};

use crate::command::{
    AsyncCommand, CancellableCommand, Command, CommandExecutor, CommandRef, CommandState,
    SuspendableCommand, as_cancellable, as_suspendable, is_cancellable, is_suspendable,
};
use crate::data::DataScope;
use crate::engine::{ExecutorOptions, ExecutorStrategy};
use crate::errors::{CommandError, CommandException, CommandInfo, Result};
use crate::event::{CommandEvent, CommandEventKind, CommandEvents, ListenerId};
use crate::lifecycle::{DefaultLifecycle, Lifecycle};
use crate::result::CommandResult;
use crate::types::{CommandId, LifecycleState, Value, lock};

/// A child that has been started and has not reached a terminal state.
struct ActiveChild {
    command: CommandRef,
    subscriptions: Vec<(CommandEventKind, ListenerId)>,
}

/// An outcome reached while suspended, reported on resume.
enum Deferred {
    Complete(Option<Value>),
    Fail(CommandError),
}

#[derive(Default)]
struct Inner {
    active: Vec<ActiveChild>,
    lifecycle: Option<Arc<dyn Lifecycle>>,
    data: Option<Arc<DataScope>>,
    /// Values added before the data scope exists.
    pending: Vec<Value>,
    deferred: Option<Deferred>,
}

/// A suspendable command running children according to `S`.
pub struct Executor<S: ExecutorStrategy> {
    me: Weak<Self>,
    state: CommandState,
    skip_failures: bool,
    skip_cancellations: bool,
    inner: Mutex<Inner>,
    strategy: S,
}

impl<S: ExecutorStrategy> Executor<S> {
    pub fn with_options(options: ExecutorOptions, strategy: S) -> Arc<Self> {
        let name = options
            .name
            .unwrap_or_else(|| strategy.kind().to_string());
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            state: CommandState::new(name),
            skip_failures: options.skip_failures,
            skip_cancellations: options.skip_cancellations,
            inner: Mutex::new(Inner {
                lifecycle: options.lifecycle,
                ..Inner::default()
            }),
            strategy,
        })
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn events(&self) -> &CommandEvents {
        self.state.events()
    }

    pub fn phase(&self) -> LifecycleState {
        self.state.phase()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// The terminal result, once there is one.
    pub fn result(&self) -> Option<CommandResult> {
        self.state.result()
    }

    pub fn skips_failures(&self) -> bool {
        self.skip_failures
    }

    pub fn skips_cancellations(&self) -> bool {
        self.skip_cancellations
    }

    pub(crate) fn weak(&self) -> Weak<Self> {
        self.me.clone()
    }

    /// Seed a value into this executor's data scope. Values added before the
    /// scope exists are kept until it is created.
    pub fn add_data(&self, value: Value) {
        let mut inner = lock(&self.inner);
        match &inner.data {
            Some(data) => data.push(value),
            None => inner.pending.push(value),
        }
    }

    /// The data scope children append their values to, created on first use.
    pub fn data(&self) -> Arc<DataScope> {
        let mut inner = lock(&self.inner);
        if let Some(data) = &inner.data {
            return Arc::clone(data);
        }
        let data = DataScope::new();
        for value in inner.pending.drain(..) {
            data.push(value);
        }
        inner.data = Some(Arc::clone(&data));
        data
    }

    pub fn lifecycle(&self) -> Arc<dyn Lifecycle> {
        let mut inner = lock(&self.inner);
        inner
            .lifecycle
            .get_or_insert_with(|| Arc::new(DefaultLifecycle::new()))
            .clone()
    }

    pub fn set_lifecycle(&self, lifecycle: Arc<dyn Lifecycle>) {
        lock(&self.inner).lifecycle = Some(lifecycle);
    }

    /// Snapshot of the children currently running.
    pub fn active_children(&self) -> Vec<CommandRef> {
        lock(&self.inner)
            .active
            .iter()
            .map(|c| Arc::clone(&c.command))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        lock(&self.inner).active.len()
    }

    /// True iff every active child can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        self.active_children().iter().all(|c| is_cancellable(&**c))
    }

    /// True iff every active child can be suspended.
    pub fn is_suspendable(&self) -> bool {
        self.active_children().iter().all(|c| is_suspendable(&**c))
    }

    pub fn is_suspended(&self) -> bool {
        self.state.is_suspended()
    }

    /// Cancel this executor and every active child.
    ///
    /// Fails with a usage error if some active child cannot be cancelled.
    /// Cancelling an executor that is not running is a logged no-op.
    pub fn cancel(&self) -> Result<()> {
        if !self.is_cancellable() {
            return Err(CommandError::usage(format!(
                "command {} cannot be cancelled",
                self.state.info()
            )));
        }
        self.state.cancel_with(|| self.cancel_children());
        Ok(())
    }

    /// Suspend every active child that is not suspended yet.
    pub fn suspend(&self) -> Result<()> {
        if !self.is_suspendable() {
            return Err(CommandError::usage(format!(
                "command {} cannot be suspended",
                self.state.info()
            )));
        }
        self.state.suspend_with(|| self.suspend_children());
        Ok(())
    }

    /// Resume every suspended child, then report an outcome reached while
    /// suspended.
    pub fn resume(&self) -> Result<()> {
        if !self.is_suspendable() {
            return Err(CommandError::usage(format!(
                "command {} cannot be resumed",
                self.state.info()
            )));
        }
        if self.state.resume_with(|| self.resume_children()) {
            self.finish_deferred();
        }
        Ok(())
    }

    /// Start `command` as a child of this executor.
    ///
    /// Synchronous children are finished when this returns. Asynchronous
    /// children are tracked until they dispatch a terminal event.
    pub fn start_child(&self, command: CommandRef) {
        let id = command.id();
        {
            let mut inner = lock(&self.inner);
            if inner.active.iter().any(|c| c.command.id() == id) {
                return;
            }
            if !self.state.is_active() {
                warn!(
                    executor = %self.state.info(),
                    child = %command.info(),
                    "not starting child: executor is not running"
                );
                return;
            }
            inner.active.push(ActiveChild {
                command: Arc::clone(&command),
                subscriptions: Vec::new(),
            });
        }

        if let Some(child) = command.as_async() {
            let subscriptions = self.subscribe(child);
            let mut inner = lock(&self.inner);
            if let Some(entry) = inner.active.iter_mut().find(|c| c.command.id() == id) {
                entry.subscriptions = subscriptions;
            }
            drop(inner);

            if child.is_active() {
                return;
            }
        }

        let lifecycle = self.lifecycle();
        let data = self.data();
        if let Some(nested) = command.as_executor() {
            nested.prepare(Arc::clone(&lifecycle), Arc::clone(&data));
        }

        lifecycle.before_execution(&*command, &data);
        debug!(
            executor = %self.state.info(),
            child = %command.info(),
            "executing child command"
        );

        match command.execute() {
            Err(cause) => {
                let Some(child) = self.remove_child(id) else {
                    return;
                };
                let result = CommandResult::failed(command.info(), cause);
                lifecycle.after_completion(&*child, &result);
                self.handle_failure(&child, result);
            }
            Ok(value) if command.as_async().is_none() => {
                if self.remove_child(id).is_none() {
                    return;
                }
                if let Some(v) = &value {
                    data.push(Arc::clone(v));
                }
                let result = CommandResult::completed(command.info(), value);
                lifecycle.after_completion(&*command, &result);
                self.strategy.on_child_complete(self, result);
            }
            Ok(_) => {}
        }
    }

    /// Complete with this executor's data scope as the value.
    pub fn complete_with_scope(&self) {
        let data: Value = self.data();
        self.complete_with(Some(data));
    }

    /// Complete with `value`. While suspended the completion is held back
    /// until `resume`.
    pub fn complete_with(&self, value: Option<Value>) {
        if self.defer(|| Deferred::Complete(value.clone())) {
            return;
        }
        if self.state.complete(value) {
            info!(executor = %self.state.info(), "executor completed");
        }
    }

    /// Fail with `cause`. While suspended the failure is held back until
    /// `resume`.
    pub fn fail(&self, cause: CommandError) {
        if self.defer(|| Deferred::Fail(cause.clone())) {
            return;
        }
        if self.state.fail(cause) {
            info!(executor = %self.state.info(), "executor failed");
        }
    }

    fn defer(&self, outcome: impl FnOnce() -> Deferred) -> bool {
        if !self.state.is_suspended() {
            return false;
        }
        let mut inner = lock(&self.inner);
        if inner.deferred.is_none() {
            debug!(executor = %self.state.info(), "holding back outcome until resumed");
            inner.deferred = Some(outcome());
        }
        true
    }

    fn finish_deferred(&self) {
        let deferred = lock(&self.inner).deferred.take();
        match deferred {
            Some(Deferred::Complete(value)) => self.complete_with(value),
            Some(Deferred::Fail(cause)) => self.fail(cause),
            None => {}
        }
    }

    /// Fail with an exception record naming this executor, `target` and
    /// `cause`.
    pub fn fail_with_exception(&self, target: Option<CommandInfo>, cause: CommandError) {
        let exception = CommandException::new(self.state.info().clone(), target, cause);
        self.fail(exception.into());
    }

    /// Stop tracking every active child and cancel those that can be.
    ///
    /// Each child gets its `after_completion` call with a cancelled result.
    pub fn cancel_children(&self) {
        let children = std::mem::take(&mut lock(&self.inner).active);
        if children.is_empty() {
            return;
        }
        let lifecycle = self.lifecycle();
        for child in children {
            Self::unsubscribe(&child);
            let command = &*child.command;
            if is_cancellable(command) {
                if let Some(c) = as_cancellable(command) {
                    if let Err(err) = c.cancel() {
                        warn!(
                            executor = %self.state.info(),
                            child = %command.info(),
                            error = %err,
                            "failed to cancel child"
                        );
                    }
                }
            } else {
                debug!(
                    executor = %self.state.info(),
                    child = %command.info(),
                    "abandoning child that cannot be cancelled"
                );
            }
            lifecycle.after_completion(command, &CommandResult::cancelled(command.info()));
        }
    }

    fn suspend_children(&self) {
        for child in self.active_children() {
            if let Some(s) = as_suspendable(&*child) {
                if !s.is_suspended() {
                    self.forward("suspend", &*child, s.suspend());
                }
            }
        }
    }

    fn resume_children(&self) {
        for child in self.active_children() {
            if let Some(s) = as_suspendable(&*child) {
                if s.is_suspended() {
                    self.forward("resume", &*child, s.resume());
                }
            }
        }
    }

    fn forward(&self, signal: &str, child: &dyn Command, outcome: Result<()>) {
        if let Err(err) = outcome {
            warn!(
                executor = %self.state.info(),
                child = %child.info(),
                error = %err,
                "failed to {signal} child"
            );
        }
    }

    fn subscribe(&self, child: &dyn AsyncCommand) -> Vec<(CommandEventKind, ListenerId)> {
        let events = child.events();
        CommandEventKind::TERMINAL
            .iter()
            .map(|&kind| {
                let me = self.me.clone();
                let id = events.on(kind, move |event: &CommandEvent| {
                    if let Some(executor) = me.upgrade() {
                        executor.on_child_event(event);
                    }
                });
                (kind, id)
            })
            .collect()
    }

    fn unsubscribe(child: &ActiveChild) {
        if let Some(events) = child.command.as_async().map(|a| a.events()) {
            for (kind, id) in &child.subscriptions {
                events.unsubscribe(*kind, *id);
            }
        }
    }

    /// Remove a child from the active set, tearing down its subscriptions.
    /// `None` if it was not (or no longer) tracked.
    fn remove_child(&self, id: CommandId) -> Option<CommandRef> {
        let child = {
            let mut inner = lock(&self.inner);
            let idx = inner.active.iter().position(|c| c.command.id() == id)?;
            inner.active.swap_remove(idx)
        };
        Self::unsubscribe(&child);
        Some(child.command)
    }

    fn on_child_event(&self, event: &CommandEvent) {
        let Some(result) = event.result() else {
            return;
        };
        let Some(child) = self.remove_child(result.command_id()) else {
            return;
        };
        if self.state.is_suspended() {
            debug!(
                executor = %self.state.info(),
                child = %child.info(),
                "child finished while its executor was suspended"
            );
        }

        let lifecycle = self.lifecycle();
        match event {
            CommandEvent::Completed(result) => {
                if let Some(value) = result.value() {
                    self.data().push(Arc::clone(value));
                }
                lifecycle.after_completion(&*child, result);
                self.strategy.on_child_complete(self, result.clone());
            }
            CommandEvent::Failed(result) => {
                lifecycle.after_completion(&*child, result);
                self.handle_failure(&child, result.clone());
            }
            CommandEvent::Cancelled(result) => {
                lifecycle.after_completion(&*child, result);
                if self.skip_cancellations {
                    self.strategy.on_child_complete(self, result.clone());
                } else {
                    debug!(
                        executor = %self.state.info(),
                        child = %child.info(),
                        "child was cancelled, cancelling executor"
                    );
                    self.state.cancel_with(|| self.cancel_children());
                }
            }
            CommandEvent::Suspended(_) | CommandEvent::Resumed(_) => {}
        }
    }

    fn handle_failure(&self, child: &CommandRef, result: CommandResult) {
        if self.skip_failures {
            debug!(
                executor = %self.state.info(),
                child = %child.info(),
                "ignoring child failure"
            );
            self.strategy.on_child_complete(self, result);
            return;
        }

        let cause = result
            .error()
            .cloned()
            .unwrap_or_else(|| CommandError::failed("child reported failure without a cause"));
        self.cancel_children();
        self.fail_with_exception(Some(child.info()), cause);
    }
}

impl<S: ExecutorStrategy> Command for Executor<S> {
    fn id(&self) -> CommandId {
        self.state.id()
    }

    fn name(&self) -> String {
        self.state.name().to_string()
    }

    fn execute(&self) -> Result<Option<Value>> {
        self.strategy.validate(self)?;
        if !self.state.begin_execute() {
            return Ok(None);
        }
        // Flush values seeded through `add_data`.
        self.data();
        debug!(executor = %self.state.info(), "executor started");
        self.strategy.start(self);
        Ok(None)
    }

    fn as_async(&self) -> Option<&dyn AsyncCommand> {
        Some(self)
    }

    fn as_executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }

    fn info(&self) -> CommandInfo {
        self.state.info().clone()
    }
}

impl<S: ExecutorStrategy> AsyncCommand for Executor<S> {
    fn phase(&self) -> LifecycleState {
        self.state.phase()
    }

    fn events(&self) -> &CommandEvents {
        self.state.events()
    }

    fn as_cancellable(&self) -> Option<&dyn CancellableCommand> {
        Some(self)
    }
}

impl<S: ExecutorStrategy> CancellableCommand for Executor<S> {
    fn cancel(&self) -> Result<()> {
        Executor::cancel(self)
    }

    fn as_suspendable(&self) -> Option<&dyn SuspendableCommand> {
        Some(self)
    }
}

impl<S: ExecutorStrategy> SuspendableCommand for Executor<S> {
    fn suspend(&self) -> Result<()> {
        Executor::suspend(self)
    }

    fn resume(&self) -> Result<()> {
        Executor::resume(self)
    }

    fn is_suspended(&self) -> bool {
        self.state.is_suspended()
    }
}

impl<S: ExecutorStrategy> CommandExecutor for Executor<S> {
    /// Adopt the enclosing executor's lifecycle hook and open a child scope
    /// of its data scope. Values already held move into the new scope.
    fn prepare(&self, lifecycle: Arc<dyn Lifecycle>, parent: Arc<DataScope>) {
        let mut inner = lock(&self.inner);
        inner.lifecycle = Some(lifecycle);
        let data = DataScope::with_parent(&parent);
        if let Some(previous) = inner.data.take() {
            for value in previous.values() {
                data.push(value);
            }
        }
        for value in inner.pending.drain(..) {
            data.push(value);
        }
        inner.data = Some(data);
    }

    fn is_cancellable(&self) -> bool {
        Executor::is_cancellable(self)
    }

    fn is_suspendable(&self) -> bool {
        Executor::is_suspendable(self)
    }
}

impl<S: ExecutorStrategy> fmt::Debug for Executor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("kind", &self.strategy.kind())
            .field("command", self.state.info())
            .field("state", &self.state.phase())
            .field("active", &self.active_count())
            .finish()
    }
}
