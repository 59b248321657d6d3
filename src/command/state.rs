// src/command/state.rs

//! Lifecycle state machine shared by every asynchronous command.
//!
//! `CommandState` owns the current [`LifecycleState`] and the command's event
//! dispatcher. Each successful transition dispatches exactly one event, after
//! the state lock has been released, so listeners may call straight back into
//! the command. Transitions the current state does not permit are no-ops that
//! log a warning and return `false`.

use std::sync::Mutex;

use tracing::warn;

use crate::errors::{CommandError, CommandInfo};
use crate::event::{CommandEvent, CommandEvents};
use crate::result::CommandResult;
use crate::types::{CommandId, LifecycleState, Value, lock};

#[derive(Debug)]
pub struct CommandState {
    info: CommandInfo,
    phase: Mutex<LifecycleState>,
    result: Mutex<Option<CommandResult>>,
    events: CommandEvents,
}

impl CommandState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: CommandInfo::new(CommandId::next(), name),
            phase: Mutex::new(LifecycleState::Idle),
            result: Mutex::new(None),
            events: CommandEvents::new(),
        }
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn id(&self) -> CommandId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn phase(&self) -> LifecycleState {
        *lock(&self.phase)
    }

    /// Active or suspended.
    pub fn is_active(&self) -> bool {
        self.phase().is_running()
    }

    pub fn is_suspended(&self) -> bool {
        self.phase() == LifecycleState::Suspended
    }

    pub fn events(&self) -> &CommandEvents {
        &self.events
    }

    /// The terminal result, once there is one.
    pub fn result(&self) -> Option<CommandResult> {
        lock(&self.result).clone()
    }

    /// `Idle -> Active`. Returns `false` if the command was already started.
    ///
    /// Dispatches nothing: the start itself is not an observable event.
    pub fn begin_execute(&self) -> bool {
        self.transition("execute", |p| p == LifecycleState::Idle, LifecycleState::Active)
    }

    /// `Active -> Completed`, dispatching a completion result.
    pub fn complete(&self, value: Option<Value>) -> bool {
        if !self.transition("complete", is_active, LifecycleState::Completed) {
            return false;
        }
        let result = self.record(CommandResult::completed(self.info.clone(), value));
        self.events.dispatch(&CommandEvent::Completed(result));
        true
    }

    /// `Active -> Failed`, dispatching a failure result.
    pub fn fail(&self, cause: CommandError) -> bool {
        if !self.transition("fail", is_active, LifecycleState::Failed) {
            return false;
        }
        let result = self.record(CommandResult::failed(self.info.clone(), cause));
        self.events.dispatch(&CommandEvent::Failed(result));
        true
    }

    /// `Active | Suspended -> Cancelled`.
    ///
    /// The state changes before `stop` runs, so anything `stop` triggers sees
    /// the command as already cancelled.
    pub fn cancel_with(&self, stop: impl FnOnce()) -> bool {
        if !self.transition("cancel", LifecycleState::is_running, LifecycleState::Cancelled) {
            return false;
        }
        stop();
        let result = self.record(CommandResult::cancelled(self.info.clone()));
        self.events.dispatch(&CommandEvent::Cancelled(result));
        true
    }

    pub fn cancel(&self) -> bool {
        self.cancel_with(|| {})
    }

    /// `Active -> Suspended`.
    pub fn suspend_with(&self, hook: impl FnOnce()) -> bool {
        if !self.transition("suspend", is_active, LifecycleState::Suspended) {
            return false;
        }
        hook();
        self.events.dispatch(&CommandEvent::Suspended(self.info.id));
        true
    }

    pub fn suspend(&self) -> bool {
        self.suspend_with(|| {})
    }

    /// `Suspended -> Active`.
    pub fn resume_with(&self, hook: impl FnOnce()) -> bool {
        if !self.transition(
            "resume",
            |p| p == LifecycleState::Suspended,
            LifecycleState::Active,
        ) {
            return false;
        }
        hook();
        self.events.dispatch(&CommandEvent::Resumed(self.info.id));
        true
    }

    pub fn resume(&self) -> bool {
        self.resume_with(|| {})
    }

    fn record(&self, result: CommandResult) -> CommandResult {
        *lock(&self.result) = Some(result.clone());
        result
    }

    fn transition(
        &self,
        op: &str,
        allowed: impl Fn(LifecycleState) -> bool,
        next: LifecycleState,
    ) -> bool {
        let mut phase = lock(&self.phase);
        if !allowed(*phase) {
            warn!(
                command = %self.info,
                state = %*phase,
                "ignoring {op}: not permitted in current state"
            );
            return false;
        }
        *phase = next;
        true
    }
}

fn is_active(phase: LifecycleState) -> bool {
    phase == LifecycleState::Active
}
