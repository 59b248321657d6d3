// src/command/mod.rs

//! Command capabilities.
//!
//! A command is anything with an `execute` operation. Further capabilities
//! are exposed through `as_*` accessors returning trait objects, so an
//! executor can ask a `&dyn Command` whether it reports asynchronously,
//! whether it can be cancelled or suspended, and whether it runs children of
//! its own:
//!
//! - [`AsyncCommand`]: finishes later by dispatching a terminal event;
//! - [`CancellableCommand`]: adds `cancel`;
//! - [`SuspendableCommand`]: adds `suspend` / `resume`;
//! - [`CommandExecutor`]: accepts a lifecycle hook and a parent data scope.

pub mod light;
pub mod state;

use std::fmt;
use std::sync::Arc;

pub use light::{
    AsyncLightAdapter, AsyncLightCommand, Callback, FnCommand, FromData, LightAdapter, LightCommand,
};
pub use state::CommandState;

use crate::data::DataScope;
use crate::errors::{CommandInfo, Result};
use crate::event::CommandEvents;
use crate::lifecycle::Lifecycle;
use crate::types::{CommandId, LifecycleState, Value};

/// Shared handle to a command of any shape.
pub type CommandRef = Arc<dyn Command>;

pub trait Command: Send + Sync + fmt::Debug {
    fn id(&self) -> CommandId;

    fn name(&self) -> String;

    /// Start the command.
    ///
    /// A synchronous command has finished when this returns: `Ok` carries
    /// its value and `Err` its failure. An asynchronous command only starts
    /// here and reports its outcome later through [`AsyncCommand::events`];
    /// the returned value is ignored.
    fn execute(&self) -> Result<Option<Value>>;

    fn as_async(&self) -> Option<&dyn AsyncCommand> {
        None
    }

    fn as_executor(&self) -> Option<&dyn CommandExecutor> {
        None
    }

    fn info(&self) -> CommandInfo {
        CommandInfo::new(self.id(), self.name())
    }
}

pub trait AsyncCommand: Send + Sync {
    fn phase(&self) -> LifecycleState;

    fn events(&self) -> &CommandEvents;

    /// Started and not yet terminal. Suspended commands count as active.
    fn is_active(&self) -> bool {
        self.phase().is_running()
    }

    fn as_cancellable(&self) -> Option<&dyn CancellableCommand> {
        None
    }
}

pub trait CancellableCommand: Send + Sync {
    fn cancel(&self) -> Result<()>;

    fn as_suspendable(&self) -> Option<&dyn SuspendableCommand> {
        None
    }
}

pub trait SuspendableCommand: Send + Sync {
    fn suspend(&self) -> Result<()>;

    fn resume(&self) -> Result<()>;

    fn is_suspended(&self) -> bool;
}

/// A command that runs other commands.
pub trait CommandExecutor: Send + Sync {
    /// Hand down the lifecycle hook and the data scope of the enclosing
    /// executor. Called right before `execute`.
    fn prepare(&self, lifecycle: Arc<dyn Lifecycle>, data: Arc<DataScope>);

    fn is_cancellable(&self) -> bool;

    fn is_suspendable(&self) -> bool;
}

pub fn as_cancellable(command: &dyn Command) -> Option<&dyn CancellableCommand> {
    command.as_async().and_then(|a| a.as_cancellable())
}

pub fn as_suspendable(command: &dyn Command) -> Option<&dyn SuspendableCommand> {
    as_cancellable(command).and_then(|c| c.as_suspendable())
}

/// Whether `command` can be cancelled right now.
///
/// Executors answer for themselves since their ability depends on which
/// children are currently running.
pub fn is_cancellable(command: &dyn Command) -> bool {
    if as_cancellable(command).is_none() {
        return false;
    }
    command.as_executor().is_none_or(|e| e.is_cancellable())
}

/// Whether `command` can be suspended right now.
pub fn is_suspendable(command: &dyn Command) -> bool {
    if as_suspendable(command).is_none() {
        return false;
    }
    command.as_executor().is_none_or(|e| e.is_suspendable())
}
