// src/event/mod.rs

//! Publish/subscribe plumbing used by every asynchronous command.
//!
//! - [`dispatcher`] is a small generic listener registry keyed by event kind.
//! - [`CommandEvent`] is the vocabulary commands speak: three terminal events
//!   carrying a [`CommandResult`], plus suspend/resume notifications.

pub mod dispatcher;

pub use dispatcher::{Event, EventDispatcher, Listener, ListenerId};

use crate::errors::CommandError;
use crate::result::CommandResult;
use crate::types::CommandId;

/// Kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandEventKind {
    Completed,
    Failed,
    Cancelled,
    Suspended,
    Resumed,
}

impl CommandEventKind {
    /// The three kinds after which a command never dispatches again.
    pub const TERMINAL: [CommandEventKind; 3] = [
        CommandEventKind::Completed,
        CommandEventKind::Failed,
        CommandEventKind::Cancelled,
    ];
}

/// Event dispatched by a command on each lifecycle transition.
#[derive(Debug, Clone)]
pub enum CommandEvent {
    Completed(CommandResult),
    Failed(CommandResult),
    Cancelled(CommandResult),
    Suspended(CommandId),
    Resumed(CommandId),
}

impl CommandEvent {
    pub fn source(&self) -> CommandId {
        match self {
            CommandEvent::Completed(r) | CommandEvent::Failed(r) | CommandEvent::Cancelled(r) => {
                r.command_id()
            }
            CommandEvent::Suspended(id) | CommandEvent::Resumed(id) => *id,
        }
    }

    /// The result carried by a terminal event.
    pub fn result(&self) -> Option<&CommandResult> {
        match self {
            CommandEvent::Completed(r) | CommandEvent::Failed(r) | CommandEvent::Cancelled(r) => {
                Some(r)
            }
            CommandEvent::Suspended(_) | CommandEvent::Resumed(_) => None,
        }
    }
}

impl Event for CommandEvent {
    type Kind = CommandEventKind;

    fn kind(&self) -> CommandEventKind {
        match self {
            CommandEvent::Completed(_) => CommandEventKind::Completed,
            CommandEvent::Failed(_) => CommandEventKind::Failed,
            CommandEvent::Cancelled(_) => CommandEventKind::Cancelled,
            CommandEvent::Suspended(_) => CommandEventKind::Suspended,
            CommandEvent::Resumed(_) => CommandEventKind::Resumed,
        }
    }
}

/// Dispatcher specialised for command events.
pub type CommandEvents = EventDispatcher<CommandEvent>;

impl EventDispatcher<CommandEvent> {
    /// Run `f` with the result when the command completes.
    pub fn on_result<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&CommandResult) + Send + Sync + 'static,
    {
        self.on(CommandEventKind::Completed, move |event: &CommandEvent| {
            if let Some(result) = event.result() {
                f(result);
            }
        })
    }

    /// Run `f` with the cause when the command fails.
    pub fn on_error<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&CommandError) + Send + Sync + 'static,
    {
        self.on(CommandEventKind::Failed, move |event: &CommandEvent| {
            if let Some(cause) = event.result().and_then(CommandResult::error) {
                f(cause);
            }
        })
    }

    /// Run `f` when the command is cancelled.
    pub fn on_cancel<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&CommandResult) + Send + Sync + 'static,
    {
        self.on(CommandEventKind::Cancelled, move |event: &CommandEvent| {
            if let Some(result) = event.result() {
                f(result);
            }
        })
    }
}
