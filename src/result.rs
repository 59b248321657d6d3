// src/result.rs

//! Immutable record of how a single command run finished.

use std::any::Any;
use std::sync::Arc;

use crate::data::DataScope;
use crate::errors::{CommandError, CommandInfo};
use crate::types::{CommandId, ResultStatus, Value};

/// Outcome carried by a [`CommandResult`].
#[derive(Clone)]
pub enum Outcome {
    Completed(Option<Value>),
    Failed(CommandError),
    Cancelled,
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Completed(Some(_)) => f.write_str("Completed(<value>)"),
            Outcome::Completed(None) => f.write_str("Completed(None)"),
            Outcome::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Outcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// `(command identity, value-or-cause, status)`.
///
/// Created exactly once per command run, when the command signals
/// completion, failure or cancellation, and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CommandResult {
    command: CommandInfo,
    outcome: Outcome,
}

impl CommandResult {
    pub fn completed(command: CommandInfo, value: Option<Value>) -> Self {
        Self {
            command,
            outcome: Outcome::Completed(value),
        }
    }

    pub fn failed(command: CommandInfo, cause: CommandError) -> Self {
        Self {
            command,
            outcome: Outcome::Failed(cause),
        }
    }

    pub fn cancelled(command: CommandInfo) -> Self {
        Self {
            command,
            outcome: Outcome::Cancelled,
        }
    }

    pub fn command(&self) -> &CommandInfo {
        &self.command
    }

    pub fn command_id(&self) -> CommandId {
        self.command.id
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn status(&self) -> ResultStatus {
        match self.outcome {
            Outcome::Completed(_) => ResultStatus::Completed,
            Outcome::Failed(_) => ResultStatus::Failed,
            Outcome::Cancelled => ResultStatus::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == ResultStatus::Completed
    }

    /// The completion value, if the command completed with one.
    pub fn value(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Completed(value) => value.as_ref(),
            _ => None,
        }
    }

    /// The completion value downcast to `T`.
    pub fn value_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value().cloned().and_then(|v| v.downcast::<T>().ok())
    }

    /// The completion value as a [`DataScope`], which is what groups
    /// complete with.
    pub fn data(&self) -> Option<Arc<DataScope>> {
        self.value_as::<DataScope>()
    }

    pub fn error(&self) -> Option<&CommandError> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}
