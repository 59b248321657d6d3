// src/errors.rs

//! Crate-wide error types.
//!
//! Usage errors are returned straight to the caller. Everything else travels
//! through the engine inside a failed [`CommandResult`] and is only observed
//! by listeners.
//!
//! [`CommandResult`]: crate::result::CommandResult

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::types::CommandId;

/// Identity plus display name of a command, as recorded in errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: CommandId,
    pub name: String,
}

impl CommandInfo {
    pub fn new(id: CommandId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Failure of a child command, attributed to the executor that ran it.
#[derive(Debug, Clone)]
pub struct CommandException {
    executor: CommandInfo,
    target: Option<CommandInfo>,
    cause: Box<CommandError>,
}

impl CommandException {
    pub fn new(executor: CommandInfo, target: Option<CommandInfo>, cause: CommandError) -> Self {
        Self {
            executor,
            target,
            cause: Box::new(cause),
        }
    }

    pub fn executor(&self) -> &CommandInfo {
        &self.executor
    }

    /// The command that failed. `None` when the target could not even be
    /// instantiated.
    pub fn target(&self) -> Option<&CommandInfo> {
        self.target.as_ref()
    }

    pub fn cause(&self) -> &CommandError {
        &self.cause
    }
}

impl fmt::Display for CommandException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(
                f,
                "execution of {} failed, target command {} failed: {}",
                self.executor, target, self.cause
            ),
            None => write!(
                f,
                "execution of {} failed before a target was resolved: {}",
                self.executor, self.cause
            ),
        }
    }
}

impl std::error::Error for CommandException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// The caller violated the engine's contract.
    #[error("usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    Execution(#[from] CommandException),

    #[error("a timeout occurred in a command after {0:?}")]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Failed(String),

    #[error("no value of type {0} available in the data scope")]
    MissingInput(&'static str),

    #[error("could not instantiate command: {0}")]
    Instantiation(String),

    #[error("no command adapter registered for {0}")]
    NoAdapter(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("TOML parsing error: {0}")]
    Toml(Arc<toml::de::Error>),

    #[error("{0:#}")]
    Other(Arc<anyhow::Error>),
}

impl CommandError {
    pub fn usage(msg: impl Into<String>) -> Self {
        CommandError::Usage(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        CommandError::Failed(msg.into())
    }

    /// Whether this error, or any cause nested in an exception chain, is a
    /// timeout marker.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), CommandError::Timeout(_))
    }

    /// Configured duration of the timeout at the bottom of the chain, if any.
    pub fn timeout(&self) -> Option<Duration> {
        match self.root_cause() {
            CommandError::Timeout(d) => Some(*d),
            _ => None,
        }
    }

    /// Walk nested exception records down to the original cause.
    pub fn root_cause(&self) -> &CommandError {
        let mut current = self;
        while let CommandError::Execution(exc) = current {
            current = exc.cause();
        }
        current
    }

    /// The outermost exception record, if this error is one.
    pub fn exception(&self) -> Option<&CommandException> {
        match self {
            CommandError::Execution(exc) => Some(exc),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Io(Arc::new(err))
    }
}

impl From<toml::de::Error> for CommandError {
    fn from(err: toml::de::Error) -> Self {
        CommandError::Toml(Arc::new(err))
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Other(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CommandError>;
