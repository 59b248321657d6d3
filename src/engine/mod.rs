// src/engine/mod.rs

//! Executor base shared by proxies and groups.
//!
//! An [`Executor`] is a suspendable command that runs children. It owns:
//! - the active-child set, plus the event subscriptions it installed on each
//!   child so they can be torn down precisely;
//! - the lifecycle hook and the data scope handed to every child;
//! - the skip flags deciding whether a child's failure or cancellation
//!   aborts the executor or counts as an ordinary completion.
//!
//! What happens when a child finishes is decided by an [`ExecutorStrategy`]:
//! the proxy strategy lives in [`crate::exec`], sequence and parallel in
//! [`crate::group`].

pub mod executor;

use std::fmt;
use std::sync::Arc;

pub use executor::Executor;

use crate::errors::Result;
use crate::lifecycle::Lifecycle;
use crate::result::CommandResult;

/// Behaviour plugged into an [`Executor`].
pub trait ExecutorStrategy: Send + Sync + Sized + 'static {
    /// Name used when none is configured.
    fn kind(&self) -> &'static str;

    /// Check the configuration before the executor leaves `Idle`. An error
    /// here is returned to the caller of `execute`.
    fn validate(&self, _executor: &Executor<Self>) -> Result<()> {
        Ok(())
    }

    /// Called once, right after the executor became active.
    fn start(&self, executor: &Executor<Self>);

    /// A child finished and did not abort the executor.
    fn on_child_complete(&self, executor: &Executor<Self>, result: CommandResult);
}

/// Construction options shared by every executor.
#[derive(Clone, Default)]
pub struct ExecutorOptions {
    pub name: Option<String>,
    /// Treat a child's failure as ordinary completion.
    pub skip_failures: bool,
    /// Treat a child's cancellation as ordinary completion.
    pub skip_cancellations: bool,
    /// Used until an enclosing executor hands down its own.
    pub lifecycle: Option<Arc<dyn Lifecycle>>,
}

impl fmt::Debug for ExecutorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorOptions")
            .field("name", &self.name)
            .field("skip_failures", &self.skip_failures)
            .field("skip_cancellations", &self.skip_cancellations)
            .field("lifecycle", &self.lifecycle.is_some())
            .finish()
    }
}
