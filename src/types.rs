// src/types.rs

//! Small shared types used across the engine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque value produced by a command and stored in a [`DataScope`].
///
/// [`DataScope`]: crate::data::DataScope
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wrap any value as an opaque [`Value`].
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a single command instance.
///
/// Ids are allocated from a process-wide counter and never reused, so two
/// distinct command instances never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        CommandId(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-command lifecycle state.
///
/// `Idle -> Active -> {Suspended <-> Active} -> {Completed | Failed | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Active,
    Suspended,
    Completed,
    Failed,
    Cancelled,
}

impl LifecycleState {
    /// `Completed`, `Failed` and `Cancelled` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecycleState::Completed | LifecycleState::Failed | LifecycleState::Cancelled
        )
    }

    /// Running, whether currently suspended or not.
    pub fn is_running(self) -> bool {
        matches!(self, LifecycleState::Active | LifecycleState::Suspended)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Active => "active",
            LifecycleState::Suspended => "suspended",
            LifecycleState::Completed => "completed",
            LifecycleState::Failed => "failed",
            LifecycleState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How a command run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Lock a mutex, recovering the data if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
