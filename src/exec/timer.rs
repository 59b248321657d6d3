// src/exec/timer.rs

//! Single-shot timer running on the Tokio runtime.
//!
//! Every `arm` bumps a generation counter. A sleeping task that wakes up
//! after it was disarmed or re-armed finds a stale generation and does
//! nothing, so aborting the task is only an optimisation.

use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::errors::{CommandError, Result};
use crate::types::lock;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub struct Timer {
    handle: Mutex<Option<Handle>>,
    slot: Mutex<Slot>,
}

impl Timer {
    /// Create a timer bound to the current Tokio runtime, if there is one.
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(Handle::try_current().ok()),
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Make sure a runtime is available to spawn the timer task on.
    pub fn ensure_runtime(&self) -> Result<()> {
        let mut handle = lock(&self.handle);
        if handle.is_some() {
            return Ok(());
        }
        match Handle::try_current() {
            Ok(h) => {
                *handle = Some(h);
                Ok(())
            }
            Err(_) => Err(CommandError::usage(
                "a timeout requires a Tokio runtime, but none is running",
            )),
        }
    }

    /// Run `fire(generation)` after `after`, replacing any armed timer.
    pub fn arm<F>(&self, after: Duration, fire: F) -> Result<()>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.ensure_runtime()?;
        let Some(handle) = lock(&self.handle).clone() else {
            return Err(CommandError::usage("no Tokio runtime available"));
        };

        let mut slot = lock(&self.slot);
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        slot.task = Some(handle.spawn(async move {
            tokio::time::sleep(after).await;
            fire(generation);
        }));
        Ok(())
    }

    pub fn disarm(&self) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
    }

    /// Claim the firing of `generation`. Returns `false` if the timer was
    /// disarmed or re-armed since.
    pub fn claim(&self, generation: u64) -> bool {
        let mut slot = lock(&self.slot);
        if slot.generation != generation || slot.task.is_none() {
            return false;
        }
        slot.task = None;
        true
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.slot).task.is_some()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Ok(slot) = self.slot.get_mut() {
            if let Some(task) = slot.task.take() {
                task.abort();
            }
        }
    }
}
