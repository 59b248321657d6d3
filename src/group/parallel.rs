// src/group/parallel.rs

//! Parallel group: every child is started immediately and the group
//! completes once all of them have finished.
//!
//! "Parallel" means concurrently outstanding. Children are started back to
//! back on the calling thread; asynchronous ones then run on their own.

use std::sync::{Arc, Mutex};

use crate::command::CommandRef;
use crate::engine::{Executor, ExecutorStrategy};
use crate::group::{GroupBuilder, GroupStrategy};
use crate::result::CommandResult;
use crate::types::lock;

pub type Parallel = Executor<ParallelStrategy>;

#[derive(Debug, Default)]
struct Progress {
    commands: Vec<CommandRef>,
    finished: usize,
}

#[derive(Debug)]
pub struct ParallelStrategy {
    progress: Mutex<Progress>,
}

impl GroupStrategy for ParallelStrategy {
    fn with_commands(commands: Vec<CommandRef>) -> Self {
        Self {
            progress: Mutex::new(Progress {
                commands,
                finished: 0,
            }),
        }
    }
}

impl ExecutorStrategy for ParallelStrategy {
    fn kind(&self) -> &'static str {
        "Parallel"
    }

    fn start(&self, parallel: &Parallel) {
        let commands = {
            let mut progress = lock(&self.progress);
            progress.finished = 0;
            progress.commands.clone()
        };
        if commands.is_empty() {
            parallel.complete_with(None);
            return;
        }
        for command in commands {
            // A failing child may already have ended the group.
            if !parallel.is_active() {
                break;
            }
            parallel.start_child(command);
        }
    }

    fn on_child_complete(&self, parallel: &Parallel, _result: CommandResult) {
        let done = {
            let mut progress = lock(&self.progress);
            progress.finished += 1;
            progress.finished == progress.commands.len()
        };
        if done {
            parallel.complete_with_scope();
        }
    }
}

impl Executor<ParallelStrategy> {
    pub fn new(commands: Vec<CommandRef>) -> Arc<Self> {
        Self::builder().commands(commands).build()
    }

    pub fn builder() -> GroupBuilder<ParallelStrategy> {
        GroupBuilder::new()
    }

    /// Add a command. If the group is already running it is started right
    /// away.
    pub fn add_command(&self, command: CommandRef) {
        lock(&self.strategy().progress)
            .commands
            .push(Arc::clone(&command));
        if self.is_active() {
            self.start_child(command);
        }
    }

    pub fn commands(&self) -> Vec<CommandRef> {
        lock(&self.strategy().progress).commands.clone()
    }

    /// Number of children that have finished so far.
    pub fn finished(&self) -> usize {
        lock(&self.strategy().progress).finished
    }
}
