// src/group/mod.rs

//! Command groups.
//!
//! - [`sequence`] runs its children one at a time, in order.
//! - [`parallel`] starts all children at once and completes when every one
//!   of them has finished.
//!
//! Both complete with their data scope as value. Children can be appended
//! after construction through `add_command`.

pub mod parallel;
pub mod sequence;

use std::marker::PhantomData;
use std::sync::Arc;

pub use parallel::{Parallel, ParallelStrategy};
pub use sequence::{Sequence, SequenceStrategy};

use crate::adapter::BuildCommand;
use crate::command::CommandRef;
use crate::engine::{Executor, ExecutorOptions, ExecutorStrategy};
use crate::lifecycle::Lifecycle;
use crate::types::Value;

/// Strategy of a group over an initial list of commands.
pub trait GroupStrategy: ExecutorStrategy {
    fn with_commands(commands: Vec<CommandRef>) -> Self;
}

#[derive(Debug)]
pub struct GroupBuilder<S> {
    commands: Vec<CommandRef>,
    options: ExecutorOptions,
    data: Vec<Value>,
    _strategy: PhantomData<fn() -> S>,
}

impl<S: GroupStrategy> GroupBuilder<S> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            options: ExecutorOptions::default(),
            data: Vec::new(),
            _strategy: PhantomData,
        }
    }

    pub fn command(mut self, command: CommandRef) -> Self {
        self.commands.push(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = CommandRef>) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    pub fn skip_failures(mut self, skip: bool) -> Self {
        self.options.skip_failures = skip;
        self
    }

    pub fn skip_cancellations(mut self, skip: bool) -> Self {
        self.options.skip_cancellations = skip;
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn Lifecycle>) -> Self {
        self.options.lifecycle = Some(lifecycle);
        self
    }

    pub fn options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Seed a value into the group's data scope.
    pub fn data(mut self, value: Value) -> Self {
        self.data.push(value);
        self
    }

    pub fn build(self) -> Arc<Executor<S>> {
        let group = Executor::with_options(self.options, S::with_commands(self.commands));
        for value in self.data {
            group.add_data(value);
        }
        group
    }
}

impl<S: GroupStrategy> Default for GroupBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GroupStrategy> BuildCommand for GroupBuilder<S> {
    fn build_command(self: Box<Self>) -> CommandRef {
        self.build()
    }
}
