// src/group/sequence.rs

//! Sequential group: child N+1 starts only after child N has finished.

use std::sync::{Arc, Mutex};

use crate::command::CommandRef;
use crate::engine::{Executor, ExecutorStrategy};
use crate::group::{GroupBuilder, GroupStrategy};
use crate::result::CommandResult;
use crate::types::lock;

pub type Sequence = Executor<SequenceStrategy>;

#[derive(Debug, Default)]
struct Cursor {
    commands: Vec<CommandRef>,
    index: usize,
}

#[derive(Debug)]
pub struct SequenceStrategy {
    cursor: Mutex<Cursor>,
}

impl SequenceStrategy {
    /// Start the command at the cursor, or complete if there is none left.
    fn advance(&self, sequence: &Sequence) {
        let next = {
            let cursor = lock(&self.cursor);
            cursor.commands.get(cursor.index).cloned()
        };
        match next {
            Some(command) => sequence.start_child(command),
            None => sequence.complete_with_scope(),
        }
    }
}

impl GroupStrategy for SequenceStrategy {
    fn with_commands(commands: Vec<CommandRef>) -> Self {
        Self {
            cursor: Mutex::new(Cursor { commands, index: 0 }),
        }
    }
}

impl ExecutorStrategy for SequenceStrategy {
    fn kind(&self) -> &'static str {
        "Sequence"
    }

    fn start(&self, sequence: &Sequence) {
        let empty = {
            let mut cursor = lock(&self.cursor);
            cursor.index = 0;
            cursor.commands.is_empty()
        };
        if empty {
            sequence.complete_with(None);
            return;
        }
        self.advance(sequence);
    }

    fn on_child_complete(&self, sequence: &Sequence, _result: CommandResult) {
        lock(&self.cursor).index += 1;
        self.advance(sequence);
    }
}

impl Executor<SequenceStrategy> {
    pub fn new(commands: Vec<CommandRef>) -> Arc<Self> {
        Self::builder().commands(commands).build()
    }

    pub fn builder() -> GroupBuilder<SequenceStrategy> {
        GroupBuilder::new()
    }

    /// Append a command. It runs after every command already listed.
    pub fn add_command(&self, command: CommandRef) {
        lock(&self.strategy().cursor).commands.push(command);
    }

    pub fn commands(&self) -> Vec<CommandRef> {
        lock(&self.strategy().cursor).commands.clone()
    }

    /// Index of the command currently running, or of the next to start.
    pub fn position(&self) -> usize {
        lock(&self.strategy().cursor).index
    }
}
