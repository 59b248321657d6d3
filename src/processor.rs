// src/processor.rs

//! Result processors.
//!
//! A result processor is a command run on the value a light command
//! produced, before that light command reports completion. The light command
//! then completes with the processor's value instead of its own.
//!
//! Processors are registered either for a result type (any command producing
//! a value of that type) or for a command type (any value that command
//! produces). Result-type registrations are consulted first.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::command::{Command, CommandRef, LightAdapter, LightCommand};
use crate::types::Value;

type ProcessorFactory = Arc<dyn Fn() -> CommandRef + Send + Sync>;

struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    factory: ProcessorFactory,
}

#[derive(Default)]
pub struct ResultProcessorRegistry {
    by_result_type: Vec<Registration>,
    by_command_type: Vec<Registration>,
}

impl ResultProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration slot for values of type `T`.
    pub fn for_result_type<T: Any>(&mut self) -> ProcessorSlot<'_> {
        ProcessorSlot {
            registrations: &mut self.by_result_type,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Registration slot for every value produced by commands of type `C`.
    pub fn for_command_type<C: Any>(&mut self) -> ProcessorSlot<'_> {
        ProcessorSlot {
            registrations: &mut self.by_command_type,
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_result_type.len() + self.by_command_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A fresh processor for `result`, produced by a command of type
    /// `command_type`, if one is registered.
    pub fn new_processor(&self, command_type: TypeId, result: &Value) -> Option<CommandRef> {
        let result_type = (**result).type_id();
        self.by_result_type
            .iter()
            .find(|r| r.type_id == result_type)
            .or_else(|| {
                self.by_command_type
                    .iter()
                    .find(|r| r.type_id == command_type)
            })
            .map(|r| (r.factory)())
    }
}

impl fmt::Debug for ResultProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[Registration]| list.iter().map(|r| r.type_name).collect::<Vec<_>>();
        f.debug_struct("ResultProcessorRegistry")
            .field("by_result_type", &names(&self.by_result_type))
            .field("by_command_type", &names(&self.by_command_type))
            .finish()
    }
}

/// One result or command type in a [`ResultProcessorRegistry`].
pub struct ProcessorSlot<'a> {
    registrations: &'a mut Vec<Registration>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ProcessorSlot<'_> {
    /// Whether a processor is registered for this type.
    pub fn exists(&self) -> bool {
        self.registrations.iter().any(|r| r.type_id == self.type_id)
    }

    /// Use commands created by `factory` as processors, replacing any
    /// processor registered for this type before.
    pub fn processor<P, F>(self, factory: F)
    where
        P: Command + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let factory: ProcessorFactory = Arc::new(move || {
            let command: CommandRef = Arc::new(factory());
            command
        });
        let registration = Registration {
            type_id: self.type_id,
            type_name: self.type_name,
            factory,
        };
        match self.registrations.iter_mut().find(|r| r.type_id == self.type_id) {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
    }

    /// Use a [`LightCommand`] as processor. It reads the value to process
    /// from its data scope like any other input.
    ///
    /// Its own output is never processed again.
    pub fn light_processor<C, F>(self, factory: F)
    where
        C: LightCommand,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.processor(move || LightAdapter::new(factory()));
    }
}
