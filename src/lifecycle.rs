// src/lifecycle.rs

//! Lifecycle hook invoked around every child command an executor runs.
//!
//! The hook also creates command instances from a [`CommandType`], which is
//! how a proxy configured with a type rather than an instance obtains its
//! target. [`DefaultLifecycle`] does this from a table of factories keyed by
//! type; factories receive the current data scope and can pull their
//! constructor inputs out of it.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::{Command, CommandRef};
use crate::data::DataScope;
use crate::errors::Result;
use crate::result::CommandResult;
use crate::types::Value;

/// Runtime descriptor of a command type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandType {
    id: TypeId,
    name: &'static str,
}

impl CommandType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Something created from a [`CommandType`].
#[derive(Debug)]
pub enum Instance {
    /// Already a command; run as is.
    Command(CommandRef),
    /// A plain object that has to go through the adapter registry.
    Object(Value),
}

pub trait Lifecycle: Send + Sync + fmt::Debug {
    /// Create an instance of `ty`. `Ok(None)` means the hook does not know
    /// the type.
    fn create_instance(&self, ty: &CommandType, data: &DataScope) -> Result<Option<Instance>>;

    /// Called exactly once per child, right before its `execute`.
    fn before_execution(&self, _command: &dyn Command, _data: &DataScope) {}

    /// Called exactly once per child, as soon as its result is known.
    fn after_completion(&self, _command: &dyn Command, _result: &CommandResult) {}
}

type Factory = Arc<dyn Fn(&DataScope) -> Result<Instance> + Send + Sync>;

/// Lifecycle hook backed by a table of per-type factories.
#[derive(Default, Clone)]
pub struct DefaultLifecycle {
    factories: HashMap<TypeId, Factory>,
}

impl DefaultLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory producing commands of type `T`.
    pub fn register<T, F>(mut self, factory: F) -> Self
    where
        T: Command + 'static,
        F: Fn(&DataScope) -> Result<T> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |data: &DataScope| {
            let command: CommandRef = Arc::new(factory(data)?);
            Ok(Instance::Command(command))
        });
        self.factories.insert(TypeId::of::<T>(), factory);
        self
    }

    /// Register a factory producing plain objects of type `T`, to be turned
    /// into commands by an adapter.
    pub fn register_object<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&DataScope) -> Result<T> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |data: &DataScope| {
            let object: Value = Arc::new(factory(data)?);
            Ok(Instance::Object(object))
        });
        self.factories.insert(TypeId::of::<T>(), factory);
        self
    }

    pub fn knows(&self, ty: &CommandType) -> bool {
        self.factories.contains_key(&ty.type_id())
    }
}

impl Lifecycle for DefaultLifecycle {
    fn create_instance(&self, ty: &CommandType, data: &DataScope) -> Result<Option<Instance>> {
        match self.factories.get(&ty.type_id()) {
            Some(factory) => factory(data).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for DefaultLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultLifecycle")
            .field("factories", &self.factories.len())
            .finish()
    }
}
