// src/adapter.rs

//! Turning arbitrary candidates into commands.
//!
//! [`AdapterRegistry`] is an ordered chain of [`AdapterFactory`]s. A foreign
//! object is offered to each factory in turn and the first one that
//! recognises it wins. Registries are plain values passed to whoever needs
//! them; there is no process-wide instance.

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::command::{
    AsyncLightAdapter, AsyncLightCommand, CommandRef, LightAdapter, LightCommand,
};
use crate::errors::{CommandError, Result};
use crate::exec::Proxy;
use crate::lifecycle::CommandType;
use crate::processor::ResultProcessorRegistry;
use crate::types::Value;

/// Wraps objects it recognises as commands.
pub trait AdapterFactory: Send + Sync + fmt::Debug {
    /// `None` if `object` is not something this factory handles.
    fn create_adapter(&self, object: &Value) -> Option<CommandRef>;
}

/// Builds a command on request. Implemented by the proxy and group builders
/// so a builder can be handed over wherever a command is expected.
pub trait BuildCommand: Send {
    fn build_command(self: Box<Self>) -> CommandRef;
}

/// Anything [`AdapterRegistry::resolve`] can turn into a command.
pub enum Candidate {
    Command(CommandRef),
    Builder(Box<dyn BuildCommand>),
    /// Instantiated lazily through the lifecycle hook of whichever executor
    /// ends up running it.
    Type(CommandType),
    Object(Value),
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Command(c) => f.debug_tuple("Command").field(c).finish(),
            Candidate::Builder(_) => f.write_str("Builder(..)"),
            Candidate::Type(t) => f.debug_tuple("Type").field(t).finish(),
            Candidate::Object(_) => f.write_str("Object(..)"),
        }
    }
}

#[derive(Debug)]
struct Registration {
    order: i32,
    factory: Arc<dyn AdapterFactory>,
}

#[derive(Debug, Default)]
pub struct AdapterRegistry {
    factories: Vec<Registration>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory. Lower `order` is consulted first; equal orders keep
    /// registration order.
    pub fn register(&mut self, factory: Arc<dyn AdapterFactory>, order: i32) -> &mut Self {
        let at = self
            .factories
            .iter()
            .position(|r| r.order > order)
            .unwrap_or(self.factories.len());
        self.factories.insert(at, Registration { order, factory });
        self
    }

    /// Shorthand for registering a [`LightAdapterFactory`].
    pub fn register_light<C: LightCommand>(&mut self, order: i32) -> &mut Self {
        self.register(Arc::new(LightAdapterFactory::<C>::new()), order)
    }

    pub fn register_async_light<C: AsyncLightCommand>(&mut self, order: i32) -> &mut Self {
        self.register(Arc::new(AsyncLightAdapterFactory::<C>::new()), order)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Wrap a foreign object with the first factory that accepts it.
    pub fn adapt(&self, object: &Value) -> Result<CommandRef> {
        self.factories
            .iter()
            .find_map(|r| r.factory.create_adapter(object))
            .ok_or_else(|| CommandError::NoAdapter(format!("object {:?}", Any::type_id(&**object))))
    }

    /// Turn `candidate` into a command.
    ///
    /// Commands pass through, builders are built, types become a proxy that
    /// instantiates them on execution, and everything else goes through the
    /// factory chain.
    pub fn resolve(self: &Arc<Self>, candidate: Candidate) -> Result<CommandRef> {
        match candidate {
            Candidate::Command(command) => Ok(command),
            Candidate::Builder(builder) => Ok(builder.build_command()),
            Candidate::Type(ty) => {
                let proxy: CommandRef = Proxy::of_type(ty).adapters(Arc::clone(self)).build();
                Ok(proxy)
            }
            Candidate::Object(object) => self.adapt(&object),
        }
    }
}

/// Adapter factory for objects of a [`LightCommand`] type `C`.
pub struct LightAdapterFactory<C> {
    processors: Option<Arc<ResultProcessorRegistry>>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: LightCommand> LightAdapterFactory<C> {
    pub fn new() -> Self {
        Self {
            processors: None,
            _marker: PhantomData,
        }
    }

    /// Adapters created from now on look up result processors here.
    pub fn with_processors(mut self, processors: Arc<ResultProcessorRegistry>) -> Self {
        self.processors = Some(processors);
        self
    }
}

impl<C: LightCommand> Default for LightAdapterFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LightCommand> AdapterFactory for LightAdapterFactory<C> {
    fn create_adapter(&self, object: &Value) -> Option<CommandRef> {
        let command = Arc::clone(object).downcast::<C>().ok()?;
        let adapter = LightAdapter::from_arc(command);
        let adapter = match &self.processors {
            Some(processors) => adapter.with_processors(Arc::clone(processors)),
            None => adapter,
        };
        Some(Arc::new(adapter))
    }
}

impl<C> fmt::Debug for LightAdapterFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LightAdapterFactory<{}>", type_name::<C>())
    }
}

/// Adapter factory for objects of an [`AsyncLightCommand`] type `C`.
pub struct AsyncLightAdapterFactory<C> {
    processors: Option<Arc<ResultProcessorRegistry>>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: AsyncLightCommand> AsyncLightAdapterFactory<C> {
    pub fn new() -> Self {
        Self {
            processors: None,
            _marker: PhantomData,
        }
    }

    pub fn with_processors(mut self, processors: Arc<ResultProcessorRegistry>) -> Self {
        self.processors = Some(processors);
        self
    }
}

impl<C: AsyncLightCommand> Default for AsyncLightAdapterFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: AsyncLightCommand> AdapterFactory for AsyncLightAdapterFactory<C> {
    fn create_adapter(&self, object: &Value) -> Option<CommandRef> {
        let command = Arc::clone(object).downcast::<C>().ok()?;
        let adapter = AsyncLightAdapter::from_arc(command);
        let adapter = match &self.processors {
            Some(processors) => adapter.with_processors(Arc::clone(processors)),
            None => adapter,
        };
        Some(Arc::new(adapter))
    }
}

impl<C> fmt::Debug for AsyncLightAdapterFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncLightAdapterFactory<{}>", type_name::<C>())
    }
}
