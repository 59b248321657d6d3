// src/command/light.rs

//! Commands built from plain Rust code.
//!
//! - [`FnCommand`] runs a closure.
//! - [`LightCommand`] is a typed `run(input) -> output` unit whose input is
//!   extracted from the enclosing data scope by type ([`FromData`]).
//!   [`LightAdapter`] turns one into a [`Command`].
//! - [`AsyncLightCommand`] starts work and reports its output later through a
//!   [`Callback`]. [`AsyncLightAdapter`] turns one into a [`Command`].
//!
//! Both adapters hand a produced value to a matching result processor, when
//! a [`ResultProcessorRegistry`] is attached, and complete with whatever the
//! processor produces.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::command::{
    AsyncCommand, CancellableCommand, Command, CommandExecutor, CommandRef, CommandState,
};
use crate::data::DataScope;
use crate::errors::{CommandError, CommandInfo, Result};
use crate::event::CommandEvents;
use crate::exec::Proxy;
use crate::lifecycle::Lifecycle;
use crate::processor::ResultProcessorRegistry;
use crate::result::CommandResult;
use crate::types::{CommandId, LifecycleState, Value, lock};

/// Synchronous command backed by a closure.
pub struct FnCommand<F> {
    id: CommandId,
    name: String,
    run: F,
}

impl<F> FnCommand<F>
where
    F: Fn() -> Result<Option<Value>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            id: CommandId::next(),
            name: name.into(),
            run,
        }
    }
}

impl<F> Command for FnCommand<F>
where
    F: Fn() -> Result<Option<Value>> + Send + Sync,
{
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn execute(&self) -> Result<Option<Value>> {
        (self.run)()
    }
}

impl<F> fmt::Debug for FnCommand<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Input that can be pulled out of a data scope.
pub trait FromData: Sized {
    fn from_data(data: Option<&DataScope>) -> Result<Self>;
}

impl FromData for () {
    fn from_data(_data: Option<&DataScope>) -> Result<Self> {
        Ok(())
    }
}

/// Required: the most recent value of type `T`.
impl<T: Any + Send + Sync> FromData for Arc<T> {
    fn from_data(data: Option<&DataScope>) -> Result<Self> {
        data.and_then(|d| d.get::<T>())
            .ok_or(CommandError::MissingInput(type_name::<T>()))
    }
}

/// Optional: the most recent value of type `T`, if any.
impl<T: Any + Send + Sync> FromData for Option<Arc<T>> {
    fn from_data(data: Option<&DataScope>) -> Result<Self> {
        Ok(data.and_then(|d| d.get::<T>()))
    }
}

/// Every value of type `T`, oldest first.
impl<T: Any + Send + Sync> FromData for Vec<Arc<T>> {
    fn from_data(data: Option<&DataScope>) -> Result<Self> {
        Ok(data.map(|d| d.all::<T>()).unwrap_or_default())
    }
}

impl<A: FromData, B: FromData> FromData for (A, B) {
    fn from_data(data: Option<&DataScope>) -> Result<Self> {
        Ok((A::from_data(data)?, B::from_data(data)?))
    }
}

impl<A: FromData, B: FromData, C: FromData> FromData for (A, B, C) {
    fn from_data(data: Option<&DataScope>) -> Result<Self> {
        Ok((A::from_data(data)?, B::from_data(data)?, C::from_data(data)?))
    }
}

/// A typed unit of synchronous work.
///
/// ```ignore
/// struct Greet;
///
/// impl LightCommand for Greet {
///     type Input = Arc<String>;
///     type Output = String;
///
///     fn run(&self, name: Arc<String>) -> Result<String> {
///         Ok(format!("hello {name}"))
///     }
/// }
/// ```
pub trait LightCommand: Send + Sync + 'static {
    type Input: FromData;
    type Output: Any + Send + Sync;

    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output>;
}

/// A typed unit of asynchronous work.
///
/// `start` kicks the work off and hands the outcome to `callback` whenever
/// it is ready, from any thread.
pub trait AsyncLightCommand: Send + Sync + 'static {
    type Input: FromData;
    type Output: Any + Send + Sync;

    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }

    fn start(&self, input: Self::Input, callback: Callback<Self::Output>) -> Result<()>;

    /// Stop work in progress. Called at most once, when the adapter is
    /// cancelled before the callback reported anything.
    fn cancel(&self) {}
}

/// State shared by both adapters and the callbacks they hand out.
struct LightCore {
    state: CommandState,
    command_type: TypeId,
    processors: Mutex<Option<Arc<ResultProcessorRegistry>>>,
    lifecycle: Mutex<Option<Arc<dyn Lifecycle>>>,
    data: Mutex<Option<Arc<DataScope>>>,
    /// Result processor currently running, if any.
    processor: Mutex<Option<Arc<Proxy>>>,
}

impl LightCore {
    fn new(name: String, command_type: TypeId) -> Arc<Self> {
        Arc::new(Self {
            state: CommandState::new(name),
            command_type,
            processors: Mutex::new(None),
            lifecycle: Mutex::new(None),
            data: Mutex::new(None),
            processor: Mutex::new(None),
        })
    }

    fn prepare(&self, lifecycle: Arc<dyn Lifecycle>, data: Arc<DataScope>) {
        *lock(&self.lifecycle) = Some(lifecycle);
        *lock(&self.data) = Some(data);
    }

    fn data(&self) -> Option<Arc<DataScope>> {
        lock(&self.data).clone()
    }

    fn is_processing(&self) -> bool {
        lock(&self.processor).is_some()
    }

    /// Complete with `value`, or hand it to a result processor first.
    fn handle_result(self: &Arc<Self>, value: Option<Value>) {
        if self.state.phase() != LifecycleState::Active {
            warn!(command = %self.state.info(), "ignoring result: command is not active");
            return;
        }
        let registry = lock(&self.processors).clone();
        let processor = registry
            .zip(value.as_ref())
            .and_then(|(registry, value)| registry.new_processor(self.command_type, value));
        match (processor, value) {
            (Some(processor), Some(value)) => self.process(processor, value),
            (_, value) => {
                self.state.complete(value);
            }
        }
    }

    fn process(self: &Arc<Self>, processor: CommandRef, value: Value) {
        debug!(
            command = %self.state.info(),
            processor = %processor.info(),
            "processing result"
        );
        let proxy = Proxy::wrap(processor)
            .name(format!("{} result processor", self.state.name()))
            .data(value)
            .build();
        let lifecycle = lock(&self.lifecycle).clone();
        if let (Some(lifecycle), Some(data)) = (lifecycle, self.data()) {
            proxy.prepare(lifecycle, data);
        }

        let events = proxy.events();
        let core = Arc::downgrade(self);
        events.on_result(move |result| {
            if let Some(core) = core.upgrade() {
                lock(&core.processor).take();
                core.state.complete(result.value().cloned());
            }
        });
        let core = Arc::downgrade(self);
        events.on_error(move |cause| {
            if let Some(core) = core.upgrade() {
                lock(&core.processor).take();
                core.state.fail(cause.clone());
            }
        });
        let core = Arc::downgrade(self);
        events.on_cancel(move |_| {
            if let Some(core) = core.upgrade() {
                lock(&core.processor).take();
                if core.state.phase() == LifecycleState::Active {
                    core.state.cancel();
                }
            }
        });

        *lock(&self.processor) = Some(Arc::clone(&proxy));
        if let Err(cause) = proxy.execute() {
            lock(&self.processor).take();
            self.state.fail(cause);
        }
    }

    /// Cancel a running result processor, or call `stop` if there is none.
    fn cancel(&self, stop: impl FnOnce()) -> bool {
        self.state.cancel_with(|| {
            let processor = lock(&self.processor).take();
            match processor {
                Some(processor) => {
                    if let Err(err) = processor.cancel() {
                        warn!(
                            command = %self.state.info(),
                            error = %err,
                            "failed to cancel result processor"
                        );
                    }
                }
                None => stop(),
            }
        })
    }
}

fn into_value<T: Any + Send + Sync>(output: T) -> Option<Value> {
    if (&output as &dyn Any).is::<()>() {
        return None;
    }
    Some(Arc::new(output))
}

/// Reports the outcome of an [`AsyncLightCommand`].
///
/// Only the first report counts. Reporting after that, or after the command
/// was cancelled, is a usage error.
pub struct Callback<T> {
    core: Weak<LightCore>,
    _output: PhantomData<fn(T)>,
}

impl<T: Any + Send + Sync> Callback<T> {
    fn new(core: &Arc<LightCore>) -> Self {
        Self {
            core: Arc::downgrade(core),
            _output: PhantomData,
        }
    }

    /// Whether the command still waits for an outcome.
    pub fn is_active(&self) -> bool {
        self.core.upgrade().is_some_and(|core| {
            core.state.phase() == LifecycleState::Active && !core.is_processing()
        })
    }

    pub fn result(&self, output: T) -> Result<()> {
        let core = self.active("result")?;
        core.handle_result(into_value(output));
        Ok(())
    }

    pub fn error(&self, cause: CommandError) -> Result<()> {
        let core = self.active("error")?;
        core.state.fail(cause);
        Ok(())
    }

    /// Report that the work gave up on its own.
    pub fn cancel(&self) -> Result<()> {
        let core = self.active("cancel")?;
        core.state.cancel();
        Ok(())
    }

    fn active(&self, report: &str) -> Result<Arc<LightCore>> {
        match self.core.upgrade() {
            Some(core) if self.is_active() => Ok(core),
            Some(core) => Err(CommandError::usage(format!(
                "{report} reported although command {} is not active",
                core.state.info()
            ))),
            None => Err(CommandError::usage(format!(
                "{report} reported for a command that no longer exists"
            ))),
        }
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _output: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = self.core.upgrade().map(|core| core.state.info().clone());
        f.debug_struct("Callback")
            .field("command", &command)
            .field("output", &type_name::<T>())
            .finish()
    }
}

/// Runs a [`LightCommand`] as a [`Command`].
///
/// It is an executor only in the sense that it receives the enclosing data
/// scope before `execute`; it never runs children. A `()` output is not
/// recorded as a value.
///
/// Without a result processor it finishes inside `execute`. With one it
/// stays active, and cancellable, until the processor finishes.
pub struct LightAdapter<C> {
    command: Arc<C>,
    core: Arc<LightCore>,
}

impl<C: LightCommand> LightAdapter<C> {
    pub fn new(command: C) -> Self {
        Self::from_arc(Arc::new(command))
    }

    pub fn from_arc(command: Arc<C>) -> Self {
        let core = LightCore::new(command.name(), TypeId::of::<C>());
        Self { command, core }
    }

    /// Look up result processors in `processors`.
    pub fn with_processors(self, processors: Arc<ResultProcessorRegistry>) -> Self {
        *lock(&self.core.processors) = Some(processors);
        self
    }

    pub fn inner(&self) -> &C {
        &self.command
    }

    pub fn result(&self) -> Option<CommandResult> {
        self.core.state.result()
    }
}

impl<C: LightCommand> Command for LightAdapter<C> {
    fn id(&self) -> CommandId {
        self.core.state.id()
    }

    fn name(&self) -> String {
        self.core.state.name().to_string()
    }

    fn execute(&self) -> Result<Option<Value>> {
        if !self.core.state.begin_execute() {
            return Ok(None);
        }
        let data = self.core.data();
        let output =
            C::Input::from_data(data.as_deref()).and_then(|input| self.command.run(input));
        match output {
            Ok(output) => self.core.handle_result(into_value(output)),
            Err(cause) => {
                self.core.state.fail(cause);
            }
        }
        Ok(None)
    }

    fn as_async(&self) -> Option<&dyn AsyncCommand> {
        Some(self)
    }

    fn as_executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }

    fn info(&self) -> CommandInfo {
        self.core.state.info().clone()
    }
}

impl<C: LightCommand> AsyncCommand for LightAdapter<C> {
    fn phase(&self) -> LifecycleState {
        self.core.state.phase()
    }

    fn events(&self) -> &CommandEvents {
        self.core.state.events()
    }

    fn as_cancellable(&self) -> Option<&dyn CancellableCommand> {
        Some(self)
    }
}

impl<C: LightCommand> CancellableCommand for LightAdapter<C> {
    fn cancel(&self) -> Result<()> {
        self.core.cancel(|| {});
        Ok(())
    }
}

impl<C: LightCommand> CommandExecutor for LightAdapter<C> {
    fn prepare(&self, lifecycle: Arc<dyn Lifecycle>, data: Arc<DataScope>) {
        self.core.prepare(lifecycle, data);
    }

    fn is_cancellable(&self) -> bool {
        self.core.is_processing()
    }

    fn is_suspendable(&self) -> bool {
        false
    }
}

impl<C: LightCommand> fmt::Debug for LightAdapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightAdapter")
            .field("command", self.core.state.info())
            .field("type", &type_name::<C>())
            .field("state", &self.core.state.phase())
            .finish()
    }
}

/// Runs an [`AsyncLightCommand`] as a cancellable [`Command`].
pub struct AsyncLightAdapter<C> {
    command: Arc<C>,
    core: Arc<LightCore>,
}

impl<C: AsyncLightCommand> AsyncLightAdapter<C> {
    pub fn new(command: C) -> Self {
        Self::from_arc(Arc::new(command))
    }

    pub fn from_arc(command: Arc<C>) -> Self {
        let core = LightCore::new(command.name(), TypeId::of::<C>());
        Self { command, core }
    }

    pub fn with_processors(self, processors: Arc<ResultProcessorRegistry>) -> Self {
        *lock(&self.core.processors) = Some(processors);
        self
    }

    pub fn inner(&self) -> &C {
        &self.command
    }

    pub fn result(&self) -> Option<CommandResult> {
        self.core.state.result()
    }
}

impl<C: AsyncLightCommand> Command for AsyncLightAdapter<C> {
    fn id(&self) -> CommandId {
        self.core.state.id()
    }

    fn name(&self) -> String {
        self.core.state.name().to_string()
    }

    fn execute(&self) -> Result<Option<Value>> {
        if !self.core.state.begin_execute() {
            return Ok(None);
        }
        let data = self.core.data();
        let started = C::Input::from_data(data.as_deref())
            .and_then(|input| self.command.start(input, Callback::new(&self.core)));
        if let Err(cause) = started {
            self.core.state.fail(cause);
        }
        Ok(None)
    }

    fn as_async(&self) -> Option<&dyn AsyncCommand> {
        Some(self)
    }

    fn as_executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }

    fn info(&self) -> CommandInfo {
        self.core.state.info().clone()
    }
}

impl<C: AsyncLightCommand> AsyncCommand for AsyncLightAdapter<C> {
    fn phase(&self) -> LifecycleState {
        self.core.state.phase()
    }

    fn events(&self) -> &CommandEvents {
        self.core.state.events()
    }

    fn as_cancellable(&self) -> Option<&dyn CancellableCommand> {
        Some(self)
    }
}

impl<C: AsyncLightCommand> CancellableCommand for AsyncLightAdapter<C> {
    fn cancel(&self) -> Result<()> {
        self.core.cancel(|| self.command.cancel());
        Ok(())
    }
}

impl<C: AsyncLightCommand> CommandExecutor for AsyncLightAdapter<C> {
    fn prepare(&self, lifecycle: Arc<dyn Lifecycle>, data: Arc<DataScope>) {
        self.core.prepare(lifecycle, data);
    }

    fn is_cancellable(&self) -> bool {
        true
    }

    fn is_suspendable(&self) -> bool {
        false
    }
}

impl<C: AsyncLightCommand> fmt::Debug for AsyncLightAdapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLightAdapter")
            .field("command", self.core.state.info())
            .field("type", &type_name::<C>())
            .field("state", &self.core.state.phase())
            .finish()
    }
}
