// src/exec/proxy.rs

//! Proxy: run one target command with an optional timeout.
//!
//! The target is either given directly or created on `execute` from a
//! [`CommandType`] through the lifecycle hook, with the proxy's data scope
//! available to the factory. Objects the hook returns that are not commands
//! go through the adapter registry.
//!
//! The timeout is armed once the target is running, disarmed when the proxy
//! completes, fails, is cancelled or suspended, and re-armed on resume. When
//! it fires the target is cancelled and the proxy fails with a timeout
//! cause.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::adapter::{AdapterRegistry, BuildCommand};
use crate::command::{Command, CommandRef};
use crate::engine::{Executor, ExecutorOptions, ExecutorStrategy};
use crate::errors::{CommandError, Result};
use crate::event::{CommandEvent, CommandEventKind};
use crate::exec::timer::Timer;
use crate::lifecycle::{CommandType, Instance, Lifecycle};
use crate::result::CommandResult;
use crate::types::{LifecycleState, Value, lock};

pub type Proxy = Executor<ProxyStrategy>;

#[derive(Debug)]
pub struct ProxyStrategy {
    target: Mutex<Option<CommandRef>>,
    command_type: Option<CommandType>,
    adapters: Option<Arc<AdapterRegistry>>,
    timeout: Option<Duration>,
    timer: Timer,
}

impl ProxyStrategy {
    fn resolve_target(&self, proxy: &Proxy) -> Result<CommandRef> {
        if let Some(target) = lock(&self.target).clone() {
            return Ok(target);
        }
        let Some(ty) = self.command_type else {
            return Err(CommandError::usage(
                "proxy has neither a target command nor a command type",
            ));
        };

        let instance = proxy
            .lifecycle()
            .create_instance(&ty, &proxy.data())?
            .ok_or_else(|| CommandError::Instantiation(format!("no factory registered for {ty}")))?;

        let command = match instance {
            Instance::Command(command) => command,
            Instance::Object(object) => match &self.adapters {
                Some(adapters) => adapters.adapt(&object)?,
                None => return Err(CommandError::NoAdapter(ty.to_string())),
            },
        };
        debug!(proxy = %proxy.state().info(), target = %command.info(), "instantiated target");

        *lock(&self.target) = Some(Arc::clone(&command));
        Ok(command)
    }

    fn on_timeout(&self, proxy: &Proxy, generation: u64) {
        if !self.timer.claim(generation) {
            return;
        }
        if proxy.phase() != LifecycleState::Active {
            error!(
                proxy = %proxy.state().info(),
                state = %proxy.phase(),
                "timeout fired while proxy was not active"
            );
            return;
        }
        let Some(timeout) = self.timeout else {
            return;
        };

        warn!(proxy = %proxy.state().info(), ?timeout, "command timed out");
        let target = lock(&self.target).as_ref().map(|t| t.info());
        proxy.cancel_children();
        proxy.fail_with_exception(target, CommandError::Timeout(timeout));
    }
}

impl ExecutorStrategy for ProxyStrategy {
    fn kind(&self) -> &'static str {
        "Proxy"
    }

    fn validate(&self, _proxy: &Proxy) -> Result<()> {
        if lock(&self.target).is_none() && self.command_type.is_none() {
            return Err(CommandError::usage(
                "proxy has neither a target command nor a command type",
            ));
        }
        if self.timeout.is_some() {
            self.timer.ensure_runtime()?;
        }
        Ok(())
    }

    fn start(&self, proxy: &Proxy) {
        let target = match self.resolve_target(proxy) {
            Ok(target) => target,
            Err(cause) => {
                warn!(proxy = %proxy.state().info(), error = %cause, "could not resolve target");
                proxy.fail_with_exception(None, cause);
                return;
            }
        };

        proxy.start_child(target);

        // Nothing to time if the target already finished.
        if proxy.phase() == LifecycleState::Active {
            arm_timer(proxy);
        }
    }

    fn on_child_complete(&self, proxy: &Proxy, result: CommandResult) {
        proxy.complete_with(result.value().cloned());
    }
}

fn arm_timer(proxy: &Proxy) {
    let Some(timeout) = proxy.strategy().timeout else {
        return;
    };
    let weak = proxy.weak();
    let armed = proxy.strategy().timer.arm(timeout, move |generation| {
        if let Some(proxy) = weak.upgrade() {
            proxy.strategy().on_timeout(&proxy, generation);
        }
    });
    if let Err(err) = armed {
        warn!(proxy = %proxy.state().info(), error = %err, "could not arm timeout");
    }
}

/// Keep the timer in step with the proxy's own lifecycle events.
fn watch_timer(proxy: &Arc<Proxy>) {
    let events = proxy.events();
    for kind in [
        CommandEventKind::Completed,
        CommandEventKind::Failed,
        CommandEventKind::Cancelled,
        CommandEventKind::Suspended,
    ] {
        let weak = proxy.weak();
        events.on(kind, move |_: &CommandEvent| {
            if let Some(proxy) = weak.upgrade() {
                proxy.strategy().timer.disarm();
            }
        });
    }

    let weak = proxy.weak();
    events.on(CommandEventKind::Resumed, move |_: &CommandEvent| {
        if let Some(proxy) = weak.upgrade() {
            arm_timer(&proxy);
        }
    });
}

impl Executor<ProxyStrategy> {
    /// Proxy with neither a target nor a type yet.
    pub fn builder() -> ProxyBuilder {
        ProxyBuilder::new(None, None)
    }

    /// Proxy for an existing command.
    pub fn wrap(target: CommandRef) -> ProxyBuilder {
        ProxyBuilder::new(Some(target), None)
    }

    /// Proxy that instantiates its target from `ty` on execution.
    pub fn of_type(ty: CommandType) -> ProxyBuilder {
        ProxyBuilder::new(None, Some(ty))
    }

    pub fn for_type<T: Command + 'static>() -> ProxyBuilder {
        Self::of_type(CommandType::of::<T>())
    }

    /// The target, once given or instantiated.
    pub fn target(&self) -> Option<CommandRef> {
        lock(&self.strategy().target).clone()
    }

    pub fn command_type(&self) -> Option<CommandType> {
        self.strategy().command_type
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.strategy().timeout
    }

    pub fn timer_armed(&self) -> bool {
        self.strategy().timer.is_armed()
    }
}

#[derive(Debug)]
pub struct ProxyBuilder {
    target: Option<CommandRef>,
    command_type: Option<CommandType>,
    timeout: Option<Duration>,
    adapters: Option<Arc<AdapterRegistry>>,
    options: ExecutorOptions,
    data: Vec<Value>,
}

impl ProxyBuilder {
    fn new(target: Option<CommandRef>, command_type: Option<CommandType>) -> Self {
        Self {
            target,
            command_type,
            timeout: None,
            adapters: None,
            options: ExecutorOptions::default(),
            data: Vec::new(),
        }
    }

    pub fn target(mut self, target: CommandRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn command_type(mut self, ty: CommandType) -> Self {
        self.command_type = Some(ty);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn maybe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn Lifecycle>) -> Self {
        self.options.lifecycle = Some(lifecycle);
        self
    }

    pub fn adapters(mut self, adapters: Arc<AdapterRegistry>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Seed a value into the proxy's data scope.
    pub fn data(mut self, value: Value) -> Self {
        self.data.push(value);
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

    pub fn build(self) -> Arc<Proxy> {
        let strategy = ProxyStrategy {
            target: Mutex::new(self.target),
            command_type: self.command_type,
            adapters: self.adapters,
            timeout: self.timeout,
            timer: Timer::new(),
        };
        let proxy = Executor::with_options(self.options, strategy);
        for value in self.data {
            proxy.add_data(value);
        }
        if proxy.timeout().is_some() {
            watch_timer(&proxy);
        }
        proxy
    }

    /// Build the proxy and execute it right away.
    pub fn execute(self) -> Result<Arc<Proxy>> {
        let proxy = self.build();
        proxy.execute()?;
        Ok(proxy)
    }
}

impl BuildCommand for ProxyBuilder {
    fn build_command(self: Box<Self>) -> CommandRef {
        self.build()
    }
}
