// src/commands.rs

//! Entry point for building proxies and groups.
//!
//! [`Commands`] carries the lifecycle hook, the adapter registry, the result
//! processors and the configured defaults, and hands them to every proxy,
//! group and light command it creates.
//! Construct one per application (or per test) and pass it down.

use std::sync::Arc;

use crate::adapter::{AdapterRegistry, Candidate};
use crate::command::{
    AsyncLightAdapter, AsyncLightCommand, Command, CommandRef, LightAdapter, LightCommand,
};
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::exec::{Proxy, ProxyBuilder};
use crate::group::{GroupBuilder, Parallel, ParallelStrategy, Sequence, SequenceStrategy};
use crate::lifecycle::{CommandType, DefaultLifecycle, Lifecycle};
use crate::processor::ResultProcessorRegistry;

#[derive(Debug, Clone)]
pub struct Commands {
    lifecycle: Arc<dyn Lifecycle>,
    adapters: Arc<AdapterRegistry>,
    processors: Arc<ResultProcessorRegistry>,
    config: EngineConfig,
}

impl Commands {
    pub fn new() -> Self {
        Self {
            lifecycle: Arc::new(DefaultLifecycle::new()),
            adapters: Arc::new(AdapterRegistry::new()),
            processors: Arc::new(ResultProcessorRegistry::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn Lifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = Arc::new(adapters);
        self
    }

    pub fn with_processors(mut self, processors: ResultProcessorRegistry) -> Self {
        self.processors = Arc::new(processors);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lifecycle(&self) -> &Arc<dyn Lifecycle> {
        &self.lifecycle
    }

    pub fn adapters(&self) -> &Arc<AdapterRegistry> {
        &self.adapters
    }

    pub fn processors(&self) -> &Arc<ResultProcessorRegistry> {
        &self.processors
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Proxy around an existing command.
    pub fn wrap(&self, command: CommandRef) -> ProxyBuilder {
        self.configure(Proxy::wrap(command))
    }

    /// Proxy that instantiates `ty` through the lifecycle hook on execution.
    pub fn create(&self, ty: CommandType) -> ProxyBuilder {
        self.configure(Proxy::of_type(ty))
    }

    pub fn create_type<T: Command + 'static>(&self) -> ProxyBuilder {
        self.create(CommandType::of::<T>())
    }

    /// Adapter for `command` using this context's result processors.
    pub fn light<C: LightCommand>(&self, command: C) -> Arc<LightAdapter<C>> {
        Arc::new(LightAdapter::new(command).with_processors(Arc::clone(&self.processors)))
    }

    pub fn async_light<C: AsyncLightCommand>(&self, command: C) -> Arc<AsyncLightAdapter<C>> {
        Arc::new(AsyncLightAdapter::new(command).with_processors(Arc::clone(&self.processors)))
    }

    pub fn sequence(&self) -> GroupBuilder<SequenceStrategy> {
        Sequence::builder()
            .options(self.config.group.executor_options())
            .lifecycle(Arc::clone(&self.lifecycle))
    }

    pub fn parallel(&self) -> GroupBuilder<ParallelStrategy> {
        Parallel::builder()
            .options(self.config.group.executor_options())
            .lifecycle(Arc::clone(&self.lifecycle))
    }

    /// Turn a candidate into a command. Types become proxies carrying this
    /// context's lifecycle hook.
    pub fn resolve(&self, candidate: Candidate) -> Result<CommandRef> {
        match candidate {
            Candidate::Type(ty) => {
                let proxy: CommandRef = self.create(ty).build();
                Ok(proxy)
            }
            other => self.adapters.resolve(other),
        }
    }

    fn configure(&self, builder: ProxyBuilder) -> ProxyBuilder {
        builder
            .lifecycle(Arc::clone(&self.lifecycle))
            .adapters(Arc::clone(&self.adapters))
            .maybe_timeout(self.config.proxy.timeout)
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}
