// src/lib.rs

//! Command execution and composition engine.
//!
//! Commands are units of work that finish synchronously or report their
//! outcome later through events. They are composed with:
//! - [`Proxy`]: one target, resolved directly or from a type, with an
//!   optional timeout;
//! - [`Sequence`]: children one after the other;
//! - [`Parallel`]: all children at once.
//!
//! All three share the executor base in [`engine`], which tracks running
//! children, forwards cancel/suspend/resume, appends child values to a
//! [`DataScope`] and turns child failures into [`CommandException`]s.

pub mod adapter;
pub mod command;
pub mod commands;
pub mod config;
pub mod data;
pub mod engine;
pub mod errors;
pub mod event;
pub mod exec;
pub mod group;
pub mod lifecycle;
pub mod logging;
pub mod processor;
pub mod result;
pub mod types;

pub use adapter::{
    AdapterFactory, AdapterRegistry, AsyncLightAdapterFactory, BuildCommand, Candidate,
    LightAdapterFactory,
};
pub use command::{
    AsyncCommand, AsyncLightAdapter, AsyncLightCommand, Callback, CancellableCommand, Command,
    CommandExecutor, CommandRef, CommandState, FnCommand, FromData, LightAdapter, LightCommand,
    SuspendableCommand,
};
pub use commands::Commands;
pub use config::EngineConfig;
pub use data::DataScope;
pub use engine::{Executor, ExecutorOptions, ExecutorStrategy};
pub use errors::{CommandError, CommandException, CommandInfo, Result};
pub use event::{CommandEvent, CommandEventKind, CommandEvents};
pub use exec::{Proxy, ProxyBuilder};
pub use group::{GroupBuilder, Parallel, Sequence};
pub use lifecycle::{CommandType, DefaultLifecycle, Instance, Lifecycle};
pub use processor::{ProcessorSlot, ResultProcessorRegistry};
pub use result::{CommandResult, Outcome};
pub use types::{CommandId, LifecycleState, ResultStatus, Value, value};
