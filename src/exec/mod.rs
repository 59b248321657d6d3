// src/exec/mod.rs

//! Single-command execution.
//!
//! - [`proxy`] wraps exactly one target command, resolving it from a type
//!   through the lifecycle hook when needed, and enforces an optional
//!   timeout.
//! - [`timer`] is the single-shot Tokio timer behind that timeout.

pub mod proxy;
pub mod timer;

pub use proxy::{Proxy, ProxyBuilder, ProxyStrategy};
pub use timer::Timer;
