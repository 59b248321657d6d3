// src/data.rs

//! Hierarchical store of values produced by completed commands.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::types::{Value, lock};

/// Append-only sequence of values with an optional parent scope.
///
/// Lookups scan this scope from the most recently added value backwards,
/// descend into any value that is itself a `DataScope`, and finally fall
/// back to the parent. The parent is held weakly: a group's scope is usually
/// stored as a value inside its parent's scope, so an owning back-reference
/// would form a cycle.
pub struct DataScope {
    values: Mutex<Vec<Value>>,
    parent: Option<Weak<DataScope>>,
}

/// Scopes already entered during one lookup.
///
/// Lives on the caller's stack, so concurrent lookups on the same scope never
/// see each other's markers.
struct Visiting(Vec<*const DataScope>);

impl Visiting {
    fn new() -> Self {
        Visiting(Vec::new())
    }

    /// Returns `false` if `scope` was already entered.
    fn enter(&mut self, scope: &DataScope) -> bool {
        let ptr = scope as *const DataScope;
        if self.0.contains(&ptr) {
            return false;
        }
        self.0.push(ptr);
        true
    }
}

impl DataScope {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(Vec::new()),
            parent: None,
        })
    }

    /// Create a child scope that falls back to `parent` on lookup misses.
    pub fn with_parent(parent: &Arc<DataScope>) -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(Vec::new()),
            parent: Some(Arc::downgrade(parent)),
        })
    }

    pub fn parent(&self) -> Option<Arc<DataScope>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn push(&self, value: Value) {
        lock(&self.values).push(value);
    }

    /// Number of values stored directly in this scope.
    pub fn len(&self) -> usize {
        lock(&self.values).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.values).is_empty()
    }

    /// Snapshot of the values stored directly in this scope, oldest first.
    pub fn values(&self) -> Vec<Value> {
        lock(&self.values).clone()
    }

    /// The most recently added value of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let found = self.find(&mut Visiting::new(), &|v: &Value| (**v).is::<T>())?;
        found.downcast::<T>().ok()
    }

    /// The most recently added non-scope value of any type.
    pub fn last(&self) -> Option<Value> {
        self.find(&mut Visiting::new(), &|v: &Value| !(**v).is::<DataScope>())
    }

    /// Every value of type `T`: this scope in insertion order (nested scopes
    /// expanded in place), followed by the parent's matches.
    pub fn all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        let mut out = Vec::new();
        self.collect(&mut Visiting::new(), &mut |v: &Value| {
            if let Ok(typed) = v.clone().downcast::<T>() {
                out.push(typed);
            }
        });
        out
    }

    fn find(&self, visiting: &mut Visiting, matches: &dyn Fn(&Value) -> bool) -> Option<Value> {
        if !visiting.enter(self) {
            return None;
        }

        // Never hold our own lock while descending into other scopes.
        let snapshot = self.values();
        for value in snapshot.iter().rev() {
            if matches(value) {
                return Some(value.clone());
            }
            if let Ok(nested) = value.clone().downcast::<DataScope>() {
                if let Some(found) = nested.find(visiting, matches) {
                    return Some(found);
                }
            }
        }

        self.parent()
            .and_then(|parent| parent.find(visiting, matches))
    }

    fn collect(&self, visiting: &mut Visiting, sink: &mut dyn FnMut(&Value)) {
        if !visiting.enter(self) {
            return;
        }

        let snapshot = self.values();
        for value in snapshot.iter() {
            match value.clone().downcast::<DataScope>() {
                Ok(nested) => nested.collect(visiting, sink),
                Err(_) => sink(value),
            }
        }

        if let Some(parent) = self.parent() {
            parent.collect(visiting, sink);
        }
    }
}

impl fmt::Debug for DataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataScope")
            .field("len", &self.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
