// src/event/dispatcher.rs

//! Generic listener registry.
//!
//! Contract:
//! - listeners are registered per event kind and invoked in registration order;
//! - `dispatch` delivers to a snapshot of the listeners taken when it starts,
//!   so a listener may subscribe or unsubscribe (itself or others) while being
//!   invoked without affecting the delivery in progress.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::types::lock;

/// An event with a kind used for routing.
pub trait Event {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct EventDispatcher<E: Event> {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<E::Kind, Vec<(ListenerId, Listener<E>)>>>,
}

impl<E: Event> EventDispatcher<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, kind: E::Kind, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners)
            .entry(kind)
            .or_default()
            .push((id, listener));
        id
    }

    /// Convenience wrapper around [`subscribe`](Self::subscribe) for closures.
    pub fn on<F>(&self, kind: E::Kind, f: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(f))
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: E::Kind, id: ListenerId) -> bool {
        let mut guard = lock(&self.listeners);
        let Some(list) = guard.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            guard.remove(&kind);
        }
        removed
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        lock(&self.listeners).get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener registered for its kind.
    pub fn dispatch(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = {
            let guard = lock(&self.listeners);
            match guard.get(&event.kind()) {
                Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return,
            }
        };

        for listener in snapshot {
            listener(event);
        }
    }
}

impl<E: Event> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = lock(&self.listeners);
        let counts: HashMap<_, _> = guard.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("listeners", &counts)
            .finish()
    }
}
