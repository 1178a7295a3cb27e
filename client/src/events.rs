//! Typed publish/subscribe keyed by a closed set of event kinds
//!
//! Every subscription returns a [`Subscription`] handle that removes exactly
//! that handler again. Handlers are compared by `Arc` identity, so
//! subscribing the same handler to the same kind twice is a no-op that
//! hands back the original subscription.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// An event that knows which kind it belongs to
pub trait Event {
    type Kind: Copy + Eq + Hash;

    fn kind(&self) -> Self::Kind;
}

impl Event for shared::ServerEvent {
    type Kind = shared::EventKind;

    fn kind(&self) -> shared::EventKind {
        shared::ServerEvent::kind(self)
    }
}

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription<K> {
    kind: K,
    id: u64,
}

impl<K: Copy> Subscription<K> {
    pub fn kind(&self) -> K {
        self.kind
    }
}

pub struct EventBus<E: Event> {
    next_id: u64,
    handlers: HashMap<E::Kind, Vec<(u64, Handler<E>)>>,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            handlers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, kind: E::Kind, handler: Handler<E>) -> Subscription<E::Kind> {
        let handlers = self.handlers.entry(kind).or_default();

        if let Some((id, _)) = handlers.iter().find(|(_, h)| Arc::ptr_eq(h, &handler)) {
            return Subscription { kind, id: *id };
        }

        let id = self.next_id;
        self.next_id += 1;
        handlers.push((id, handler));

        Subscription { kind, id }
    }

    /// Removes a handler. Returns false if it was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription<E::Kind>) -> bool {
        let Some(handlers) = self.handlers.get_mut(&subscription.kind) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        before != handlers.len()
    }

    /// Calls every handler of the event's kind, in subscription order
    pub fn emit(&self, event: &E) {
        if let Some(handlers) = self.handlers.get(&event.kind()) {
            for (_, handler) in handlers {
                handler(event);
            }
        }
    }

    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
