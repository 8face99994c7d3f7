//! Multicast delegates for structural ECS events.
//!
//! Every structural mutation the runtime performs — component creation and
//! destruction, attachment to and detachment from entities, activation
//! transitions, entity creation and destruction — is broadcast through a
//! [`Delegate`]. Subscribers receive events inline on the calling thread,
//! in no guaranteed order relative to each other.
//!
//! Subscribers must not mutate ECS structure from inside a callback; they
//! may record the event and enqueue work for later.

use crate::engine::component::ComponentHandle;
use crate::engine::types::EntityId;

/// Token returned by [`Delegate::subscribe`], used to unsubscribe.
pub type SubscriptionId = u32;

/// Multicast subscription point for one event kind.
pub struct Delegate<E> {
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
    next_id: SubscriptionId,
}

impl<E> Default for Delegate<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> Delegate<E> {
    /// Registers a callback; returns a token for unsubscribing.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a previously registered callback. Returns `false` if the
    /// token is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(token, _)| *token != id);
        self.subscribers.len() != before
    }

    /// Invokes every subscriber with `event`.
    pub fn emit(&mut self, event: &E) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Drops all subscriptions.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

/// Payload of attach/detach events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentAttachment {
    /// Entity the component was attached to or detached from.
    pub entity: EntityId,

    /// Handle of the component in question.
    pub handle: ComponentHandle,
}

/// All delegate endpoints of the runtime, owned by the manager.
#[derive(Default)]
pub struct EventHub {
    /// A component payload was created.
    pub component_created: Delegate<ComponentHandle>,

    /// A component payload was destroyed. The handle is already stale when
    /// subscribers observe it.
    pub component_destroyed: Delegate<ComponentHandle>,

    /// A component was attached to an entity.
    pub component_attached: Delegate<ComponentAttachment>,

    /// A component was detached from an entity. Detachment does not destroy
    /// the payload.
    pub component_detached: Delegate<ComponentAttachment>,

    /// A component's owning entity became effectively active.
    pub component_activated: Delegate<ComponentHandle>,

    /// A component's owning entity became effectively inactive.
    pub component_deactivated: Delegate<ComponentHandle>,

    /// An entity was created.
    pub entity_created: Delegate<EntityId>,

    /// An entity was destroyed. The id never resolves again.
    pub entity_destroyed: Delegate<EntityId>,
}

impl EventHub {
    /// Creates a hub with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every subscription on every delegate.
    pub fn clear(&mut self) {
        self.component_created.clear();
        self.component_destroyed.clear();
        self.component_attached.clear();
        self.component_detached.clear();
        self.component_activated.clear();
        self.component_deactivated.clear();
        self.entity_created.clear();
        self.entity_destroyed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_every_subscriber() {
        let mut delegate: Delegate<u32> = Delegate::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = seen.clone();
        delegate.subscribe(move |value| a.borrow_mut().push(*value));
        let b = seen.clone();
        delegate.subscribe(move |value| b.borrow_mut().push(*value * 10));

        delegate.emit(&3);
        assert_eq!(*seen.borrow(), vec![3, 30]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut delegate: Delegate<u32> = Delegate::default();
        let seen = Rc::new(RefCell::new(0u32));

        let counter = seen.clone();
        let token = delegate.subscribe(move |_| *counter.borrow_mut() += 1);

        delegate.emit(&0);
        assert!(delegate.unsubscribe(token));
        assert!(!delegate.unsubscribe(token));
        delegate.emit(&0);

        assert_eq!(*seen.borrow(), 1);
    }
}
