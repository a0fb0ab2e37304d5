//! Lifecycle Event Emitter
//!
//! Single-writer broadcaster for update lifecycle transitions. The update
//! pipeline publishes; any number of listeners subscribe. Delivery for one
//! publish call follows subscription order, and there is no buffering: a
//! listener only sees events published while it is registered.

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use crate::update::UpdateRecord;

/// Update lifecycle transitions surfaced to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    CheckStarted,
    NoUpdateAvailable,
    UpdateAvailable(UpdateRecord),
    Error { kind: String, message: String },
}

type Listener = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Broadcast point for [`LifecycleEvent`]s.
pub struct EventEmitter {
    registry: Arc<Mutex<Registry>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener. The returned handle unsubscribes when dropped,
    /// so keep it alive for as long as events are wanted.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every live listener, in subscription order.
    ///
    /// The listener list is snapshotted under the lock and invoked outside
    /// it, so a listener may subscribe or unsubscribe re-entrantly, and a
    /// panicking listener cannot poison the registry. Listeners registered
    /// at publish time receive this event even if they unsubscribe while it
    /// is being delivered.
    pub fn publish(&self, event: &LifecycleEvent) {
        let snapshot: Vec<Listener> = {
            let registry = self.registry.lock().unwrap();
            registry
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        for listener in snapshot {
            listener(event);
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an active subscription.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap();
            registry.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_in_subscription_order() {
        let emitter = EventEmitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = Arc::clone(&order);
            emitter.subscribe(move |_| order.lock().unwrap().push("first"))
        };
        let second = {
            let order = Arc::clone(&order);
            emitter.subscribe(move |_| order.lock().unwrap().push("second"))
        };

        emitter.publish(&LifecycleEvent::CheckStarted);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);

        drop(first);
        drop(second);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let emitter = EventEmitter::new();
        let count = Arc::new(Mutex::new(0u32));

        let sub = {
            let count = Arc::clone(&count);
            emitter.subscribe(move |_| *count.lock().unwrap() += 1)
        };

        emitter.publish(&LifecycleEvent::CheckStarted);
        sub.unsubscribe();
        emitter.publish(&LifecycleEvent::NoUpdateAvailable);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_no_replay_for_late_subscriber() {
        let emitter = EventEmitter::new();
        emitter.publish(&LifecycleEvent::CheckStarted);

        let count = Arc::new(Mutex::new(0u32));
        let _sub = {
            let count = Arc::clone(&count);
            emitter.subscribe(move |_| *count.lock().unwrap() += 1)
        };

        assert_eq!(*count.lock().unwrap(), 0);
        emitter.publish(&LifecycleEvent::NoUpdateAvailable);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_reentrant_subscribe_from_listener() {
        let emitter = Arc::new(EventEmitter::new());
        let late_count = Arc::new(Mutex::new(0u32));
        let late_sub = Arc::new(Mutex::new(None));

        let outer = {
            let emitter_inner = Arc::clone(&emitter);
            let late_count = Arc::clone(&late_count);
            let late_sub = Arc::clone(&late_sub);
            emitter.subscribe(move |_| {
                // Subscribing from inside a delivery must not deadlock.
                let late_count = Arc::clone(&late_count);
                let sub = emitter_inner.subscribe(move |_| *late_count.lock().unwrap() += 1);
                *late_sub.lock().unwrap() = Some(sub);
            })
        };

        emitter.publish(&LifecycleEvent::CheckStarted);
        // The listener registered mid-publish sees only later events.
        assert_eq!(*late_count.lock().unwrap(), 0);

        outer.unsubscribe();
        emitter.publish(&LifecycleEvent::NoUpdateAvailable);
        assert_eq!(*late_count.lock().unwrap(), 1);
    }

    #[test]
    fn test_unsubscribe_from_listener_does_not_deadlock() {
        let emitter = Arc::new(EventEmitter::new());
        let count = Arc::new(Mutex::new(0u32));

        let sub_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let sub = {
            let count = Arc::clone(&count);
            let sub_slot = Arc::clone(&sub_slot);
            emitter.subscribe(move |_| {
                *count.lock().unwrap() += 1;
                // Drop our own subscription while it is being delivered to.
                sub_slot.lock().unwrap().take();
            })
        };
        *sub_slot.lock().unwrap() = Some(sub);

        emitter.publish(&LifecycleEvent::CheckStarted);
        emitter.publish(&LifecycleEvent::NoUpdateAvailable);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(&LifecycleEvent::Error {
            kind: "storage".to_string(),
            message: "disk full".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "storage");
    }
}
