//! Change notifications published by the tagger.

use std::fmt;

/// A document change, carrying the id of the affected tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EntityAdded(String),
    EntityFinalized(String),
    EntityEdited(String),
    EntityRemoved(String),
    EntityCopied(String),
    EntityPasted(String),
    TagAdded(String),
    TagEdited(String),
    TagRemoved(String),
    TagContentsRemoved(String),
    /// The user activated a note marker and wants to edit the entity.
    EditRequested(String),
    DocumentLoaded,
}

type Subscriber = Box<dyn Fn(&Event) + Send + Sync>;

/// Synchronous publish/subscribe bus.
///
/// Subscribers are called in registration order. Every published event is
/// also queued until [`EventBus::drain`] is called.
#[derive(Default)]
pub struct EventBus {
    queue: Vec<Event>,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn publish(&mut self, event: Event) {
        tracing::debug!(event = ?event, "publishing event");
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
        self.queue.push(event);
    }

    /// Take every event published since the last drain.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.queue)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_publish_reaches_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for name in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |event| seen.lock().unwrap().push(format!("{name}:{event:?}")));
        }
        bus.publish(Event::EntityAdded("ent_1".into()));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "first:EntityAdded(\"ent_1\")".to_string(),
                "second:EntityAdded(\"ent_1\")".to_string()
            ]
        );
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut bus = EventBus::new();
        bus.publish(Event::DocumentLoaded);
        bus.publish(Event::TagRemoved("struct_2".into()));
        assert_eq!(bus.drain(), vec![Event::DocumentLoaded, Event::TagRemoved("struct_2".into())]);
        assert!(bus.drain().is_empty());
    }
}
