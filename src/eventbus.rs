use crate::event::{EventKind, HeadsetEvent};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Trait for reacting to events from a headset session.
pub trait EventListener: Send {
    fn on_event(&mut self, event: &HeadsetEvent);
}

impl<F> EventListener for F
where
    F: FnMut(&HeadsetEvent) + Send,
{
    fn on_event(&mut self, event: &HeadsetEvent) {
        self(event)
    }
}

/// Determines which events a listener wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    All,
    Only(EventKind),
    Custom(fn(&HeadsetEvent) -> bool),
}

impl EventFilter {
    fn accepts(&self, event: &HeadsetEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(kind) => event.kind() == *kind,
            EventFilter::Custom(f) => f(event),
        }
    }
}

/// Handle returned by [`EventBus::add_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Metadata-wrapped listener with filter and control flags.
struct ListenerEntry {
    listener: Box<dyn EventListener>,
    enabled: bool,
    filter: EventFilter,
    // Registered by the session itself; survives clear_listeners().
    internal: bool,
}

/// Ordered fan-out of [`HeadsetEvent`]s to registered listeners.
///
/// Listeners run in registration order on the emitting thread. A listener must not call
/// back into the bus that is emitting to it.
pub struct EventBus {
    next_id: u64,
    listeners: BTreeMap<u64, ListenerEntry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: BTreeMap::new(),
        }
    }

    /// Registers a listener with a filter.
    pub fn add_listener(
        &mut self,
        listener: impl EventListener + 'static,
        filter: EventFilter,
    ) -> ListenerId {
        self.insert(Box::new(listener), filter, false)
    }

    /// Registers a listener owned by the session. `clear_listeners` leaves it in place.
    pub(crate) fn add_internal_listener(
        &mut self,
        listener: impl EventListener + 'static,
        filter: EventFilter,
    ) -> ListenerId {
        self.insert(Box::new(listener), filter, true)
    }

    fn insert(
        &mut self,
        listener: Box<dyn EventListener>,
        filter: EventFilter,
        internal: bool,
    ) -> ListenerId {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener,
                enabled: true,
                filter,
                internal,
            },
        );
        self.next_id += 1;
        ListenerId(id)
    }

    /// Enables a previously registered listener.
    pub fn enable(&mut self, id: ListenerId) {
        if let Some(entry) = self.listeners.get_mut(&id.0) {
            entry.enabled = true;
        }
    }

    /// Disables (mutes) a listener without removing it.
    pub fn disable(&mut self, id: ListenerId) {
        if let Some(entry) = self.listeners.get_mut(&id.0) {
            entry.enabled = false;
        }
    }

    /// Unregisters a listener entirely. Returns `false` if the id was unknown.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    /// Removes every caller-registered listener; internal ones stay.
    pub fn clear_listeners(&mut self) {
        self.listeners.retain(|_, entry| entry.internal);
    }

    /// Removes everything, internal listeners included.
    pub(crate) fn clear_all(&mut self) {
        self.listeners.clear();
    }

    /// Number of caller-registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.values().filter(|e| !e.internal).count()
    }

    /// Emits one event to all active and matching listeners.
    pub fn emit(&mut self, event: &HeadsetEvent) {
        for (id, entry) in self.listeners.iter_mut() {
            if !entry.enabled || !entry.filter.accepts(event) {
                continue;
            }

            let listener = &mut entry.listener;
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                log::error!("listener {id} panicked while handling {} event", event.kind());
            }
        }
    }

    /// Emits a batch of events to matching listeners.
    pub fn emit_all(&mut self, events: &[HeadsetEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<HeadsetEvent>>>, impl EventListener + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: &HeadsetEvent| sink.lock().unwrap().push(e.clone()))
    }

    #[test]
    fn only_filter_routes_by_kind() {
        let mut bus = EventBus::new();
        let (seen, listener) = recorder();
        bus.add_listener(listener, EventFilter::Only(EventKind::Muted));

        bus.emit_all(&[
            HeadsetEvent::Battery(80),
            HeadsetEvent::Muted(true),
            HeadsetEvent::Connected,
        ]);

        assert_eq!(*seen.lock().unwrap(), vec![HeadsetEvent::Muted(true)]);
    }

    #[test]
    fn disabled_and_removed_listeners_are_skipped() {
        let mut bus = EventBus::new();
        let (seen, listener) = recorder();
        let id = bus.add_listener(listener, EventFilter::All);

        bus.disable(id);
        bus.emit(&HeadsetEvent::Connected);
        bus.enable(id);
        bus.emit(&HeadsetEvent::Charging(true));
        assert!(bus.remove_listener(id));
        assert!(!bus.remove_listener(id));
        bus.emit(&HeadsetEvent::Charging(false));

        assert_eq!(*seen.lock().unwrap(), vec![HeadsetEvent::Charging(true)]);
    }

    #[test]
    fn clear_keeps_internal_listeners() {
        let mut bus = EventBus::new();
        let (user_seen, user) = recorder();
        let (internal_seen, internal) = recorder();
        bus.add_listener(user, EventFilter::All);
        bus.add_internal_listener(internal, EventFilter::Only(EventKind::Close));

        bus.clear_listeners();
        assert_eq!(bus.listener_count(), 0);
        bus.emit(&HeadsetEvent::Close);

        assert!(user_seen.lock().unwrap().is_empty());
        assert_eq!(*internal_seen.lock().unwrap(), vec![HeadsetEvent::Close]);

        bus.clear_all();
        bus.emit(&HeadsetEvent::Close);
        assert_eq!(internal_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_fan_out() {
        let mut bus = EventBus::new();
        bus.add_listener(|_: &HeadsetEvent| panic!("boom"), EventFilter::All);
        let (seen, listener) = recorder();
        bus.add_listener(listener, EventFilter::All);

        bus.emit(&HeadsetEvent::Battery(40));

        assert_eq!(*seen.lock().unwrap(), vec![HeadsetEvent::Battery(40)]);
    }

    #[test]
    fn custom_filter() {
        fn low_battery(e: &HeadsetEvent) -> bool {
            matches!(e, HeadsetEvent::Battery(p) if *p <= 20)
        }
        let mut bus = EventBus::new();
        let (seen, listener) = recorder();
        bus.add_listener(listener, EventFilter::Custom(low_battery));

        bus.emit_all(&[HeadsetEvent::Battery(90), HeadsetEvent::Battery(15)]);

        assert_eq!(*seen.lock().unwrap(), vec![HeadsetEvent::Battery(15)]);
    }
}
