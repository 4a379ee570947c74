use crate::event::HeadsetEvent;
use crate::eventbus::EventListener;

/// A listener that logs every event as JSON through the `log` facade.
///
/// Registered internally when [`Config::debug`](crate::config::Config::debug) is set.
pub struct EventLogger;

impl EventLogger {
    pub fn new() -> Self {
        EventLogger
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl EventListener for EventLogger {
    fn on_event(&mut self, event: &HeadsetEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::debug!("[event] {json}"),
            Err(_) => log::debug!("[event] {event:?}"),
        }
    }
}
