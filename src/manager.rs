#[cfg(feature = "hid")]
use crate::backends::hid::HidTransport;
use crate::catalog::{self, PRODUCT_ID, VENDOR_ID};
use crate::config::Config;
use crate::device::Transport;
use crate::error::{Error, Result};
use crate::event::{EventKind, HeadsetEvent};
use crate::eventbus::{EventFilter, EventListener, ListenerId};
use crate::logger::EventLogger;
use crate::session::{Control, Message, Session, Shared};
use crate::snapshot::HeadsetSnapshot;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A live session with a Cloud Flight receiver.
///
/// Construction checks that the receiver is present, then hands the session to a
/// background task on the current tokio runtime. From then on the session reconnects by
/// itself; callers only subscribe to events and eventually [`close`](Headset::close) it.
///
/// Listeners run on the session task. They must not call back into this `Headset`.
pub struct Headset {
    tx: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
}

impl Headset {
    /// Open the receiver through `hidapi`.
    #[cfg(feature = "hid")]
    pub fn open(config: Config) -> Result<Self> {
        let transport = HidTransport::new()?;
        Self::with_transport(config, transport)
    }

    /// Open the receiver through any [`Transport`].
    ///
    /// Fails with [`Error::NoEndpoints`] if the receiver is not plugged in right now, and
    /// with [`Error::NoRuntime`] outside a tokio runtime.
    pub fn with_transport<T: Transport>(config: Config, mut transport: T) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let endpoints = catalog::discover(&mut transport);
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints {
                vendor_id: VENDOR_ID,
                product_id: PRODUCT_ID,
            });
        }
        log::info!(
            "opening receiver {VENDOR_ID:04x}:{PRODUCT_ID:04x} ({} endpoint(s))",
            endpoints.len()
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());
        {
            let mut bus = shared.bus();
            let close_tx = tx.clone();
            bus.add_internal_listener(
                move |_: &HeadsetEvent| {
                    let _ = close_tx.send(Message::Control(Control::Close(None)));
                },
                EventFilter::Only(EventKind::Close),
            );
            if config.debug {
                bus.add_internal_listener(EventLogger::new(), EventFilter::All);
            }
        }

        let session = Session::new(config, transport, Arc::clone(&shared), tx.clone());
        runtime.spawn(session.run(rx));

        Ok(Self { tx, shared })
    }

    /// Subscribe to one category of events.
    pub fn subscribe(
        &self,
        kind: EventKind,
        listener: impl EventListener + 'static,
    ) -> ListenerId {
        self.subscribe_filtered(EventFilter::Only(kind), listener)
    }

    /// Subscribe to every event.
    pub fn subscribe_all(&self, listener: impl EventListener + 'static) -> ListenerId {
        self.subscribe_filtered(EventFilter::All, listener)
    }

    pub fn subscribe_filtered(
        &self,
        filter: EventFilter,
        listener: impl EventListener + 'static,
    ) -> ListenerId {
        self.shared.bus().add_listener(listener, filter)
    }

    /// Remove one subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.bus().remove_listener(id)
    }

    /// Remove every subscription made through this handle.
    pub fn clear_listeners(&self) {
        self.shared.bus().clear_listeners();
    }

    /// Last-known state of the headset.
    pub fn snapshot(&self) -> HeadsetSnapshot {
        self.shared.snapshot()
    }

    /// Deliver an event to subscribers as if the session had emitted it.
    ///
    /// Publishing [`HeadsetEvent::Close`] shuts the session down.
    pub fn publish(&self, event: HeadsetEvent) {
        if self.shared.is_closed() {
            return;
        }
        self.shared.emit(event);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop all timers, close every handle and drop all listeners.
    ///
    /// Idempotent; later calls return immediately.
    pub async fn close(&self) {
        if self.shared.mark_closed() {
            return;
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .tx
            .send(Message::Control(Control::Close(Some(ack_tx))))
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }
}

impl Drop for Headset {
    fn drop(&mut self) {
        if !self.shared.mark_closed() {
            let _ = self.tx.send(Message::Control(Control::Close(None)));
        }
    }
}
