//! Session actor.
//!
//! One tokio task owns every piece of mutable session state in a [`SessionContext`]:
//! the open handles, the bootstrap reference, the power state, the backoff and the timers.
//! It is driven by a single mailbox carrying three kinds of [`Message`]:
//! - reports and read failures pushed by transports through a [`ReportSink`]
//! - timer fires (keepalive, reconnect retry, power-on delay)
//! - control commands from the [`Headset`](crate::manager::Headset)
//!
//! Each message is handled to completion before the next is taken, so a reinitialization
//! can never interleave with another one. Stale inputs are filtered, never raced:
//! - every close bumps the epoch, and reports tagged with an older epoch are dropped;
//! - every timer carries a token, and a fire whose token is no longer current is ignored.

use crate::backoff::Backoff;
use crate::catalog::{self, PRODUCT_ID, VENDOR_ID};
use crate::config::Config;
use crate::decoder;
use crate::device::{DeviceHandle, ReportSink, Transport};
use crate::error::TransportError;
use crate::event::{HeadsetEvent, PowerState};
use crate::eventbus::EventBus;
use crate::metadata::EndpointDescriptor;
use crate::snapshot::HeadsetSnapshot;
use crate::timer::{Timer, TimerKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

/// Delay between a power-on report and the `power: on` event.
pub const POWER_ON_DELAY: Duration = Duration::from_millis(500);

/// Everything the session actor can be woken up by.
#[derive(Debug)]
pub(crate) enum Message {
    Report {
        epoch: u64,
        path: String,
        data: Vec<u8>,
    },
    HandleError {
        epoch: u64,
        path: String,
        error: TransportError,
    },
    Timer {
        kind: TimerKind,
        token: u64,
    },
    Control(Control),
}

#[derive(Debug)]
pub(crate) enum Control {
    /// Tear everything down; acknowledge once done.
    Close(Option<oneshot::Sender<()>>),
}

/// State shared between the actor and the caller-facing [`Headset`](crate::manager::Headset).
///
/// Locks are held for one emit or one bookkeeping call at a time, never across an await.
pub(crate) struct Shared {
    bus: Mutex<EventBus>,
    snapshot: Mutex<HeadsetSnapshot>,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            bus: Mutex::new(EventBus::new()),
            snapshot: Mutex::new(HeadsetSnapshot::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn bus(&self) -> MutexGuard<'_, EventBus> {
        self.bus.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn snapshot(&self) -> HeadsetSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn emit(&self, event: HeadsetEvent) {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(&event);
        self.bus().emit(&event);
    }

    /// Marks the session closed; returns `true` if it already was.
    pub(crate) fn mark_closed(&self) -> bool {
        self.closed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// All mutable session state. Owned by the actor; nothing else touches it.
pub(crate) struct SessionContext {
    pub(crate) handles: Vec<Box<dyn DeviceHandle>>,
    /// Path of the open handle designated as bootstrap, if any.
    pub(crate) bootstrap: Option<String>,
    /// Result of the most recent discovery pass.
    pub(crate) endpoints: Vec<EndpointDescriptor>,
    pub(crate) epoch: u64,
    pub(crate) power: PowerState,
    pub(crate) backoff: Backoff,
    pub(crate) keepalive: Option<Timer>,
    pub(crate) power_on: Option<Timer>,
    next_token: u64,
    pub(crate) closed: bool,
}

impl SessionContext {
    fn new(backoff: Backoff) -> Self {
        Self {
            handles: Vec::new(),
            bootstrap: None,
            endpoints: Vec::new(),
            epoch: 0,
            power: PowerState::Unknown,
            backoff,
            keepalive: None,
            power_on: None,
            next_token: 0,
            closed: false,
        }
    }

    pub(crate) fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

pub(crate) struct Session<T: Transport> {
    pub(crate) transport: T,
    pub(crate) config: Config,
    pub(crate) shared: Arc<Shared>,
    pub(crate) tx: UnboundedSender<Message>,
    pub(crate) ctx: SessionContext,
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(
        config: Config,
        transport: T,
        shared: Arc<Shared>,
        tx: UnboundedSender<Message>,
    ) -> Self {
        let backoff = Backoff::new(config.reconnect.clone());
        Self {
            transport,
            config,
            shared,
            tx,
            ctx: SessionContext::new(backoff),
        }
    }

    /// Actor loop: initial connect, then one message at a time until closed.
    pub(crate) async fn run(mut self, mut rx: UnboundedReceiver<Message>) {
        self.reinitialize();

        while let Some(message) = rx.recv().await {
            match message {
                Message::Report { epoch, path, data } => self.on_report(epoch, &path, &data),
                Message::HandleError { epoch, path, error } => {
                    self.on_handle_error(epoch, &path, error)
                }
                Message::Timer { kind, token } => self.on_timer(kind, token),
                Message::Control(Control::Close(ack)) => {
                    self.shutdown();
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
            }
            if self.ctx.closed {
                break;
            }
        }
        log::debug!("session actor stopped");
    }

    pub(crate) fn emit(&self, event: HeadsetEvent) {
        self.shared.emit(event);
    }

    pub(crate) fn sink_for(&self, path: &str) -> ReportSink {
        ReportSink::new(self.tx.clone(), self.ctx.epoch, path)
    }

    // ---- session manager -------------------------------------------------------------

    /// Close everything, rediscover, and either reopen or schedule a retry.
    pub(crate) fn reinitialize(&mut self) {
        if self.ctx.closed {
            return;
        }
        self.close_all();

        let endpoints = catalog::discover(&mut self.transport);
        self.ctx.endpoints = endpoints.clone();
        if endpoints.is_empty() {
            self.schedule_reconnect(format!(
                "no receiver endpoints found for {VENDOR_ID:04x}:{PRODUCT_ID:04x}"
            ));
            return;
        }

        log::info!("receiver found with {} endpoint(s)", endpoints.len());
        self.ctx.backoff.reset();
        self.open_all(&endpoints);
        self.restart_keepalive();
        self.emit(HeadsetEvent::Connected);
    }

    /// Open one handle per endpoint; a failure on one does not stop the others.
    pub(crate) fn open_all(&mut self, endpoints: &[EndpointDescriptor]) {
        for endpoint in endpoints {
            let sink = self.sink_for(&endpoint.path);
            match self.transport.open(&endpoint.path, sink) {
                Ok(handle) => {
                    log::debug!("opened {endpoint}");
                    if catalog::is_bootstrap(endpoint) {
                        self.ctx.bootstrap = Some(endpoint.path.clone());
                    }
                    self.ctx.handles.push(handle);
                }
                Err(e) => self.report_failure(&format!("failed to open {endpoint}"), e),
            }
        }
    }

    /// Close every handle, logging (not propagating) individual failures.
    pub(crate) fn close_all(&mut self) {
        for mut handle in self.ctx.handles.drain(..) {
            if let Err(e) = handle.close() {
                log::warn!("failed to close {}: {e}", handle.path());
            }
        }
        self.ctx.bootstrap = None;
        self.ctx.epoch += 1;
    }

    /// Close and forget one handle.
    pub(crate) fn drop_handle(&mut self, path: &str) {
        if self.ctx.bootstrap.as_deref() == Some(path) {
            self.ctx.bootstrap = None;
        }
        if let Some(index) = self.ctx.handles.iter().position(|h| h.path() == path) {
            let mut handle = self.ctx.handles.remove(index);
            if let Err(e) = handle.close() {
                log::warn!("failed to close {path}: {e}");
            }
        }
    }

    pub(crate) fn bootstrap_handle(&mut self) -> Option<&mut Box<dyn DeviceHandle>> {
        let path = self.ctx.bootstrap.as_deref()?;
        self.ctx.handles.iter_mut().find(|h| h.path() == path)
    }

    fn shutdown(&mut self) {
        if self.ctx.closed {
            return;
        }
        self.ctx.closed = true;
        self.shared.mark_closed();

        self.stop_keepalive();
        if let Some(timer) = self.ctx.power_on.take() {
            timer.cancel();
        }
        self.ctx.backoff.cancel();
        self.close_all();
        self.shared.bus().clear_all();
        log::info!("session closed");
    }

    // ---- reconnection ----------------------------------------------------------------

    /// Emit an error for a transport failure; reconnect if it means the device is gone.
    pub(crate) fn report_failure(&mut self, context: &str, error: TransportError) {
        log::warn!("{context}: {error}");
        self.emit(HeadsetEvent::Error(format!("{context}: {error}")));
        if error.is_disconnect() && !self.ctx.backoff.is_pending() {
            self.schedule_reconnect(format!("{context}: {error}"));
        }
    }

    /// Count a failure and arm the (single) retry timer.
    pub(crate) fn schedule_reconnect(&mut self, reason: String) {
        let plan = self.ctx.backoff.record_failure();
        log::warn!(
            "{reason}; retry #{} in {:.1}s",
            plan.attempt,
            plan.delay.as_secs_f64()
        );
        self.emit(HeadsetEvent::Error(format!(
            "{reason}; reconnecting in {:.1}s (attempt {})",
            plan.delay.as_secs_f64(),
            plan.attempt
        )));
        if plan.announce_disconnected {
            self.emit(HeadsetEvent::Disconnected(reason));
        }

        let token = self.ctx.next_token();
        let timer = Timer::once(&self.tx, TimerKind::Reconnect, token, plan.delay);
        self.ctx.backoff.arm(timer);
    }

    // ---- inputs ----------------------------------------------------------------------

    fn on_report(&mut self, epoch: u64, path: &str, data: &[u8]) {
        if self.ctx.closed || epoch != self.ctx.epoch {
            return;
        }
        if self.config.debug {
            log::debug!("[report] {path} len={} {:02x?}", data.len(), data);
        }

        for event in decoder::decode(data) {
            match event {
                HeadsetEvent::Power(PowerState::Off) => self.on_power_off(),
                HeadsetEvent::Power(PowerState::On) => self.on_power_on(),
                other => self.emit(other),
            }
        }
    }

    fn on_power_off(&mut self) {
        log::info!("headset powered off");
        self.ctx.power = PowerState::Off;
        self.stop_keepalive();
        self.emit(HeadsetEvent::Power(PowerState::Off));
    }

    fn on_power_on(&mut self) {
        log::info!("headset powered on");
        self.ctx.power = PowerState::On;
        if let Some(timer) = self.ctx.power_on.take() {
            timer.cancel();
        }
        let token = self.ctx.next_token();
        self.ctx.power_on = Some(Timer::once(
            &self.tx,
            TimerKind::PowerOn,
            token,
            POWER_ON_DELAY,
        ));
    }

    fn on_handle_error(&mut self, epoch: u64, path: &str, error: TransportError) {
        if self.ctx.closed || epoch != self.ctx.epoch {
            return;
        }
        if error.is_disconnect() {
            self.drop_handle(path);
        }
        self.report_failure(&format!("device error on {path}"), error);
    }

    fn on_timer(&mut self, kind: TimerKind, token: u64) {
        if self.ctx.closed {
            return;
        }
        match kind {
            TimerKind::Keepalive => self.on_keepalive_timer(token),
            TimerKind::Reconnect => {
                if self.ctx.backoff.take_fired(token) {
                    log::info!("reconnect attempt {}", self.ctx.backoff.attempts());
                    self.reinitialize();
                }
            }
            TimerKind::PowerOn => {
                if self.ctx.power_on.as_ref().map(Timer::token) == Some(token) {
                    self.ctx.power_on = None;
                    self.reinitialize();
                    self.emit(HeadsetEvent::Power(PowerState::On));
                }
            }
        }
    }
}
