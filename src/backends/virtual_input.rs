//! In-memory receiver.
//!
//! [`VirtualReceiver`] stands in for the USB dongle: it can be plugged and unplugged, fed
//! reports on any of its interfaces, and told to fail opens or writes. The session talks to
//! it through [`VirtualTransport`], which shares the same state, so a test can keep the
//! receiver while the session owns the transport.

use crate::catalog::{BOOTSTRAP_USAGE, BOOTSTRAP_USAGE_PAGE, PRODUCT_ID, VENDOR_ID};
use crate::device::{DeviceHandle, ReportSink, Transport};
use crate::error::{TransportError, TransportErrorKind};
use crate::metadata::DeviceEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Consumer-control interface (volume keys).
pub const CONSUMER_PATH: &str = "virtual://receiver/0";
/// Vendor interface that takes the bootstrap command.
pub const BOOTSTRAP_PATH: &str = "virtual://receiver/1";
/// Vendor interface that streams status reports.
pub const STATUS_PATH: &str = "virtual://receiver/2";

/// A device that is always plugged in and never matches the receiver filter.
const FOREIGN_PATH: &str = "virtual://keyboard/0";

struct OpenSlot {
    id: u64,
    path: String,
    sink: ReportSink,
}

#[derive(Default)]
struct VirtualState {
    plugged: bool,
    endpoints: Vec<DeviceEntry>,
    open: Vec<OpenSlot>,
    writes: Vec<(String, Vec<u8>)>,
    opened_total: usize,
    closed_total: usize,
    next_id: u64,
    fail_open: HashMap<String, TransportError>,
    fail_writes: Option<TransportError>,
}

/// Test double for a Cloud Flight receiver.
#[derive(Clone)]
pub struct VirtualReceiver {
    state: Arc<Mutex<VirtualState>>,
}

impl Default for VirtualReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualReceiver {
    /// A plugged-in receiver with consumer, bootstrap and status interfaces.
    pub fn new() -> Self {
        Self::with_endpoints(&[
            (CONSUMER_PATH, 0x000C, 0x0001),
            (BOOTSTRAP_PATH, BOOTSTRAP_USAGE_PAGE, BOOTSTRAP_USAGE),
            (STATUS_PATH, 0xFF73, 0x0001),
        ])
    }

    /// A plugged-in receiver exposing exactly `(path, usage_page, usage)` interfaces.
    pub fn with_endpoints(endpoints: &[(&str, u16, u16)]) -> Self {
        let endpoints = endpoints
            .iter()
            .map(|&(path, usage_page, usage)| DeviceEntry {
                path: path.to_owned(),
                vendor_id: VENDOR_ID,
                product_id: PRODUCT_ID,
                usage_page,
                usage,
                product_string: Some("HyperX Cloud Flight Wireless".into()),
            })
            .collect();
        let state = VirtualState {
            plugged: true,
            endpoints,
            ..VirtualState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn transport(&self) -> VirtualTransport {
        VirtualTransport {
            state: Arc::clone(&self.state),
        }
    }

    pub fn plug_in(&self) {
        self.state().plugged = true;
    }

    /// Remove the receiver; every open handle reports a disconnect.
    pub fn unplug(&self) {
        let sinks: Vec<ReportSink> = {
            let mut state = self.state();
            state.plugged = false;
            state.open.iter().map(|slot| slot.sink.clone()).collect()
        };
        for sink in sinks {
            sink.fail(TransportError::new(
                TransportErrorKind::Disconnected,
                "device disconnected",
            ));
        }
    }

    /// Drop out of enumeration without telling open handles.
    pub fn unplug_silently(&self) {
        self.state().plugged = false;
    }

    /// Deliver a report on the open handle for `path`. `false` if nothing has it open.
    pub fn feed(&self, path: &str, data: &[u8]) -> bool {
        match self.sink(path) {
            Some(sink) => sink.deliver(data.to_vec()),
            None => false,
        }
    }

    /// Push a transport error into the open handle for `path`.
    pub fn fail_handle(&self, path: &str, error: TransportError) -> bool {
        match self.sink(path) {
            Some(sink) => sink.fail(error),
            None => false,
        }
    }

    fn sink(&self, path: &str) -> Option<ReportSink> {
        self.state()
            .open
            .iter()
            .rev()
            .find(|slot| slot.path == path)
            .map(|slot| slot.sink.clone())
    }

    /// Make the next open of `path` fail with `error`.
    pub fn fail_next_open(&self, path: &str, error: TransportError) {
        self.state().fail_open.insert(path.to_owned(), error);
    }

    /// Make every write fail with `error` (or succeed again with `None`).
    pub fn fail_writes(&self, error: Option<TransportError>) {
        self.state().fail_writes = error;
    }

    /// Every successful write so far, as `(path, bytes)`.
    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.state().writes.clone()
    }

    pub fn writes_to(&self, path: &str) -> usize {
        self.state().writes.iter().filter(|(p, _)| p == path).count()
    }

    /// Paths with an open handle right now, in open order.
    pub fn open_paths(&self) -> Vec<String> {
        self.state().open.iter().map(|slot| slot.path.clone()).collect()
    }

    pub fn opened_total(&self) -> usize {
        self.state().opened_total
    }

    pub fn closed_total(&self) -> usize {
        self.state().closed_total
    }
}

/// The [`Transport`] side of a [`VirtualReceiver`].
pub struct VirtualTransport {
    state: Arc<Mutex<VirtualState>>,
}

impl Transport for VirtualTransport {
    fn list_devices(&mut self) -> Result<Vec<DeviceEntry>, TransportError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = vec![DeviceEntry {
            path: FOREIGN_PATH.into(),
            vendor_id: 0x046d,
            product_id: 0xc31c,
            usage_page: 0x01,
            usage: 0x06,
            product_string: Some("USB Keyboard".into()),
        }];
        if state.plugged {
            out.extend(state.endpoints.iter().cloned());
        }
        Ok(out)
    }

    fn open(
        &mut self,
        path: &str,
        sink: ReportSink,
    ) -> Result<Box<dyn DeviceHandle>, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(error) = state.fail_open.remove(path) {
            return Err(error);
        }
        if !state.plugged || !state.endpoints.iter().any(|e| e.path == path) {
            return Err(TransportError::new(
                TransportErrorKind::DeviceNotFound,
                format!("device not found: {path}"),
            ));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.opened_total += 1;
        state.open.push(OpenSlot {
            id,
            path: path.to_owned(),
            sink,
        });
        Ok(Box::new(VirtualHandle {
            id,
            path: path.to_owned(),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct VirtualHandle {
    id: u64,
    path: String,
    state: Arc<Mutex<VirtualState>>,
    closed: bool,
}

impl DeviceHandle for VirtualHandle {
    fn path(&self) -> &str {
        &self.path
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if self.closed || !state.plugged {
            return Err(TransportError::new(
                TransportErrorKind::Disconnected,
                format!("{} disconnected", self.path),
            ));
        }
        if let Some(error) = state.fail_writes.clone() {
            return Err(error);
        }
        state.writes.push((self.path.clone(), data.to_vec()));
        Ok(data.len())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.open.retain(|slot| slot.id != self.id);
        state.closed_total += 1;
        Ok(())
    }
}
