//! `hidapi` transport.
//!
//! [`HidTransport`] lists interfaces through a single `HidApi` instance and opens them by
//! path. Each open handle is switched to non-blocking mode and gets a reader thread that
//! polls it and pushes every report into the handle's [`ReportSink`]. The device lock is
//! only held for one non-blocking read at a time, so a write from the session never waits
//! on a pending read. The thread exits when the handle is closed, when the session goes
//! away, or after a disconnect-class read error.
//!
//! This module does **not** interpret reports; that is the decoder's job.

use crate::device::{DeviceHandle, ReportSink, Transport};
use crate::error::{Error, TransportError, TransportErrorKind};
use crate::metadata::DeviceEntry;
use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Input reports from the receiver are at most 20 bytes; leave headroom.
const READ_BUF_LEN: usize = 64;

/// Sleep between polls that found no report. The lock is not held while sleeping.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Pause after a non-fatal read error before trying again.
const ERROR_PAUSE: Duration = Duration::from_millis(250);

pub struct HidTransport {
    api: HidApi,
}

impl HidTransport {
    pub fn new() -> Result<Self, Error> {
        let api = HidApi::new().map_err(TransportError::from)?;
        Ok(Self { api })
    }
}

impl Transport for HidTransport {
    fn list_devices(&mut self) -> Result<Vec<DeviceEntry>, TransportError> {
        self.api.refresh_devices()?;
        Ok(self
            .api
            .device_list()
            .map(|info| DeviceEntry {
                path: info.path().to_string_lossy().into_owned(),
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                usage_page: info.usage_page(),
                usage: info.usage(),
                product_string: info.product_string().map(str::to_owned),
            })
            .collect())
    }

    fn open(
        &mut self,
        path: &str,
        sink: ReportSink,
    ) -> Result<Box<dyn DeviceHandle>, TransportError> {
        let c_path = CString::new(path).map_err(|_| {
            TransportError::new(
                TransportErrorKind::DeviceNotFound,
                format!("invalid device path {path:?}"),
            )
        })?;
        let device = self.api.open_path(&c_path)?;
        device.set_blocking_mode(false)?;
        let device = Arc::new(Mutex::new(device));
        let stop = Arc::new(AtomicBool::new(false));

        {
            let device = Arc::clone(&device);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name(format!("hid-reader {path}"))
                .spawn(move || read_loop(device.as_ref(), &stop, &sink))
                .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
        }

        log::debug!("[HID/OPEN] {path}");
        Ok(Box::new(HidHandle {
            path: path.to_owned(),
            device,
            stop,
        }))
    }
}

/// Non-blocking source of input reports. `Ok(0)` means nothing is pending.
trait PollReport {
    fn poll_report(&self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

impl PollReport for Mutex<HidDevice> {
    fn poll_report(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let device = self.lock().unwrap_or_else(|e| e.into_inner());
        let read = device.read(buf)?;
        Ok(read)
    }
}

fn read_loop<R: PollReport + ?Sized>(device: &R, stop: &AtomicBool, sink: &ReportSink) {
    let mut buf = [0u8; READ_BUF_LEN];
    loop {
        if stop.load(Ordering::Acquire) || sink.is_closed() {
            break;
        }

        match device.poll_report(&mut buf) {
            Ok(0) => std::thread::sleep(POLL_INTERVAL),
            Ok(n) => {
                if !sink.deliver(buf[..n.min(READ_BUF_LEN)].to_vec()) {
                    break;
                }
            }
            Err(err) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let fatal = err.is_disconnect();
                log::debug!("[HID/ERROR] {} read failed: {err}", sink.path());
                if !sink.fail(err) || fatal {
                    break;
                }
                std::thread::sleep(ERROR_PAUSE);
            }
        }
    }
    log::debug!("[HID/CLOSE] reader for {} stopped", sink.path());
}

/// One open interface. The OS handle is released once the reader thread notices `stop`.
struct HidHandle {
    path: String,
    device: Arc<Mutex<HidDevice>>,
    stop: Arc<AtomicBool>,
}

impl DeviceHandle for HidHandle {
    fn path(&self) -> &str {
        &self.path
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if self.stop.load(Ordering::Acquire) {
            return Err(TransportError::new(
                TransportErrorKind::Disconnected,
                format!("{} is closed", self.path),
            ));
        }
        let device = self.device.lock().unwrap_or_else(|e| e.into_inner());
        let written = device.write(data)?;
        Ok(written)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.stop.store(true, Ordering::Release);
        Ok(())
    }
}

impl Drop for HidHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}
