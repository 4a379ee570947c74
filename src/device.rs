//! Transport seam.
//!
//! The session talks to hardware only through these two traits:
//! - [`Transport`] lists HID interfaces and opens them.
//! - [`DeviceHandle`] is one open interface: write bytes, close it.
//!
//! Incoming data does not flow through the handle. When the session opens a path it passes
//! a [`ReportSink`]; the transport pushes every report (and any fatal read error) into it,
//! from whatever thread it reads on. The sink is tagged with the session epoch that opened
//! it, so reports from a handle that has since been closed are dropped by the session.

use crate::error::TransportError;
use crate::metadata::DeviceEntry;
use crate::session::Message;
use tokio::sync::mpsc::UnboundedSender;

/// Enumerates and opens HID interfaces.
pub trait Transport: Send + 'static {
    /// List every HID interface currently visible, unfiltered.
    fn list_devices(&mut self) -> Result<Vec<DeviceEntry>, TransportError>;

    /// Open `path` exclusively and start delivering its input reports into `sink`.
    fn open(
        &mut self,
        path: &str,
        sink: ReportSink,
    ) -> Result<Box<dyn DeviceHandle>, TransportError>;
}

/// An open, exclusively owned HID interface.
pub trait DeviceHandle: Send {
    fn path(&self) -> &str;

    /// Write one output report, verbatim (first byte is the report ID).
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Release the interface. Further reports from it are not delivered.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Where a transport delivers input reports and read failures for one open handle.
#[derive(Clone, Debug)]
pub struct ReportSink {
    tx: UnboundedSender<Message>,
    epoch: u64,
    path: String,
}

impl ReportSink {
    pub(crate) fn new(tx: UnboundedSender<Message>, epoch: u64, path: &str) -> Self {
        Self {
            tx,
            epoch,
            path: path.to_owned(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Deliver one input report. Returns `false` once the session is gone; stop reading then.
    pub fn deliver(&self, data: Vec<u8>) -> bool {
        self.tx
            .send(Message::Report {
                epoch: self.epoch,
                path: self.path.clone(),
                data,
            })
            .is_ok()
    }

    /// Report a failure on this handle. Returns `false` once the session is gone.
    pub fn fail(&self, error: TransportError) -> bool {
        self.tx
            .send(Message::HandleError {
                epoch: self.epoch,
                path: self.path.clone(),
                error,
            })
            .is_ok()
    }

    /// `true` once the session has shut down and nothing reads this sink anymore.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
