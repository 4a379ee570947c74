//! Error types.
//!
//! Two layers:
//! - [`TransportError`] is what a transport hands back for a failed list/open/write/close,
//!   or pushes into a [`ReportSink`](crate::device::ReportSink) when a handle dies.
//!   It carries an explicit [`TransportErrorKind`] so the session never has to guess.
//! - [`Error`] is the crate-level error returned from construction and configuration.
//!
//! Only construction can fail hard. Everything that goes wrong after that is reported
//! through the `error` event channel instead.

use thiserror::Error;

/// Coarse classification of a transport failure.
///
/// The first four kinds mean the device is gone (or unreachable) and trigger reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The OS refused to read from the device.
    Unreadable,
    /// The device went away underneath an open handle.
    Disconnected,
    /// The path no longer resolves to a device.
    DeviceNotFound,
    /// The OS denied access to the device node.
    AccessDenied,
    /// Anything else.
    Other,
}

/// A failure reported by a [`Transport`](crate::device::Transport) or an open handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// Message fragments (lower-case) that identify each disconnect class.
///
/// Backends such as `hidapi` only report free text, so this is the fallback vocabulary.
const DISCONNECT_PATTERNS: &[(&str, TransportErrorKind)] = &[
    ("could not read", TransportErrorKind::Unreadable),
    ("cannot read", TransportErrorKind::Unreadable),
    ("unreadable", TransportErrorKind::Unreadable),
    ("disconnected", TransportErrorKind::Disconnected),
    ("device not found", TransportErrorKind::DeviceNotFound),
    ("no such device", TransportErrorKind::DeviceNotFound),
    ("access denied", TransportErrorKind::AccessDenied),
    ("permission denied", TransportErrorKind::AccessDenied),
];

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from free text, inferring the kind from the message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let kind = DISCONNECT_PATTERNS
            .iter()
            .find(|(pattern, _)| lower.contains(pattern))
            .map(|&(_, kind)| kind)
            .unwrap_or(TransportErrorKind::Other);
        Self { kind, message }
    }

    /// `true` when this failure means the receiver is gone and the session should reconnect.
    pub fn is_disconnect(&self) -> bool {
        !matches!(self.kind, TransportErrorKind::Other)
    }
}

#[cfg(feature = "hid")]
impl From<hidapi::HidError> for TransportError {
    fn from(err: hidapi::HidError) -> Self {
        TransportError::classify(err.to_string())
    }
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup discovery found no receiver endpoints.
    #[error("no receiver endpoints found for {vendor_id:04x}:{product_id:04x}")]
    NoEndpoints { vendor_id: u16, product_id: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A headset session must be started from inside a tokio runtime.
    #[error("no tokio runtime available to drive the session")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_disconnect_vocabulary() {
        let cases = [
            ("Could not read from HID device: Input/output error", TransportErrorKind::Unreadable),
            ("device disconnected", TransportErrorKind::Disconnected),
            ("hid_open_path: device not found", TransportErrorKind::DeviceNotFound),
            ("Access denied (insufficient permissions)", TransportErrorKind::AccessDenied),
            ("Permission denied", TransportErrorKind::AccessDenied),
        ];
        for (msg, kind) in cases {
            let err = TransportError::classify(msg);
            assert_eq!(err.kind, kind, "{msg}");
            assert!(err.is_disconnect(), "{msg}");
            assert_eq!(err.message, msg);
        }
    }

    #[test]
    fn unrelated_messages_are_not_disconnects() {
        let err = TransportError::classify("Overlapped I/O operation is in progress");
        assert_eq!(err.kind, TransportErrorKind::Other);
        assert!(!err.is_disconnect());
    }

    #[cfg(feature = "hid")]
    #[test]
    fn hidapi_errors_are_classified_by_message() {
        let err = TransportError::from(hidapi::HidError::HidApiError {
            message: "device disconnected".into(),
        });
        assert_eq!(err.kind, TransportErrorKind::Disconnected);

        let err = TransportError::from(hidapi::HidError::InvalidZeroSizeData);
        assert_eq!(err.kind, TransportErrorKind::Other);
    }

    #[test]
    fn no_endpoints_message_names_identity() {
        let err = Error::NoEndpoints {
            vendor_id: 0x0951,
            product_id: 0x16c4,
        };
        assert_eq!(err.to_string(), "no receiver endpoints found for 0951:16c4");
    }
}
