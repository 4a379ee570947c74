//! Events emitted by a headset session.
//!
//! Every decoded report, connection change and diagnostic is one [`HeadsetEvent`].
//! Listeners subscribe by [`EventKind`], the payload-free discriminant of the event.
//!
//! ## Value conventions
//! - **Battery:** an estimated percentage in `10..=100`. The receiver reports a coarse
//!   charge-state byte plus a secondary "magic" byte; the estimate is a step function of both
//!   (see [`decoder`](crate::decoder)). No event is emitted when the pair does not map to a band.
//! - **Volume:** edge events for the headset's wheel; there is no absolute level.
//! - **Unknown:** the raw bytes of any report shape the decoder does not recognize.

use serde::{Deserialize, Serialize};

/// Physical power state of the headset as last reported by the receiver.
///
/// Survives reinitialization: it reflects the headset, not the USB connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    #[default]
    Unknown,
    On,
    Off,
}

/// Direction of one volume-wheel step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeDirection {
    Up,
    Down,
}

/// A single event delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "lowercase")]
pub enum HeadsetEvent {
    /// The headset was switched on or off.
    ///
    /// `On` is delivered 500 ms after the report, once the session has been rebuilt.
    Power(PowerState),

    /// Microphone mute state.
    Muted(bool),

    /// One volume-wheel step.
    Volume(VolumeDirection),

    /// Estimated battery percentage (`10..=100`).
    Battery(u8),

    /// Whether the headset is on the charger.
    Charging(bool),

    /// A report whose shape the decoder does not recognize.
    Unknown(Vec<u8>),

    /// A recoverable fault: open/write failure, lost handle, missing receiver.
    Error(String),

    /// The receiver's endpoints were (re)opened.
    Connected,

    /// Reconnection has failed long enough to give up on fast retries.
    Disconnected(String),

    /// Shutdown request. Publishing this event closes the session.
    Close,
}

/// Category of a [`HeadsetEvent`], used to subscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Power,
    Muted,
    Volume,
    Battery,
    Charging,
    Unknown,
    Error,
    Connected,
    Disconnected,
    Close,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Power,
        EventKind::Muted,
        EventKind::Volume,
        EventKind::Battery,
        EventKind::Charging,
        EventKind::Unknown,
        EventKind::Error,
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Power => "power",
            EventKind::Muted => "muted",
            EventKind::Volume => "volume",
            EventKind::Battery => "battery",
            EventKind::Charging => "charging",
            EventKind::Unknown => "unknown",
            EventKind::Error => "error",
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Close => "close",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HeadsetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HeadsetEvent::Power(_) => EventKind::Power,
            HeadsetEvent::Muted(_) => EventKind::Muted,
            HeadsetEvent::Volume(_) => EventKind::Volume,
            HeadsetEvent::Battery(_) => EventKind::Battery,
            HeadsetEvent::Charging(_) => EventKind::Charging,
            HeadsetEvent::Unknown(_) => EventKind::Unknown,
            HeadsetEvent::Error(_) => EventKind::Error,
            HeadsetEvent::Connected => EventKind::Connected,
            HeadsetEvent::Disconnected(_) => EventKind::Disconnected,
            HeadsetEvent::Close => EventKind::Close,
        }
    }
}
