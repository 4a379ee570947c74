//! Enumeration records.
//!
//! [`DeviceEntry`] is one row of a transport's device list, the raw material discovery
//! filters. [`EndpointDescriptor`] is what survives the filter: one logical interface
//! of the receiver, identified by its path and HID usage.
//!
//! # Conventions
//! - `path` is an OS/topology path (opaque string). It is only meaningful to the transport
//!   that produced it and may change across replugs; treat it as a handle key, not identity.
//! - `usage_page` / `usage` are the top-level collection usage reported by the platform.
//!
//! Both types are plain data. A fresh set is produced on every discovery pass.

use serde::{Deserialize, Serialize};

/// One entry from [`Transport::list_devices`](crate::device::Transport::list_devices).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// OS path used to open the interface.
    pub path: String,

    /// USB Vendor ID (VID).
    pub vendor_id: u16,

    /// USB Product ID (PID).
    pub product_id: u16,

    /// HID Usage Page of the interface's top-level collection.
    pub usage_page: u16,

    /// HID Usage within the page.
    pub usage: u16,

    /// Human-readable product name from the driver/firmware, if reported.
    pub product_string: Option<String>,
}

/// One logical interface of the receiver, as kept by the session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub path: String,
    pub usage_page: u16,
    pub usage: u16,
}

impl EndpointDescriptor {
    pub fn matches_usage(&self, usage_page: u16, usage: u16) -> bool {
        self.usage_page == usage_page && self.usage == usage
    }
}

impl From<&DeviceEntry> for EndpointDescriptor {
    fn from(entry: &DeviceEntry) -> Self {
        Self {
            path: entry.path.clone(),
            usage_page: entry.usage_page,
            usage: entry.usage,
        }
    }
}

impl std::fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (usage_page=0x{:04x} usage=0x{:04x})",
            self.path, self.usage_page, self.usage
        )
    }
}
