//! Endpoint discovery.
//!
//! The Cloud Flight receiver enumerates as several HID interfaces under one VID/PID.
//! [`discover`] keeps exactly those; [`find_bootstrap`] picks out the vendor interface
//! that has to receive the keepalive command.

use crate::device::Transport;
use crate::metadata::{DeviceEntry, EndpointDescriptor};

/// Kingston / HyperX.
pub const VENDOR_ID: u16 = 2385;
/// Cloud Flight wireless receiver.
pub const PRODUCT_ID: u16 = 5828;

/// Usage page of the bootstrap interface (vendor-defined `0xFF53`).
pub const BOOTSTRAP_USAGE_PAGE: u16 = 65363;
/// Usage of the bootstrap interface (`0x0303`).
pub const BOOTSTRAP_USAGE: u16 = 771;

fn accept_device(entry: &DeviceEntry) -> bool {
    entry.vendor_id == VENDOR_ID && entry.product_id == PRODUCT_ID
}

/// List the receiver's endpoints.
///
/// An absent receiver is an empty list, not an error. Enumeration failures are logged
/// and treated the same way.
pub fn discover<T: Transport + ?Sized>(transport: &mut T) -> Vec<EndpointDescriptor> {
    match transport.list_devices() {
        Ok(entries) => filter_endpoints(&entries),
        Err(e) => {
            log::warn!("device enumeration failed: {e}");
            Vec::new()
        }
    }
}

/// Reduce a raw device list to receiver endpoints, preserving order.
pub fn filter_endpoints(entries: &[DeviceEntry]) -> Vec<EndpointDescriptor> {
    entries
        .iter()
        .filter(|e| accept_device(e))
        .map(EndpointDescriptor::from)
        .collect()
}

pub fn is_bootstrap(endpoint: &EndpointDescriptor) -> bool {
    endpoint.matches_usage(BOOTSTRAP_USAGE_PAGE, BOOTSTRAP_USAGE)
}

pub fn find_bootstrap(endpoints: &[EndpointDescriptor]) -> Option<&EndpointDescriptor> {
    endpoints.iter().find(|e| is_bootstrap(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, vid: u16, pid: u16, usage_page: u16, usage: u16) -> DeviceEntry {
        DeviceEntry {
            path: path.into(),
            vendor_id: vid,
            product_id: pid,
            usage_page,
            usage,
            product_string: None,
        }
    }

    #[test]
    fn keeps_only_receiver_interfaces() {
        let entries = vec![
            entry("kbd", 0x046d, 0xc31c, 0x01, 0x06),
            entry("rx-0", VENDOR_ID, PRODUCT_ID, 0x0C, 0x01),
            entry("other-hyperx", VENDOR_ID, 0x1723, 0xFF53, 0x0303),
            entry("rx-1", VENDOR_ID, PRODUCT_ID, 0xFF53, 0x0303),
        ];

        let endpoints = filter_endpoints(&entries);
        let paths: Vec<_> = endpoints.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["rx-0", "rx-1"]);

        let bootstrap = find_bootstrap(&endpoints).unwrap();
        assert_eq!(bootstrap.path, "rx-1");
        assert_eq!(bootstrap.usage_page, 0xFF53);
        assert_eq!(bootstrap.usage, 0x0303);
    }

    #[test]
    fn no_bootstrap_without_vendor_interface() {
        let endpoints = filter_endpoints(&[entry("rx-0", VENDOR_ID, PRODUCT_ID, 0x0C, 0x01)]);
        assert_eq!(endpoints.len(), 1);
        assert!(find_bootstrap(&endpoints).is_none());
    }
}
