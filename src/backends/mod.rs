//! Transport backends for `cloudflight`.
//!
//! Implementations of [`Transport`](crate::device::Transport):
//! - **`hid`** (default feature): real receivers through `hidapi`.
//! - **`virtual_input`**: an in-memory receiver that tests and demos drive by hand.

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

pub mod virtual_input;
