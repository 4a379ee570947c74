//! Keeps a session with a HyperX Cloud Flight wireless receiver alive and
//! turns its status reports into typed events.
//!
//! The receiver exposes several HID interfaces. Once opened, it streams short reports for
//! power, mute, volume wheel and battery, as long as it is periodically sent a bootstrap
//! command. [`Headset`] owns all of that: discovery, the keepalive, decoding, and
//! reconnecting with exponential backoff when the dongle is unplugged or the headset is
//! power-cycled.
//!
//! ```no_run
//! use cloudflight::{Config, EventKind, Headset, HeadsetEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cloudflight::Result<()> {
//! let headset = Headset::open(Config::default())?;
//! headset.subscribe(EventKind::Battery, |e: &HeadsetEvent| println!("{e:?}"));
//! tokio::signal::ctrl_c().await?;
//! headset.close().await;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod backoff;
pub mod catalog;
pub mod config;
pub mod decoder;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod keepalive;
pub mod logger;
pub mod manager;
pub mod metadata;
pub mod session;
pub mod snapshot;
mod timer;

pub use config::{Config, ReconnectConfig};
pub use device::{DeviceHandle, ReportSink, Transport};
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use event::*;
pub use eventbus::*;
pub use manager::*;
pub use metadata::*;
pub use snapshot::HeadsetSnapshot;
