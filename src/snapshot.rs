//! Last-known headset state.
//!
//! [`HeadsetSnapshot`] is an **owned**, read-only copy of the most recent value seen for
//! each event category. It is updated by the session on every emitted event and handed out
//! by [`Headset::snapshot`](crate::manager::Headset::snapshot); it is cheap to clone.
//!
//! # Semantics
//! - Fields are `None` until the receiver has reported them at least once.
//! - `connected` flips on `connected` and off on `disconnected`; a short outage that
//!   recovers before the retry ceiling never clears it.
//! - Nothing here is persisted across process restarts.

use crate::event::{HeadsetEvent, PowerState};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadsetSnapshot {
    pub power: PowerState,
    pub muted: Option<bool>,
    pub battery: Option<u8>,
    pub charging: Option<bool>,
    pub connected: bool,
}

impl HeadsetSnapshot {
    /// Fold one event into the snapshot.
    pub fn apply(&mut self, event: &HeadsetEvent) {
        match event {
            HeadsetEvent::Power(state) => self.power = *state,
            HeadsetEvent::Muted(muted) => self.muted = Some(*muted),
            HeadsetEvent::Battery(percent) => self.battery = Some(*percent),
            HeadsetEvent::Charging(charging) => self.charging = Some(*charging),
            HeadsetEvent::Connected => self.connected = true,
            HeadsetEvent::Disconnected(_) => self.connected = false,
            HeadsetEvent::Volume(_)
            | HeadsetEvent::Unknown(_)
            | HeadsetEvent::Error(_)
            | HeadsetEvent::Close => {}
        }
    }
}
