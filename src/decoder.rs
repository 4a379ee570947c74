//! Status report decoder for Cloud Flight receivers.
//!
//! [`decode`] is pure: the same bytes always produce the same events, and it never
//! touches session state. Dispatch is on report length first, then content:
//!
//! | Length | Meaning |
//! |---|---|
//! | 2 | power on/off (`64 01` / `64 03`), otherwise mute state (`65 04` = muted) |
//! | 5 | volume wheel step (byte 1: `01` up, `02` down) |
//! | 15, 20 | battery status (byte 3 charge state, byte 4 magic value) |
//! | other | passed through as [`HeadsetEvent::Unknown`] |
//!
//! The session gives `Power` events extra handling (keepalive stop, delayed power-on);
//! the decoder only reports what the receiver said.

use crate::event::{HeadsetEvent, PowerState, VolumeDirection};

/// Charge-state byte while docked and (nearly) full.
pub const CHARGE_STATE_FULL: u8 = 0x10;
/// Charge-state byte for the upper half of the discharge curve.
pub const CHARGE_STATE_MID: u8 = 0x0F;
/// Charge-state byte for the lower half of the discharge curve.
pub const CHARGE_STATE_LOW: u8 = 0x0E;

/// Magic values at or above this mean "on the charger" when the state byte is `0x10`.
const CHARGING_THRESHOLD: u8 = 20;

/// One band of the battery curve: `min..max` (half-open) maps to `percent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Band {
    pub min: u8,
    /// Exclusive upper bound; `None` means "through 255".
    pub max: Option<u8>,
    pub percent: u8,
}

impl Band {
    const fn new(min: u8, max: Option<u8>, percent: u8) -> Self {
        Self { min, max, percent }
    }

    fn contains(&self, value: u8) -> bool {
        value >= self.min && self.max.map_or(true, |max| value < max)
    }
}

const FULL_BANDS: &[Band] = &[Band::new(0, Some(12), 100)];

const MID_BANDS: &[Band] = &[
    Band::new(130, None, 100),
    Band::new(120, Some(130), 95),
    Band::new(100, Some(120), 90),
    Band::new(70, Some(100), 85),
    Band::new(50, Some(70), 80),
    Band::new(20, Some(50), 75),
    Band::new(1, Some(20), 70),
];

// 240, 179 and >= 250 intentionally fall between bands.
const LOW_BANDS: &[Band] = &[
    Band::new(241, Some(250), 65),
    Band::new(220, Some(240), 60),
    Band::new(208, Some(220), 55),
    Band::new(200, Some(208), 50),
    Band::new(190, Some(200), 45),
    Band::new(180, Some(190), 40),
    Band::new(169, Some(179), 35),
    Band::new(159, Some(169), 30),
    Band::new(148, Some(159), 25),
    Band::new(119, Some(148), 20),
    Band::new(90, Some(119), 15),
    Band::new(0, Some(90), 10),
];

/// The curve for one charge-state byte, if it has one.
pub fn battery_curve(charge_state: u8) -> Option<&'static [Band]> {
    match charge_state {
        CHARGE_STATE_FULL => Some(FULL_BANDS),
        CHARGE_STATE_MID => Some(MID_BANDS),
        CHARGE_STATE_LOW => Some(LOW_BANDS),
        _ => None,
    }
}

/// Estimate the battery percentage from the charge-state and magic bytes.
///
/// `None` when no band matches. A zero estimate is also reported as `None`.
pub fn battery_percentage(charge_state: u8, magic: u8) -> Option<u8> {
    battery_curve(charge_state)?
        .iter()
        .find(|band| band.contains(magic))
        .map(|band| band.percent)
        .filter(|&percent| percent != 0)
}

/// Decode one raw report into zero or more events.
pub fn decode(report: &[u8]) -> Vec<HeadsetEvent> {
    match report.len() {
        2 => decode_short(report[0], report[1]),
        5 => decode_volume(report[1]).into_iter().collect(),
        15 | 20 => decode_battery(report[3], report[4]),
        _ => vec![HeadsetEvent::Unknown(report.to_vec())],
    }
}

fn decode_short(b0: u8, b1: u8) -> Vec<HeadsetEvent> {
    let event = match (b0, b1) {
        (0x64, 0x03) => HeadsetEvent::Power(PowerState::Off),
        (0x64, 0x01) => HeadsetEvent::Power(PowerState::On),
        _ => HeadsetEvent::Muted(b0 == 0x65 && b1 == 0x04),
    };
    vec![event]
}

fn decode_volume(direction: u8) -> Option<HeadsetEvent> {
    match direction {
        0x01 => Some(HeadsetEvent::Volume(VolumeDirection::Up)),
        0x02 => Some(HeadsetEvent::Volume(VolumeDirection::Down)),
        _ => None,
    }
}

fn decode_battery(charge_state: u8, magic: u8) -> Vec<HeadsetEvent> {
    let mut events = Vec::with_capacity(2);
    if charge_state == CHARGE_STATE_FULL {
        events.push(HeadsetEvent::Charging(magic >= CHARGING_THRESHOLD));
    }
    if let Some(percent) = battery_percentage(charge_state, magic) {
        events.push(HeadsetEvent::Battery(percent));
    }
    events
}
