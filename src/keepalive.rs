//! Bootstrap keepalive.
//!
//! The receiver only streams status reports for a while after it has been sent the
//! bootstrap command on its vendor interface. The session re-sends it on a recurring
//! timer for as long as the headset is not known to be off.

use crate::catalog;
use crate::device::Transport;
use crate::event::{HeadsetEvent, PowerState};
use crate::session::Session;
use crate::timer::{Timer, TimerKind};

/// `21 FF 05` followed by 17 zero bytes.
pub const BOOTSTRAP_COMMAND: [u8; 20] = [
    0x21, 0xFF, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

impl<T: Transport> Session<T> {
    /// Cancel the recurring timer and run one tick now.
    ///
    /// The immediate tick never reinitializes; a receiver without a bootstrap interface
    /// would otherwise reinitialize forever.
    pub(crate) fn restart_keepalive(&mut self) {
        self.stop_keepalive();
        self.keepalive_tick(false);
    }

    pub(crate) fn stop_keepalive(&mut self) {
        if let Some(timer) = self.ctx.keepalive.take() {
            timer.cancel();
        }
    }

    pub(crate) fn on_keepalive_timer(&mut self, token: u64) {
        if self.ctx.keepalive.as_ref().map(Timer::token) == Some(token) {
            self.keepalive_tick(true);
        }
    }

    fn keepalive_tick(&mut self, may_reinitialize: bool) {
        if self.ctx.keepalive.is_none() && self.ctx.power != PowerState::Off {
            let token = self.ctx.next_token();
            self.ctx.keepalive = Some(Timer::every(
                &self.tx,
                TimerKind::Keepalive,
                token,
                self.config.update_delay(),
            ));
        }

        if self.ctx.bootstrap.is_none() && !self.open_bootstrap(may_reinitialize) {
            return;
        }

        let result = match self.bootstrap_handle() {
            Some(handle) => handle.write(&BOOTSTRAP_COMMAND),
            None => return,
        };
        match result {
            Ok(_) => log::debug!("bootstrap command sent"),
            Err(e) => {
                if let Some(path) = self.ctx.bootstrap.take() {
                    self.drop_handle(&path);
                }
                self.report_failure("bootstrap write failed", e);
            }
        }
    }

    /// Open the bootstrap interface from the last discovery result. `false` ends the tick.
    fn open_bootstrap(&mut self, may_reinitialize: bool) -> bool {
        // The pending retry rebuilds the session on the backoff schedule.
        if self.ctx.backoff.is_pending() {
            log::debug!("bootstrap handle missing, reconnect already scheduled");
            return false;
        }

        let Some(endpoint) = catalog::find_bootstrap(&self.ctx.endpoints).cloned() else {
            if may_reinitialize {
                log::info!("bootstrap endpoint missing, reinitializing");
                self.reinitialize();
            } else {
                log::warn!("bootstrap endpoint missing");
                self.emit(HeadsetEvent::Error(
                    "bootstrap endpoint not present on receiver".into(),
                ));
            }
            return false;
        };

        let sink = self.sink_for(&endpoint.path);
        match self.transport.open(&endpoint.path, sink) {
            Ok(handle) => {
                self.ctx.handles.push(handle);
                self.ctx.bootstrap = Some(endpoint.path);
                true
            }
            Err(e) => {
                self.report_failure(&format!("failed to open bootstrap endpoint {endpoint}"), e);
                false
            }
        }
    }
}
