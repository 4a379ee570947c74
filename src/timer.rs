//! Cancellable timers that post into the session actor's mailbox.
//!
//! A timer is a spawned task that sleeps and then sends a [`Message`]. Cancelling aborts
//! the task; a message that was already queued before the abort is recognized as stale by
//! its token and ignored by the session.

use crate::session::Message;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// What a timer fires into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Keepalive,
    Reconnect,
    PowerOn,
}

#[derive(Debug)]
pub(crate) struct Timer {
    token: u64,
    task: JoinHandle<()>,
}

impl Timer {
    /// Fire once after `delay`.
    pub(crate) fn once(
        tx: &UnboundedSender<Message>,
        kind: TimerKind,
        token: u64,
        delay: Duration,
    ) -> Self {
        let tx = tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Message::Timer { kind, token });
        });
        Self { token, task }
    }

    /// Fire every `period`, first after one full period.
    pub(crate) fn every(
        tx: &UnboundedSender<Message>,
        kind: TimerKind,
        token: u64,
        period: Duration,
    ) -> Self {
        let tx = tx.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if tx.send(Message::Timer { kind, token }).is_err() {
                    break;
                }
            }
        });
        Self { token, task }
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    pub(crate) fn cancel(self) {
        self.task.abort();
    }
}
