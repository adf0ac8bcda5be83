//! Lock-free outcome counters for the relay tasks.
//!
//! Failures are otherwise only visible in log output; these counters make dropped
//! and failed work observable without changing task behaviour.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Shared counters updated by the producer, consumer and persister.
#[derive(Debug, Default)]
pub struct RelayStats {
    sent: AtomicU64,
    send_failures: AtomicU64,
    received: AtomicU64,
    empty_receives: AtomicU64,
    receive_failures: AtomicU64,
    handed_off: AtomicU64,
    saved: AtomicU64,
    save_failures: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Successful sends.
    pub sent: u64,
    /// Failed sends.
    pub send_failures: u64,
    /// Receives that delivered a message.
    pub received: u64,
    /// Receives that found nothing deliverable.
    pub empty_receives: u64,
    /// Failed receives.
    pub receive_failures: u64,
    /// Messages accepted by the hand-off.
    pub handed_off: u64,
    /// Successful store writes.
    pub saved: u64,
    /// Failed store writes; each one is a dropped message.
    pub save_failures: u64,
}

impl RelayStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_empty_receive(&self) {
        self.empty_receives.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_receive_failure(&self) {
        self.receive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handed_off(&self) {
        self.handed_off.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_saved(&self) {
        self.saved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_save_failure(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            empty_receives: self.empty_receives.load(Ordering::Relaxed),
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
            handed_off: self.handed_off.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
        }
    }
}
