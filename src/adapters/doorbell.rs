//! Transport doorbell — wakes a parked transport thread.
//!
//! Implements [`DispatchNotifier`] on top of an `embassy-sync` [`Signal`].
//! Issuers ring it after every enqueue; the transport thread parks on it
//! with `futures_lite::future::block_on` once the queue is drained.  The
//! signal latches, so a ring that lands between "queue empty" and "park"
//! is not lost.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::link::ports::DispatchNotifier;

/// Latching wake-up for the transport thread.
pub struct SignalNotifier {
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl SignalNotifier {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Wake the transport without enqueuing anything (e.g. for shutdown).
    pub fn ring(&self) {
        self.signal.signal(());
    }

    /// Park the calling thread until rung.  Consumes the ring.
    pub fn wait(&self) {
        futures_lite::future::block_on(self.signal.wait());
    }

    /// Consume a pending ring without blocking.
    pub fn try_take(&self) -> bool {
        self.signal.try_take().is_some()
    }
}

impl Default for SignalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchNotifier for SignalNotifier {
    fn command_enqueued(&self) {
        self.ring();
    }
}
