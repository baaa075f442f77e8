//! Command envelope: one outgoing message and its eventual outcome.
//!
//! The issuing thread creates the envelope, hands an `Arc` clone to the
//! dispatch queue, then parks in [`CommandEnvelope::wait`] or
//! [`CommandEnvelope::wait_timeout`].  The transport thread resolves it
//! exactly once through the queue.
//!
//! ```text
//!  created ──▶ pending ──▶ active ──▶ completed
//!                 │
//!                 └──────▶ aborted
//! ```

use core::cmp::Ordering;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::error;

use crate::error::{CommandError, ProtocolMisuse};

type Outcome<M> = Result<M, CommandError>;

/// An outgoing command plus a one-shot completion slot.
pub struct CommandEnvelope<M> {
    request: M,
    slot: Mutex<Option<Outcome<M>>>,
    done: Condvar,
    created_at: Instant,
}

impl<M> CommandEnvelope<M> {
    pub fn new(request: M) -> Self {
        Self {
            request,
            slot: Mutex::new(None),
            done: Condvar::new(),
            created_at: Instant::now(),
        }
    }

    /// The message this envelope carries to the device.
    pub fn request(&self) -> &M {
        &self.request
    }

    /// Time since the envelope was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn is_completed(&self) -> bool {
        self.lock().is_some()
    }

    /// Resolve with the device's response and wake every waiter.
    pub fn complete_with_result(&self, response: M) -> Result<(), ProtocolMisuse> {
        self.complete(Ok(response))
    }

    /// Resolve with a failure and wake every waiter.
    pub fn complete_with_failure(&self, cause: CommandError) -> Result<(), ProtocolMisuse> {
        self.complete(Err(cause))
    }

    /// Store `outcome` unless one is already present.  The first writer
    /// wins; a second write is reported, the stored outcome is kept.
    pub(crate) fn complete(&self, outcome: Outcome<M>) -> Result<(), ProtocolMisuse> {
        let mut slot = self.lock();
        if slot.is_some() {
            error!(
                "envelope completed twice (age {:?}), keeping first outcome",
                self.age()
            );
            return Err(ProtocolMisuse::AlreadyCompleted);
        }
        *slot = Some(outcome);
        drop(slot);
        self.done.notify_all();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Outcome<M>>> {
        // The slot is written in a single assignment, so a poisoned guard
        // still holds a consistent value.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: Clone> CommandEnvelope<M> {
    /// Block until the envelope is resolved.
    pub fn wait(&self) -> Result<M, CommandError> {
        let mut slot = self.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self.done.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the envelope is resolved or `timeout` elapses.
    ///
    /// Expiry yields [`CommandError::Timeout`] and leaves the envelope
    /// untouched: it stays queued or in flight and a later completion is
    /// still delivered normally.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<M, CommandError> {
        let (slot, _) = self
            .done
            .wait_timeout_while(self.lock(), timeout, |s| s.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map_or(Err(CommandError::Timeout), Clone::clone)
    }

    /// Non-blocking peek at the outcome.
    pub fn outcome(&self) -> Option<Result<M, CommandError>> {
        self.lock().as_ref().cloned()
    }
}

impl<M: core::fmt::Debug> core::fmt::Debug for CommandEnvelope<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandEnvelope")
            .field("request", &self.request)
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

// Envelopes order exactly as the messages they carry.

impl<M: Ord> PartialEq for CommandEnvelope<M> {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request
    }
}

impl<M: Ord> Eq for CommandEnvelope<M> {}

impl<M: Ord> PartialOrd for CommandEnvelope<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Ord> Ord for CommandEnvelope<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.request.cmp(&other.request)
    }
}
