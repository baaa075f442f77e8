//! Dispatch queue: pending commands plus the single in-flight slot.
//!
//! All queue state sits behind one `embassy-sync` blocking mutex so the
//! "at most one active envelope" invariant holds no matter how many
//! issuer threads enqueue concurrently.  Outcomes are delivered to
//! envelopes only after that lock is released; each envelope has its own
//! lock and condition variable.
//!
//! ```text
//!   enqueue ──▶ ┌──────────────────────────┐
//!               │ pending (sorted, stable) │──activate_next──▶ active
//!               └──────────────────────────┘                      │
//!                    │ abort_all_pending                 complete_active
//!                    ▼                                             ▼
//!                 aborted                                      completed
//! ```

use core::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use super::envelope::CommandEnvelope;
use crate::error::{CommandError, ProtocolMisuse};

struct QueueState<M> {
    /// Sorted by message order; equal messages keep arrival order.
    pending: VecDeque<Arc<CommandEnvelope<M>>>,
    active: Option<Arc<CommandEnvelope<M>>>,
}

/// Ordered pending commands and the single outstanding request.
pub struct DispatchQueue<M> {
    state: Mutex<CriticalSectionRawMutex, RefCell<QueueState<M>>>,
    /// `None` = unbounded.
    capacity: Option<usize>,
}

impl<M> DispatchQueue<M> {
    /// An unbounded queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(QueueState {
                pending: VecDeque::new(),
                active: None,
            })),
            capacity: None,
        }
    }

    /// A queue that rejects enqueues once `capacity` commands are pending.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    fn with_state<U>(&self, f: impl FnOnce(&mut QueueState<M>) -> U) -> U {
        self.state.lock(|cell| f(&mut *cell.borrow_mut()))
    }

    /// Insert `envelope` behind every pending envelope that does not sort
    /// after it.
    ///
    /// Fails with [`CommandError::QueueFull`] on a bounded queue at
    /// capacity; the envelope is left unresolved for the caller to handle.
    pub fn enqueue(&self, envelope: Arc<CommandEnvelope<M>>) -> Result<(), CommandError>
    where
        M: Ord,
    {
        let capacity = self.capacity;
        let depth = self.with_state(|s| {
            if capacity.is_some_and(|cap| s.pending.len() >= cap) {
                return None;
            }
            let at = s.pending.partition_point(|queued| **queued <= *envelope);
            s.pending.insert(at, envelope);
            Some(s.pending.len())
        });

        if let Some(depth) = depth {
            debug!("Queue: enqueued, {} pending", depth);
            Ok(())
        } else {
            warn!("Queue: rejected command, {} already pending", capacity.unwrap_or(0));
            Err(CommandError::QueueFull)
        }
    }

    /// Promote the first pending envelope to the in-flight slot.
    ///
    /// Returns the newly active envelope for transmission, or `None` when
    /// nothing is pending or a command is already in flight.  The latter
    /// is a protocol violation by the caller and is logged.
    pub fn activate_next(&self) -> Option<Arc<CommandEnvelope<M>>> {
        let result = self.with_state(|s| {
            if s.active.is_some() {
                return Err(ProtocolMisuse::SlotOccupied);
            }
            let next = s.pending.pop_front();
            s.active = next.clone();
            Ok(next)
        });

        match result {
            Ok(next) => next,
            Err(misuse) => {
                warn!("Queue: activate_next ignored, {}", misuse);
                None
            }
        }
    }

    /// Resolve the in-flight envelope and free the slot.
    ///
    /// Returns `false` when nothing was in flight (late or spurious
    /// completion) or the envelope had already been resolved.
    pub fn complete_active(&self, outcome: Result<M, CommandError>) -> bool {
        let Some(active) = self.with_state(|s| s.active.take()) else {
            debug!("Queue: completion with no command in flight, ignoring");
            return false;
        };

        if let Err(e) = &outcome {
            info!("Queue: active command failed after {:?}: {}", active.age(), e);
        } else {
            debug!("Queue: active command answered after {:?}", active.age());
        }
        active.complete(outcome).is_ok()
    }

    /// Fail every pending envelope with `cause` and empty the collection.
    ///
    /// The in-flight envelope is not touched; it must be resolved through
    /// [`complete_active`](Self::complete_active).  Returns how many
    /// envelopes were aborted.
    pub fn abort_all_pending(&self, cause: CommandError) -> usize {
        let aborted = self.with_state(|s| core::mem::take(&mut s.pending));
        let count = aborted.len();
        for envelope in aborted {
            // Already-resolved envelopes report misuse themselves.
            let _ = envelope.complete_with_failure(cause);
        }
        if count > 0 {
            info!("Queue: aborted {} pending commands ({})", count, cause);
        }
        count
    }

    /// Abort every pending envelope, fail the in-flight one and leave the
    /// queue empty, all in one critical section.
    ///
    /// Equivalent to [`abort_all_pending`](Self::abort_all_pending),
    /// [`complete_active`](Self::complete_active) and [`reset`](Self::reset)
    /// with no enqueue able to land in between, so every envelope the
    /// queue held is resolved.  Returns the number of pending envelopes
    /// aborted and whether one was in flight.
    pub fn fail_all(&self, cause: CommandError) -> (usize, bool) {
        let (pending, active) =
            self.with_state(|s| (core::mem::take(&mut s.pending), s.active.take()));
        let aborted = pending.len();
        for envelope in pending {
            let _ = envelope.complete_with_failure(cause);
        }
        let had_active = active.is_some();
        if let Some(active) = active {
            let _ = active.complete_with_failure(cause);
        }
        if aborted > 0 || had_active {
            info!(
                "Queue: failed {} pending{} ({})",
                aborted,
                if had_active { " + 1 in flight" } else { "" },
                cause
            );
        }
        (aborted, had_active)
    }

    pub fn has_pending(&self) -> bool {
        self.with_state(|s| !s.pending.is_empty())
    }

    pub fn pending_len(&self) -> usize {
        self.with_state(|s| s.pending.len())
    }

    pub fn has_active(&self) -> bool {
        self.with_state(|s| s.active.is_some())
    }

    /// The envelope currently in flight, if any.
    pub fn active(&self) -> Option<Arc<CommandEnvelope<M>>> {
        self.with_state(|s| s.active.clone())
    }

    /// Drop every held envelope without resolving it.
    ///
    /// Waiters on discarded, unresolved envelopes are not woken; use
    /// [`fail_all`](Self::fail_all) to tear down with waiters present.
    pub fn reset(&self) {
        let (pending, active) =
            self.with_state(|s| (core::mem::take(&mut s.pending), s.active.take()));
        let unresolved = pending
            .iter()
            .chain(active.iter())
            .filter(|e| !e.is_completed())
            .count();
        if unresolved > 0 {
            warn!(
                "Queue: reset discarded {} unresolved commands, their waiters stay blocked",
                unresolved
            );
        }
    }
}

impl<M> Default for DispatchQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}
