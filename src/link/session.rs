//! Link session — the facade shared by command issuers and the transport.
//!
//! [`LinkSession`] owns the [`DispatchQueue`] for one connection session
//! and encodes the call orderings both collaborators must follow:
//!
//! ```text
//!  Issuer thread                     Transport thread
//!  ─────────────                     ────────────────
//!  request(m)
//!    ├─ enqueue ──────┐
//!    ├─ notify ───────┼────────────▶ next_to_send()  ──▶ transmit
//!    └─ wait ◀────────┘                    ...
//!         ▲                          deliver_response(r) / deliver_error(e)
//!         └───────────────────────────────┘
//!                                    link_lost(e): abort pending,
//!                                                  fail active, reset
//! ```
//!
//! Only the transport thread may call the transport-side methods; the
//! check-then-activate in [`next_to_send`](LinkSession::next_to_send)
//! relies on that.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::envelope::CommandEnvelope;
use super::ports::DispatchNotifier;
use super::queue::DispatchQueue;
use crate::config::LinkConfig;
use crate::error::CommandError;

/// One connection session's worth of dispatch state.
pub struct LinkSession<M, N> {
    queue: DispatchQueue<M>,
    notifier: N,
    command_timeout: Duration,
}

impl<M, N: DispatchNotifier> LinkSession<M, N> {
    /// Build a session from `config`, rejecting it if it fails
    /// [`LinkConfig::validate`].
    pub fn new(config: &LinkConfig, notifier: N) -> crate::Result<Self> {
        config.validate()?;
        let queue = match config.max_pending {
            Some(cap) => DispatchQueue::bounded(usize::from(cap)),
            None => DispatchQueue::new(),
        };
        Ok(Self {
            queue,
            notifier,
            command_timeout: config.command_timeout(),
        })
    }

    pub fn queue(&self) -> &DispatchQueue<M> {
        &self.queue
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Budget used by [`request`](Self::request).
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    // ── Issuer side ───────────────────────────────────────────

    /// Enqueue `request` and wake the transport.
    ///
    /// The returned envelope is the caller's handle for waiting.
    pub fn submit(&self, request: M) -> Result<Arc<CommandEnvelope<M>>, CommandError>
    where
        M: Ord,
    {
        let envelope = Arc::new(CommandEnvelope::new(request));
        self.queue.enqueue(Arc::clone(&envelope))?;
        self.notifier.command_enqueued();
        Ok(envelope)
    }

    /// Submit and wait up to the configured command timeout.
    pub fn request(&self, request: M) -> Result<M, CommandError>
    where
        M: Ord + Clone,
    {
        self.request_timeout(request, self.command_timeout)
    }

    /// Submit and wait up to `timeout`.
    ///
    /// On [`CommandError::Timeout`] the command stays queued or in flight;
    /// its effect on the device is unknown.
    pub fn request_timeout(&self, request: M, timeout: Duration) -> Result<M, CommandError>
    where
        M: Ord + Clone,
    {
        let envelope = self.submit(request)?;
        let outcome = envelope.wait_timeout(timeout);
        if outcome == Err(CommandError::Timeout) {
            warn!("Session: command timed out after {:?}, outcome in doubt", timeout);
        }
        outcome
    }

    /// Submit and wait with no deadline.
    pub fn request_untimed(&self, request: M) -> Result<M, CommandError>
    where
        M: Ord + Clone,
    {
        self.submit(request)?.wait()
    }

    pub fn has_pending(&self) -> bool {
        self.queue.has_pending()
    }

    // ── Transport side ────────────────────────────────────────

    /// The next command to transmit, if the device is free and work is
    /// queued.  A no-op while a command is still in flight.
    pub fn next_to_send(&self) -> Option<Arc<CommandEnvelope<M>>> {
        if self.queue.has_active() {
            return None;
        }
        self.queue.activate_next()
    }

    /// The device answered the in-flight command.
    pub fn deliver_response(&self, response: M) -> bool {
        self.queue.complete_active(Ok(response))
    }

    /// The in-flight command failed at the device or transport level.
    pub fn deliver_error(&self, cause: CommandError) -> bool {
        self.queue.complete_active(Err(cause))
    }

    /// The link is gone: release every waiter, then clear the queue.
    ///
    /// Queued commands, the in-flight command and the slot are torn down
    /// in one step, so an issuer submitting concurrently either has its
    /// command failed here or finds it queued afterwards.
    pub fn link_lost(&self, cause: CommandError) {
        let (aborted, had_active) = self.queue.fail_all(cause);
        info!(
            "Session: link lost ({}), released {} queued{}",
            cause,
            aborted,
            if had_active { " + 1 in flight" } else { "" }
        );
    }

    /// Start a fresh connection session on the same queue.
    ///
    /// Anything left over from the previous session is failed with
    /// [`CommandError::LinkLost`], so no waiter is left blocked.
    pub fn begin_session(&self) {
        let (stale, had_active) = self.queue.fail_all(CommandError::LinkLost);
        if stale > 0 || had_active {
            warn!(
                "Session: new session released {} stale commands",
                stale + usize::from(had_active)
            );
        }
        debug!("Session: new connection session");
    }
}
