//! Port traits: the boundary between the dispatch core and the transport.
//!
//! ```text
//!   Issuer ──▶ LinkSession ──▶ DispatchNotifier ──▶ transport thread
//! ```
//!
//! The core never pushes bytes itself.  After a command is enqueued it
//! rings the notifier; the transport adapter decides how to wake up and
//! when to call [`LinkSession::next_to_send`](super::session::LinkSession::next_to_send).

/// Wakes the transport thread when there may be work to transmit.
///
/// Called from issuer threads, so implementations must be cheap and must
/// not block.
pub trait DispatchNotifier: Send + Sync {
    fn command_enqueued(&self);
}

/// A notifier for transports that poll [`has_pending`](super::queue::DispatchQueue::has_pending)
/// on their own schedule.
pub struct NullNotifier;

impl DispatchNotifier for NullNotifier {
    fn command_enqueued(&self) {}
}

impl<N: DispatchNotifier + ?Sized> DispatchNotifier for std::sync::Arc<N> {
    fn command_enqueued(&self) {
        (**self).command_enqueued();
    }
}
