//! Dispatch ordering for application-layer messages.
//!
//! The dispatch queue is generic over any `M: Ord`: lower in the order
//! means transmitted first.  Message catalogs that do not carry a natural
//! order can wrap their payload in [`Prioritized`].

use core::cmp::Ordering;

/// Urgency rank of a pump command.
///
/// Declared most-urgent first so that the derived `Ord` sorts
/// [`Highest`](Self::Highest) to the front of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MessagePriority {
    /// Delivery-stopping commands (cancel bolus, suspend).
    Highest,
    High,
    #[default]
    Normal,
    Low,
    /// Background reads such as history sync.
    Lowest,
}

/// A payload tagged with a [`MessagePriority`].
///
/// Ordering and equality look at the priority only, so two messages with
/// the same priority are "equal" for dispatch and keep their enqueue order.
#[derive(Debug, Clone, Copy)]
pub struct Prioritized<T> {
    pub priority: MessagePriority,
    pub body: T,
}

impl<T> Prioritized<T> {
    pub const fn new(priority: MessagePriority, body: T) -> Self {
        Self { priority, body }
    }

    pub fn into_body(self) -> T {
        self.body
    }
}

impl<T> PartialEq for Prioritized<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl<T> Eq for Prioritized<T> {}

impl<T> PartialOrd for Prioritized<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Prioritized<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}
