//! Rendezvous hand-off between the consumer and the persister.

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::RelayError;

/// Unbuffered conduit: a put completes only once a take has claimed its item.
///
/// At most one item is ever in transit, and the putter stays blocked while it is.
/// Closing releases every blocked caller. A put whose item has not been claimed
/// withdraws it and fails with [`RelayError::HandOffClosed`]; takes return `None`
/// once nothing is left to claim. An item is therefore either claimed by exactly
/// one take or returned to its putter as an error, never both and never neither.
pub struct HandOff<T> {
    state: Mutex<State<T>>,
    changed: Notify,
}

struct State<T> {
    /// Item offered by the blocked putter, tagged with its ticket.
    offered: Option<(u64, T)>,
    /// Ticket of the most recently claimed item.
    claimed: u64,
    next_ticket: u64,
    closed: bool,
}

impl<T: Send> HandOff<T> {
    /// Create an open, empty hand-off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                offered: None,
                claimed: 0,
                next_ticket: 1,
                closed: false,
            }),
            changed: Notify::new(),
        }
    }

    /// Offer an item and wait until a take claims it.
    ///
    /// Dropping the returned future before it completes withdraws the item if it
    /// is still unclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::HandOffClosed`] if the hand-off closes before a take
    /// claims the item. The item is dropped in that case.
    pub async fn put(&self, item: T) -> Result<(), RelayError> {
        let mut item = Some(item);
        let ticket = loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(RelayError::HandOffClosed);
                }
                if state.offered.is_none() {
                    let ticket = state.next_ticket;
                    state.next_ticket += 1;
                    if let Some(item) = item.take() {
                        state.offered = Some((ticket, item));
                    }
                    drop(state);
                    self.changed.notify_waiters();
                    break ticket;
                }
            }
            notified.await;
        };

        let mut offer = Offer {
            handoff: self,
            ticket,
            settled: false,
        };
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.claimed >= ticket {
                    offer.settled = true;
                    return Ok(());
                }
                if state.closed {
                    state.offered = None;
                    offer.settled = true;
                    drop(state);
                    self.changed.notify_waiters();
                    return Err(RelayError::HandOffClosed);
                }
            }
            notified.await;
        }
    }

    /// Claim the offered item, waiting until one arrives.
    ///
    /// Returns `None` once the hand-off is closed and no item is left to claim.
    pub async fn take(&self) -> Option<T> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if let Some((ticket, item)) = state.offered.take() {
                    state.claimed = ticket;
                    drop(state);
                    self.changed.notify_waiters();
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the hand-off. Idempotent.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_waiters();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl<T: Send> Default for HandOff<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Withdraws an unclaimed item when a put is cancelled.
struct Offer<'a, T> {
    handoff: &'a HandOff<T>,
    ticket: u64,
    settled: bool,
}

impl<T> Drop for Offer<'_, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.handoff.state.lock();
        if matches!(state.offered, Some((ticket, _)) if ticket == self.ticket) {
            state.offered = None;
            drop(state);
            self.handoff.changed.notify_waiters();
        }
    }
}
