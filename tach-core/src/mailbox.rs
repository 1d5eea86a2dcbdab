//! Single-slot, latest-value-wins mailbox.
//!
//! Sending never blocks and replaces any value the consumer has not taken
//! yet. Exactly one task is expected to receive. Backed by
//! [`embassy_sync::signal::Signal`] so the sender may be an interrupt
//! handler.

use core::future::Future;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Holds at most one `T` between a sender and a single receiver.
pub struct Mailbox<T> {
    slot: Signal<CriticalSectionRawMutex, T>,
}

impl<T: Send> Mailbox<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Signal::new(),
        }
    }

    /// Stores `value`, overwriting any unread value.
    pub fn send(&self, value: T) {
        self.slot.signal(value);
    }

    /// Waits for the next value.
    pub async fn receive(&self) -> T {
        self.slot.wait().await
    }

    /// Waits for the next value or for `timeout` to resolve, whichever comes
    /// first.
    ///
    /// The timeout is any future so the caller chooses the time source, for
    /// example `embassy_time::Timer::after(..)` on target.
    pub async fn receive_within<F>(&self, timeout: F) -> Option<T>
    where
        F: Future<Output = ()>,
    {
        match select(self.slot.wait(), timeout).await {
            Either::First(value) => Some(value),
            Either::Second(()) => None,
        }
    }

    /// Takes the pending value, if any, without waiting.
    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.slot.try_take()
    }

    /// Returns `true` while a value is waiting to be received.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.signaled()
    }
}

impl<T: Send> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
