//! Multicast channels.
//!
//! This module provides `Channel` which delivers values to every registered
//! observer and carries a one-shot completion signal.

use crate::subscription::{Cancel, Observer, Subscription, SubscriptionId, SubscriptionManager};
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::fmt;

/// Shared state behind a channel handle.
struct ChannelInner<T> {
    /// Registered observers
    subscriptions: RefCell<SubscriptionManager<T>>,
    /// Set once by `complete()`
    completed: Cell<bool>,
}

impl<T> Cancel for ChannelInner<T> {
    fn cancel(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow_mut().unsubscribe(id)
    }

    fn is_live(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow().contains(id)
    }
}

/// A push-based multicast channel.
///
/// Cloning a `Channel` yields another handle to the same channel. Delivery is
/// synchronous: `emit` returns once every observer has run. No borrow is held
/// while observers run, so observers may emit, subscribe or unsubscribe
/// reentrantly.
///
/// # Example
///
/// ```rust
/// use idsets_reactive::Channel;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let channel: Channel<&str> = Channel::new();
/// let done = Rc::new(Cell::new(false));
///
/// let done_clone = done.clone();
/// let subscription = channel.subscribe_with(|_| {}, move || done_clone.set(true));
///
/// channel.complete();
/// assert!(done.get());
/// assert!(subscription.is_closed());
/// ```
pub struct Channel<T: 'static> {
    inner: Rc<ChannelInner<T>>,
}

impl<T: 'static> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("observers", &self.observer_count())
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<T: 'static> Channel<T> {
    /// Creates a new channel without observers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ChannelInner {
                subscriptions: RefCell::new(SubscriptionManager::new()),
                completed: Cell::new(false),
            }),
        }
    }

    /// Subscribes to values emitted from now on.
    pub fn subscribe<F>(&self, next: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = self.inner.subscriptions.borrow_mut().next_id();
        self.register(Observer::new(id, next))
    }

    /// Subscribes to values and to the completion signal.
    ///
    /// Subscribing to a completed channel runs `complete` immediately and
    /// returns a closed subscription.
    pub fn subscribe_with<F, C>(&self, next: F, complete: C) -> Subscription
    where
        F: Fn(&T) + 'static,
        C: Fn() + 'static,
    {
        let id = self.inner.subscriptions.borrow_mut().next_id();
        self.register(Observer::new(id, next).on_complete(complete))
    }

    fn register(&self, observer: Observer<T>) -> Subscription {
        let id = observer.id();
        if self.inner.completed.get() {
            observer.complete();
        } else {
            self.inner.subscriptions.borrow_mut().insert(observer);
        }
        let weak: Weak<ChannelInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(id, weak)
    }

    /// Delivers a value to every current observer, in subscription order.
    pub fn emit(&self, value: &T) {
        if self.inner.completed.get() {
            return;
        }
        let observers = self.inner.subscriptions.borrow().snapshot();
        for observer in observers {
            observer.notify(value);
        }
    }

    /// Completes the channel.
    ///
    /// Every observer receives the completion signal once and is dropped.
    /// Later emissions are ignored. Completing twice is a no-op.
    pub fn complete(&self) {
        if self.inner.completed.replace(true) {
            return;
        }
        let observers = self.inner.subscriptions.borrow_mut().take_all();
        tracing::trace!(observers = observers.len(), "channel completed");
        for observer in observers {
            observer.complete();
        }
    }

    /// Returns true if at least one observer is registered.
    #[inline]
    pub fn is_observed(&self) -> bool {
        !self.inner.subscriptions.borrow().is_empty()
    }

    /// Returns true once `complete()` was called.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.get()
    }

    /// Returns the number of registered observers.
    #[inline]
    pub fn observer_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    /// Returns true if both handles refer to the same channel.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_channel_emit() {
        let channel: Channel<i32> = Channel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = seen.clone();
        channel.subscribe(move |v| seen_clone.borrow_mut().push(*v));

        channel.emit(&1);
        channel.emit(&2);

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_channel_is_observed() {
        let channel: Channel<i32> = Channel::new();
        assert!(!channel.is_observed());

        let sub = channel.subscribe(|_| {});
        assert!(channel.is_observed());
        assert_eq!(channel.observer_count(), 1);

        assert!(sub.unsubscribe());
        assert!(!channel.is_observed());
        assert!(sub.is_closed());
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_channel_complete() {
        let channel: Channel<i32> = Channel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let completions = Rc::new(Cell::new(0));

        let seen_clone = seen.clone();
        let completions_clone = completions.clone();
        let sub = channel.subscribe_with(
            move |v| seen_clone.borrow_mut().push(*v),
            move || completions_clone.set(completions_clone.get() + 1),
        );

        channel.emit(&1);
        channel.complete();
        channel.complete();
        channel.emit(&2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(completions.get(), 1);
        assert!(sub.is_closed());
        assert!(!channel.is_observed());
    }

    #[test]
    fn test_channel_subscribe_after_complete() {
        let channel: Channel<i32> = Channel::new();
        channel.complete();

        let completed = Rc::new(Cell::new(false));
        let completed_clone = completed.clone();
        let sub = channel.subscribe_with(|_| {}, move || completed_clone.set(true));

        assert!(completed.get());
        assert!(sub.is_closed());
        assert!(!channel.is_observed());
    }

    #[test]
    fn test_channel_reentrant_unsubscribe() {
        let channel: Channel<i32> = Channel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let seen_clone = seen.clone();
        let slot_clone = slot.clone();
        let sub = channel.subscribe(move |v| {
            seen_clone.borrow_mut().push(*v);
            if let Some(sub) = slot_clone.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.borrow_mut() = Some(sub);

        channel.emit(&1);
        channel.emit(&2);

        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_channel_reentrant_emit() {
        let channel: Channel<i32> = Channel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = seen.clone();
        let echo = channel.clone();
        channel.subscribe(move |v| {
            seen_clone.borrow_mut().push(*v);
            if *v < 3 {
                echo.emit(&(*v + 1));
            }
        });

        channel.emit(&1);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_subscription_outlives_channel() {
        let channel: Channel<i32> = Channel::new();
        let sub = channel.subscribe(|_| {});
        drop(channel);
        assert!(sub.is_closed());
        assert!(!sub.unsubscribe());
    }
}
