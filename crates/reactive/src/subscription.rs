//! Subscription management for channels.
//!
//! This module provides observer records, the registry a channel keeps them
//! in, and the `Subscription` handle returned to callers for cancellation.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::fmt;

/// Unique identifier for a subscription within one channel.
pub type SubscriptionId = u64;

/// Callback invoked for every emitted value.
pub type NextCallback<T> = Box<dyn Fn(&T)>;

/// Callback invoked once when the channel completes.
pub type CompleteCallback = Box<dyn Fn()>;

/// A registered observer of a channel.
pub struct Observer<T> {
    /// Unique identifier
    id: SubscriptionId,
    /// Callback to invoke on values
    next: NextCallback<T>,
    /// Callback to invoke on completion
    complete: Option<CompleteCallback>,
}

impl<T> Observer<T> {
    /// Creates a new observer.
    pub fn new<F>(id: SubscriptionId, next: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        Self {
            id,
            next: Box::new(next),
            complete: None,
        }
    }

    /// Attaches a completion callback.
    pub fn on_complete<F>(mut self, complete: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.complete = Some(Box::new(complete));
        self
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Delivers a value to this observer.
    #[inline]
    pub fn notify(&self, value: &T) {
        (self.next)(value);
    }

    /// Delivers the completion signal to this observer.
    #[inline]
    pub fn complete(&self) {
        if let Some(complete) = &self.complete {
            complete();
        }
    }
}

/// Manages the observers of one channel.
///
/// Observers are kept in subscription order so delivery is deterministic.
pub struct SubscriptionManager<T> {
    /// Active observers
    observers: BTreeMap<SubscriptionId, Rc<Observer<T>>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionManager<T> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            observers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserves the next subscription ID.
    pub fn next_id(&mut self) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Subscribes with the given callback.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&mut self, next: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        let id = self.next_id();
        self.insert(Observer::new(id, next));
        id
    }

    /// Registers a prepared observer under its own ID.
    pub fn insert(&mut self, observer: Observer<T>) {
        self.observers.insert(observer.id(), Rc::new(observer));
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Returns true if the subscription is registered.
    #[inline]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.observers.contains_key(&id)
    }

    /// Returns the current observers in subscription order.
    ///
    /// Delivery iterates this copy, so observers may subscribe or unsubscribe
    /// while a value is being delivered.
    pub fn snapshot(&self) -> Vec<Rc<Observer<T>>> {
        self.observers.values().cloned().collect()
    }

    /// Removes and returns every observer in subscription order.
    pub fn take_all(&mut self) -> Vec<Rc<Observer<T>>> {
        core::mem::take(&mut self.observers).into_values().collect()
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Returns all subscription IDs.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.observers.keys().copied().collect()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

/// The channel side of a subscription handle.
pub(crate) trait Cancel {
    /// Removes the observer, returning true if it was registered.
    fn cancel(&self, id: SubscriptionId) -> bool;

    /// Returns true if the observer is still registered.
    fn is_live(&self, id: SubscriptionId) -> bool;
}

/// Handle to one observer of a channel.
///
/// Dropping the handle does not cancel the observer; call `unsubscribe`.
/// Cancelling only stops delivery to this observer.
pub struct Subscription {
    id: SubscriptionId,
    channel: Weak<dyn Cancel>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, channel: Weak<dyn Cancel>) -> Self {
        Self { id, channel }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stops delivery to this observer.
    ///
    /// Returns true if the observer was still registered.
    pub fn unsubscribe(&self) -> bool {
        self.channel
            .upgrade()
            .map(|channel| channel.cancel(self.id))
            .unwrap_or(false)
    }

    /// Returns true once the observer no longer receives values, because it
    /// was unsubscribed, the channel completed or the channel was dropped.
    pub fn is_closed(&self) -> bool {
        self.channel
            .upgrade()
            .map(|channel| !channel.is_live(self.id))
            .unwrap_or(true)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
