//! Idsets Reactive - Push-based notification channels.
//!
//! This crate implements the multicast channels every idsets collection
//! publishes its changes through. A channel delivers values to its observers
//! synchronously and carries a one-shot completion signal.
//!
//! # Core Concepts
//!
//! - `Channel<T>`: A broadcaster with observer registration and completion
//! - `Subscription`: A handle that cancels one observer
//! - `SubscriptionManager<T>`: The ordered observer registry behind a channel
//!
//! # Example
//!
//! ```rust
//! use idsets_reactive::Channel;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let channel: Channel<u32> = Channel::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let seen_clone = seen.clone();
//! let subscription = channel.subscribe(move |value| seen_clone.borrow_mut().push(*value));
//!
//! channel.emit(&1);
//! subscription.unsubscribe();
//! channel.emit(&2);
//!
//! assert_eq!(*seen.borrow(), vec![1]);
//! assert!(!channel.is_observed());
//! ```

#![no_std]

extern crate alloc;

pub mod channel;
pub mod subscription;

pub use channel::Channel;
pub use subscription::{
    CompleteCallback, NextCallback, Observer, Subscription, SubscriptionId, SubscriptionManager,
};
