//! Idsets Incremental - incrementally maintained identity-keyed collections.
//!
//! This crate keeps collections of identified values and set views over them
//! up to date as their inputs change. Every write publishes a change, and
//! derived views apply upstream changes instead of recomputing from scratch.
//!
//! # Core Concepts
//!
//! - `Base<V>`: id -> value storage with four change channels and
//!   pause/resume coalescing
//! - `Delta<T>`: the create/update/delete groups of one write or one pause
//!   episode
//! - `IdCollection<V>`: read access shared by every collection
//!
//! # Collections
//!
//! - `IdSet`: client-mutable collection
//! - `Union`, `Intersection`, `Difference`: views over tracked sources,
//!   whose sources can be changed at runtime
//! - `Container` / `Categorized`: values filed under one or more keys, one
//!   `KeyedSet` per key
//!
//! # Example
//!
//! ```rust
//! use idsets_incremental::{Delta, IdCollection, IdSet, Identified};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! #[derive(Debug)]
//! struct Task {
//!     id: u32,
//!     done: bool,
//! }
//!
//! impl Identified for Task {
//!     type Id = u32;
//!     fn id(&self) -> &u32 {
//!         &self.id
//!     }
//! }
//!
//! let open = IdSet::from_values([Task { id: 1, done: false }, Task { id: 2, done: false }]);
//! let archived = IdSet::from_values([Task { id: 2, done: true }]);
//! let visible = open.subtract([&archived]);
//! assert_eq!(visible.ids(), vec![1]);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_clone = seen.clone();
//! visible.on_delta().subscribe(move |delta: &Delta<Rc<Task>>| {
//!     seen_clone.borrow_mut().push(delta.map(|task| task.id));
//! });
//!
//! open.batch(|| {
//!     open.add([Task { id: 3, done: false }]);
//!     open.delete([1u32]);
//! });
//!
//! assert_eq!(visible.ids(), vec![3]);
//! assert_eq!(
//!     *seen.borrow(),
//!     vec![Delta::from_parts(vec![3], vec![], vec![1])]
//! );
//! ```

#![no_std]

extern crate alloc;

pub mod collection;
pub mod container;
mod dataflow;
pub mod delta;
pub mod id_set;
pub mod operators;

#[cfg(test)]
mod test_util;

pub use collection::{Base, IdCollection};
pub use container::{Categorized, Container, KeyedSet, SetKey};
pub use delta::{Delta, DeltaProcessor};
pub use id_set::IdSet;
pub use operators::{Difference, Intersection, Union};

pub use idsets_core::{CollectionConfig, Error, FilterFn, Identified, Result, TransformFn};
pub use idsets_reactive::{Channel, Subscription};
