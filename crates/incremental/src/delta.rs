//! Delta type for incremental collections.
//!
//! A `Delta` bundles the net changes of one mutation episode: the values
//! that were created, updated and deleted. A single write produces a delta
//! with one value in one group; a `pause()`/`resume()` episode produces one
//! delta holding every net change.

use alloc::vec::Vec;

/// The changes of one mutation episode, grouped by kind.
///
/// The three groups are disjoint by id. An empty group means the kind is
/// absent from this episode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta<T> {
    /// Values that did not exist before the episode
    pub create: Vec<T>,
    /// Values that replaced an existing value
    pub update: Vec<T>,
    /// Values that were removed
    pub delete: Vec<T>,
}

impl<T> Default for Delta<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives the groups of a delta, one callback per value.
///
/// Every method defaults to a no-op, so a processor only implements the
/// groups it cares about.
pub trait DeltaProcessor<T> {
    /// Called for every created value.
    fn create(&mut self, _value: &T) {}

    /// Called for every updated value.
    fn update(&mut self, _value: &T) {}

    /// Called for every deleted value.
    fn delete(&mut self, _value: &T) {}
}

impl<T> Delta<T> {
    /// Creates an empty delta.
    #[inline]
    pub fn new() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
        }
    }

    /// Creates a delta from its three groups.
    #[inline]
    pub fn from_parts(create: Vec<T>, update: Vec<T>, delete: Vec<T>) -> Self {
        Self {
            create,
            update,
            delete,
        }
    }

    /// Creates a delta holding a single created value.
    #[inline]
    pub fn created(value: T) -> Self {
        Self::from_parts(alloc::vec![value], Vec::new(), Vec::new())
    }

    /// Creates a delta holding a single updated value.
    #[inline]
    pub fn updated(value: T) -> Self {
        Self::from_parts(Vec::new(), alloc::vec![value], Vec::new())
    }

    /// Creates a delta holding a single deleted value.
    #[inline]
    pub fn deleted(value: T) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), alloc::vec![value])
    }

    /// Returns true if no group holds a value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Returns the total number of values across all groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    /// Maps every value through `f`, preserving the three groups.
    pub fn map<U, F>(&self, mut f: F) -> Delta<U>
    where
        F: FnMut(&T) -> U,
    {
        Delta {
            create: self.create.iter().map(&mut f).collect(),
            update: self.update.iter().map(&mut f).collect(),
            delete: self.delete.iter().map(&mut f).collect(),
        }
    }

    /// Projects every value to zero or more results.
    ///
    /// Results are produced for created values first, then updated, then
    /// deleted, each group in order.
    pub fn flat_map<U, I, F>(&self, mut f: F) -> Vec<U>
    where
        I: IntoIterator<Item = U>,
        F: FnMut(&T) -> I,
    {
        let mut results = Vec::new();
        for value in self.create.iter().chain(&self.update).chain(&self.delete) {
            results.extend(f(value));
        }
        results
    }

    /// Dispatches every value to the matching processor method.
    pub fn process<P>(&self, processor: &mut P)
    where
        P: DeltaProcessor<T> + ?Sized,
    {
        for value in &self.create {
            processor.create(value);
        }
        for value in &self.update {
            processor.update(value);
        }
        for value in &self.delete {
            processor.delete(value);
        }
    }

    /// Returns an iterator over created and updated values.
    pub fn added(&self) -> impl Iterator<Item = &T> {
        self.create.iter().chain(&self.update)
    }
}
