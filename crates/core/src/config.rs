//! Collection configuration.
//!
//! A `CollectionConfig` decides what a collection stores when a value is
//! written to it. It is applied on every inbound write, including seeding.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

/// Predicate deciding whether an inbound value is stored.
pub type FilterFn<V> = Rc<dyn Fn(&V) -> bool>;

/// Rewrites an inbound value before it is stored.
pub type TransformFn<V> = Rc<dyn Fn(Rc<V>) -> Rc<V>>;

/// Ingest configuration for a collection.
///
/// Built fluently:
///
/// ```rust
/// use idsets_core::CollectionConfig;
/// use std::rc::Rc;
///
/// let config = CollectionConfig::<i64>::new()
///     .name("positive")
///     .filter(|v| *v > 0)
///     .transform(|v| Rc::new(*v * 10));
///
/// assert_eq!(config.ingest(Rc::new(2)).as_deref(), Some(&20));
/// assert_eq!(config.ingest(Rc::new(-2)), None);
/// ```
pub struct CollectionConfig<V> {
    name: Option<String>,
    filter: Option<FilterFn<V>>,
    transform: Option<TransformFn<V>>,
    clone_with: Option<fn(&V) -> V>,
}

impl<V> Default for CollectionConfig<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for CollectionConfig<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            filter: self.filter.clone(),
            transform: self.transform.clone(),
            clone_with: self.clone_with,
        }
    }
}

impl<V> fmt::Debug for CollectionConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionConfig")
            .field("name", &self.name)
            .field("filter", &self.filter.is_some())
            .field("transform", &self.transform.is_some())
            .field("clone_values", &self.clone_with.is_some())
            .finish()
    }
}

impl<V> CollectionConfig<V> {
    /// Creates a configuration that stores every value as given.
    pub fn new() -> Self {
        Self {
            name: None,
            filter: None,
            transform: None,
            clone_with: None,
        }
    }

    /// Sets the name used in log records and errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only values matching `filter` are stored.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&V) -> bool + 'static,
    {
        self.filter = Some(Rc::new(filter));
        self
    }

    /// Stored values are rewritten by `transform`.
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Rc<V>) -> Rc<V> + 'static,
    {
        self.transform = Some(Rc::new(transform));
        self
    }

    /// Returns the configured name.
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true if this configuration stores every value unchanged.
    #[inline]
    pub fn is_passthrough(&self) -> bool {
        self.filter.is_none() && self.transform.is_none() && self.clone_with.is_none()
    }

    /// Applies filter, cloning and transform, in that order.
    ///
    /// Returns `None` when the filter rejects the value.
    pub fn ingest(&self, value: Rc<V>) -> Option<Rc<V>> {
        if let Some(filter) = &self.filter {
            if !filter(&value) {
                return None;
            }
        }
        let value = match self.clone_with {
            Some(clone) => Rc::new(clone(&value)),
            None => value,
        };
        Some(match &self.transform {
            Some(transform) => transform(value),
            None => value,
        })
    }
}

impl<V: Clone> CollectionConfig<V> {
    /// Every stored value is a fresh deep clone of the inbound value.
    pub fn clone_values(mut self) -> Self {
        self.clone_with = Some(V::clone);
        self
    }
}
