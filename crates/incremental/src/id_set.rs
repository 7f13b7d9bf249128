//! Plain mutable collection.

use crate::collection::{Base, IdCollection};
use alloc::rc::Rc;
use core::borrow::Borrow;
use hashbrown::HashSet;
use idsets_core::{CollectionConfig, Identified, Result};

/// A client-mutable collection of identified values.
///
/// Cheap to clone; clones share the same collection.
///
/// Writes accept owned values or `Rc<V>`. An `Rc<V>` argument alone does not
/// determine `V`, so name the value type when nothing else does:
/// `IdSet::<User>::from_values(shared)`.
///
/// # Example
///
/// ```rust
/// use idsets_incremental::{IdCollection, IdSet, Identified};
///
/// struct User {
///     id: u32,
///     name: &'static str,
/// }
///
/// impl Identified for User {
///     type Id = u32;
///     fn id(&self) -> &u32 {
///         &self.id
///     }
/// }
///
/// let users = IdSet::new();
/// users.add([User { id: 1, name: "ada" }, User { id: 2, name: "grace" }]);
/// assert_eq!(users.get(&2).map(|u| u.name), Some("grace"));
///
/// users.replace([User { id: 3, name: "edsger" }]);
/// assert_eq!(users.ids(), vec![3]);
///
/// let shared = users.values();
/// let copy = IdSet::<User>::from_values(shared);
/// assert_eq!(copy.ids(), vec![3]);
/// ```
#[derive(Debug)]
pub struct IdSet<V: Identified + 'static> {
    base: Base<V>,
}

impl<V: Identified + 'static> Clone for IdSet<V> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

impl<V: Identified + 'static> Default for IdSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Identified + 'static> IdSet<V> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self { base: Base::new() }
    }

    /// Creates an empty set with an ingest configuration.
    pub fn with_config(config: CollectionConfig<V>) -> Self {
        Self {
            base: Base::with_config(config),
        }
    }

    /// Creates a set holding `values`, without publishing anything.
    pub fn from_values<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        Self {
            base: Base::from_values(values),
        }
    }

    /// Adds or replaces `values`.
    pub fn add<I, T>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        for value in values {
            self.base.upsert(value.into());
        }
    }

    /// Deletes the values stored under `ids`.
    ///
    /// Returns true if at least one value was deleted.
    pub fn delete<I, B>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = B>,
        B: Borrow<V::Id>,
    {
        let mut deleted = false;
        for id in ids {
            deleted |= self.base.remove(id.borrow());
        }
        deleted
    }

    /// Makes `values` the full contents, publishing one batch.
    pub fn replace<I, T>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        self.base.batch(|| {
            let mut kept: HashSet<V::Id> = HashSet::new();
            for value in values {
                let value = value.into();
                kept.insert(value.id().clone());
                self.base.upsert(value);
            }
            for id in self.base.ids() {
                if !kept.contains(&id) {
                    self.base.remove(&id);
                }
            }
        });
    }

    /// Deletes every value.
    pub fn clear(&self) {
        self.base.clear();
    }

    /// See [`Base::pause`].
    pub fn pause(&self) {
        self.base.pause();
    }

    /// See [`Base::resume`].
    pub fn resume(&self) -> Result<()> {
        self.base.resume()
    }

    /// Runs `f` inside one pause episode.
    pub fn batch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.base.batch(f)
    }

    /// Closes every channel.
    pub fn complete(&self) {
        self.base.complete();
    }
}

impl<V: Identified + 'static> IdCollection<V> for IdSet<V> {
    #[inline]
    fn base(&self) -> &Base<V> {
        &self.base
    }
}
