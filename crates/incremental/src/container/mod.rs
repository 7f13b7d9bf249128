//! Multi-key container.
//!
//! A `Container` is a collection whose values are filed under one or more
//! keys. Every key owns a `KeyedSet` holding the values filed under it; the
//! container itself holds every value filed under at least one key.
//!
//! # Example
//!
//! ```rust
//! use idsets_incremental::{Container, IdCollection, Identified};
//!
//! struct Doc(u32);
//!
//! impl Identified for Doc {
//!     type Id = u32;
//!     fn id(&self) -> &u32 {
//!         &self.0
//!     }
//! }
//!
//! let docs: Container<Doc, &str> = Container::new();
//! docs.add([Doc(1)], ["draft"]);
//! docs.add([Doc(2)], ["draft", "shared"]);
//!
//! assert_eq!(docs.keyed("draft").ids(), vec![1, 2]);
//! assert_eq!(docs.keys_of(&2), Some(vec!["draft", "shared"]));
//!
//! docs.delete_from([2u32], ["draft"]);
//! assert_eq!(docs.keyed("draft").ids(), vec![1]);
//! assert!(docs.contains(&2));
//! ```

mod keyed;

pub use keyed::KeyedSet;

use crate::collection::{Base, IdCollection};
use crate::operators::{Difference, Intersection, Union};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cell::RefCell;
use core::fmt;
use core::hash::Hash;
use hashbrown::hash_map::DefaultHashBuilder;
use hashbrown::{HashMap, HashSet};
use idsets_core::{CollectionConfig, Identified, Result};
use indexmap::{IndexMap, IndexSet};

/// Bounds required of container keys.
pub trait SetKey: Clone + Eq + Hash + fmt::Debug + 'static {}

impl<T> SetKey for T where T: Clone + Eq + Hash + fmt::Debug + 'static {}

type KeySet<K> = IndexSet<K, DefaultHashBuilder>;

/// Categorization vocabulary for the same collection.
pub type Categorized<V, K> = Container<V, K>;

pub(crate) struct ContainerInner<V: Identified + 'static, K: SetKey> {
    base: Base<V>,
    /// Keyed sets in creation order
    sets: RefCell<IndexMap<K, KeyedSet<V, K>, DefaultHashBuilder>>,
    /// Keys every stored id is filed under
    memberships: RefCell<HashMap<V::Id, KeySet<K>>>,
}

/// A collection of values filed under one or more keys.
///
/// Every value held by a keyed set is the same reference the container
/// holds. A value stays in the container while it is filed under at least
/// one key.
pub struct Container<V: Identified + 'static, K: SetKey> {
    inner: Rc<ContainerInner<V, K>>,
}

impl<V: Identified + 'static, K: SetKey> Clone for Container<V, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Identified + 'static, K: SetKey> Default for Container<V, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Identified + 'static, K: SetKey> fmt::Debug for Container<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("base", &self.inner.base)
            .field("keys", &self.keys())
            .finish()
    }
}

impl<V: Identified + 'static, K: SetKey> Container<V, K> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::new())
    }

    /// Creates an empty container with an ingest configuration.
    ///
    /// Values are ingested once; keyed sets hold the ingested reference.
    pub fn with_config(config: CollectionConfig<V>) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                base: Base::with_config(config),
                sets: RefCell::new(IndexMap::default()),
                memberships: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Creates a container from `(value, keys)` pairs, as produced by
    /// [`Container::export`].
    pub fn from_entries<I, T, KI>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, KI)>,
        T: Into<Rc<V>>,
        KI: IntoIterator<Item = K>,
    {
        let container = Self::new();
        container.replace(entries);
        container
    }

    pub(crate) fn from_inner(inner: Rc<ContainerInner<V, K>>) -> Self {
        Self { inner }
    }

    /// Files `values` under every key in `keys`, in addition to the keys
    /// they are already filed under.
    ///
    /// Nothing happens when `keys` is empty.
    pub fn add<I, T, KI>(&self, values: I, keys: KI)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
        KI: IntoIterator<Item = K>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        if keys.is_empty() {
            return;
        }
        for value in values {
            self.file(value.into(), &keys);
        }
    }

    fn file(&self, value: Rc<V>, keys: &[K]) {
        if let Some(value) = self.inner.base.config().ingest(value) {
            self.store_filed(value, keys);
        }
    }

    /// Records `keys` for an ingested value and stores it in the container
    /// and in every keyed set it is filed under.
    fn store_filed(&self, value: Rc<V>, keys: &[K]) {
        let recorded: Vec<K> = {
            let mut memberships = self.inner.memberships.borrow_mut();
            let filed = memberships.entry(value.id().clone()).or_default();
            filed.extend(keys.iter().cloned());
            filed.iter().cloned().collect()
        };
        self.inner.base.store(value.clone());
        for key in recorded {
            self.keyed(key).raw_upsert(value.clone());
        }
    }

    /// Removes `ids` from every key they are filed under, and from the
    /// container.
    ///
    /// Returns true if at least one id was filed under a key.
    pub fn delete<I, B>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = B>,
        B: Borrow<V::Id>,
    {
        let mut deleted = false;
        for id in ids {
            deleted |= self.unfile(id.borrow(), None);
        }
        deleted
    }

    /// Removes `ids` from the given keys only.
    ///
    /// Ids left without a key are removed from the container. Returns true
    /// if at least one filing was removed.
    pub fn delete_from<I, B, KI>(&self, ids: I, keys: KI) -> bool
    where
        I: IntoIterator<Item = B>,
        B: Borrow<V::Id>,
        KI: IntoIterator<Item = K>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        let mut deleted = false;
        for id in ids {
            deleted |= self.unfile(id.borrow(), Some(keys.as_slice()));
        }
        deleted
    }

    /// Unfiles `id` and removes it from the container once no key is left.
    fn unfile(&self, id: &V::Id, keys: Option<&[K]>) -> bool {
        let (removed, orphaned) = self.drop_keys(id, keys);
        if orphaned {
            self.inner.base.remove(id);
        }
        removed
    }

    /// Removes filings from the index and the keyed sets, leaving the
    /// container itself untouched.
    ///
    /// Returns whether a filing was removed and whether the id is left
    /// without a key.
    fn drop_keys(&self, id: &V::Id, keys: Option<&[K]>) -> (bool, bool) {
        let (removed, orphaned) = {
            let mut memberships = self.inner.memberships.borrow_mut();
            let Some(filed) = memberships.get_mut(id) else {
                return (false, false);
            };
            let removed: Vec<K> = match keys {
                Some(keys) => keys.iter().filter(|key| filed.shift_remove(*key)).cloned().collect(),
                None => filed.drain(..).collect(),
            };
            let orphaned = filed.is_empty();
            if orphaned {
                memberships.remove(id);
            }
            (removed, orphaned)
        };
        for key in &removed {
            if let Some(set) = self.get_keyed(key) {
                set.raw_remove(id);
            }
        }
        (!removed.is_empty(), orphaned)
    }

    /// Files `values` under exactly `keys`, unfiling them from every other
    /// key.
    ///
    /// An empty `keys` deletes the values. A value rejected by the
    /// container's filter leaves its current filing untouched, as with
    /// [`Container::add`].
    pub fn add_exclusive<I, T, KI>(&self, values: I, keys: KI)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
        KI: IntoIterator<Item = K>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        for value in values {
            let value = value.into();
            if keys.is_empty() {
                self.unfile(value.id(), None);
                continue;
            }
            let Some(value) = self.inner.base.config().ingest(value) else {
                continue;
            };
            let id = value.id().clone();
            let stale: Vec<K> = self
                .inner
                .memberships
                .borrow()
                .get(&id)
                .map(|filed| filed.iter().filter(|key| !keys.contains(key)).cloned().collect())
                .unwrap_or_default();
            if !stale.is_empty() {
                // refiled right below, so the container keeps the id
                self.drop_keys(&id, Some(stale.as_slice()));
            }
            self.store_filed(value, &keys);
        }
    }

    /// Alias of [`Container::add_exclusive`].
    pub fn replace_categories<I, T, KI>(&self, values: I, keys: KI)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
        KI: IntoIterator<Item = K>,
    {
        self.add_exclusive(values, keys);
    }

    /// Makes the container hold exactly `entries`, each filed under exactly
    /// its keys.
    ///
    /// The container publishes one batch.
    pub fn replace<I, T, KI>(&self, entries: I)
    where
        I: IntoIterator<Item = (T, KI)>,
        T: Into<Rc<V>>,
        KI: IntoIterator<Item = K>,
    {
        self.inner.base.batch(|| {
            let mut kept: HashSet<V::Id> = HashSet::new();
            for (value, keys) in entries {
                let value = value.into();
                kept.insert(value.id().clone());
                self.add_exclusive([value], keys);
            }
            for id in self.inner.base.ids() {
                if !kept.contains(&id) {
                    self.unfile(&id, None);
                }
            }
        });
    }

    /// Empties every keyed set, and with them the container.
    pub fn clear(&self) {
        self.clear_keys(self.keys());
    }

    /// Empties the keyed sets of `keys`.
    ///
    /// Values left without a key are removed from the container.
    pub fn clear_keys<KI>(&self, keys: KI)
    where
        KI: IntoIterator<Item = K>,
    {
        for key in keys {
            let Some(set) = self.get_keyed(&key) else {
                continue;
            };
            let key = [key];
            for id in set.ids() {
                self.unfile(&id, Some(key.as_slice()));
            }
        }
    }

    /// Severs the keyed set of `key` from the container.
    ///
    /// The detached set keeps its values and, from now on, its own mutations
    /// no longer reach the container. Values filed only under `key` are
    /// removed from the container. Returns `None` for an unknown key.
    pub fn detach(&self, key: &K) -> Option<KeyedSet<V, K>> {
        let set = self.inner.sets.borrow_mut().shift_remove(key)?;
        set.sever();
        self.inner.base.batch(|| {
            for id in set.ids() {
                let orphaned = {
                    let mut memberships = self.inner.memberships.borrow_mut();
                    match memberships.get_mut(&id) {
                        Some(filed) => {
                            filed.shift_remove(key);
                            let orphaned = filed.is_empty();
                            if orphaned {
                                memberships.remove(&id);
                            }
                            orphaned
                        }
                        None => false,
                    }
                };
                if orphaned {
                    self.inner.base.remove(&id);
                }
            }
        });
        tracing::debug!(container = ?self.inner.base.name(), key = ?key, "keyed set detached");
        Some(set)
    }

    /// Returns the keyed set of `key`, creating an empty one for a new key.
    pub fn keyed(&self, key: K) -> KeyedSet<V, K> {
        if let Some(set) = self.inner.sets.borrow().get(&key) {
            return set.clone();
        }
        let set = KeyedSet::attached(key.clone(), Rc::downgrade(&self.inner));
        self.inner.sets.borrow_mut().insert(key, set.clone());
        set
    }

    /// Returns the keyed set of `key` if it exists.
    pub fn get_keyed(&self, key: &K) -> Option<KeyedSet<V, K>> {
        self.inner.sets.borrow().get(key).cloned()
    }

    /// Returns the keys `id` is filed under, or `None` if the container does
    /// not hold `id`.
    pub fn keys_of(&self, id: &V::Id) -> Option<Vec<K>> {
        if !self.inner.base.contains(id) {
            return None;
        }
        Some(
            self.inner
                .memberships
                .borrow()
                .get(id)
                .map(|filed| filed.iter().cloned().collect())
                .unwrap_or_default(),
        )
    }

    /// Returns every key with a keyed set, in creation order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.sets.borrow().keys().cloned().collect()
    }

    /// Returns every value with its keys, in a form accepted by
    /// [`Container::replace`] and [`Container::from_entries`].
    pub fn export(&self) -> Vec<(Rc<V>, Vec<K>)> {
        let memberships = self.inner.memberships.borrow();
        self.inner
            .base
            .values()
            .into_iter()
            .map(|value| {
                let keys = memberships
                    .get(value.id())
                    .map(|filed| filed.iter().cloned().collect())
                    .unwrap_or_default();
                (value, keys)
            })
            .collect()
    }

    /// Union of the keyed sets of `keys`.
    pub fn union<KI>(&self, keys: KI) -> Union<V>
    where
        KI: IntoIterator<Item = K>,
    {
        Union::new(keys.into_iter().map(|key| self.keyed(key)))
    }

    /// Intersection of the keyed sets of `keys`.
    pub fn intersection<KI>(&self, keys: KI) -> Intersection<V>
    where
        KI: IntoIterator<Item = K>,
    {
        Intersection::new(keys.into_iter().map(|key| self.keyed(key)))
    }

    /// The keyed set of `key` minus the keyed sets of `subtracted`.
    pub fn difference<KI>(&self, key: K, subtracted: KI) -> Difference<V>
    where
        KI: IntoIterator<Item = K>,
    {
        Difference::new(
            &self.keyed(key),
            subtracted.into_iter().map(|key| self.keyed(key)),
        )
    }

    /// The whole container minus the keyed sets of `subtracted`.
    pub fn complement<KI>(&self, subtracted: KI) -> Difference<V>
    where
        KI: IntoIterator<Item = K>,
    {
        Difference::new(self, subtracted.into_iter().map(|key| self.keyed(key)))
    }

    /// See [`Base::pause`].
    pub fn pause(&self) {
        self.inner.base.pause();
    }

    /// See [`Base::resume`].
    pub fn resume(&self) -> Result<()> {
        self.inner.base.resume()
    }

    /// Runs `f` inside one pause episode of the container.
    pub fn batch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.inner.base.batch(f)
    }

    /// Completes every keyed set, then the container.
    pub fn complete(&self) {
        let sets: Vec<KeyedSet<V, K>> = self.inner.sets.borrow().values().cloned().collect();
        for set in sets {
            set.complete();
        }
        self.inner.base.complete();
    }
}

impl<V: Identified + 'static, K: SetKey> IdCollection<V> for Container<V, K> {
    #[inline]
    fn base(&self) -> &Base<V> {
        &self.inner.base
    }
}
