//! Per-key sets of a container.

use super::{Container, ContainerInner, SetKey};
use crate::collection::{Base, IdCollection};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cell::RefCell;
use core::fmt;
use hashbrown::HashSet;
use idsets_core::{Identified, Result};

struct KeyedInner<V: Identified + 'static, K: SetKey> {
    key: K,
    base: Base<V>,
    /// Dangling once detached
    container: RefCell<Weak<ContainerInner<V, K>>>,
}

/// The values a container files under one key.
///
/// While attached, `add`, `delete`, `replace` and `clear` go through the
/// owning container, so the container and its other keyed sets stay
/// consistent. Once detached, or once the container is dropped, they act on
/// this set alone.
pub struct KeyedSet<V: Identified + 'static, K: SetKey> {
    inner: Rc<KeyedInner<V, K>>,
}

impl<V: Identified + 'static, K: SetKey> Clone for KeyedSet<V, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Identified + 'static, K: SetKey> fmt::Debug for KeyedSet<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSet")
            .field("key", &self.inner.key)
            .field("base", &self.inner.base)
            .field("detached", &self.is_detached())
            .finish()
    }
}

impl<V: Identified + 'static, K: SetKey> KeyedSet<V, K> {
    pub(crate) fn attached(key: K, container: Weak<ContainerInner<V, K>>) -> Self {
        Self {
            inner: Rc::new(KeyedInner {
                key,
                base: Base::new(),
                container: RefCell::new(container),
            }),
        }
    }

    pub(crate) fn sever(&self) {
        *self.inner.container.borrow_mut() = Weak::new();
    }

    fn container(&self) -> Option<Container<V, K>> {
        self.inner
            .container
            .borrow()
            .upgrade()
            .map(Container::from_inner)
    }

    /// Returns the key this set belongs to.
    #[inline]
    pub fn key(&self) -> &K {
        &self.inner.key
    }

    /// Returns true once the set no longer belongs to a container.
    pub fn is_detached(&self) -> bool {
        self.container().is_none()
    }

    /// Files `values` under this key.
    pub fn add<I, T>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        match self.container() {
            Some(container) => container.add(values, [self.key().clone()]),
            None => {
                for value in values {
                    self.inner.base.upsert(value.into());
                }
            }
        }
    }

    /// Unfiles `ids` from this key.
    ///
    /// Returns true if at least one id was removed.
    pub fn delete<I, B>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = B>,
        B: Borrow<V::Id>,
    {
        match self.container() {
            Some(container) => container.delete_from(ids, [self.key().clone()]),
            None => {
                let mut deleted = false;
                for id in ids {
                    deleted |= self.inner.base.remove(id.borrow());
                }
                deleted
            }
        }
    }

    /// Makes `values` the full contents of this set.
    ///
    /// While attached, values dropped from this set stay in the container
    /// when they are filed under another key.
    pub fn replace<I, T>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        let values: Vec<Rc<V>> = values.into_iter().map(Into::into).collect();
        let kept: HashSet<V::Id> = values.iter().map(|value| value.id().clone()).collect();
        let stale: Vec<V::Id> = self
            .inner
            .base
            .ids()
            .into_iter()
            .filter(|id| !kept.contains(id))
            .collect();
        match self.container() {
            Some(container) => container.batch(|| {
                container.add(values, [self.key().clone()]);
                container.delete_from(stale, [self.key().clone()]);
            }),
            None => self.inner.base.batch(|| {
                for value in values {
                    self.inner.base.upsert(value);
                }
                for id in &stale {
                    self.inner.base.remove(id);
                }
            }),
        }
    }

    /// Unfiles every value from this key.
    pub fn clear(&self) {
        match self.container() {
            Some(container) => container.clear_keys([self.key().clone()]),
            None => self.inner.base.clear(),
        }
    }

    /// See [`Base::pause`].
    pub fn pause(&self) {
        self.inner.base.pause();
    }

    /// See [`Base::resume`].
    pub fn resume(&self) -> Result<()> {
        self.inner.base.resume()
    }

    /// Runs `f` inside one pause episode of this set.
    pub fn batch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.inner.base.batch(f)
    }

    /// Closes this set's channels.
    pub fn complete(&self) {
        self.inner.base.complete();
    }

    /// Stores a value the container already ingested.
    pub(crate) fn raw_upsert(&self, value: Rc<V>) -> bool {
        self.inner.base.store(value)
    }

    /// Removes a value on behalf of the container.
    pub(crate) fn raw_remove(&self, id: &V::Id) -> bool {
        self.inner.base.remove(id)
    }
}

impl<V: Identified + 'static, K: SetKey> IdCollection<V> for KeyedSet<V, K> {
    #[inline]
    fn base(&self) -> &Base<V> {
        &self.inner.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Delta;
    use crate::test_util::{item, Item, Recorder};
    use alloc::vec;

    type Tags = Container<Item, &'static str>;

    #[test]
    fn test_keyed_set_add_routes_through_container() {
        let container = Tags::new();
        let a = container.keyed("A");

        a.add([item(1), item(2)]);

        assert_eq!(a.ids(), vec![1, 2]);
        assert_eq!(container.ids(), vec![1, 2]);
        assert_eq!(container.keys_of(&1), Some(vec!["A"]));
        assert_eq!(a.key(), &"A");
        assert!(!a.is_detached());
    }

    #[test]
    fn test_keyed_set_delete_keeps_other_keys() {
        let container = Tags::new();
        container.add([item(1)], ["A", "B"]);
        container.add([item(2)], ["A"]);
        let a = container.keyed("A");

        assert!(a.delete([1u32, 2]));

        assert!(a.is_empty());
        assert_eq!(container.ids(), vec![1]);
        assert_eq!(container.keyed("B").ids(), vec![1]);
    }

    #[test]
    fn test_keyed_set_replace() {
        let container = Tags::new();
        container.add([item(1)], ["A", "B"]);
        container.add([item(2)], ["A"]);
        let a = container.keyed("A");
        let recorder = Recorder::attach(&container);

        a.replace([item(3)]);

        assert_eq!(a.ids(), vec![3]);
        assert_eq!(container.ids(), vec![1, 3]);
        assert_eq!(
            recorder.deltas(),
            vec![Delta::from_parts(vec![3], vec![], vec![2])]
        );
    }

    #[test]
    fn test_keyed_set_clear() {
        let container = Tags::new();
        container.add([item(1)], ["A", "B"]);
        container.add([item(2)], ["A"]);

        container.keyed("A").clear();

        assert_eq!(container.ids(), vec![1]);
        assert!(container.keyed("A").is_empty());
    }

    #[test]
    fn test_keyed_set_detached_replace_is_local() {
        let container = Tags::new();
        container.add([item(1), item(2)], ["A"]);
        let a = container.detach(&"A").unwrap();
        let recorder = Recorder::attach(&a);

        a.replace([item(2), item(3)]);

        assert_eq!(a.ids(), vec![2, 3]);
        assert!(container.is_empty());
        assert_eq!(
            recorder.deltas(),
            vec![Delta::from_parts(vec![3], vec![2], vec![1])]
        );
        a.clear();
        assert!(a.is_empty());
    }

    #[test]
    fn test_keyed_set_outlives_container() {
        let container = Tags::new();
        container.add([item(1)], ["A"]);
        let a = container.keyed("A");
        drop(container);

        assert!(a.is_detached());
        a.add([item(2)]);
        assert_eq!(a.ids(), vec![1, 2]);
    }

    #[test]
    fn test_keyed_set_own_batch() {
        let container = Tags::new();
        let a = container.keyed("A");
        let recorder = Recorder::attach(&a);

        a.batch(|| {
            a.add([item(1)]);
            a.add([item(2)]);
        });

        assert_eq!(recorder.deltas(), vec![Delta::from_parts(vec![1, 2], vec![], vec![])]);
        assert!(a.resume().is_err());
        a.complete();
        assert!(recorder.is_completed());
    }
}
