//! Incremental difference view.

use crate::collection::{Base, IdCollection};
use crate::dataflow::{subscribe, BindingSet, Source};
use crate::delta::Delta;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use idsets_core::{CollectionConfig, Identified};

struct DifferenceInner<V: Identified + 'static> {
    base: Base<V>,
    /// Holds exactly one binding
    source: BindingSet<V>,
    subtracted: BindingSet<V>,
}

/// A view holding the values of one source whose id is held by none of the
/// subtracted collections.
///
/// A value that stops being subtracted is re-admitted with the reference the
/// source holds.
pub struct Difference<V: Identified + 'static> {
    inner: Rc<DifferenceInner<V>>,
}

impl<V: Identified + 'static> Clone for Difference<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Identified + 'static> fmt::Debug for Difference<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Difference")
            .field("base", &self.inner.base)
            .field("subtracted", &self.inner.subtracted.len())
            .finish()
    }
}

impl<V: Identified + 'static> Difference<V> {
    /// Creates `source` minus every collection in `subtracted`.
    pub fn new<C, I, S>(source: &C, subtracted: I) -> Self
    where
        C: IdCollection<V> + ?Sized,
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        Self::with_config(CollectionConfig::new(), source, subtracted)
    }

    /// Creates the difference with an ingest configuration.
    pub fn with_config<C, I, S>(config: CollectionConfig<V>, source: &C, subtracted: I) -> Self
    where
        C: IdCollection<V> + ?Sized,
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let difference = Self {
            inner: Rc::new(DifferenceInner {
                base: Base::with_config(config),
                source: BindingSet::new(),
                subtracted: BindingSet::new(),
            }),
        };
        let inner = &difference.inner;
        for other in subtracted {
            inner.bind_subtracted(Source::of(&other));
        }
        inner.bind_source(Source::of(source));
        inner.base.batch(|| inner.admit_all(false));
        inner.check_completed();
        difference
    }

    /// Returns the collection values are taken from.
    pub fn source(&self) -> Option<Base<V>> {
        self.inner.source.first()
    }

    /// Returns the subtracted collections in tracking order.
    pub fn subtracted(&self) -> Vec<Base<V>> {
        self.inner.subtracted.sources()
    }

    /// Starts subtracting `sets`.
    pub fn add_subtracted<I, S>(&self, sets: I)
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let inner = &self.inner;
        let mut added = 0;
        for set in sets {
            if inner.bind_subtracted(Source::of(&set)) {
                added += 1;
            }
        }
        if added > 0 {
            tracing::debug!(difference = ?inner.base.name(), added, "subtracted sets added");
        }
        inner.base.batch(|| inner.admit_all(false));
        inner.check_completed();
    }

    /// Stops subtracting `sets`; their values are re-admitted where the
    /// source still holds them.
    pub fn remove_subtracted<I, S>(&self, sets: I)
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let inner = &self.inner;
        let mut removed = 0;
        for set in sets {
            if inner.subtracted.unbind(set.base()).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(difference = ?inner.base.name(), removed, "subtracted sets removed");
        }
        inner.base.batch(|| inner.admit_all(false));
        inner.check_completed();
    }

    /// Takes values from `source` from now on.
    ///
    /// The difference is recomputed inside one batch: values the new source
    /// lacks are removed and every admissible value takes the new source's
    /// reference.
    pub fn replace_source<C>(&self, source: &C)
    where
        C: IdCollection<V> + ?Sized,
    {
        let inner = &self.inner;
        inner.source.unbind_all();
        inner.bind_source(Source::of(source));
        tracing::debug!(difference = ?inner.base.name(), source = ?source.base().name(), "source replaced");
        inner.base.batch(|| inner.admit_all(true));
        inner.check_completed();
    }
}

impl<V: Identified + 'static> DifferenceInner<V> {
    fn bind_source(self: &Rc<Self>, source: Source<V>) -> bool {
        self.source.bind(source, |upstream| {
            subscribe(upstream, self, Self::apply_source, Self::check_completed)
        })
    }

    fn bind_subtracted(self: &Rc<Self>, set: Source<V>) -> bool {
        self.subtracted.bind(set, |upstream| {
            subscribe(upstream, self, Self::apply_subtracted, Self::check_completed)
        })
    }

    fn apply_source(&self, delta: &Delta<Rc<V>>) {
        self.base.batch(|| {
            for value in delta.added() {
                let id = value.id();
                if self.base.contains(id) || !self.subtracted.any_holds(id) {
                    self.base.upsert(value.clone());
                }
            }
            for value in &delta.delete {
                self.base.remove(value.id());
            }
        });
    }

    fn apply_subtracted(&self, delta: &Delta<Rc<V>>) {
        self.base.batch(|| {
            for value in delta.added() {
                self.base.remove(value.id());
            }
            for value in &delta.delete {
                self.readmit(value.id());
            }
        });
    }

    fn readmit(&self, id: &V::Id) {
        if self.base.contains(id) || self.subtracted.any_holds(id) {
            return;
        }
        if let Some(value) = self.source.first().and_then(|source| source.get(id)) {
            self.base.upsert(value);
        }
    }

    /// Re-evaluates every member and every source value.
    ///
    /// With `refresh`, members also take the source's current reference.
    fn admit_all(&self, refresh: bool) {
        let source = self.source.first();
        for id in self.base.ids() {
            let in_source = source.as_ref().map_or(false, |source| source.contains(&id));
            if !in_source || self.subtracted.any_holds(&id) {
                self.base.remove(&id);
            }
        }
        let Some(source) = source else {
            return;
        };
        for value in source.values() {
            let id = value.id();
            if self.subtracted.any_holds(id) {
                continue;
            }
            if refresh || !self.base.contains(id) {
                self.base.upsert(value);
            }
        }
    }

    fn source_completed(&self) -> bool {
        !self.source.is_empty() && self.source.all_completed()
    }

    fn check_completed(&self) {
        if self.source.is_binding() || self.subtracted.is_binding() || self.base.is_completed() {
            return;
        }
        // an empty subtracted group counts as completed
        if self.source_completed() && self.subtracted.all_completed() {
            tracing::debug!(difference = ?self.base.name(), "difference inputs completed");
            self.base.complete();
        }
    }
}

impl<V: Identified + 'static> IdCollection<V> for Difference<V> {
    #[inline]
    fn base(&self) -> &Base<V> {
        &self.inner.base
    }

    fn driver(&self) -> Option<Rc<dyn Any>> {
        Some(self.inner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_set::IdSet;
    use crate::test_util::{item, Item, Recorder};
    use alloc::vec;

    fn scenario() -> (IdSet<Item>, IdSet<Item>, IdSet<Item>) {
        (
            IdSet::<Item>::from_values([item(1), item(2), item(3)]),
            IdSet::<Item>::from_values([item(2), item(5)]),
            IdSet::<Item>::from_values([item(3)]),
        )
    }

    #[test]
    fn test_difference_seed() {
        let (source, s1, s2) = scenario();
        let difference = Difference::new(&source, [&s1, &s2]);

        assert_eq!(difference.ids(), vec![1]);
        assert!(difference.source().unwrap().ptr_eq(source.base()));
        assert_eq!(difference.subtracted().len(), 2);
    }

    #[test]
    fn test_difference_source_changes() {
        let (source, s1, s2) = scenario();
        let difference = Difference::new(&source, [&s1, &s2]);
        let recorder = Recorder::attach(&difference);

        source.add([item(4)]);
        source.add([item(2)]);
        source.delete([1u32]);

        assert_eq!(difference.ids(), vec![4]);
        assert_eq!(recorder.created(), vec![4]);
        assert_eq!(recorder.deleted(), vec![1]);
        assert!(recorder.updated().is_empty());
    }

    #[test]
    fn test_difference_update_of_member() {
        let (source, s1, _) = scenario();
        let difference = Difference::new(&source, [&s1]);
        let recorder = Recorder::attach(&difference);

        let revised = item(1);
        source.add([revised.clone()]);

        assert_eq!(recorder.updated(), vec![1]);
        assert!(Rc::ptr_eq(&difference.get(&1).unwrap(), &revised));
    }

    #[test]
    fn test_difference_subtracted_changes() {
        let (source, s1, s2) = scenario();
        let difference = Difference::new(&source, [&s1, &s2]);
        let recorder = Recorder::attach(&difference);

        s2.add([item(1)]);
        assert!(difference.is_empty());
        assert_eq!(recorder.deleted(), vec![1]);

        s1.delete([2u32]);
        assert_eq!(difference.ids(), vec![2]);
        assert!(Rc::ptr_eq(&difference.get(&2).unwrap(), &source.get(&2).unwrap()));

        // 5 was never in the source
        s1.delete([5u32]);
        assert_eq!(difference.ids(), vec![2]);
    }

    #[test]
    fn test_difference_readmission_needs_every_subtracted() {
        let source = IdSet::<Item>::from_values([item(1)]);
        let s1 = IdSet::<Item>::from_values([item(1)]);
        let s2 = IdSet::<Item>::from_values([item(1)]);
        let difference = Difference::new(&source, [&s1, &s2]);

        s1.delete([1u32]);
        assert!(difference.is_empty());
        s2.delete([1u32]);
        assert_eq!(difference.ids(), vec![1]);
    }

    #[test]
    fn test_difference_change_subtracted() {
        let (source, s1, s2) = scenario();
        let difference = Difference::new(&source, [&s1]);
        assert_eq!(difference.ids(), vec![1, 3]);

        let recorder = Recorder::attach(&difference);
        difference.add_subtracted([&s2]);
        assert_eq!(difference.ids(), vec![1]);
        assert_eq!(recorder.deltas(), vec![Delta::deleted(3)]);

        difference.remove_subtracted([&s1, &s2]);
        assert_eq!(difference.ids(), vec![1, 2, 3]);
        assert_eq!(recorder.created(), vec![2, 3]);
        assert!(difference.subtracted().is_empty());
    }

    #[test]
    fn test_difference_replace_source() {
        let (source, s1, _) = scenario();
        let difference = Difference::new(&source, [&s1]);
        let recorder = Recorder::attach(&difference);

        let other = IdSet::<Item>::from_values([item(3), item(4), item(5)]);
        difference.replace_source(&other);

        assert_eq!(difference.ids(), vec![3, 4]);
        assert_eq!(
            recorder.deltas(),
            vec![Delta::from_parts(vec![4], vec![3], vec![1])]
        );

        // the old source is no longer followed
        source.add([item(8)]);
        assert!(!difference.contains(&8));
        other.add([item(9)]);
        assert!(difference.contains(&9));
    }

    #[test]
    fn test_difference_completion() {
        let (source, s1, s2) = scenario();
        let difference = Difference::new(&source, [&s1, &s2]);

        s1.complete();
        source.complete();
        assert!(!difference.is_completed());
        s2.complete();
        assert!(difference.is_completed());
    }

    #[test]
    fn test_difference_completion_without_subtracted() {
        let source = IdSet::<Item>::from_values([item(1)]);
        let difference = Difference::new(&source, Vec::<IdSet<Item>>::new());
        assert_eq!(difference.ids(), vec![1]);

        source.complete();
        assert!(difference.is_completed());
    }

    #[test]
    fn test_difference_completion_after_removing_subtracted() {
        let (source, s1, s2) = scenario();
        let difference = Difference::new(&source, [&s1, &s2]);

        source.complete();
        s1.complete();
        difference.remove_subtracted([&s2]);
        assert!(difference.is_completed());
    }
}
