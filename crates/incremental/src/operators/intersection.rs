//! Incremental intersection view.

use crate::collection::{Base, IdCollection};
use crate::dataflow::{subscribe, BindingSet, Source};
use crate::delta::Delta;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use idsets_core::{CollectionConfig, Identified};

struct IntersectionInner<V: Identified + 'static> {
    base: Base<V>,
    bindings: BindingSet<V>,
}

/// A view holding the values whose id is held by every tracked source.
///
/// With no tracked source the intersection is empty.
pub struct Intersection<V: Identified + 'static> {
    inner: Rc<IntersectionInner<V>>,
}

impl<V: Identified + 'static> Clone for Intersection<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Identified + 'static> fmt::Debug for Intersection<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intersection")
            .field("base", &self.inner.base)
            .field("sources", &self.inner.bindings.len())
            .finish()
    }
}

impl<V: Identified + 'static> Intersection<V> {
    /// Creates the intersection of `sources`.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        Self::with_config(CollectionConfig::new(), sources)
    }

    /// Creates the intersection of `sources` with an ingest configuration.
    pub fn with_config<I, S>(config: CollectionConfig<V>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let intersection = Self::empty(config);
        intersection.track(sources.into_iter().map(|source| Source::of(&source)).collect());
        intersection
    }

    pub(crate) fn from_sources(sources: Vec<Source<V>>) -> Self {
        let intersection = Self::empty(CollectionConfig::new());
        intersection.track(sources);
        intersection
    }

    fn empty(config: CollectionConfig<V>) -> Self {
        Self {
            inner: Rc::new(IntersectionInner {
                base: Base::with_config(config),
                bindings: BindingSet::new(),
            }),
        }
    }

    /// Starts tracking `sources` and recomputes the intersection.
    pub fn add_sources<I, S>(&self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        self.track(sources.into_iter().map(|source| Source::of(&source)).collect());
    }

    fn track(&self, sources: Vec<Source<V>>) {
        let inner = &self.inner;
        let mut added = 0;
        for source in sources {
            let bound = inner.bindings.bind(source, |upstream| {
                subscribe(
                    upstream,
                    inner,
                    IntersectionInner::apply,
                    IntersectionInner::check_completed,
                )
            });
            if bound {
                added += 1;
            }
        }
        if added > 0 {
            tracing::debug!(intersection = ?inner.base.name(), added, "intersection sources added");
        }
        inner.rebuild();
        inner.check_completed();
    }

    /// Stops tracking `sources` and recomputes the intersection.
    pub fn remove_sources<I, S>(&self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let inner = &self.inner;
        let mut removed = 0;
        for source in sources {
            if inner.bindings.unbind(source.base()).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(intersection = ?inner.base.name(), removed, "intersection sources removed");
        }
        inner.rebuild();
        inner.check_completed();
    }

    /// Returns the tracked sources in tracking order.
    pub fn sources(&self) -> Vec<Base<V>> {
        self.inner.bindings.sources()
    }
}

impl<V: Identified + 'static> IntersectionInner<V> {
    fn apply(&self, delta: &Delta<Rc<V>>) {
        self.base.batch(|| {
            for value in delta.added() {
                if self.bindings.all_hold(value.id()) {
                    self.base.upsert(value.clone());
                } else {
                    self.base.remove(value.id());
                }
            }
            for value in &delta.delete {
                self.base.remove(value.id());
            }
        });
    }

    /// Drops members no longer held by every source, then admits the values
    /// of the first source that every source holds.
    fn rebuild(&self) {
        self.base.batch(|| {
            for id in self.base.ids() {
                if !self.bindings.all_hold(&id) {
                    self.base.remove(&id);
                }
            }
            if let Some(first) = self.bindings.first() {
                for value in first.values() {
                    let id = value.id();
                    if !self.base.contains(id) && self.bindings.all_hold(id) {
                        self.base.upsert(value);
                    }
                }
            }
        });
    }

    fn check_completed(&self) {
        if self.bindings.is_binding() || self.base.is_completed() || self.bindings.is_empty() {
            return;
        }
        if self.bindings.all_completed() {
            tracing::debug!(intersection = ?self.base.name(), "all intersection sources completed");
            self.base.complete();
        }
    }
}

impl<V: Identified + 'static> IdCollection<V> for Intersection<V> {
    #[inline]
    fn base(&self) -> &Base<V> {
        &self.inner.base
    }

    fn driver(&self) -> Option<Rc<dyn Any>> {
        Some(self.inner.clone())
    }
}
