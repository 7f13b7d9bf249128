//! Incremental union view.

use crate::collection::{Base, IdCollection};
use crate::dataflow::{subscribe, BindingSet, Source};
use crate::delta::Delta;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use idsets_core::{CollectionConfig, Identified};

struct UnionInner<V: Identified + 'static> {
    base: Base<V>,
    bindings: BindingSet<V>,
}

/// A view holding every value held by at least one tracked source.
///
/// When several sources hold the same id, the most recently published value
/// wins. A value leaves the union only once no tracked source holds its id.
///
/// # Example
///
/// ```rust
/// use idsets_incremental::{IdCollection, IdSet, Identified, Union};
///
/// #[derive(Debug)]
/// struct Tag(u32);
///
/// impl Identified for Tag {
///     type Id = u32;
///     fn id(&self) -> &u32 {
///         &self.0
///     }
/// }
///
/// let a = IdSet::from_values([Tag(1), Tag(2)]);
/// let b = IdSet::from_values([Tag(2), Tag(3)]);
/// let union = Union::new([&a, &b]);
/// assert_eq!(union.len(), 3);
///
/// a.delete([2u32]);
/// assert!(union.contains(&2));
/// b.delete([2u32]);
/// assert!(!union.contains(&2));
/// ```
pub struct Union<V: Identified + 'static> {
    inner: Rc<UnionInner<V>>,
}

impl<V: Identified + 'static> Clone for Union<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Identified + 'static> fmt::Debug for Union<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Union")
            .field("base", &self.inner.base)
            .field("sources", &self.inner.bindings.len())
            .finish()
    }
}

impl<V: Identified + 'static> Union<V> {
    /// Creates the union of `sources`.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        Self::with_config(CollectionConfig::new(), sources)
    }

    /// Creates the union of `sources` with an ingest configuration.
    pub fn with_config<I, S>(config: CollectionConfig<V>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let union = Self::empty(config);
        union.track(sources.into_iter().map(|source| Source::of(&source)).collect());
        union
    }

    pub(crate) fn from_sources(sources: Vec<Source<V>>) -> Self {
        let union = Self::empty(CollectionConfig::new());
        union.track(sources);
        union
    }

    fn empty(config: CollectionConfig<V>) -> Self {
        Self {
            inner: Rc::new(UnionInner {
                base: Base::with_config(config),
                bindings: BindingSet::new(),
            }),
        }
    }

    /// Starts tracking `sources`, adding their values.
    ///
    /// Sources that are already tracked are skipped.
    pub fn add_sources<I, S>(&self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        self.track(sources.into_iter().map(|source| Source::of(&source)).collect());
    }

    fn track(&self, sources: Vec<Source<V>>) {
        let inner = &self.inner;
        let added = inner.base.batch(|| {
            let mut added = 0;
            for source in sources {
                let base = source.base.clone();
                let bound = inner.bindings.bind(source, |upstream| {
                    subscribe(upstream, inner, UnionInner::apply, UnionInner::check_completed)
                });
                if bound {
                    for value in base.values() {
                        inner.base.upsert(value);
                    }
                    added += 1;
                }
            }
            added
        });
        if added > 0 {
            tracing::debug!(union = ?inner.base.name(), added, "union sources added");
        }
        inner.check_completed();
    }

    /// Stops tracking `sources`.
    ///
    /// Values held only by the removed sources leave the union.
    pub fn remove_sources<I, S>(&self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
    {
        let inner = &self.inner;
        let removed = inner.base.batch(|| {
            let mut removed = 0;
            for source in sources {
                if let Some(source) = inner.bindings.unbind(source.base()) {
                    for id in source.base.ids() {
                        inner.remove_orphan(&id);
                    }
                    removed += 1;
                }
            }
            removed
        });
        if removed > 0 {
            tracing::debug!(union = ?inner.base.name(), removed, "union sources removed");
        }
        inner.check_completed();
    }

    /// Returns the tracked sources in tracking order.
    pub fn sources(&self) -> Vec<Base<V>> {
        self.inner.bindings.sources()
    }
}

impl<V: Identified + 'static> UnionInner<V> {
    fn apply(&self, delta: &Delta<Rc<V>>) {
        self.base.batch(|| {
            for value in delta.added() {
                self.base.upsert(value.clone());
            }
            for value in &delta.delete {
                self.remove_orphan(value.id());
            }
        });
    }

    fn remove_orphan(&self, id: &V::Id) {
        if !self.bindings.any_holds(id) {
            self.base.remove(id);
        }
    }

    fn check_completed(&self) {
        if self.bindings.is_binding() || self.base.is_completed() || self.bindings.is_empty() {
            return;
        }
        if self.bindings.all_completed() {
            tracing::debug!(union = ?self.base.name(), "all union sources completed");
            self.base.complete();
        }
    }
}

impl<V: Identified + 'static> IdCollection<V> for Union<V> {
    #[inline]
    fn base(&self) -> &Base<V> {
        &self.inner.base
    }

    fn driver(&self) -> Option<Rc<dyn Any>> {
        Some(self.inner.clone())
    }
}
