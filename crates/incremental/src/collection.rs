//! Mutable indexed collection.
//!
//! `Base` owns the id -> value mapping of a collection and its four change
//! channels. Every other collection in this crate is built on it: plain sets
//! write to it on behalf of clients, derived views write to it while
//! replaying upstream changes.
//!
//! Writes either publish immediately or, while the collection is paused,
//! collapse into pending maps that are flushed as one batch on the final
//! `resume()`.

use crate::dataflow::Source;
use crate::delta::Delta;
use crate::operators::{Difference, Intersection, Union};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::hash_map::DefaultHashBuilder;
use idsets_core::{CollectionConfig, Error, Identified, Result};
use idsets_reactive::{Channel, Subscription};
use indexmap::IndexMap;

/// Insertion-ordered id -> value map.
pub(crate) type IdMap<V> = IndexMap<<V as Identified>::Id, Rc<V>, DefaultHashBuilder>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Create,
    Update,
    Delete,
}

/// Net changes of the current pause episode.
struct Pending<V: Identified> {
    create: IdMap<V>,
    update: IdMap<V>,
    delete: IdMap<V>,
}

impl<V: Identified> Default for Pending<V> {
    fn default() -> Self {
        Self {
            create: IdMap::<V>::default(),
            update: IdMap::<V>::default(),
            delete: IdMap::<V>::default(),
        }
    }
}

impl<V: Identified> Pending<V> {
    fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    // Existing entries are always reconciled; `observed` only decides whether
    // a new entry is recorded.

    fn record_create(&mut self, id: V::Id, value: Rc<V>, observed: bool) {
        // deleted earlier in this episode, so the net effect is an update
        if self.delete.shift_remove(&id).is_some() {
            self.update.insert(id, value);
        } else if observed {
            self.create.insert(id, value);
        }
    }

    fn record_update(&mut self, id: V::Id, value: Rc<V>, observed: bool) {
        // created earlier in this episode, so it is still a create
        if let Some(created) = self.create.get_mut(&id) {
            *created = value;
        } else if observed || self.update.contains_key(&id) {
            self.update.insert(id, value);
        }
    }

    fn record_delete(&mut self, id: V::Id, value: Rc<V>, observed: bool) {
        // created and deleted within one episode: nothing to publish
        if self.create.shift_remove(&id).is_some() {
            return;
        }
        self.update.shift_remove(&id);
        if observed {
            self.delete.insert(id, value);
        }
    }
}

struct State<V: Identified> {
    entries: IdMap<V>,
    pause_depth: usize,
    pending: Pending<V>,
}

struct Channels<V: 'static> {
    create: Channel<Rc<V>>,
    update: Channel<Rc<V>>,
    delete: Channel<Rc<V>>,
    delta: Channel<Delta<Rc<V>>>,
}

struct BaseInner<V: Identified + 'static> {
    state: RefCell<State<V>>,
    channels: Channels<V>,
    config: CollectionConfig<V>,
    completed: Cell<bool>,
}

/// A mutable, insertion-ordered collection of identified values that
/// publishes every change.
///
/// `Base` is a cheap-clone handle; clones share the same collection. The
/// write primitives are crate-internal: clients mutate through `IdSet` or
/// `Container`, derived views mutate through their recomputation rules.
///
/// # Change channels
///
/// - `on_create()`: values stored under a new id
/// - `on_update()`: values replacing an existing value
/// - `on_delete()`: values removed
/// - `on_delta()`: one `Delta` per write, or one per pause episode
///
/// Values are compared by reference: passing the `Rc` that is already stored
/// is a no-op, while a different `Rc` with equal contents is an update.
pub struct Base<V: Identified + 'static> {
    inner: Rc<BaseInner<V>>,
}

impl<V: Identified + 'static> Clone for Base<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Identified + 'static> Default for Base<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Identified + 'static> fmt::Debug for Base<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Base")
            .field("name", &self.name())
            .field("ids", &state.entries.keys().collect::<Vec<_>>())
            .field("pause_depth", &state.pause_depth)
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<V: Identified + 'static> Base<V> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::new())
    }

    /// Creates an empty collection with the given ingest configuration.
    pub fn with_config(config: CollectionConfig<V>) -> Self {
        Self {
            inner: Rc::new(BaseInner {
                state: RefCell::new(State {
                    entries: IdMap::<V>::default(),
                    pause_depth: 0,
                    pending: Pending::default(),
                }),
                channels: Channels {
                    create: Channel::new(),
                    update: Channel::new(),
                    delete: Channel::new(),
                    delta: Channel::new(),
                },
                config,
                completed: Cell::new(false),
            }),
        }
    }

    /// Creates a collection pre-seeded with `values`.
    pub fn from_values<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        let base = Self::new();
        base.seed(values);
        base
    }

    /// Stores values without publishing anything.
    pub(crate) fn seed<I, T>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Rc<V>>,
    {
        let ingested: Vec<Rc<V>> = values
            .into_iter()
            .filter_map(|value| self.inner.config.ingest(value.into()))
            .collect();
        let mut state = self.inner.state.borrow_mut();
        for value in ingested {
            state.entries.insert(value.id().clone(), value);
        }
    }

    /// Returns the ingest configuration.
    #[inline]
    pub fn config(&self) -> &CollectionConfig<V> {
        &self.inner.config
    }

    /// Returns the configured name.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.inner.config.label()
    }

    /// Returns true if both handles refer to the same collection.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.state.borrow().entries.len()
    }

    /// Returns true if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().entries.is_empty()
    }

    /// Returns the value stored under `id`.
    pub fn get(&self, id: &V::Id) -> Option<Rc<V>> {
        self.inner.state.borrow().entries.get(id).cloned()
    }

    /// Returns true if a value is stored under `id`.
    #[inline]
    pub fn contains(&self, id: &V::Id) -> bool {
        self.inner.state.borrow().entries.contains_key(id)
    }

    /// Returns the stored ids in insertion order.
    pub fn ids(&self) -> Vec<V::Id> {
        self.inner.state.borrow().entries.keys().cloned().collect()
    }

    /// Returns the stored values in insertion order.
    pub fn values(&self) -> Vec<Rc<V>> {
        self.inner.state.borrow().entries.values().cloned().collect()
    }

    /// Returns the stored (id, value) pairs in insertion order.
    pub fn entries(&self) -> Vec<(V::Id, Rc<V>)> {
        self.inner
            .state
            .borrow()
            .entries
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    /// Calls `f` for every stored value, over a snapshot.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Rc<V>),
    {
        for value in self.values() {
            f(&value);
        }
    }

    /// Iterates a snapshot of the stored values.
    pub fn iter(&self) -> alloc::vec::IntoIter<Rc<V>> {
        self.values().into_iter()
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    /// Channel publishing values stored under a new id.
    #[inline]
    pub fn on_create(&self) -> &Channel<Rc<V>> {
        &self.inner.channels.create
    }

    /// Channel publishing values that replaced an existing value.
    #[inline]
    pub fn on_update(&self) -> &Channel<Rc<V>> {
        &self.inner.channels.update
    }

    /// Channel publishing removed values.
    #[inline]
    pub fn on_delete(&self) -> &Channel<Rc<V>> {
        &self.inner.channels.delete
    }

    /// Channel publishing one `Delta` per write or pause episode.
    #[inline]
    pub fn on_delta(&self) -> &Channel<Delta<Rc<V>>> {
        &self.inner.channels.delta
    }

    /// Delivers the current values as one synthetic create batch, then
    /// subscribes `next` to future deltas.
    pub fn all_delta<F>(&self, next: F) -> Subscription
    where
        F: Fn(&Delta<Rc<V>>) + 'static,
    {
        next(&Delta::from_parts(self.values(), Vec::new(), Vec::new()));
        self.inner.channels.delta.subscribe(next)
    }

    /// Subscribes `next` to every created or updated value.
    ///
    /// Values arrive per delta, created ones first.
    pub fn on_add<F>(&self, next: F) -> Subscription
    where
        F: Fn(&Rc<V>) + 'static,
    {
        self.inner.channels.delta.subscribe(move |delta: &Delta<Rc<V>>| {
            for value in delta.added() {
                next(value);
            }
        })
    }

    /// Delivers every current value, then subscribes `next` like
    /// [`Base::on_add`].
    pub fn all_add<F>(&self, next: F) -> Subscription
    where
        F: Fn(&Rc<V>) + 'static,
    {
        for value in self.values() {
            next(&value);
        }
        self.on_add(next)
    }

    /// Returns true if any channel has an observer.
    pub fn is_observed(&self) -> bool {
        let channels = &self.inner.channels;
        channels.create.is_observed()
            || channels.update.is_observed()
            || channels.delete.is_observed()
            || channels.delta.is_observed()
    }

    fn is_observed_for(&self, change: Change) -> bool {
        let channels = &self.inner.channels;
        let single = match change {
            Change::Create => &channels.create,
            Change::Update => &channels.update,
            Change::Delete => &channels.delete,
        };
        single.is_observed() || channels.delta.is_observed()
    }

    /// Returns true once `complete()` was called.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.get()
    }

    // ------------------------------------------------------------------
    // Write primitives
    // ------------------------------------------------------------------

    /// Stores `value`, publishing a create or an update.
    ///
    /// Returns false if the value was rejected by the filter or is the
    /// reference already stored.
    pub(crate) fn upsert(&self, value: Rc<V>) -> bool {
        match self.inner.config.ingest(value) {
            Some(value) => self.store(value),
            None => false,
        }
    }

    /// Stores an already ingested value.
    pub(crate) fn store(&self, value: Rc<V>) -> bool {
        let id = value.id().clone();
        let publish = {
            let mut state = self.inner.state.borrow_mut();
            let change = match state.entries.get(&id) {
                Some(current) if Rc::ptr_eq(current, &value) => return false,
                Some(_) => Change::Update,
                None => Change::Create,
            };
            state.entries.insert(id.clone(), value.clone());
            if state.pause_depth == 0 {
                Some(change)
            } else {
                let observed = self.is_observed_for(change);
                match change {
                    Change::Create => state.pending.record_create(id, value.clone(), observed),
                    _ => state.pending.record_update(id, value.clone(), observed),
                }
                None
            }
        };
        if let Some(change) = publish {
            self.publish(change, value);
        }
        true
    }

    /// Removes the value stored under `id`, publishing a delete.
    ///
    /// Returns false if nothing was stored under `id`.
    pub(crate) fn remove(&self, id: &V::Id) -> bool {
        let publish = {
            let mut state = self.inner.state.borrow_mut();
            let Some(removed) = state.entries.shift_remove(id) else {
                return false;
            };
            if state.pause_depth == 0 {
                Some(removed)
            } else {
                let observed = self.is_observed_for(Change::Delete);
                state.pending.record_delete(id.clone(), removed, observed);
                None
            }
        };
        if let Some(removed) = publish {
            self.publish(Change::Delete, removed);
        }
        true
    }

    /// Removes every value through `remove`.
    pub(crate) fn clear(&self) {
        for id in self.ids() {
            self.remove(&id);
        }
    }

    fn publish(&self, change: Change, value: Rc<V>) {
        let channels = &self.inner.channels;
        let single = match change {
            Change::Create => &channels.create,
            Change::Update => &channels.update,
            Change::Delete => &channels.delete,
        };
        single.emit(&value);
        if channels.delta.is_observed() {
            let delta = match change {
                Change::Create => Delta::created(value),
                Change::Update => Delta::updated(value),
                Change::Delete => Delta::deleted(value),
            };
            channels.delta.emit(&delta);
        }
    }

    fn flush(&self, pending: Pending<V>) {
        if pending.is_empty() {
            return;
        }
        tracing::trace!(
            collection = ?self.name(),
            created = pending.create.len(),
            updated = pending.update.len(),
            deleted = pending.delete.len(),
            "flushing paused changes"
        );
        let channels = &self.inner.channels;
        for value in pending.delete.values() {
            channels.delete.emit(value);
        }
        for value in pending.update.values() {
            channels.update.emit(value);
        }
        for value in pending.create.values() {
            channels.create.emit(value);
        }
        channels.delta.emit(&Delta::from_parts(
            pending.create.into_values().collect(),
            pending.update.into_values().collect(),
            pending.delete.into_values().collect(),
        ));
    }

    // ------------------------------------------------------------------
    // Batching and completion
    // ------------------------------------------------------------------

    /// Starts (or nests) a pause episode.
    ///
    /// While paused, writes still apply immediately and are visible to reads,
    /// but their events are held back and collapsed to their net effect.
    pub fn pause(&self) {
        self.inner.state.borrow_mut().pause_depth += 1;
    }

    /// Ends one pause level; the outermost `resume()` publishes the net
    /// changes of the episode.
    ///
    /// Deletes are published first, then updates, then creates, followed by
    /// a single delta holding all three groups.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnmatchedResume` if the collection is not paused. The
    /// collection is left untouched in that case.
    pub fn resume(&self) -> Result<()> {
        if self.inner.state.borrow().pause_depth == 0 {
            tracing::warn!(collection = ?self.name(), "resume() called with no pause() pending");
            return Err(Error::unmatched_resume(self.name()));
        }
        self.release();
        Ok(())
    }

    /// Runs `f` inside one pause episode.
    pub fn batch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.pause();
        let result = f();
        self.release();
        result
    }

    fn release(&self) {
        let pending = {
            let mut state = self.inner.state.borrow_mut();
            state.pause_depth = state.pause_depth.saturating_sub(1);
            if state.pause_depth > 0 {
                return;
            }
            core::mem::take(&mut state.pending)
        };
        self.flush(pending);
    }

    /// Returns true while at least one pause is outstanding.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.inner.state.borrow().pause_depth > 0
    }

    /// Closes every channel permanently.
    ///
    /// Net changes held by an open pause episode are published first. The
    /// pause depth is kept, so matching `resume()` calls still succeed.
    pub fn complete(&self) {
        if self.inner.completed.replace(true) {
            return;
        }
        let pending = core::mem::take(&mut self.inner.state.borrow_mut().pending);
        self.flush(pending);
        tracing::debug!(collection = ?self.name(), "collection completed");
        let channels = &self.inner.channels;
        channels.create.complete();
        channels.update.complete();
        channels.delete.complete();
        channels.delta.complete();
    }
}

/// Read access shared by every collection type.
///
/// Implementors only provide `base()`; everything else forwards to it.
pub trait IdCollection<V: Identified + 'static> {
    /// Returns the underlying collection.
    fn base(&self) -> &Base<V>;

    /// Returns the number of stored values.
    fn len(&self) -> usize {
        self.base().len()
    }

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.base().is_empty()
    }

    /// Returns the value stored under `id`.
    fn get(&self, id: &V::Id) -> Option<Rc<V>> {
        self.base().get(id)
    }

    /// Returns true if a value is stored under `id`.
    fn contains(&self, id: &V::Id) -> bool {
        self.base().contains(id)
    }

    /// Returns the stored ids in insertion order.
    fn ids(&self) -> Vec<V::Id> {
        self.base().ids()
    }

    /// Returns the stored values in insertion order.
    fn values(&self) -> Vec<Rc<V>> {
        self.base().values()
    }

    /// Returns the stored (id, value) pairs in insertion order.
    fn entries(&self) -> Vec<(V::Id, Rc<V>)> {
        self.base().entries()
    }

    /// Channel publishing values stored under a new id.
    fn on_create(&self) -> &Channel<Rc<V>> {
        self.base().on_create()
    }

    /// Channel publishing values that replaced an existing value.
    fn on_update(&self) -> &Channel<Rc<V>> {
        self.base().on_update()
    }

    /// Channel publishing removed values.
    fn on_delete(&self) -> &Channel<Rc<V>> {
        self.base().on_delete()
    }

    /// Channel publishing one `Delta` per write or pause episode.
    fn on_delta(&self) -> &Channel<Delta<Rc<V>>> {
        self.base().on_delta()
    }

    /// Current values as one create batch, then future deltas.
    fn all_delta<F>(&self, next: F) -> Subscription
    where
        F: Fn(&Delta<Rc<V>>) + 'static,
        Self: Sized,
    {
        self.base().all_delta(next)
    }

    /// Every created or updated value.
    fn on_add<F>(&self, next: F) -> Subscription
    where
        F: Fn(&Rc<V>) + 'static,
        Self: Sized,
    {
        self.base().on_add(next)
    }

    /// Current values, then every created or updated value.
    fn all_add<F>(&self, next: F) -> Subscription
    where
        F: Fn(&Rc<V>) + 'static,
        Self: Sized,
    {
        self.base().all_add(next)
    }

    /// Returns true if any channel has an observer.
    fn is_observed(&self) -> bool {
        self.base().is_observed()
    }

    /// Returns true once the collection completed.
    fn is_completed(&self) -> bool {
        self.base().is_completed()
    }

    /// Keeps a derived view alive while downstream views read from it.
    ///
    /// Collections that are maintained by upstream bindings return their
    /// maintenance state; plain collections return `None`.
    fn driver(&self) -> Option<Rc<dyn Any>> {
        None
    }

    /// Union of this collection with `others`.
    fn union_with<I, S>(&self, others: I) -> Union<V>
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
        Self: Sized,
    {
        Union::from_sources(with_others(self, others))
    }

    /// Intersection of this collection with `others`.
    fn intersect_with<I, S>(&self, others: I) -> Intersection<V>
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
        Self: Sized,
    {
        Intersection::from_sources(with_others(self, others))
    }

    /// This collection minus every value held by one of `others`.
    fn subtract<I, S>(&self, others: I) -> Difference<V>
    where
        I: IntoIterator<Item = S>,
        S: IdCollection<V>,
        Self: Sized,
    {
        Difference::new(self, others)
    }
}

fn with_others<V, C, I, S>(first: &C, others: I) -> Vec<Source<V>>
where
    V: Identified + 'static,
    C: IdCollection<V> + ?Sized,
    I: IntoIterator<Item = S>,
    S: IdCollection<V>,
{
    let mut sources = alloc::vec![Source::of(first)];
    sources.extend(others.into_iter().map(|other| Source::of(&other)));
    sources
}

impl<V: Identified + 'static> IdCollection<V> for Base<V> {
    #[inline]
    fn base(&self) -> &Base<V> {
        self
    }
}

impl<V, T> IdCollection<V> for &T
where
    V: Identified + 'static,
    T: IdCollection<V> + ?Sized,
{
    #[inline]
    fn base(&self) -> &Base<V> {
        (**self).base()
    }

    fn driver(&self) -> Option<Rc<dyn Any>> {
        (**self).driver()
    }
}
