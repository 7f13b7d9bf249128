//! Binding set management.

use crate::collection::{Base, IdCollection};
use crate::delta::Delta;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use idsets_core::Identified;
use idsets_reactive::Subscription;

/// An upstream collection as seen by a derived view.
pub(crate) struct Source<V: Identified + 'static> {
    pub(crate) base: Base<V>,
    /// Keeps an upstream view maintained while it is tracked
    driver: Option<Rc<dyn Any>>,
}

impl<V: Identified + 'static> Clone for Source<V> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            driver: self.driver.clone(),
        }
    }
}

impl<V: Identified + 'static> Source<V> {
    pub(crate) fn of<S>(collection: &S) -> Self
    where
        S: IdCollection<V> + ?Sized,
    {
        Self {
            base: collection.base().clone(),
            driver: collection.driver(),
        }
    }
}

struct Binding<V: Identified + 'static> {
    source: Source<V>,
    subscription: Subscription,
}

/// The tracked upstreams of a derived view.
///
/// Bindings are kept in tracking order. All methods take `&self` and never
/// hold a borrow across a call into a collection, so delta and completion
/// handlers may read the set while it is being changed.
pub(crate) struct BindingSet<V: Identified + 'static> {
    bindings: RefCell<Vec<Binding<V>>>,
    /// Non-zero while a subscription is being registered
    binding: Cell<usize>,
}

impl<V: Identified + 'static> Default for BindingSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Identified + 'static> BindingSet<V> {
    /// Creates an empty binding set.
    pub(crate) fn new() -> Self {
        Self {
            bindings: RefCell::new(Vec::new()),
            binding: Cell::new(0),
        }
    }

    /// Returns true if `base` is tracked.
    pub(crate) fn contains(&self, base: &Base<V>) -> bool {
        self.bindings
            .borrow()
            .iter()
            .any(|binding| binding.source.base.ptr_eq(base))
    }

    /// Tracks `source`, subscribing through `subscribe`.
    ///
    /// Returns false if the source was already tracked.
    pub(crate) fn bind<F>(&self, source: Source<V>, subscribe: F) -> bool
    where
        F: FnOnce(&Base<V>) -> Subscription,
    {
        if self.contains(&source.base) {
            return false;
        }
        self.binding.set(self.binding.get() + 1);
        let subscription = subscribe(&source.base);
        self.binding.set(self.binding.get() - 1);
        tracing::trace!(source = ?source.base.name(), "bound upstream");
        self.bindings.borrow_mut().push(Binding {
            source,
            subscription,
        });
        true
    }

    /// Stops tracking `base`, returning the removed source.
    pub(crate) fn unbind(&self, base: &Base<V>) -> Option<Source<V>> {
        let binding = {
            let mut bindings = self.bindings.borrow_mut();
            let position = bindings
                .iter()
                .position(|binding| binding.source.base.ptr_eq(base))?;
            bindings.remove(position)
        };
        binding.subscription.unsubscribe();
        tracing::trace!(source = ?base.name(), "unbound upstream");
        Some(binding.source)
    }

    /// Stops tracking every source.
    pub(crate) fn unbind_all(&self) -> Vec<Source<V>> {
        let bindings = core::mem::take(&mut *self.bindings.borrow_mut());
        bindings
            .into_iter()
            .map(|binding| {
                binding.subscription.unsubscribe();
                binding.source
            })
            .collect()
    }

    /// Returns the tracked collections in tracking order.
    pub(crate) fn sources(&self) -> Vec<Base<V>> {
        self.bindings
            .borrow()
            .iter()
            .map(|binding| binding.source.base.clone())
            .collect()
    }

    /// Returns the first tracked collection.
    pub(crate) fn first(&self) -> Option<Base<V>> {
        self.bindings
            .borrow()
            .first()
            .map(|binding| binding.source.base.clone())
    }

    /// Returns true if any tracked collection holds `id`.
    pub(crate) fn any_holds(&self, id: &V::Id) -> bool {
        self.sources().iter().any(|source| source.contains(id))
    }

    /// Returns true if there is at least one tracked collection and every
    /// one of them holds `id`.
    pub(crate) fn all_hold(&self, id: &V::Id) -> bool {
        let sources = self.sources();
        !sources.is_empty() && sources.iter().all(|source| source.contains(id))
    }

    /// Returns true if every tracked collection completed.
    ///
    /// Vacuously true for an empty set.
    pub(crate) fn all_completed(&self) -> bool {
        self.bindings
            .borrow()
            .iter()
            .all(|binding| binding.source.base.is_completed())
    }

    /// Returns true while a subscription is being registered.
    ///
    /// Subscribing to a completed collection runs the completion handler
    /// immediately; handlers skip their check until the set is consistent.
    #[inline]
    pub(crate) fn is_binding(&self) -> bool {
        self.binding.get() > 0
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bindings.borrow().len()
    }
}

impl<V: Identified + 'static> Drop for BindingSet<V> {
    fn drop(&mut self) {
        for binding in self.bindings.get_mut().drain(..) {
            binding.subscription.unsubscribe();
        }
    }
}

/// Subscribes `target` to the delta channel of `source`.
///
/// The handlers hold a `Weak` reference, so the upstream never keeps the
/// target alive.
pub(crate) fn subscribe<V, T, N, C>(source: &Base<V>, target: &Rc<T>, next: N, complete: C) -> Subscription
where
    V: Identified + 'static,
    T: 'static,
    N: Fn(&T, &Delta<Rc<V>>) + 'static,
    C: Fn(&T) + 'static,
{
    let on_next = Rc::downgrade(target);
    let on_complete = Rc::downgrade(target);
    source.on_delta().subscribe_with(
        move |delta| {
            if let Some(target) = on_next.upgrade() {
                next(&target, delta);
            }
        },
        move || {
            if let Some(target) = on_complete.upgrade() {
                complete(&target);
            }
        },
    )
}
