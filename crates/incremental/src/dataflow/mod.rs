//! Upstream bindings of derived views.
//!
//! A derived view tracks its upstream collections in a `BindingSet`: every
//! tracked upstream together with the subscription that feeds its deltas
//! into the view.

mod binding;

pub(crate) use binding::{subscribe, BindingSet, Source};
