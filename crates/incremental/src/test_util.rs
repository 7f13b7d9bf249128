//! Shared fixtures for unit tests.

use crate::collection::IdCollection;
use crate::delta::Delta;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use idsets_core::Identified;
use idsets_reactive::Subscription;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub(crate) id: u32,
    pub(crate) label: &'static str,
}

impl Identified for Item {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.id
    }
}

/// A fresh reference on every call.
pub(crate) fn item(id: u32) -> Rc<Item> {
    Rc::new(Item { id, label: "item" })
}

#[derive(Default)]
struct Log {
    created: Vec<u32>,
    updated: Vec<u32>,
    deleted: Vec<u32>,
    order: Vec<String>,
    deltas: Vec<Delta<Rc<Item>>>,
    completed: bool,
}

/// Records everything a collection publishes.
pub(crate) struct Recorder {
    log: Rc<RefCell<Log>>,
    _subscriptions: Vec<Subscription>,
}

impl Recorder {
    pub(crate) fn attach<C: IdCollection<Item>>(collection: &C) -> Self {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut subscriptions = Vec::new();

        let create = log.clone();
        subscriptions.push(collection.on_create().subscribe(move |value| {
            let mut log = create.borrow_mut();
            log.created.push(value.id);
            log.order.push(format!("create {}", value.id));
        }));
        let update = log.clone();
        subscriptions.push(collection.on_update().subscribe(move |value| {
            let mut log = update.borrow_mut();
            log.updated.push(value.id);
            log.order.push(format!("update {}", value.id));
        }));
        let delete = log.clone();
        subscriptions.push(collection.on_delete().subscribe(move |value| {
            let mut log = delete.borrow_mut();
            log.deleted.push(value.id);
            log.order.push(format!("delete {}", value.id));
        }));
        let delta = log.clone();
        let completed = log.clone();
        subscriptions.push(collection.on_delta().subscribe_with(
            move |value| delta.borrow_mut().deltas.push(value.clone()),
            move || completed.borrow_mut().completed = true,
        ));

        Self {
            log,
            _subscriptions: subscriptions,
        }
    }

    pub(crate) fn created(&self) -> Vec<u32> {
        self.log.borrow().created.clone()
    }

    pub(crate) fn updated(&self) -> Vec<u32> {
        self.log.borrow().updated.clone()
    }

    pub(crate) fn deleted(&self) -> Vec<u32> {
        self.log.borrow().deleted.clone()
    }

    /// Single-channel events in delivery order.
    pub(crate) fn order(&self) -> Vec<String> {
        self.log.borrow().order.clone()
    }

    /// Deltas, reduced to ids.
    pub(crate) fn deltas(&self) -> Vec<Delta<u32>> {
        self.log
            .borrow()
            .deltas
            .iter()
            .map(|delta| delta.map(|value| value.id))
            .collect()
    }

    pub(crate) fn last_delta(&self) -> Option<Delta<Rc<Item>>> {
        self.log.borrow().deltas.last().cloned()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.log.borrow().completed
    }
}
