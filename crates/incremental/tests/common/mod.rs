//! Shared helpers for integration tests.

#![allow(dead_code)]

use idsets_incremental::{Delta, IdCollection, Identified, Subscription};
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; set `RUST_LOG` to see records.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: u32,
    pub version: u32,
}

impl Identified for Item {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.id
    }
}

pub fn item(id: u32) -> Rc<Item> {
    Rc::new(Item { id, version: 0 })
}

pub fn items(ids: &[u32]) -> Vec<Rc<Item>> {
    ids.iter().map(|&id| item(id)).collect()
}

/// Collects the deltas and completion of one collection, reduced to ids.
pub struct Recorder {
    deltas: Rc<RefCell<Vec<Delta<u32>>>>,
    completed: Rc<RefCell<bool>>,
    subscription: Subscription,
}

impl Recorder {
    pub fn attach<C: IdCollection<Item>>(collection: &C) -> Self {
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let completed = Rc::new(RefCell::new(false));
        let deltas_clone = deltas.clone();
        let completed_clone = completed.clone();
        let subscription = collection.on_delta().subscribe_with(
            move |delta| deltas_clone.borrow_mut().push(delta.map(|value| value.id)),
            move || *completed_clone.borrow_mut() = true,
        );
        Self {
            deltas,
            completed,
            subscription,
        }
    }

    pub fn deltas(&self) -> Vec<Delta<u32>> {
        self.deltas.borrow().clone()
    }

    pub fn created(&self) -> Vec<u32> {
        self.deltas.borrow().iter().flat_map(|d| d.create.clone()).collect()
    }

    pub fn deleted(&self) -> Vec<u32> {
        self.deltas.borrow().iter().flat_map(|d| d.delete.clone()).collect()
    }

    pub fn is_completed(&self) -> bool {
        *self.completed.borrow()
    }

    pub fn detach(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

/// Ids of a collection in ascending order.
pub fn sorted_ids<C: IdCollection<Item>>(collection: &C) -> Vec<u32> {
    let mut ids = collection.ids();
    ids.sort_unstable();
    ids
}
