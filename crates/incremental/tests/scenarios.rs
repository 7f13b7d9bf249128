//! End-to-end scenarios across collections and views.

mod common;

use common::{init_tracing, item, items, sorted_ids, Item, Recorder};
use idsets_incremental::{
    Base, Container, Delta, Difference, Error, IdCollection, IdSet, Intersection, Union,
};
use std::rc::Rc;

#[test]
fn pause_resume_coalescing() {
    init_tracing();
    let set = IdSet::<Item>::from_values(items(&[1, 2, 3]));
    let recorder = Recorder::attach(&set);

    set.pause();
    set.delete([1u32]);
    set.add([item(4)]);
    set.add([item(4)]);
    set.delete([4u32]);
    set.resume().unwrap();

    assert_eq!(set.ids(), vec![2, 3]);
    assert_eq!(recorder.deltas(), vec![Delta::deleted(1)]);
}

#[test]
fn unmatched_resume_is_reported() {
    init_tracing();
    let set: IdSet<Item> = IdSet::new();
    assert!(matches!(
        set.resume(),
        Err(Error::UnmatchedResume { collection: None })
    ));
    assert!(set.is_empty());
}

#[test]
fn union_scenario() {
    init_tracing();
    let set1 = IdSet::<Item>::from_values(items(&[1, 2]));
    let set2 = IdSet::<Item>::from_values(items(&[2, 3]));
    let set3 = IdSet::<Item>::from_values(items(&[1, 3]));
    let union = Union::new([&set1, &set2, &set3]);
    let recorder = Recorder::attach(&union);

    assert_eq!(union.len(), 3);
    set1.delete([2u32]);
    assert!(recorder.deleted().is_empty());
    set2.delete([2u32]);
    assert_eq!(recorder.deltas(), vec![Delta::deleted(2)]);
}

#[test]
fn intersection_scenario() {
    init_tracing();
    let set1 = IdSet::<Item>::from_values(items(&[1, 2]));
    let set2 = IdSet::<Item>::from_values(items(&[2, 3]));
    let set3 = IdSet::<Item>::from_values(items(&[1, 2, 3]));
    let intersection = Intersection::new([&set1, &set2, &set3]);
    let recorder = Recorder::attach(&intersection);

    assert_eq!(intersection.ids(), vec![2]);
    set1.add([item(3)]);
    assert_eq!(intersection.len(), 2);
    assert_eq!(recorder.deltas(), vec![Delta::created(3)]);
}

#[test]
fn difference_scenario() {
    init_tracing();
    let source = IdSet::<Item>::from_values(items(&[1, 2, 3]));
    let subtract1 = IdSet::<Item>::from_values(items(&[2, 5]));
    let subtract2 = IdSet::<Item>::from_values(items(&[3]));
    let difference = Difference::new(&source, [&subtract1, &subtract2]);
    let recorder = Recorder::attach(&difference);

    assert_eq!(difference.ids(), vec![1]);
    source.add([item(4)]);
    assert_eq!(recorder.created(), vec![4]);
    subtract1.delete([2u32]);
    assert_eq!(recorder.created(), vec![4, 2]);
    assert!(Rc::ptr_eq(
        &difference.get(&2).unwrap(),
        &source.get(&2).unwrap()
    ));
}

#[test]
fn container_scenario() {
    init_tracing();
    let container: Container<Item, char> = Container::new();
    let (v1, v2, v3) = (item(1), item(2), item(3));

    container.add([v1.clone()], ['A']);
    container.add([v2.clone(), v3.clone()], ['A', 'B', 'C']);
    assert_eq!(container.ids(), vec![1, 2, 3]);
    assert_eq!(container.keyed('A').ids(), vec![1, 2, 3]);
    assert_eq!(container.keyed('B').ids(), vec![2, 3]);
    assert_eq!(container.keyed('C').ids(), vec![2, 3]);

    container.add_exclusive([v3.clone()], ['B', 'C']);
    assert_eq!(container.keyed('A').ids(), vec![1, 2]);

    container.delete_from([v2.id], ['B']);
    assert_eq!(container.keyed('B').ids(), vec![3]);

    container.delete([v1.id]);
    assert_eq!(container.ids(), vec![2, 3]);
}

#[test]
fn idempotent_add() {
    init_tracing();
    let set: IdSet<Item> = IdSet::new();
    let recorder = Recorder::attach(&set);
    let value = item(1);

    for _ in 0..3 {
        set.add([value.clone()]);
    }
    assert_eq!(recorder.deltas(), vec![Delta::created(1)]);
}

#[test]
fn completion_is_order_independent() {
    init_tracing();
    for order in [[0, 1, 2], [2, 1, 0], [1, 0, 2]] {
        let sets: Vec<IdSet<Item>> = (0..3).map(|_| IdSet::new()).collect();
        let union = Union::new(&sets);
        let recorder = Recorder::attach(&union);

        for (step, &index) in order.iter().enumerate() {
            assert!(!union.is_completed(), "completed early at step {}", step);
            sets[index].complete();
        }
        assert!(union.is_completed());
        assert!(recorder.is_completed());
    }
}

#[test]
fn chained_views_stay_maintained() {
    init_tracing();
    let a = IdSet::<Item>::from_values(items(&[1, 2]));
    let b = IdSet::<Item>::from_values(items(&[3]));
    let hidden = IdSet::<Item>::from_values(items(&[2]));

    // the union is only reachable through the difference
    let visible = a.union_with([&b]).subtract([&hidden]);
    assert_eq!(sorted_ids(&visible), vec![1, 3]);

    b.add([item(4)]);
    hidden.delete([2u32]);
    a.delete([1u32]);
    assert_eq!(sorted_ids(&visible), vec![2, 3, 4]);
}

#[test]
fn one_upstream_batch_reaches_views_as_one_batch() {
    init_tracing();
    let a = IdSet::<Item>::from_values(items(&[1, 2, 3]));
    let b = IdSet::<Item>::from_values(items(&[3]));
    let union = Union::new([&a, &b]);
    let intersection = Intersection::new([&a, &b]);
    let unions = Recorder::attach(&union);
    let intersections = Recorder::attach(&intersection);

    a.batch(|| {
        a.delete([1u32, 3]);
        a.add(items(&[5, 6]));
    });

    assert_eq!(
        unions.deltas(),
        vec![Delta::from_parts(vec![5, 6], vec![], vec![1])]
    );
    assert_eq!(intersections.deltas(), vec![Delta::deleted(3)]);
}

#[test]
fn listener_may_write_to_another_collection() {
    init_tracing();
    let source: IdSet<Item> = IdSet::new();
    let mirror: IdSet<Item> = IdSet::new();

    let target = mirror.clone();
    source.on_create().subscribe(move |value| target.add([value.clone()]));
    source.add(items(&[1, 2]));

    assert_eq!(mirror.ids(), vec![1, 2]);
}

#[test]
fn all_delta_starts_with_snapshot() {
    init_tracing();
    let set = IdSet::<Item>::from_values(items(&[1, 2]));
    let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
    let seen_clone = seen.clone();

    set.all_delta(move |delta| seen_clone.borrow_mut().push(delta.map(|v| v.id)));
    set.delete([1u32]);

    assert_eq!(
        *seen.borrow(),
        vec![Delta::from_parts(vec![1, 2], vec![], vec![]), Delta::deleted(1)]
    );
}

#[test]
fn base_is_shared_by_handles() {
    let set = IdSet::<Item>::from_values(items(&[1]));
    let base: Base<Item> = set.base().clone();
    set.add([item(2)]);
    assert_eq!(base.ids(), vec![1, 2]);
    assert!(base.ptr_eq(set.base()));
}
