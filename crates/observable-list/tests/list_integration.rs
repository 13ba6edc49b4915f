//! Integration tests: the list against a plain `Vec` model, in copy and
//! proxy mode.

use std::cell::RefCell;
use std::rc::Rc;

use observable_list::{
    EventKind, Key, ListEvent, ListLike, ListLikeExt, ListOptions, ObservableList, ProxyStorage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("observable_list=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

fn random_edit(rng: &mut StdRng, list: &ObservableList<u32>, model: &mut Vec<u32>) {
    let len = model.len();
    match rng.gen_range(0..7) {
        0 => {
            let values: Vec<u32> = (0..rng.gen_range(1..4)).map(|_| rng.gen_range(0..1000)).collect();
            assert_eq!(list.push(values.clone()), len + values.len());
            model.extend(values);
        }
        1 => assert_eq!(list.pop(), model.pop()),
        2 => {
            let expected = (!model.is_empty()).then(|| model.remove(0));
            assert_eq!(list.shift(), expected);
        }
        3 => {
            let value = rng.gen_range(0..1000);
            list.unshift(vec![value]);
            model.insert(0, value);
        }
        4 => {
            let index = rng.gen_range(0..=len);
            let how_many = rng.gen_range(0..4).min(len - index);
            let values: Vec<u32> = (0..rng.gen_range(0..4)).map(|_| rng.gen_range(0..1000)).collect();
            let displaced = list.splice(index, how_many, values.clone());
            let expected: Vec<u32> = model.splice(index..index + how_many, values).collect();
            assert_eq!(displaced, expected);
        }
        5 if len > 1 => {
            let from = rng.gen_range(0..len);
            let to = rng.gen_range(0..len);
            list.move_item(from, to);
            let value = model.remove(from);
            model.insert(to, value);
        }
        _ => {
            let index = rng.gen_range(0..=len);
            let value = rng.gen_range(0..1000);
            list.set_at(index, value);
            if index < len {
                model[index] = value;
            } else {
                model.push(value);
            }
        }
    }
}

#[test]
fn test_order_invariant_against_model() {
    let mut rng = StdRng::seed_from_u64(5);
    let list = ObservableList::new();
    let mut model = Vec::new();

    for step in 0..1000 {
        random_edit(&mut rng, &list, &mut model);
        assert_eq!(list.len(), model.len(), "length diverged at step {step}");
        for (index, value) in model.iter().enumerate() {
            assert_eq!(list.get_at(index), Some(*value), "step {step}, index {index}");
        }
    }
}

#[test]
fn test_keys_stay_unique_and_resolvable() {
    let mut rng = StdRng::seed_from_u64(9);
    let list = ObservableList::new();
    let mut model = Vec::new();

    for _ in 0..300 {
        random_edit(&mut rng, &list, &mut model);
        let keys = list.keys();
        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), keys.len());
        for (index, key) in keys.iter().enumerate() {
            assert_eq!(list.index_of_key(key), Some(index));
            assert_eq!(list.get_item_from_key(key), list.get_item(index));
        }
    }
}

#[test]
fn test_proxy_storage_tracks_model() {
    let mut rng = StdRng::seed_from_u64(13);
    let storage: ProxyStorage<u32> = Rc::new(RefCell::new(vec![Some(1), Some(2), Some(3)]));
    let list = ObservableList::proxy(Rc::clone(&storage), ListOptions::new()).unwrap();
    let mut model = vec![1, 2, 3];

    for step in 0..300 {
        random_edit(&mut rng, &list, &mut model);
        let mirrored: Vec<u32> = storage.borrow().iter().flatten().copied().collect();
        assert_eq!(mirrored, model, "proxy storage diverged at step {step}");
    }
}

#[test]
fn test_append_only_list_keeps_implicit_keys() {
    let list = ObservableList::from_values([1, 2]);
    list.push(vec![3, 4]);
    list.pop();
    list.set_at(0, 10);
    assert!(!list.has_materialized_keys());
    assert_eq!(list.index_of_key(&Key::from("2")), Some(2));

    list.unshift(vec![0]);
    assert!(list.has_materialized_keys());
    assert_eq!(list.index_of_key(&Key::from("2")), Some(3));
}

#[test]
fn test_kind_filtered_listeners() {
    let list = ObservableList::from_values(["a", "b"]);
    let inserted = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&inserted);
    let id = list.add_event_listener(
        Some(EventKind::ItemInserted),
        Rc::new(move |_: &ListEvent<&str>| *counter.borrow_mut() += 1),
    );

    list.push(vec!["c"]);
    list.set_at(0, "z");
    list.pop();
    assert_eq!(*inserted.borrow(), 1);

    assert!(list.remove_event_listener(id));
    list.push(vec!["d"]);
    assert_eq!(*inserted.borrow(), 1);
    assert_eq!(list.join(","), "z,b,d");
}

#[test]
fn test_zero_length_removes_ascending() {
    let list = ObservableList::from_values([1, 2, 3, 4]);
    let removed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&removed);
    list.add_event_listener(
        None,
        Rc::new(move |event: &ListEvent<i32>| match event {
            ListEvent::ItemRemoved { index, item } => sink.borrow_mut().push((*index, item.data)),
            other => panic!("unexpected {other:?}"),
        }),
    );

    list.set_length(0).unwrap();

    assert_eq!(*removed.borrow(), vec![(0, 1), (0, 2), (0, 3), (0, 4)]);
    assert_eq!(list.len(), 0);
}

#[test]
fn test_traversal_helpers() {
    let list = ObservableList::from_values([3, 1, 4, 1, 5]);
    assert_eq!(list.map(|v, i| v * i as i32), vec![0, 1, 8, 3, 20]);
    assert_eq!(list.filter(|v| *v > 2), vec![3, 4, 5]);
    assert!(list.some(|v| *v == 4));
    assert!(!list.every(|v| *v > 1));
    assert_eq!(list.reduce(0, |acc, v| acc + v), 14);
    assert_eq!(list.slice(1, 3), vec![1, 4]);
    assert_eq!(list.index_of(&1), Some(1));
    assert_eq!(list.last_index_of(&1), Some(3));

    let joined = list.concat([9]);
    assert_eq!(joined.to_vec(), vec![3, 1, 4, 1, 5, 9]);
    assert_eq!(list.len(), 5);

    let mut seen = Vec::new();
    list.for_each(|v, i| seen.push((i, *v)));
    assert_eq!(seen.len(), 5);
}
