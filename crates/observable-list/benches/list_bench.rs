use criterion::{Criterion, criterion_group, criterion_main};
use observable_list::{ListEvent, ListLike, ObservableList};

use std::rc::Rc;

fn bench_push_1000(c: &mut Criterion) {
    c.bench_function("observable_list/push_1000", |b| {
        b.iter(|| {
            let list = ObservableList::new();
            for value in 0..1000 {
                list.push(vec![value]);
            }
            list.len()
        });
    });
}

fn bench_push_1000_with_listener(c: &mut Criterion) {
    c.bench_function("observable_list/push_1000_one_listener", |b| {
        b.iter(|| {
            let list = ObservableList::new();
            list.add_event_listener(None, Rc::new(|_: &ListEvent<i32>| {}));
            for value in 0..1000 {
                list.push(vec![value]);
            }
            list.len()
        });
    });
}

fn bench_unshift_500(c: &mut Criterion) {
    c.bench_function("observable_list/unshift_500", |b| {
        b.iter(|| {
            let list = ObservableList::new();
            for value in 0..500 {
                list.unshift(vec![value]);
            }
            list.len()
        });
    });
}

fn bench_key_lookup(c: &mut Criterion) {
    let implicit = ObservableList::from_values(0..1000);
    let materialized = ObservableList::from_values(0..1000);
    materialized.move_item(0, 1);
    let keys = implicit.keys();

    c.bench_function("observable_list/index_of_key_implicit", |b| {
        b.iter(|| keys.iter().filter_map(|k| implicit.index_of_key(k)).count());
    });
    c.bench_function("observable_list/index_of_key_materialized", |b| {
        b.iter(|| keys.iter().filter_map(|k| materialized.index_of_key(k)).count());
    });
}

criterion_group!(
    benches,
    bench_push_1000,
    bench_push_1000_with_listener,
    bench_unshift_500,
    bench_key_lookup,
);
criterion_main!(benches);
