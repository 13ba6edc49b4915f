//! Sorted projection: every source item, ordered by a comparator, with ties
//! kept in source order.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use observable_list::{EventHub, Item, Key, ListEvent, ListLike};

use crate::projection::{
    InsertionAnchor, SourceLink, delegate_list_like, forward_move, forward_notify_mutated,
    forward_set_at, forward_splice,
};
use crate::search::{Search, SortOrder, merge_sort};

/// Incremental sorted key order over a source, shared by the sorted and
/// grouped projections.
pub(crate) struct SortedCore<T, O> {
    pub(crate) link: SourceLink<T>,
    pub(crate) order: O,
    sorted_keys: RefCell<Vec<Key>>,
    members: RefCell<HashSet<Key>>,
    events: EventHub<T>,
    kind: &'static str,
}

impl<T: Clone + 'static, O: SortOrder<T>> SortedCore<T, O> {
    /// Builds the initial order. The caller connects the link once the core
    /// is shared.
    pub(crate) fn new(source: Rc<dyn ListLike<T>>, order: O, kind: &'static str) -> Self {
        let core = Self {
            link: SourceLink::new(source),
            order,
            sorted_keys: RefCell::new(Vec::new()),
            members: RefCell::new(HashSet::new()),
            events: EventHub::new(),
            kind,
        };
        core.rebuild();
        core
    }

    pub(crate) fn is_disposed(&self) -> bool {
        !self.link.is_connected()
    }

    /// Detaches from the source and announces `reload` over an empty view.
    #[tracing::instrument(skip(self), fields(kind = self.kind))]
    pub(crate) fn dispose(&self) {
        if !self.link.disconnect() {
            return;
        }
        tracing::debug!("projection disposed");
        self.rebuild();
        self.emit(ListEvent::Reload);
    }

    /// Recomputes the whole order from the source with a stable merge sort.
    #[tracing::instrument(skip(self), fields(kind = self.kind))]
    fn rebuild(&self) {
        let source = self.link.source();
        self.order.clear();
        let entries: Vec<(Key, O::Value)> = (0..source.len())
            .filter_map(|index| source.get_item(index))
            .map(|item| {
                self.order.refresh(&item);
                let value = self.order.value_of_item(&item);
                (item.key, value)
            })
            .collect();
        let sorted = merge_sort(entries, &|a: &(Key, O::Value), b: &(Key, O::Value)| {
            self.order.compare(&a.1, &b.1)
        });
        let len = sorted.len();
        let keys: Vec<Key> = sorted.into_iter().map(|(key, _)| key).collect();
        *self.members.borrow_mut() = keys.iter().cloned().collect();
        *self.sorted_keys.borrow_mut() = keys;

        metrics::counter!("projection_rebuilds_total", "kind" => self.kind).increment(1);
        tracing::debug!(len, "projection rebuilt");
    }

    pub(crate) fn handle(&self, event: &ListEvent<T>) {
        match event {
            ListEvent::ItemInserted { index, item } => self.on_inserted(*index, item),
            ListEvent::ItemRemoved { item, .. } => self.on_removed(item),
            ListEvent::ItemChanged {
                index,
                old_item,
                new_item,
            } => self.on_changed(*index, old_item, new_item),
            ListEvent::ItemMoved {
                new_index, item, ..
            } => self.on_relocated(*new_index, item, false),
            ListEvent::ItemMutated { index, item } => self.on_relocated(*index, item, true),
            ListEvent::Reload => {
                self.rebuild();
                self.emit(ListEvent::Reload);
            }
        }
    }

    fn emit(&self, event: ListEvent<T>) {
        tracing::trace!(kind = self.kind, event = %event.kind(), "projection event");
        self.events.dispatch(&event);
    }

    /// Sorted index of `key`. Linear in the view length; membership alone
    /// is answered by `contains` in constant time.
    fn position(&self, key: &Key) -> Option<usize> {
        if !self.contains(key) {
            return None;
        }
        self.sorted_keys.borrow().iter().position(|k| k == key)
    }

    fn contains(&self, key: &Key) -> bool {
        self.members.borrow().contains(key)
    }

    fn take(&self, index: usize) {
        let key = self.sorted_keys.borrow_mut().remove(index);
        self.members.borrow_mut().remove(&key);
    }

    fn put(&self, index: usize, key: &Key) {
        self.sorted_keys.borrow_mut().insert(index, key.clone());
        self.members.borrow_mut().insert(key.clone());
    }

    /// Finds the slot for `key` among the other sorted keys.
    fn search(&self, key: &Key, value: &O::Value, source_index: usize) -> usize {
        let source = self.link.source();
        let sorted = self.sorted_keys.borrow();
        Search {
            order: &self.order,
            source: source.as_ref(),
            sorted: &sorted,
        }
        .insertion_pos(key, value, source_index)
    }

    fn place(&self, item: &Item<T>, source_index: usize) -> usize {
        let value = self.order.value_of_item(item);
        let position = self.search(&item.key, &value, source_index);
        self.put(position, &item.key);
        position
    }

    fn on_inserted(&self, source_index: usize, item: &Item<T>) {
        self.order.refresh(item);
        let index = self.place(item, source_index);
        self.emit(ListEvent::ItemInserted {
            index,
            item: self.order.decorate(item.clone()),
        });
    }

    fn on_removed(&self, item: &Item<T>) {
        let Some(index) = self.position(&item.key) else {
            return;
        };
        self.take(index);
        let item = self.order.decorate(item.clone());
        self.order.forget(&item.key);
        self.emit(ListEvent::ItemRemoved { index, item });
    }

    fn on_changed(&self, source_index: usize, old_item: &Item<T>, new_item: &Item<T>) {
        let Some(index) = self.position(&new_item.key) else {
            return;
        };
        let old_value = self.order.value_of_item(old_item);
        let old_view = self.order.decorate(old_item.clone());
        let regrouped = self.order.refresh(new_item);
        let new_value = self.order.value_of_item(new_item);
        let new_view = self.order.decorate(new_item.clone());

        if !regrouped && self.order.compare(&old_value, &new_value) == Ordering::Equal {
            self.emit(ListEvent::ItemChanged {
                index,
                old_item: old_view,
                new_item: new_view,
            });
            return;
        }

        self.take(index);
        self.emit(ListEvent::ItemRemoved {
            index,
            item: old_view,
        });
        let index = self.place(new_item, source_index);
        self.emit(ListEvent::ItemInserted {
            index,
            item: new_view,
        });
    }

    /// Re-seats an item whose source position or content changed.
    fn on_relocated(&self, source_index: usize, item: &Item<T>, mutated: bool) {
        let Some(old_index) = self.position(&item.key) else {
            return;
        };
        let old_view = self.order.decorate(item.clone());
        self.take(old_index);
        let regrouped = self.order.refresh(item);
        let value = self.order.value_of_item(item);
        let new_index = self.search(&item.key, &value, source_index);
        let view = self.order.decorate(item.clone());

        if regrouped || (mutated && new_index != old_index) {
            self.emit(ListEvent::ItemRemoved {
                index: old_index,
                item: old_view,
            });
            self.put(new_index, &item.key);
            self.emit(ListEvent::ItemInserted {
                index: new_index,
                item: view,
            });
            return;
        }

        self.put(new_index, &item.key);
        if mutated {
            self.emit(ListEvent::ItemMutated {
                index: new_index,
                item: view,
            });
        } else if new_index != old_index {
            self.emit(ListEvent::ItemMoved {
                old_index,
                new_index,
                item: view,
            });
        }
    }
}

impl<T: Clone + 'static, O: SortOrder<T>> ListLike<T> for SortedCore<T, O> {
    fn len(&self) -> usize {
        self.sorted_keys.borrow().len()
    }

    fn get_item(&self, index: usize) -> Option<Item<T>> {
        let key = self.sorted_keys.borrow().get(index).cloned()?;
        self.link
            .source()
            .get_item_from_key(&key)
            .map(|item| self.order.decorate(item))
    }

    fn get_item_from_key(&self, key: &Key) -> Option<Item<T>> {
        if !self.contains(key) {
            return None;
        }
        self.link
            .source()
            .get_item_from_key(key)
            .map(|item| self.order.decorate(item))
    }

    fn index_of_key(&self, key: &Key) -> Option<usize> {
        self.position(key)
    }

    fn keys(&self) -> Vec<Key> {
        self.sorted_keys.borrow().clone()
    }

    fn set_at(&self, index: usize, value: T) {
        forward_set_at(self, self.link.source().as_ref(), index, value);
    }

    fn splice(&self, index: usize, how_many: usize, values: Vec<T>) -> Vec<T> {
        let source = self.link.source();
        forward_splice(
            self,
            source.as_ref(),
            index,
            how_many,
            values,
            InsertionAnchor::SourceTail,
        )
    }

    fn move_item(&self, index: usize, new_index: usize) {
        forward_move(self, self.link.source().as_ref(), index, new_index);
    }

    fn notify_mutated(&self, index: usize) {
        forward_notify_mutated(self, self.link.source().as_ref(), index);
    }

    fn events(&self) -> &EventHub<T> {
        &self.events
    }
}

/// Orders items by their values through a caller comparator.
pub(crate) struct ValueOrder<T> {
    comparator: Rc<dyn Fn(&T, &T) -> Ordering>,
}

impl<T: Clone + 'static> SortOrder<T> for ValueOrder<T> {
    type Value = T;

    fn value_of_item(&self, item: &Item<T>) -> T {
        item.data.clone()
    }

    fn value_of_key(&self, source: &dyn ListLike<T>, key: &Key) -> Option<T> {
        source.get_item_from_key(key).map(|item| item.data)
    }

    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.comparator)(a, b)
    }
}

/// A live view holding every source item ordered by a comparator.
///
/// Items that compare equal appear in the order they currently have in the
/// source, not the order in which they arrived. Values inserted through the
/// projection are appended to the source and positioned by the comparator.
pub struct SortedProjection<T> {
    inner: Rc<SortedCore<T, ValueOrder<T>>>,
}

impl<T> Clone for SortedProjection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> SortedProjection<T> {
    /// Creates a sorted view over `source`.
    pub fn new(
        source: Rc<dyn ListLike<T>>,
        comparator: impl Fn(&T, &T) -> Ordering + 'static,
    ) -> Self {
        let order = ValueOrder {
            comparator: Rc::new(comparator),
        };
        let inner = Rc::new(SortedCore::new(source, order, "sorted"));
        inner.link.connect(&inner, SortedCore::handle);
        Self { inner }
    }

    /// Detaches from the source, empties the view and emits `reload`.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn core(&self) -> &SortedCore<T, ValueOrder<T>> {
        &self.inner
    }
}

impl<T> std::fmt::Debug for SortedProjection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedProjection")
            .field("len", &self.inner.sorted_keys.borrow().len())
            .field("listeners", &self.inner.events.listener_count())
            .finish()
    }
}

delegate_list_like!(SortedProjection<T> => T);

#[cfg(test)]
mod tests {
    use super::*;
    use observable_list::{ListLikeExt, ObservableList};

    fn sorted(list: &ObservableList<i32>) -> SortedProjection<i32> {
        SortedProjection::new(Rc::new(list.clone()), |a: &i32, b: &i32| a.cmp(b))
    }

    fn record(view: &dyn ListLike<i32>) -> Rc<RefCell<Vec<ListEvent<i32>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        view.add_event_listener(
            None,
            Rc::new(move |event: &ListEvent<i32>| sink.borrow_mut().push(event.clone())),
        );
        log
    }

    #[test]
    fn test_initial_build_orders_values() {
        let list = ObservableList::from_values([5, 3, 8, 1]);
        let view = sorted(&list);
        assert_eq!(view.to_vec(), vec![1, 3, 5, 8]);
        let keys: Vec<Key> = ["3", "1", "0", "2"].into_iter().map(Key::from).collect();
        assert_eq!(view.keys(), keys);
    }

    #[test]
    fn test_pushed_tie_lands_after_existing_equal() {
        let list = ObservableList::from_values([5, 3, 8, 1]);
        let view = sorted(&list);
        let log = record(&view);

        list.push(vec![3]);

        assert_eq!(view.to_vec(), vec![1, 3, 3, 5, 8]);
        assert_eq!(view.index_of_key(&Key::from("4")), Some(2));
        let events = log.borrow();
        assert!(matches!(&events[..], [ListEvent::ItemInserted { index: 2, .. }]));
    }

    #[test]
    fn test_change_without_reordering_is_translated() {
        let list = ObservableList::from_values([1, 5, 9]);
        let view = SortedProjection::new(Rc::new(list.clone()), |a: &i32, b: &i32| {
            (a / 10).cmp(&(b / 10))
        });
        let log = record(&view);

        list.set_at(1, 6);

        let events = log.borrow();
        assert!(matches!(&events[..], [ListEvent::ItemChanged { index: 1, .. }]));
        assert_eq!(view.to_vec(), vec![1, 6, 9]);
    }

    #[test]
    fn test_change_that_reorders_becomes_remove_and_insert() {
        let list = ObservableList::from_values([1, 5, 9]);
        let view = sorted(&list);
        let log = record(&view);

        list.set_at(0, 7);

        assert_eq!(view.to_vec(), vec![5, 7, 9]);
        let events = log.borrow();
        assert!(matches!(
            &events[..],
            [
                ListEvent::ItemRemoved { index: 0, .. },
                ListEvent::ItemInserted { index: 1, .. }
            ]
        ));
    }

    #[test]
    fn test_move_among_ties_mirrors_source_order() {
        let list = ObservableList::from_values(["a", "b", "c"].map(String::from));
        let view = SortedProjection::new(Rc::new(list.clone()), |_: &String, _: &String| {
            Ordering::Equal
        });
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        view.add_event_listener(
            None,
            Rc::new(move |event: &ListEvent<String>| sink.borrow_mut().push(event.clone())),
        );

        list.move_item(0, 2);

        assert_eq!(view.to_vec(), vec!["b", "c", "a"]);
        let events = log.borrow();
        assert!(matches!(
            &events[..],
            [ListEvent::ItemMoved {
                old_index: 0,
                new_index: 2,
                ..
            }]
        ));
    }

    #[test]
    fn test_move_between_distinct_values_is_silent() {
        let list = ObservableList::from_values([3, 1, 2]);
        let view = sorted(&list);
        let log = record(&view);

        list.move_item(0, 2);

        assert_eq!(view.to_vec(), vec![1, 2, 3]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_remove_reports_sorted_index() {
        let list = ObservableList::from_values([5, 3, 8, 1]);
        let view = sorted(&list);
        let log = record(&view);

        list.splice(0, 1, Vec::new());

        assert_eq!(view.to_vec(), vec![1, 3, 8]);
        let events = log.borrow();
        assert!(matches!(&events[..], [ListEvent::ItemRemoved { index: 2, .. }]));
    }

    #[test]
    fn test_mutation_in_place_emits_itemmutated() {
        let list = ObservableList::from_values([1, 2, 3]);
        let view = sorted(&list);
        let log = record(&view);

        list.notify_mutated(1);

        let events = log.borrow();
        assert!(matches!(&events[..], [ListEvent::ItemMutated { index: 1, .. }]));
    }

    type Shared = Rc<std::cell::Cell<i32>>;

    fn sorted_cells(values: &[i32]) -> (ObservableList<Shared>, SortedProjection<Shared>) {
        let list: ObservableList<Shared> = values
            .iter()
            .map(|v| Rc::new(std::cell::Cell::new(*v)))
            .collect();
        let view = SortedProjection::new(Rc::new(list.clone()), |a: &Shared, b: &Shared| {
            a.get().cmp(&b.get())
        });
        (list, view)
    }

    fn record_cells(view: &SortedProjection<Shared>) -> Rc<RefCell<Vec<ListEvent<Shared>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        view.add_event_listener(
            None,
            Rc::new(move |event: &ListEvent<Shared>| sink.borrow_mut().push(event.clone())),
        );
        log
    }

    #[test]
    fn test_in_place_mutation_that_reorders_becomes_remove_and_insert() {
        let (list, view) = sorted_cells(&[1, 5, 9]);
        let log = record_cells(&view);

        list.get_at(0).unwrap().set(7);
        list.notify_mutated(0);

        let values: Vec<i32> = view.to_vec().iter().map(|v| v.get()).collect();
        assert_eq!(values, vec![5, 7, 9]);
        assert_eq!(view.index_of_key(&Key::from("0")), Some(1));
        let events = log.borrow();
        match &events[..] {
            [
                ListEvent::ItemRemoved {
                    index: 0,
                    item: removed,
                },
                ListEvent::ItemInserted {
                    index: 1,
                    item: inserted,
                },
            ] => {
                assert_eq!(removed.key, Key::from("0"));
                assert_eq!(inserted.key, Key::from("0"));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_in_place_mutation_keeping_position_is_itemmutated() {
        let (list, view) = sorted_cells(&[1, 5, 9]);
        let log = record_cells(&view);

        list.get_at(1).unwrap().set(6);
        list.notify_mutated(1);

        let events = log.borrow();
        assert!(matches!(&events[..], [ListEvent::ItemMutated { index: 1, .. }]));
        assert_eq!(view.get_at(1).map(|v| v.get()), Some(6));
    }

    #[test]
    fn test_key_lookup_tracks_membership() {
        let list = ObservableList::from_values([5, 3, 8]);
        let view = sorted(&list);

        list.set_at(0, 9);
        assert_eq!(view.get_item_from_key(&Key::from("0")).map(|i| i.data), Some(9));
        assert_eq!(view.index_of_key(&Key::from("0")), Some(2));

        list.shift();
        assert_eq!(view.get_item_from_key(&Key::from("0")), None);
        assert_eq!(view.index_of_key(&Key::from("0")), None);

        list.push(vec![1]);
        assert_eq!(view.index_of_key(&Key::from("3")), Some(0));
    }

    #[test]
    fn test_source_reload_rebuilds() {
        let list = ObservableList::from_values([2, 1, 3]);
        let view = sorted(&list);
        let log = record(&view);

        list.reverse();

        assert_eq!(view.to_vec(), vec![1, 2, 3]);
        assert_eq!(log.borrow().last(), Some(&ListEvent::Reload));
    }

    #[test]
    fn test_push_through_projection_appends_to_source() {
        let list = ObservableList::from_values([5, 1]);
        let view = sorted(&list);

        view.push(vec![3]);

        assert_eq!(list.to_vec(), vec![5, 1, 3]);
        assert_eq!(view.to_vec(), vec![1, 3, 5]);
    }

    #[test]
    fn test_set_at_through_projection_replaces_source_item() {
        let list = ObservableList::from_values([5, 1]);
        let view = sorted(&list);

        view.set_at(0, 9);

        assert_eq!(list.to_vec(), vec![5, 9]);
        assert_eq!(view.to_vec(), vec![5, 9]);
    }

    #[test]
    fn test_set_length_truncates_sorted_view() {
        let list = ObservableList::from_values([5, 3, 8, 1]);
        let view = sorted(&list);

        view.set_length(2).unwrap();

        assert_eq!(view.to_vec(), vec![1, 3]);
        assert_eq!(list.to_vec(), vec![3, 1]);
        assert!(view.set_length(-1).is_err());
    }

    #[test]
    fn test_dispose_empties_and_detaches() {
        let list = ObservableList::from_values([2, 1]);
        let view = sorted(&list);
        let log = record(&view);

        view.dispose();

        assert!(view.is_disposed());
        assert!(view.is_empty());
        assert_eq!(log.borrow().as_slice(), &[ListEvent::Reload]);
        assert_eq!(list.events().listener_count(), 0);

        list.push(vec![0]);
        assert!(view.is_empty());
    }
}
