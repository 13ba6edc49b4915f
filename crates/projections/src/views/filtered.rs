//! Filtered projection: the source items that satisfy a predicate, in
//! source order.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use observable_list::{EventHub, Item, Key, ListEvent, ListLike};

use crate::projection::{
    InsertionAnchor, SourceLink, delegate_list_like, forward_move, forward_notify_mutated,
    forward_set_at, forward_splice,
};

pub(crate) struct FilteredCore<T> {
    link: SourceLink<T>,
    predicate: Rc<dyn Fn(&T) -> bool>,
    filtered_keys: RefCell<Vec<Key>>,
    members: RefCell<HashSet<Key>>,
    events: EventHub<T>,
}

impl<T: Clone + 'static> FilteredCore<T> {
    fn is_member(&self, key: &Key) -> Option<usize> {
        if !self.members.borrow().contains(key) {
            return None;
        }
        self.filtered_keys.borrow().iter().position(|k| k == key)
    }

    fn emit(&self, event: ListEvent<T>) {
        tracing::trace!(event = %event.kind(), "filtered event");
        self.events.dispatch(&event);
    }

    #[tracing::instrument(skip(self))]
    fn rebuild(&self) {
        let source = self.link.source();
        let keys: Vec<Key> = (0..source.len())
            .filter_map(|index| source.get_item(index))
            .filter(|item| (self.predicate)(&item.data))
            .map(|item| item.key)
            .collect();
        let len = keys.len();
        *self.members.borrow_mut() = keys.iter().cloned().collect();
        *self.filtered_keys.borrow_mut() = keys;

        metrics::counter!("projection_rebuilds_total", "kind" => "filtered").increment(1);
        tracing::debug!(len, "projection rebuilt");
    }

    #[tracing::instrument(skip(self))]
    fn dispose(&self) {
        if !self.link.disconnect() {
            return;
        }
        tracing::debug!("projection disposed");
        self.rebuild();
        self.emit(ListEvent::Reload);
    }

    /// Filtered position for an item at `source_index`: just after the
    /// nearest preceding source item that is in the view.
    fn insertion_point(&self, source_index: usize) -> usize {
        let source = self.link.source();
        let predecessor = {
            let members = self.members.borrow();
            (0..source_index)
                .rev()
                .filter_map(|index| source.get_item(index))
                .map(|item| item.key)
                .find(|key| members.contains(key))
        };
        predecessor
            .and_then(|key| self.is_member(&key))
            .map_or(0, |position| position + 1)
    }

    fn admit(&self, source_index: usize, item: Item<T>) {
        let index = self.insertion_point(source_index);
        self.filtered_keys
            .borrow_mut()
            .insert(index, item.key.clone());
        self.members.borrow_mut().insert(item.key.clone());
        self.emit(ListEvent::ItemInserted { index, item });
    }

    fn evict(&self, index: usize, item: Item<T>) {
        self.filtered_keys.borrow_mut().remove(index);
        self.members.borrow_mut().remove(&item.key);
        self.emit(ListEvent::ItemRemoved { index, item });
    }

    fn handle(&self, event: &ListEvent<T>) {
        match event {
            ListEvent::ItemInserted { index, item } => {
                if (self.predicate)(&item.data) {
                    self.admit(*index, item.clone());
                }
            }
            ListEvent::ItemRemoved { item, .. } => {
                if let Some(index) = self.is_member(&item.key) {
                    self.evict(index, item.clone());
                }
            }
            ListEvent::ItemChanged {
                index: source_index,
                old_item,
                new_item,
            } => match (self.is_member(&new_item.key), (self.predicate)(&new_item.data)) {
                (Some(index), true) => self.emit(ListEvent::ItemChanged {
                    index,
                    old_item: old_item.clone(),
                    new_item: new_item.clone(),
                }),
                (Some(index), false) => self.evict(index, old_item.clone()),
                (None, true) => self.admit(*source_index, new_item.clone()),
                (None, false) => {}
            },
            ListEvent::ItemMutated {
                index: source_index,
                item,
            } => match (self.is_member(&item.key), (self.predicate)(&item.data)) {
                (Some(index), true) => self.emit(ListEvent::ItemMutated {
                    index,
                    item: item.clone(),
                }),
                (Some(index), false) => self.evict(index, item.clone()),
                (None, true) => self.admit(*source_index, item.clone()),
                (None, false) => {}
            },
            ListEvent::ItemMoved {
                new_index, item, ..
            } => {
                let Some(old_index) = self.is_member(&item.key) else {
                    return;
                };
                self.filtered_keys.borrow_mut().remove(old_index);
                let new_filtered = self.insertion_point(*new_index);
                self.filtered_keys
                    .borrow_mut()
                    .insert(new_filtered, item.key.clone());
                if new_filtered != old_index {
                    self.emit(ListEvent::ItemMoved {
                        old_index,
                        new_index: new_filtered,
                        item: item.clone(),
                    });
                }
            }
            ListEvent::Reload => {
                self.rebuild();
                self.emit(ListEvent::Reload);
            }
        }
    }
}

impl<T: Clone + 'static> ListLike<T> for FilteredCore<T> {
    fn len(&self) -> usize {
        self.filtered_keys.borrow().len()
    }

    fn get_item(&self, index: usize) -> Option<Item<T>> {
        let key = self.filtered_keys.borrow().get(index).cloned()?;
        self.link.source().get_item_from_key(&key)
    }

    fn get_item_from_key(&self, key: &Key) -> Option<Item<T>> {
        self.is_member(key)?;
        self.link.source().get_item_from_key(key)
    }

    fn index_of_key(&self, key: &Key) -> Option<usize> {
        self.is_member(key)
    }

    fn keys(&self) -> Vec<Key> {
        self.filtered_keys.borrow().clone()
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
            InsertionAnchor::Projected,
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

/// A live view of the source items whose data satisfies a predicate.
///
/// Values inserted through the projection land in the source next to the
/// projected neighbors, so they show up where they were inserted if they
/// pass the predicate.
pub struct FilteredProjection<T> {
    inner: Rc<FilteredCore<T>>,
}

impl<T> Clone for FilteredProjection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> FilteredProjection<T> {
    /// Creates a filtered view over `source`.
    pub fn new(source: Rc<dyn ListLike<T>>, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        let inner = Rc::new(FilteredCore {
            link: SourceLink::new(source),
            predicate: Rc::new(predicate),
            filtered_keys: RefCell::new(Vec::new()),
            members: RefCell::new(HashSet::new()),
            events: EventHub::new(),
        });
        inner.rebuild();
        inner.link.connect(&inner, FilteredCore::handle);
        Self { inner }
    }

    /// Detaches from the source, empties the view and emits `reload`.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        !self.inner.link.is_connected()
    }

    fn core(&self) -> &FilteredCore<T> {
        &self.inner
    }
}

impl<T> std::fmt::Debug for FilteredProjection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredProjection")
            .field("len", &self.inner.filtered_keys.borrow().len())
            .field("listeners", &self.inner.events.listener_count())
            .finish()
    }
}

delegate_list_like!(FilteredProjection<T> => T);
