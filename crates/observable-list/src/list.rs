//! The root observable collection.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use item_store::ItemStore;

use crate::{
    Binding, EventHub, Item, Key, ListError, ListEvent, ListLike, ListOptions, ProxyStorage,
    Result,
};

struct ListState<T> {
    store: ItemStore<T>,
    proxy: Option<ProxyStorage<T>>,
}

struct ListInner<T> {
    state: RefCell<ListState<T>>,
    binding: Option<Binding<T>>,
    events: EventHub<T>,
}

/// A mutable, ordered, keyed collection that emits change events.
///
/// Handles are cheap to clone and share one underlying list. Every mutator
/// updates the list one item at a time and delivers the matching event
/// before moving on, so a listener always observes a state consistent with
/// the event it is handling.
///
/// Listeners must not mutate the list they are listening to in ways that
/// invalidate the indices of the event being delivered. In proxy mode the
/// caller must not hold a borrow of the storage across a mutation.
pub struct ObservableList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ObservableList")
            .field("len", &state.store.len())
            .field("materialized", &state.store.sequence().is_materialized())
            .field("proxy", &state.proxy.is_some())
            .field("listeners", &self.inner.events.listener_count())
            .finish()
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::with_options(std::iter::empty(), ListOptions::new())
    }

    /// Creates a list holding `values` in order.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::with_options(values.into_iter().map(Some), ListOptions::new())
    }

    /// Creates a list by copying `values`, skipping holes.
    pub fn with_options(values: impl IntoIterator<Item = Option<T>>, options: ListOptions<T>) -> Self {
        let binding = options.binding;
        let store = values
            .into_iter()
            .flatten()
            .map(|value| apply_binding(&binding, value))
            .collect();
        Self::from_parts(store, None, binding)
    }

    /// Creates a list that operates on caller-owned `storage`.
    ///
    /// Bound values are written back into the storage, and every later
    /// mutation is mirrored there.
    pub fn proxy(storage: ProxyStorage<T>, options: ListOptions<T>) -> Result<Self> {
        let binding = options.binding;
        let store: ItemStore<T> = {
            let mut slots = storage.borrow_mut();
            if let Some(index) = slots.iter().position(Option::is_none) {
                return Err(ListError::UnsupportedProxySource { index });
            }
            for slot in slots.iter_mut() {
                *slot = slot.take().map(|value| apply_binding(&binding, value));
            }
            slots.iter().flatten().cloned().collect()
        };
        Ok(Self::from_parts(store, Some(storage), binding))
    }

    fn from_parts(
        store: ItemStore<T>,
        proxy: Option<ProxyStorage<T>>,
        binding: Option<Binding<T>>,
    ) -> Self {
        Self {
            inner: Rc::new(ListInner {
                state: RefCell::new(ListState { store, proxy }),
                binding,
                events: EventHub::new(),
            }),
        }
    }

    /// Returns true once the list had to allocate an explicit key order.
    pub fn has_materialized_keys(&self) -> bool {
        self.inner.state.borrow().store.sequence().is_materialized()
    }

    /// Announces that every view over this list must be recomputed.
    pub fn notify_reload(&self) {
        tracing::debug!("list reload requested");
        self.emit(ListEvent::Reload);
    }

    /// Reverses the list in place and emits `reload`.
    pub fn reverse(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.store.reverse();
            mirror_all(&state);
        }
        self.emit(ListEvent::Reload);
    }

    /// Stably sorts the list in place and emits `reload`.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.store.sort_by(compare);
            mirror_all(&state);
        }
        self.emit(ListEvent::Reload);
    }

    fn emit(&self, event: ListEvent<T>) {
        tracing::trace!(event = %event.kind(), "list event");
        self.inner.events.dispatch(&event);
    }

    fn insert_one(&self, index: usize, value: T) {
        let value = apply_binding(&self.inner.binding, value);
        let item = {
            let mut state = self.inner.state.borrow_mut();
            let Some(item) = state.store.insert(index, value).cloned() else {
                return;
            };
            if let Some(proxy) = &state.proxy {
                proxy.borrow_mut().insert(index, Some(item.data.clone()));
            }
            item
        };
        self.emit(ListEvent::ItemInserted { index, item });
    }

    fn remove_one(&self, index: usize) -> Option<T> {
        let item = {
            let mut state = self.inner.state.borrow_mut();
            let item = state.store.remove(index)?;
            if let Some(proxy) = &state.proxy {
                proxy.borrow_mut().remove(index);
            }
            item
        };
        let value = item.data.clone();
        self.emit(ListEvent::ItemRemoved { index, item });
        Some(value)
    }

    fn replace_one(&self, index: usize, value: T) -> Option<T> {
        let value = apply_binding(&self.inner.binding, value);
        let (old_item, new_item) = {
            let mut state = self.inner.state.borrow_mut();
            let old_item = state.store.replace(index, value)?;
            let new_item = state.store.get(index)?.clone();
            if let Some(proxy) = &state.proxy
                && let Some(slot) = proxy.borrow_mut().get_mut(index)
            {
                *slot = Some(new_item.data.clone());
            }
            (old_item, new_item)
        };
        let old_value = old_item.data.clone();
        self.emit(ListEvent::ItemChanged {
            index,
            old_item,
            new_item,
        });
        Some(old_value)
    }
}

impl<T: Clone + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> From<Vec<T>> for ObservableList<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_values(values)
    }
}

impl<T: Clone + 'static> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl<T: Clone + 'static> ListLike<T> for ObservableList<T> {
    fn len(&self) -> usize {
        self.inner.state.borrow().store.len()
    }

    fn get_item(&self, index: usize) -> Option<Item<T>> {
        self.inner.state.borrow().store.get(index).cloned()
    }

    fn get_item_from_key(&self, key: &Key) -> Option<Item<T>> {
        self.inner.state.borrow().store.get_by_key(key).cloned()
    }

    fn index_of_key(&self, key: &Key) -> Option<usize> {
        self.inner.state.borrow().store.position_of(key)
    }

    fn keys(&self) -> Vec<Key> {
        self.inner.state.borrow().store.keys()
    }

    fn set_at(&self, index: usize, value: T) {
        let len = self.len();
        if index < len {
            self.replace_one(index, value);
        } else if index == len {
            self.insert_one(index, value);
        } else {
            tracing::debug!(index, len, "set_at past the end ignored");
        }
    }

    /// The first `min(how_many, values.len())` slots are replaced in place
    /// and keep their keys (`itemchanged`). Surplus removals follow in
    /// ascending order (`itemremoved`), then surplus values are inserted
    /// under fresh keys (`iteminserted`).
    fn splice(&self, index: usize, how_many: usize, values: Vec<T>) -> Vec<T> {
        let len = self.len();
        let index = index.min(len);
        let how_many = how_many.min(len - index);

        let mut values = values.into_iter();
        let mut displaced = Vec::with_capacity(how_many);
        let mut position = index;
        let mut remaining = how_many;

        while remaining > 0 {
            let Some(value) = values.next() else { break };
            displaced.extend(self.replace_one(position, value));
            position += 1;
            remaining -= 1;
        }
        for _ in 0..remaining {
            displaced.extend(self.remove_one(position));
        }
        for value in values {
            self.insert_one(position, value);
            position += 1;
        }
        displaced
    }

    fn move_item(&self, index: usize, new_index: usize) {
        let item = {
            let mut state = self.inner.state.borrow_mut();
            let Some(item) = state.store.relocate(index, new_index).cloned() else {
                return;
            };
            if let Some(proxy) = &state.proxy {
                let mut slots = proxy.borrow_mut();
                let slot = slots.remove(index);
                slots.insert(new_index, slot);
            }
            item
        };
        self.emit(ListEvent::ItemMoved {
            old_index: index,
            new_index,
            item,
        });
    }

    fn notify_mutated(&self, index: usize) {
        let Some(item) = self.get_item(index) else {
            return;
        };
        self.emit(ListEvent::ItemMutated { index, item });
    }

    fn events(&self) -> &EventHub<T> {
        &self.inner.events
    }
}

fn apply_binding<T>(binding: &Option<Binding<T>>, value: T) -> T {
    match binding {
        Some(bind) => bind(value),
        None => value,
    }
}

fn mirror_all<T: Clone>(state: &ListState<T>) {
    if let Some(proxy) = &state.proxy {
        *proxy.borrow_mut() = state.store.values().cloned().map(Some).collect();
    }
}
