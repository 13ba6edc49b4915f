//! Groups projection: one summary item per group of a grouped projection.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use observable_list::{EventHub, Item, Key, ListEvent, ListLike, ListenerId};

use super::grouped::{GroupedInner, GroupedProjection};
use crate::projection::delegate_list_like;

struct GroupEntry<D> {
    size: usize,
    first_item_key: Key,
    first_item_index_hint: usize,
    data: D,
}

impl<D: Clone> GroupEntry<D> {
    fn to_item(&self, group_key: &str) -> Item<D> {
        Item {
            key: Key::new(group_key),
            data: self.data.clone(),
            group_key: Some(group_key.to_string()),
            group_size: Some(self.size),
            first_item_key: Some(self.first_item_key.clone()),
            first_item_index_hint: Some(self.first_item_index_hint),
        }
    }
}

struct GroupsState<D> {
    order: Vec<String>,
    entries: HashMap<String, GroupEntry<D>>,
}

impl<D> Default for GroupsState<D> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<D: Clone> GroupsState<D> {
    fn position(&self, group_key: &str) -> Option<usize> {
        self.order.iter().position(|g| g == group_key)
    }

    /// Shifts the first-item hint of every group other than `skip` whose
    /// hint is at least `from`, queueing an `itemchanged` for each.
    fn shift_hints(&mut self, skip: &str, from: usize, grow: bool, pending: &mut Vec<ListEvent<D>>) {
        let GroupsState { order, entries } = self;
        for (index, group_key) in order.iter().enumerate() {
            if group_key == skip {
                continue;
            }
            let Some(entry) = entries.get_mut(group_key) else {
                continue;
            };
            if entry.first_item_index_hint < from {
                continue;
            }
            let old_item = entry.to_item(group_key);
            entry.first_item_index_hint = if grow {
                entry.first_item_index_hint + 1
            } else {
                entry.first_item_index_hint.saturating_sub(1)
            };
            pending.push(ListEvent::ItemChanged {
                index,
                old_item,
                new_item: entry.to_item(group_key),
            });
        }
    }
}

pub(crate) struct GroupsInner<T, D> {
    parent: Weak<GroupedInner<T, D>>,
    subscription: Cell<Option<ListenerId>>,
    state: RefCell<GroupsState<D>>,
    events: EventHub<D>,
}

impl<T: Clone + 'static, D: Clone + 'static> GroupsInner<T, D> {
    fn parent_item(&self, index: usize) -> Option<Item<T>> {
        self.parent.upgrade()?.core.get_item(index)
    }

    fn data_of(&self, value: &T) -> Option<D> {
        self.parent
            .upgrade()
            .map(|parent| (parent.group_data_of)(value))
    }

    fn emit(&self, event: ListEvent<D>) {
        tracing::trace!(event = %event.kind(), "groups event");
        self.events.dispatch(&event);
    }

    fn emit_all(&self, pending: Vec<ListEvent<D>>) {
        for event in pending {
            self.emit(event);
        }
    }

    #[tracing::instrument(skip(self))]
    fn rebuild(&self) {
        let mut state = GroupsState::default();
        if let Some(parent) = self.parent.upgrade() {
            for index in 0..parent.core.len() {
                let Some(item) = parent.core.get_item(index) else {
                    continue;
                };
                let Some(group_key) = item.group_key else {
                    continue;
                };
                match state.entries.get_mut(&group_key) {
                    Some(entry) => entry.size += 1,
                    None => {
                        state.order.push(group_key.clone());
                        state.entries.insert(
                            group_key,
                            GroupEntry {
                                size: 1,
                                first_item_key: item.key,
                                first_item_index_hint: index,
                                data: (parent.group_data_of)(&item.data),
                            },
                        );
                    }
                }
            }
        }
        let len = state.order.len();
        *self.state.borrow_mut() = state;

        metrics::counter!("projection_rebuilds_total", "kind" => "groups").increment(1);
        tracing::debug!(len, "projection rebuilt");
    }

    fn handle(&self, event: &ListEvent<T>) {
        match event {
            ListEvent::ItemInserted { index, item } => self.on_inserted(*index, item),
            ListEvent::ItemRemoved { index, item } => self.on_removed(*index, item),
            ListEvent::ItemChanged { new_item, .. } => self.on_updated(new_item),
            ListEvent::ItemMutated { item, .. } => self.on_updated(item),
            ListEvent::ItemMoved {
                old_index,
                new_index,
                item,
            } => self.on_moved(*old_index, *new_index, item),
            ListEvent::Reload => {
                self.rebuild();
                self.emit(ListEvent::Reload);
            }
        }
    }

    fn on_inserted(&self, index: usize, item: &Item<T>) {
        let Some(group_key) = item.group_key.as_deref() else {
            return;
        };
        let Some(data) = self.data_of(&item.data) else {
            return;
        };
        let mut pending = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            match state.position(group_key) {
                Some(position) => {
                    if let Some(entry) = state.entries.get_mut(group_key) {
                        let old_item = entry.to_item(group_key);
                        entry.size += 1;
                        if index <= entry.first_item_index_hint {
                            entry.first_item_key = item.key.clone();
                            entry.first_item_index_hint = index;
                            entry.data = data;
                        }
                        pending.push(ListEvent::ItemChanged {
                            index: position,
                            old_item,
                            new_item: entry.to_item(group_key),
                        });
                    }
                }
                None => {
                    let position = state
                        .order
                        .iter()
                        .position(|g| {
                            state
                                .entries
                                .get(g)
                                .is_some_and(|entry| entry.first_item_index_hint >= index)
                        })
                        .unwrap_or(state.order.len());
                    let entry = GroupEntry {
                        size: 1,
                        first_item_key: item.key.clone(),
                        first_item_index_hint: index,
                        data,
                    };
                    pending.push(ListEvent::ItemInserted {
                        index: position,
                        item: entry.to_item(group_key),
                    });
                    state.order.insert(position, group_key.to_string());
                    state.entries.insert(group_key.to_string(), entry);
                }
            }
            state.shift_hints(group_key, index, true, &mut pending);
        }
        self.emit_all(pending);
    }

    fn on_removed(&self, index: usize, item: &Item<T>) {
        let Some(group_key) = item.group_key.as_deref() else {
            return;
        };
        // the grouped view has already dropped the item, so its successor
        // now sits at `index`
        let successor = self
            .parent_item(index)
            .filter(|next| next.group_key.as_deref() == Some(group_key));
        let successor_data = successor
            .as_ref()
            .and_then(|next| self.data_of(&next.data));

        let mut pending = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            let Some(position) = state.position(group_key) else {
                return;
            };
            let Some(entry) = state.entries.get_mut(group_key) else {
                return;
            };
            let old_item = entry.to_item(group_key);
            entry.size = entry.size.saturating_sub(1);
            if entry.size == 0 {
                state.entries.remove(group_key);
                state.order.remove(position);
                pending.push(ListEvent::ItemRemoved {
                    index: position,
                    item: old_item,
                });
            } else {
                if entry.first_item_key == item.key
                    && let (Some(next), Some(data)) = (successor, successor_data)
                {
                    entry.first_item_key = next.key;
                    entry.data = data;
                }
                pending.push(ListEvent::ItemChanged {
                    index: position,
                    old_item,
                    new_item: entry.to_item(group_key),
                });
            }
            state.shift_hints(group_key, index + 1, false, &mut pending);
        }
        self.emit_all(pending);
    }

    /// Refreshes the summary data when the first item of its group changed.
    fn on_updated(&self, item: &Item<T>) {
        let Some(group_key) = item.group_key.as_deref() else {
            return;
        };
        let Some(data) = self.data_of(&item.data) else {
            return;
        };
        let event = {
            let mut state = self.state.borrow_mut();
            let Some(position) = state.position(group_key) else {
                return;
            };
            let Some(entry) = state.entries.get_mut(group_key) else {
                return;
            };
            if entry.first_item_key != item.key {
                return;
            }
            let old_item = entry.to_item(group_key);
            entry.data = data;
            ListEvent::ItemChanged {
                index: position,
                old_item,
                new_item: entry.to_item(group_key),
            }
        };
        self.emit(event);
    }

    /// Re-reads the first item of a group when a move touched its slot.
    fn on_moved(&self, old_index: usize, new_index: usize, item: &Item<T>) {
        let Some(group_key) = item.group_key.as_deref() else {
            return;
        };
        let hint = {
            let state = self.state.borrow();
            let Some(entry) = state.entries.get(group_key) else {
                return;
            };
            entry.first_item_index_hint
        };
        if old_index != hint && new_index != hint {
            return;
        }
        let Some(first) = self.parent_item(hint) else {
            return;
        };
        let Some(data) = self.data_of(&first.data) else {
            return;
        };
        let event = {
            let mut state = self.state.borrow_mut();
            let Some(position) = state.position(group_key) else {
                return;
            };
            let Some(entry) = state.entries.get_mut(group_key) else {
                return;
            };
            if entry.first_item_key == first.key {
                return;
            }
            let old_item = entry.to_item(group_key);
            entry.first_item_key = first.key;
            entry.data = data;
            ListEvent::ItemChanged {
                index: position,
                old_item,
                new_item: entry.to_item(group_key),
            }
        };
        self.emit(event);
    }

    fn read_only(&self, operation: &'static str) {
        tracing::warn!(operation, "groups view is read-only; mutation ignored");
    }
}

impl<T: Clone + 'static, D: Clone + 'static> ListLike<D> for GroupsInner<T, D> {
    fn len(&self) -> usize {
        self.state.borrow().order.len()
    }

    fn get_item(&self, index: usize) -> Option<Item<D>> {
        let state = self.state.borrow();
        let group_key = state.order.get(index)?;
        state
            .entries
            .get(group_key)
            .map(|entry| entry.to_item(group_key))
    }

    fn get_item_from_key(&self, key: &Key) -> Option<Item<D>> {
        let state = self.state.borrow();
        state
            .entries
            .get(key.as_str())
            .map(|entry| entry.to_item(key.as_str()))
    }

    fn index_of_key(&self, key: &Key) -> Option<usize> {
        self.state.borrow().position(key.as_str())
    }

    fn keys(&self) -> Vec<Key> {
        self.state.borrow().order.iter().map(Key::new).collect()
    }

    fn set_at(&self, _index: usize, _value: D) {
        self.read_only("set_at");
    }

    fn splice(&self, _index: usize, _how_many: usize, _values: Vec<D>) -> Vec<D> {
        self.read_only("splice");
        Vec::new()
    }

    fn move_item(&self, _index: usize, _new_index: usize) {
        self.read_only("move_item");
    }

    fn notify_mutated(&self, _index: usize) {
        self.read_only("notify_mutated");
    }

    fn events(&self) -> &EventHub<D> {
        &self.events
    }
}

/// A read-only live view with one summary item per group of a
/// [`GroupedProjection`], in group order.
///
/// A summary is keyed by its group key and carries `group_size`,
/// `first_item_key`, `first_item_index_hint` and the group data computed
/// from the group's first item. The hint is kept exact: it is always the
/// index of the group's first item in the grouped view. Mutators log a
/// warning and do nothing.
pub struct GroupsProjection<T, D> {
    inner: Rc<GroupsInner<T, D>>,
}

impl<T, D> Clone for GroupsProjection<T, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static, D: Clone + 'static> GroupsProjection<T, D> {
    pub(crate) fn new(parent: &Rc<GroupedInner<T, D>>) -> Self {
        let inner = Rc::new(GroupsInner {
            parent: Rc::downgrade(parent),
            subscription: Cell::new(None),
            state: RefCell::new(GroupsState::default()),
            events: EventHub::new(),
        });
        inner.rebuild();

        let weak = Rc::downgrade(&inner);
        let id = parent.core.events().add_listener(
            None,
            Rc::new(move |event: &ListEvent<T>| {
                if let Some(groups) = weak.upgrade() {
                    groups.handle(event);
                }
            }),
        );
        inner.subscription.set(Some(id));
        Self { inner }
    }

    /// Returns the grouped projection this view summarizes, if it is still
    /// alive.
    pub fn grouped(&self) -> Option<GroupedProjection<T, D>> {
        self.inner.parent.upgrade().map(GroupedProjection::from_inner)
    }

    /// Detaches from the grouped projection, empties the view and emits
    /// `reload`.
    #[tracing::instrument(skip(self))]
    pub fn dispose(&self) {
        let Some(id) = self.inner.subscription.take() else {
            return;
        };
        if let Some(parent) = self.inner.parent.upgrade() {
            parent.core.events().remove_listener(id);
        }
        tracing::debug!("groups view disposed");
        *self.inner.state.borrow_mut() = GroupsState::default();
        self.inner.emit(ListEvent::Reload);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.subscription.get().is_none()
    }

    fn core(&self) -> &GroupsInner<T, D> {
        &self.inner
    }
}

impl<T, D> std::fmt::Debug for GroupsProjection<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupsProjection")
            .field("groups", &self.inner.state.borrow().order)
            .finish()
    }
}

delegate_list_like!(GroupsProjection<T, D> => D);
