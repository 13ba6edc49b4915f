//! Grouped projection: a sorted projection ordered by group key, keeping
//! the items of each group contiguous.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use observable_list::{Item, Key, ListEvent, ListLike};

use super::groups::GroupsProjection;
use super::sorted::SortedCore;
use crate::projection::delegate_list_like;
use crate::search::SortOrder;

/// Extracts the group key of a value.
pub type GroupKeyFn<T> = Rc<dyn Fn(&T) -> String>;

/// Orders group keys.
pub type GroupComparator = Rc<dyn Fn(&str, &str) -> Ordering>;

/// Orders items by group key, caching each item's key so comparisons never
/// call back into the caller.
pub(crate) struct GroupOrder<T> {
    group_key_of: GroupKeyFn<T>,
    group_comparator: GroupComparator,
    group_keys: RefCell<HashMap<Key, String>>,
}

impl<T: 'static> SortOrder<T> for GroupOrder<T> {
    type Value = String;

    fn value_of_item(&self, item: &Item<T>) -> String {
        self.group_keys
            .borrow()
            .get(&item.key)
            .cloned()
            .unwrap_or_else(|| (self.group_key_of)(&item.data))
    }

    fn value_of_key(&self, source: &dyn ListLike<T>, key: &Key) -> Option<String> {
        if let Some(group_key) = self.group_keys.borrow().get(key) {
            return Some(group_key.clone());
        }
        source
            .get_item_from_key(key)
            .map(|item| (self.group_key_of)(&item.data))
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        (self.group_comparator)(a, b)
    }

    fn refresh(&self, item: &Item<T>) -> bool {
        let group_key = (self.group_key_of)(&item.data);
        let previous = self
            .group_keys
            .borrow_mut()
            .insert(item.key.clone(), group_key.clone());
        previous.is_some_and(|previous| previous != group_key)
    }

    fn forget(&self, key: &Key) {
        self.group_keys.borrow_mut().remove(key);
    }

    fn clear(&self) {
        self.group_keys.borrow_mut().clear();
    }

    fn decorate(&self, item: Item<T>) -> Item<T> {
        let group_key = self.value_of_item(&item);
        item.with_group_key(group_key)
    }
}

pub(crate) struct GroupedInner<T, D> {
    pub(crate) core: SortedCore<T, GroupOrder<T>>,
    pub(crate) group_data_of: Rc<dyn Fn(&T) -> D>,
    groups: RefCell<Option<GroupsProjection<T, D>>>,
}

/// A live view holding every source item ordered by group key.
///
/// Items of one group are contiguous and keep their source order. Every
/// item is exposed with its `group_key` set. A change that moves an item to
/// another group is always reported as a removal followed by an insertion.
///
/// The group comparator must return `Equal` only for identical group keys.
pub struct GroupedProjection<T, D> {
    inner: Rc<GroupedInner<T, D>>,
}

impl<T, D> Clone for GroupedProjection<T, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static, D: Clone + 'static> GroupedProjection<T, D> {
    /// Creates a grouped view over `source`, ordering groups by their keys.
    pub fn new(
        source: Rc<dyn ListLike<T>>,
        group_key_of: impl Fn(&T) -> String + 'static,
        group_data_of: impl Fn(&T) -> D + 'static,
    ) -> Self {
        Self::with_comparator(source, group_key_of, group_data_of, |a: &str, b: &str| {
            a.cmp(b)
        })
    }

    /// Creates a grouped view over `source` with a custom group ordering.
    pub fn with_comparator(
        source: Rc<dyn ListLike<T>>,
        group_key_of: impl Fn(&T) -> String + 'static,
        group_data_of: impl Fn(&T) -> D + 'static,
        group_comparator: impl Fn(&str, &str) -> Ordering + 'static,
    ) -> Self {
        let order = GroupOrder {
            group_key_of: Rc::new(group_key_of),
            group_comparator: Rc::new(group_comparator),
            group_keys: RefCell::new(HashMap::new()),
        };
        let inner = Rc::new(GroupedInner {
            core: SortedCore::new(source, order, "grouped"),
            group_data_of: Rc::new(group_data_of),
            groups: RefCell::new(None),
        });
        inner
            .core
            .link
            .connect(&inner, |inner: &GroupedInner<T, D>, event: &ListEvent<T>| {
                inner.core.handle(event)
            });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Rc<GroupedInner<T, D>>) -> Self {
        Self { inner }
    }

    /// Returns the view of group summaries, creating it on first use.
    ///
    /// Every call returns the same view until it is disposed; after that a
    /// fresh one is created.
    pub fn groups(&self) -> GroupsProjection<T, D> {
        let mut slot = self.inner.groups.borrow_mut();
        if let Some(groups) = slot.as_ref().filter(|groups| !groups.is_disposed()) {
            return groups.clone();
        }
        let groups = GroupsProjection::new(&self.inner);
        *slot = Some(groups.clone());
        groups
    }

    /// Disposes the groups view if one exists, then detaches this view from
    /// its source, empties it and emits `reload`.
    pub fn dispose(&self) {
        let groups = self.inner.groups.borrow_mut().take();
        if let Some(groups) = groups {
            groups.dispose();
        }
        self.inner.core.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.core.is_disposed()
    }

    fn core(&self) -> &SortedCore<T, GroupOrder<T>> {
        &self.inner.core
    }
}

impl<T, D> std::fmt::Debug for GroupedProjection<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedProjection")
            .field("has_groups", &self.inner.groups.borrow().is_some())
            .finish()
    }
}

delegate_list_like!(GroupedProjection<T, D> => T);
