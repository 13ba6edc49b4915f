//! The capability shared by lists and projections.

use crate::{EventHub, EventKind, Item, Key, ListError, Listener, ListenerId, ObservableList, Result};

/// A keyed, ordered view that announces its changes.
///
/// Implemented by [`ObservableList`] and by every projection. Projections
/// hold their source as `Rc<dyn ListLike<T>>`, so the trait stays object
/// safe; generic traversal lives in [`ListLikeExt`].
///
/// Mutators never fail on bad indices: they clamp or do nothing.
pub trait ListLike<T> {
    /// Returns the number of items in the view.
    fn len(&self) -> usize;

    /// Returns the item at `index`.
    fn get_item(&self, index: usize) -> Option<Item<T>>;

    /// Returns the item stored under `key`.
    fn get_item_from_key(&self, key: &Key) -> Option<Item<T>>;

    /// Returns the position of `key` in this view.
    fn index_of_key(&self, key: &Key) -> Option<usize>;

    /// Returns the keys of this view in order.
    fn keys(&self) -> Vec<Key>;

    /// Replaces the value at `index`, or appends when `index == len`.
    fn set_at(&self, index: usize, value: T);

    /// Removes `how_many` items starting at `index` and inserts `values`
    /// there. Returns the displaced values.
    fn splice(&self, index: usize, how_many: usize, values: Vec<T>) -> Vec<T>;

    /// Moves the item at `index` to `new_index`.
    fn move_item(&self, index: usize, new_index: usize);

    /// Announces that the value at `index` changed internally.
    fn notify_mutated(&self, index: usize);

    /// Returns the listener registry of this view.
    fn events(&self) -> &EventHub<T>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at `index`.
    fn get_at(&self, index: usize) -> Option<T> {
        self.get_item(index).map(|item| item.data)
    }

    /// Appends `values`, returning the new length.
    fn push(&self, values: Vec<T>) -> usize {
        self.splice(self.len(), 0, values);
        self.len()
    }

    /// Removes and returns the last value.
    fn pop(&self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.splice(len - 1, 1, Vec::new()).pop()
    }

    /// Removes and returns the first value.
    fn shift(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.splice(0, 1, Vec::new()).pop()
    }

    /// Prepends `values`, returning the new length.
    fn unshift(&self, values: Vec<T>) -> usize {
        self.splice(0, 0, values);
        self.len()
    }

    /// Truncates the view to `length` items.
    ///
    /// Lengths at or above the current length leave the view untouched; a
    /// negative length fails with [`ListError::IllegalLength`].
    fn set_length(&self, length: isize) -> Result<()> {
        let requested =
            usize::try_from(length).map_err(|_| ListError::IllegalLength { requested: length })?;
        let len = self.len();
        if requested < len {
            self.splice(requested, len - requested, Vec::new());
        }
        Ok(())
    }

    /// Registers a listener for one event kind, or all kinds.
    fn add_event_listener(&self, kind: Option<EventKind>, listener: Listener<T>) -> ListenerId {
        self.events().add_listener(kind, listener)
    }

    /// Unregisters a listener.
    fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.events().remove_listener(id)
    }
}

/// Read-only traversal over any [`ListLike`], computed by materializing the
/// current ordered values.
pub trait ListLikeExt<T: Clone>: ListLike<T> {
    fn to_vec(&self) -> Vec<T> {
        (0..self.len()).filter_map(|index| self.get_at(index)).collect()
    }

    fn items(&self) -> Vec<Item<T>> {
        (0..self.len()).filter_map(|index| self.get_item(index)).collect()
    }

    fn for_each(&self, mut f: impl FnMut(&T, usize)) {
        for (index, value) in self.to_vec().iter().enumerate() {
            f(value, index);
        }
    }

    fn map<U>(&self, mut f: impl FnMut(&T, usize) -> U) -> Vec<U> {
        self.to_vec()
            .iter()
            .enumerate()
            .map(|(index, value)| f(value, index))
            .collect()
    }

    fn filter(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<T> {
        self.to_vec().into_iter().filter(|value| predicate(value)).collect()
    }

    fn some(&self, predicate: impl FnMut(&T) -> bool) -> bool {
        self.to_vec().iter().any(predicate)
    }

    fn every(&self, predicate: impl FnMut(&T) -> bool) -> bool {
        self.to_vec().iter().all(predicate)
    }

    fn reduce<A>(&self, init: A, f: impl FnMut(A, &T) -> A) -> A {
        self.to_vec().iter().fold(init, f)
    }

    /// Returns values in `start..end`, clamped to the view.
    fn slice(&self, start: usize, end: usize) -> Vec<T> {
        let values = self.to_vec();
        let end = end.min(values.len());
        let start = start.min(end);
        values[start..end].to_vec()
    }

    fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.to_vec().iter().position(|v| v == value)
    }

    fn last_index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.to_vec().iter().rposition(|v| v == value)
    }

    fn join(&self, separator: &str) -> String
    where
        T: std::fmt::Display,
    {
        self.to_vec()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Returns a new list holding this view's values followed by `values`.
    fn concat(&self, values: impl IntoIterator<Item = T>) -> ObservableList<T>
    where
        T: 'static,
    {
        self.to_vec().into_iter().chain(values).collect()
    }
}

impl<T: Clone, L: ListLike<T> + ?Sized> ListLikeExt<T> for L {}
