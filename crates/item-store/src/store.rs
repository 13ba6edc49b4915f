use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{Item, Key, KeySequence};

/// In-memory item store backing an observable list.
///
/// Holds the ordered key sequence, the key→item map, and the key counter.
/// Every key in the sequence has exactly one entry in the map.
#[derive(Debug, Clone)]
pub struct ItemStore<T> {
    sequence: KeySequence,
    items: HashMap<Key, Item<T>>,
    next_key: u64,
}

impl<T> Default for ItemStore<T> {
    fn default() -> Self {
        Self {
            sequence: KeySequence::default(),
            items: HashMap::new(),
            next_key: 0,
        }
    }
}

impl<T> ItemStore<T> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of items stored.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns true if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Returns the ordered key sequence.
    pub fn sequence(&self) -> &KeySequence {
        &self.sequence
    }

    /// Returns all keys in order.
    pub fn keys(&self) -> Vec<Key> {
        self.sequence.to_vec()
    }

    /// Returns the key at `index`.
    pub fn key_at(&self, index: usize) -> Option<Key> {
        self.sequence.key_at(index)
    }

    /// Returns the position of `key`.
    pub fn position_of(&self, key: &Key) -> Option<usize> {
        self.sequence.position_of(key)
    }

    /// Returns the item at `index`.
    pub fn get(&self, index: usize) -> Option<&Item<T>> {
        self.key_at(index).and_then(|key| self.items.get(&key))
    }

    /// Returns the item stored under `key`.
    pub fn get_by_key(&self, key: &Key) -> Option<&Item<T>> {
        self.items.get(key)
    }

    /// Returns stored values in order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index).map(|item| &item.data))
    }

    fn assign_key(&mut self) -> Key {
        let key = Key::from_counter(self.next_key);
        self.next_key += 1;
        key
    }

    /// Inserts `data` at `index` under a fresh key.
    ///
    /// Returns `None` (and stores nothing) when `index > len`.
    pub fn insert(&mut self, index: usize, data: T) -> Option<&Item<T>> {
        if index > self.len() {
            return None;
        }
        let key = self.assign_key();
        self.sequence.insert(index, key.clone());
        Some(
            self.items
                .entry(key.clone())
                .or_insert_with(|| Item::new(key, data)),
        )
    }

    /// Appends `data` under a fresh key.
    pub fn push(&mut self, data: T) -> &Item<T> {
        let key = self.assign_key();
        self.sequence.append(key.clone());
        self.items
            .entry(key.clone())
            .or_insert_with(|| Item::new(key, data))
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Item<T>> {
        let key = self.sequence.remove(index)?;
        self.items.remove(&key)
    }

    /// Replaces the data at `index`, keeping its key.
    ///
    /// Returns the previous item.
    pub fn replace(&mut self, index: usize, data: T) -> Option<Item<T>> {
        let key = self.key_at(index)?;
        let item = self.items.get_mut(&key)?;
        let old = std::mem::replace(&mut item.data, data);
        Some(Item::new(key, old))
    }

    /// Moves the item at `from` to `to`.
    pub fn relocate(&mut self, from: usize, to: usize) -> Option<&Item<T>> {
        let key = self.sequence.relocate(from, to)?;
        self.items.get(&key)
    }

    /// Reverses the key order in place.
    pub fn reverse(&mut self) {
        self.sequence.materialize().reverse();
    }

    /// Stably sorts the key order by the stored data.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let items = &self.items;
        self.sequence.materialize().sort_by(|a, b| {
            match (items.get(a), items.get(b)) {
                (Some(a), Some(b)) => compare(&a.data, &b.data),
                _ => Ordering::Equal,
            }
        });
    }
}

impl<T> FromIterator<T> for ItemStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = Self::new();
        for data in iter {
            store.push(data);
        }
        store
    }
}
