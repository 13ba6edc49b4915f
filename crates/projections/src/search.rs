//! Stable ordering primitives shared by the sorted and grouped projections.
//!
//! Ties are broken by position in the source: among items that compare
//! equal, the projection keeps the order they have in the source right now.
//! Binary search alone cannot place an item inside a run of equal items, so
//! a tie is resolved by finding the nearest tying neighbor in the source and
//! anchoring on its sorted position.

use std::cmp::Ordering;

use observable_list::{Item, Key, ListLike};

/// How a sorted projection orders its items.
pub(crate) trait SortOrder<T>: 'static {
    /// The value items are compared by.
    type Value;

    /// Returns the sort value of a source item.
    fn value_of_item(&self, item: &Item<T>) -> Self::Value;

    /// Returns the sort value of the source item under `key`.
    fn value_of_key(&self, source: &dyn ListLike<T>, key: &Key) -> Option<Self::Value>;

    fn compare(&self, a: &Self::Value, b: &Self::Value) -> Ordering;

    /// Recomputes any cached state for `item`.
    ///
    /// Returns true when the item changed ordering class and must be
    /// announced as a removal followed by an insertion.
    fn refresh(&self, _item: &Item<T>) -> bool {
        false
    }

    /// Drops cached state for a key that left the projection.
    fn forget(&self, _key: &Key) {}

    /// Drops all cached state.
    fn clear(&self) {}

    /// Returns the item as the projection exposes it.
    fn decorate(&self, item: Item<T>) -> Item<T> {
        item
    }
}

/// Insertion search over a sorted key sequence.
pub(crate) struct Search<'a, T, O: SortOrder<T>> {
    pub(crate) order: &'a O,
    pub(crate) source: &'a dyn ListLike<T>,
    pub(crate) sorted: &'a [Key],
}

impl<T, O: SortOrder<T>> Search<'_, T, O> {
    fn compare_to(&self, value: &O::Value, key: &Key) -> Ordering {
        match self.order.value_of_key(self.source, key) {
            Some(other) => self.order.compare(value, &other),
            None => Ordering::Equal,
        }
    }

    /// Returns where `key`, currently at `source_index` in the source and
    /// absent from the sorted sequence, belongs.
    pub(crate) fn insertion_pos(&self, key: &Key, value: &O::Value, source_index: usize) -> usize {
        let (mut lo, mut hi) = (0, self.sorted.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.compare_to(value, &self.sorted[mid]) {
                Ordering::Less => hi = mid,
                Ordering::Greater => lo = mid + 1,
                Ordering::Equal => return self.resolve_tie(key, value, source_index, lo, hi),
            }
        }
        lo
    }

    /// Places a tied item by its nearest tying neighbor in the source,
    /// scanning toward whichever end of the source is closer. Without such a
    /// neighbor the item opens (scanning left) or closes (scanning right)
    /// the run of equal items. The whole run lies within `lo..hi`.
    fn resolve_tie(
        &self,
        key: &Key,
        value: &O::Value,
        source_index: usize,
        lo: usize,
        hi: usize,
    ) -> usize {
        let source_len = self.source.len();
        let scan_left = source_index < source_len / 2;
        let neighbors: Box<dyn Iterator<Item = usize>> = if scan_left {
            Box::new((0..source_index.min(source_len)).rev())
        } else {
            Box::new(source_index + 1..source_len)
        };

        let mut run = None;
        for index in neighbors {
            let Some(item) = self.source.get_item(index) else {
                continue;
            };
            if item.key == *key
                || self.order.compare(value, &self.order.value_of_item(&item)) != Ordering::Equal
            {
                continue;
            }
            let (start, end) = *run.get_or_insert_with(|| {
                (
                    self.find_beginning_of_group(value, lo, hi),
                    self.find_end_of_group(value, lo, hi),
                )
            });
            if let Some(offset) = self.sorted[start..end].iter().position(|k| *k == item.key) {
                let anchor = start + offset;
                return if scan_left { anchor + 1 } else { anchor };
            }
        }

        if scan_left {
            self.find_beginning_of_group(value, lo, hi)
        } else {
            self.find_end_of_group(value, lo, hi)
        }
    }

    /// First position in `lo..hi` whose item does not sort before `value`.
    fn find_beginning_of_group(&self, value: &O::Value, mut lo: usize, mut hi: usize) -> usize {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.compare_to(value, &self.sorted[mid]) == Ordering::Greater {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// First position in `lo..hi` whose item sorts after `value`.
    fn find_end_of_group(&self, value: &O::Value, mut lo: usize, mut hi: usize) -> usize {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.compare_to(value, &self.sorted[mid]) == Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

/// Stable top-down merge sort.
pub(crate) fn merge_sort<E>(mut entries: Vec<E>, compare: &impl Fn(&E, &E) -> Ordering) -> Vec<E> {
    if entries.len() <= 1 {
        return entries;
    }
    let right = entries.split_off(entries.len() / 2);
    let left = merge_sort(entries, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        // equal elements keep their left-hand (earlier) order
        let next = if compare(r, l) == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    merged
}
