//! Ordered key sequence with lazy materialization.

use crate::Key;

/// The positional order of a list's keys.
///
/// A list that has only ever been appended to holds the keys `"0"` through
/// `"len-1"` in order, so no vector is needed. The first operation that
/// breaks that shape moves the sequence to [`KeySequence::Materialized`];
/// there is no transition back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySequence {
    /// Position `i` holds `Key::from_counter(i)`.
    Implicit(usize),
    /// Explicit key order.
    Materialized(Vec<Key>),
}

impl Default for KeySequence {
    fn default() -> Self {
        Self::Implicit(0)
    }
}

impl KeySequence {
    /// Returns the number of keys in the sequence.
    pub fn len(&self) -> usize {
        match self {
            Self::Implicit(len) => *len,
            Self::Materialized(keys) => keys.len(),
        }
    }

    /// Returns true if the sequence holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once an explicit key vector has been allocated.
    pub fn is_materialized(&self) -> bool {
        matches!(self, Self::Materialized(_))
    }

    /// Returns the key at `index`.
    pub fn key_at(&self, index: usize) -> Option<Key> {
        match self {
            Self::Implicit(len) if index < *len => Some(Key::from_counter(index as u64)),
            Self::Implicit(_) => None,
            Self::Materialized(keys) => keys.get(index).cloned(),
        }
    }

    /// Returns the position of `key`.
    pub fn position_of(&self, key: &Key) -> Option<usize> {
        match self {
            Self::Implicit(len) => key
                .as_str()
                .parse::<usize>()
                .ok()
                .filter(|&index| index < *len && Key::from_counter(index as u64) == *key),
            Self::Materialized(keys) => keys.iter().position(|k| k == key),
        }
    }

    /// Returns all keys in order.
    pub fn to_vec(&self) -> Vec<Key> {
        match self {
            Self::Implicit(len) => (0..*len as u64).map(Key::from_counter).collect(),
            Self::Materialized(keys) => keys.clone(),
        }
    }

    /// Forces an explicit key vector and returns it.
    pub fn materialize(&mut self) -> &mut Vec<Key> {
        if let Self::Implicit(len) = *self {
            tracing::debug!(len, "materializing key sequence");
            *self = Self::Materialized((0..len as u64).map(Key::from_counter).collect());
        }
        match self {
            Self::Materialized(keys) => keys,
            Self::Implicit(_) => unreachable!("key sequence was just materialized"),
        }
    }

    /// Appends `key` at the tail.
    ///
    /// Stays implicit only if `key` is exactly the next implicit key.
    pub fn append(&mut self, key: Key) {
        match self {
            Self::Implicit(len) if Key::from_counter(*len as u64) == key => *len += 1,
            _ => self.materialize().push(key),
        }
    }

    /// Inserts `key` at `index`. Returns false if `index > len`.
    pub fn insert(&mut self, index: usize, key: Key) -> bool {
        let len = self.len();
        if index > len {
            return false;
        }
        if index == len {
            self.append(key);
        } else {
            self.materialize().insert(index, key);
        }
        true
    }

    /// Removes and returns the key at `index`.
    ///
    /// Removing the tail of an implicit sequence keeps it implicit.
    pub fn remove(&mut self, index: usize) -> Option<Key> {
        let len = self.len();
        if index >= len {
            return None;
        }
        match self {
            Self::Implicit(len) if index + 1 == *len => {
                *len -= 1;
                Some(Key::from_counter(index as u64))
            }
            _ => Some(self.materialize().remove(index)),
        }
    }

    /// Moves the key at `from` to `to`, returning it.
    ///
    /// Returns `None` when either index is out of range or they are equal.
    pub fn relocate(&mut self, from: usize, to: usize) -> Option<Key> {
        let len = self.len();
        if from == to || from >= len || to >= len {
            return None;
        }
        let keys = self.materialize();
        let key = keys.remove(from);
        keys.insert(to, key.clone());
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(seq: &KeySequence) -> Vec<String> {
        seq.to_vec().into_iter().map(String::from).collect()
    }

    #[test]
    fn appends_in_counter_order_stay_implicit() {
        let mut seq = KeySequence::default();
        for i in 0..4 {
            seq.append(Key::from_counter(i));
        }
        assert_eq!(seq, KeySequence::Implicit(4));
        assert_eq!(seq.key_at(2), Some(Key::from("2")));
        assert_eq!(seq.position_of(&Key::from("3")), Some(3));
        assert_eq!(seq.position_of(&Key::from("4")), None);
    }

    #[test]
    fn non_canonical_key_text_is_not_found_implicitly() {
        let seq = KeySequence::Implicit(3);
        assert_eq!(seq.position_of(&Key::from("01")), None);
        assert_eq!(seq.position_of(&Key::from("+1")), None);
    }

    #[test]
    fn tail_removal_stays_implicit_but_next_append_materializes() {
        let mut seq = KeySequence::Implicit(3);
        assert_eq!(seq.remove(2), Some(Key::from("2")));
        assert!(!seq.is_materialized());

        // the counter has moved on, so key "3" lands at position 2
        seq.append(Key::from_counter(3));
        assert!(seq.is_materialized());
        assert_eq!(keys(&seq), vec!["0", "1", "3"]);
    }

    #[test]
    fn insert_in_the_middle_materializes() {
        let mut seq = KeySequence::Implicit(2);
        assert!(seq.insert(1, Key::from("9")));
        assert_eq!(keys(&seq), vec!["0", "9", "1"]);
        assert!(!seq.insert(5, Key::from("10")));
    }

    #[test]
    fn relocate_moves_key() {
        let mut seq = KeySequence::Implicit(3);
        assert_eq!(seq.relocate(0, 2), Some(Key::from("0")));
        assert_eq!(keys(&seq), vec!["1", "2", "0"]);
        assert_eq!(seq.position_of(&Key::from("0")), Some(2));
    }

    #[test]
    fn relocate_rejects_noop_and_out_of_range() {
        let mut seq = KeySequence::Implicit(3);
        assert_eq!(seq.relocate(1, 1), None);
        assert_eq!(seq.relocate(0, 3), None);
        assert!(!seq.is_materialized());
    }
}
