use serde::{Deserialize, Serialize};

/// Unique identifier for an item in a list.
///
/// Keys are assigned once, when a value enters a list, and are never
/// reused for a different value. They are strings so that group keys
/// can double as item keys in a groups view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Creates a key from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Creates the key a list assigns to its `counter`-th value.
    pub fn from_counter(counter: u64) -> Self {
        Self(counter.to_string())
    }

    /// Returns the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

/// A keyed value as exposed by a list or projection.
///
/// The group fields are only populated on items synthesized by grouping
/// projections: grouped items carry `group_key`, group summaries carry all
/// four. `first_item_index_hint` bounds a search range and may lag behind
/// the grouped view it describes between events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<T> {
    pub key: Key,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_item_key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_item_index_hint: Option<usize>,
}

impl<T> Item<T> {
    /// Creates a plain item with no group metadata.
    pub fn new(key: Key, data: T) -> Self {
        Self {
            key,
            data,
            group_key: None,
            group_size: None,
            first_item_key: None,
            first_item_index_hint: None,
        }
    }

    /// Returns the item tagged with the group it belongs to.
    pub fn with_group_key(mut self, group_key: impl Into<String>) -> Self {
        self.group_key = Some(group_key.into());
        self
    }
}
