//! Change events and the listener registry.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Item, Key};

/// The six kinds of notification a list or projection emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    ItemChanged,
    ItemInserted,
    ItemMoved,
    ItemMutated,
    ItemRemoved,
    Reload,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 6] = [
        EventKind::ItemChanged,
        EventKind::ItemInserted,
        EventKind::ItemMoved,
        EventKind::ItemMutated,
        EventKind::ItemRemoved,
        EventKind::Reload,
    ];

    /// Returns the canonical event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ItemChanged => "itemchanged",
            EventKind::ItemInserted => "iteminserted",
            EventKind::ItemMoved => "itemmoved",
            EventKind::ItemMutated => "itemmutated",
            EventKind::ItemRemoved => "itemremoved",
            EventKind::Reload => "reload",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event name: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// A change notification.
///
/// Indices are positions in the emitting view, valid against its state at
/// the moment the event is delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent<T> {
    /// The value under an existing key was replaced.
    ItemChanged {
        index: usize,
        old_item: Item<T>,
        new_item: Item<T>,
    },
    /// A key entered the view.
    ItemInserted { index: usize, item: Item<T> },
    /// A key changed position without changing value.
    ItemMoved {
        old_index: usize,
        new_index: usize,
        item: Item<T>,
    },
    /// The value under a key changed internally without being replaced.
    ItemMutated { index: usize, item: Item<T> },
    /// A key left the view.
    ItemRemoved { index: usize, item: Item<T> },
    /// Incremental state must be discarded and recomputed.
    Reload,
}

impl<T> ListEvent<T> {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            ListEvent::ItemChanged { .. } => EventKind::ItemChanged,
            ListEvent::ItemInserted { .. } => EventKind::ItemInserted,
            ListEvent::ItemMoved { .. } => EventKind::ItemMoved,
            ListEvent::ItemMutated { .. } => EventKind::ItemMutated,
            ListEvent::ItemRemoved { .. } => EventKind::ItemRemoved,
            ListEvent::Reload => EventKind::Reload,
        }
    }

    /// Returns the key the event is about, if any.
    pub fn key(&self) -> Option<&Key> {
        match self {
            ListEvent::ItemChanged { new_item, .. } => Some(&new_item.key),
            ListEvent::ItemInserted { item, .. }
            | ListEvent::ItemMoved { item, .. }
            | ListEvent::ItemMutated { item, .. }
            | ListEvent::ItemRemoved { item, .. } => Some(&item.key),
            ListEvent::Reload => None,
        }
    }
}

/// A registered event callback.
pub type Listener<T> = Rc<dyn Fn(&ListEvent<T>)>;

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration<T> {
    id: ListenerId,
    kind: Option<EventKind>,
    listener: Listener<T>,
}

/// Listener registry owned by every list and projection.
///
/// Listeners run synchronously, in registration order. Dispatch works on a
/// snapshot of the registry, so a listener may register or unregister
/// listeners while an event is being delivered.
pub struct EventHub<T> {
    registrations: RefCell<Vec<Registration<T>>>,
    next_id: Cell<u64>,
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self {
            registrations: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<T> std::fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<T> EventHub<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for one event kind, or for all kinds when
    /// `kind` is `None`.
    pub fn add_listener(&self, kind: Option<EventKind>, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.registrations.borrow_mut().push(Registration {
            id,
            kind,
            listener,
        });
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.borrow_mut();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registrations.borrow().len()
    }

    /// Delivers `event` to every matching listener.
    pub fn dispatch(&self, event: &ListEvent<T>) {
        let kind = event.kind();
        let listeners: Vec<Listener<T>> = self
            .registrations
            .borrow()
            .iter()
            .filter(|r| r.kind.is_none_or(|k| k == kind))
            .map(|r| Rc::clone(&r.listener))
            .collect();

        metrics::counter!("observable_list_events_total", "event" => kind.as_str()).increment(1);

        for listener in listeners {
            listener(event);
        }
    }
}
