//! Machinery shared by every projection: the link to the source view and
//! translation of projection-local mutations into source mutations.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use observable_list::{Key, ListEvent, ListLike, ListenerId, ObservableList};

/// Connection from a projection to the view it derives from.
///
/// The projection holds its source strongly; the source's listener holds
/// the projection weakly, so dropping every projection handle detaches it.
pub(crate) struct SourceLink<T> {
    source: RefCell<Rc<dyn ListLike<T>>>,
    subscription: Cell<Option<ListenerId>>,
}

impl<T: Clone + 'static> SourceLink<T> {
    pub(crate) fn new(source: Rc<dyn ListLike<T>>) -> Self {
        Self {
            source: RefCell::new(source),
            subscription: Cell::new(None),
        }
    }

    /// Returns the current source.
    pub(crate) fn source(&self) -> Rc<dyn ListLike<T>> {
        Rc::clone(&self.source.borrow())
    }

    /// Subscribes `handler` to every source event on behalf of `owner`.
    pub(crate) fn connect<P: 'static>(&self, owner: &Rc<P>, handler: fn(&P, &ListEvent<T>)) {
        let owner = Rc::downgrade(owner);
        let id = self.source().add_event_listener(
            None,
            Rc::new(move |event: &ListEvent<T>| {
                if let Some(owner) = owner.upgrade() {
                    handler(&owner, event);
                }
            }),
        );
        self.subscription.set(Some(id));
    }

    /// Unsubscribes and swaps the source for an empty list.
    ///
    /// Returns false if the link was already disconnected.
    pub(crate) fn disconnect(&self) -> bool {
        let Some(id) = self.subscription.take() else {
            return false;
        };
        self.source().remove_event_listener(id);
        *self.source.borrow_mut() = Rc::new(ObservableList::<T>::new());
        true
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.subscription.get().is_some()
    }
}

impl<T> Drop for SourceLink<T> {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.source.borrow().events().remove_listener(id);
        }
    }
}

/// Where values inserted through a projection land in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertionAnchor {
    /// Next to the source position of the projected neighbors, so the
    /// values show up at the requested projection index when they pass.
    Projected,
    /// At the source tail; the projection's ordering places them.
    SourceTail,
}

fn key_at<T>(view: &dyn ListLike<T>, index: usize) -> Option<Key> {
    view.get_item(index).map(|item| item.key)
}

fn source_index_at<T>(view: &dyn ListLike<T>, source: &dyn ListLike<T>, index: usize) -> Option<usize> {
    key_at(view, index).and_then(|key| source.index_of_key(&key))
}

pub(crate) fn forward_set_at<T>(view: &dyn ListLike<T>, source: &dyn ListLike<T>, index: usize, value: T) {
    match source_index_at(view, source, index) {
        Some(source_index) => source.set_at(source_index, value),
        None if index == view.len() => {
            source.push(vec![value]);
        }
        None => tracing::debug!(index, len = view.len(), "set_at past the end ignored"),
    }
}

/// Applies a projection-relative splice to the source.
///
/// Targeted items are replaced in place while values last, and removed
/// from the source after that. Surplus values are inserted according to
/// `anchor`.
pub(crate) fn forward_splice<T: Clone>(
    view: &dyn ListLike<T>,
    source: &dyn ListLike<T>,
    index: usize,
    how_many: usize,
    values: Vec<T>,
    anchor: InsertionAnchor,
) -> Vec<T> {
    let len = view.len();
    let index = index.min(len);
    let how_many = how_many.min(len - index);
    let targets: Vec<Key> = (index..index + how_many)
        .filter_map(|i| key_at(view, i))
        .collect();

    let mut values = values.into_iter();
    let mut displaced = Vec::with_capacity(targets.len());
    let mut last_replaced = None;

    for key in targets {
        let Some(source_index) = source.index_of_key(&key) else {
            continue;
        };
        match values.next() {
            Some(value) => {
                displaced.extend(source.get_at(source_index));
                source.set_at(source_index, value);
                last_replaced = Some(key);
            }
            None => displaced.extend(source.splice(source_index, 1, Vec::new())),
        }
    }

    let rest: Vec<T> = values.collect();
    if rest.is_empty() {
        return displaced;
    }

    let position = match anchor {
        InsertionAnchor::SourceTail => source.len(),
        InsertionAnchor::Projected => last_replaced
            .and_then(|key| source.index_of_key(&key))
            .map(|i| i + 1)
            .or_else(|| source_index_at(view, source, index))
            .unwrap_or_else(|| source.len()),
    };
    source.splice(position, 0, rest);
    displaced
}

/// Moves the projected item at `index` to the source position of the
/// projected item currently at `new_index`.
pub(crate) fn forward_move<T>(view: &dyn ListLike<T>, source: &dyn ListLike<T>, index: usize, new_index: usize) {
    if index == new_index {
        return;
    }
    let (Some(from), Some(to)) = (
        source_index_at(view, source, index),
        source_index_at(view, source, new_index),
    ) else {
        return;
    };
    source.move_item(from, to);
}

pub(crate) fn forward_notify_mutated<T>(view: &dyn ListLike<T>, source: &dyn ListLike<T>, index: usize) {
    if let Some(source_index) = source_index_at(view, source, index) {
        source.notify_mutated(source_index);
    }
}

/// Implements `ListLike` for a projection handle by delegating every
/// required method to the core returned by its `core()` method.
macro_rules! delegate_list_like {
    ($handle:ident<$($param:ident),+> => $item:ident) => {
        impl<$($param: Clone + 'static),+> observable_list::ListLike<$item> for $handle<$($param),+> {
            fn len(&self) -> usize {
                observable_list::ListLike::len(self.core())
            }

            fn get_item(&self, index: usize) -> Option<observable_list::Item<$item>> {
                observable_list::ListLike::get_item(self.core(), index)
            }

            fn get_item_from_key(
                &self,
                key: &observable_list::Key,
            ) -> Option<observable_list::Item<$item>> {
                observable_list::ListLike::get_item_from_key(self.core(), key)
            }

            fn index_of_key(&self, key: &observable_list::Key) -> Option<usize> {
                observable_list::ListLike::index_of_key(self.core(), key)
            }

            fn keys(&self) -> Vec<observable_list::Key> {
                observable_list::ListLike::keys(self.core())
            }

            fn set_at(&self, index: usize, value: $item) {
                observable_list::ListLike::set_at(self.core(), index, value)
            }

            fn splice(&self, index: usize, how_many: usize, values: Vec<$item>) -> Vec<$item> {
                observable_list::ListLike::splice(self.core(), index, how_many, values)
            }

            fn move_item(&self, index: usize, new_index: usize) {
                observable_list::ListLike::move_item(self.core(), index, new_index)
            }

            fn notify_mutated(&self, index: usize) {
                observable_list::ListLike::notify_mutated(self.core(), index)
            }

            fn events(&self) -> &observable_list::EventHub<$item> {
                observable_list::ListLike::events(self.core())
            }
        }
    };
}

pub(crate) use delegate_list_like;

#[cfg(test)]
mod tests {
    use super::*;
    use observable_list::ListLikeExt;

    struct Counter {
        seen: RefCell<usize>,
    }

    impl Counter {
        fn on_event(&self, _event: &ListEvent<i32>) {
            *self.seen.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_connect_delivers_events() {
        let list = ObservableList::from_values([1, 2]);
        let link = SourceLink::new(Rc::new(list.clone()) as Rc<dyn ListLike<i32>>);
        let counter = Rc::new(Counter {
            seen: RefCell::new(0),
        });
        link.connect(&counter, Counter::on_event);

        list.push(vec![3]);
        assert_eq!(*counter.seen.borrow(), 1);
        assert!(link.is_connected());
    }

    #[test]
    fn test_dropped_owner_stops_receiving() {
        let list = ObservableList::from_values([1]);
        let link = SourceLink::new(Rc::new(list.clone()) as Rc<dyn ListLike<i32>>);
        let counter = Rc::new(Counter {
            seen: RefCell::new(0),
        });
        link.connect(&counter, Counter::on_event);
        drop(counter);

        // listener stays registered but upgrades fail
        list.push(vec![2]);
        assert_eq!(list.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_dropped_link_unregisters() {
        let list = ObservableList::from_values([1]);
        let counter = Rc::new(Counter {
            seen: RefCell::new(0),
        });
        {
            let link = SourceLink::new(Rc::new(list.clone()) as Rc<dyn ListLike<i32>>);
            link.connect(&counter, Counter::on_event);
            assert_eq!(list.events().listener_count(), 1);
        }
        assert_eq!(list.events().listener_count(), 0);
        list.push(vec![2]);
        assert_eq!(*counter.seen.borrow(), 0);
    }

    #[test]
    fn test_disconnect_swaps_in_empty_source() {
        let list = ObservableList::from_values([1, 2]);
        let link = SourceLink::new(Rc::new(list.clone()) as Rc<dyn ListLike<i32>>);
        let counter = Rc::new(Counter {
            seen: RefCell::new(0),
        });
        link.connect(&counter, Counter::on_event);

        assert!(link.disconnect());
        assert!(!link.disconnect());
        assert_eq!(link.source().len(), 0);
        assert_eq!(list.events().listener_count(), 0);

        list.push(vec![3]);
        assert_eq!(*counter.seen.borrow(), 0);
    }

    #[test]
    fn test_forward_splice_on_identity_view() {
        let list = ObservableList::from_values([1, 2, 3, 4]);
        let displaced = forward_splice(&list, &list, 1, 2, vec![20], InsertionAnchor::Projected);
        assert_eq!(displaced, vec![2, 3]);
        assert_eq!(list.to_vec(), vec![1, 20, 4]);

        forward_splice(&list, &list, 1, 0, vec![7, 8], InsertionAnchor::Projected);
        assert_eq!(list.to_vec(), vec![1, 7, 8, 20, 4]);

        forward_splice(&list, &list, 0, 0, vec![9], InsertionAnchor::SourceTail);
        assert_eq!(list.to_vec(), vec![1, 7, 8, 20, 4, 9]);
    }
}
