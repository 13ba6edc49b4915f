//! Projection constructors available on every view.

use std::cmp::Ordering;
use std::rc::Rc;

use observable_list::ListLike;

use crate::views::{FilteredProjection, GroupedProjection, SortedProjection};

/// Creates live projections over `self`.
///
/// Implemented for every cloneable [`ListLike`], lists and projections
/// alike, so projections chain: a sorted view of a filtered view is built
/// the same way as a sorted view of a list.
pub trait ProjectionFactory<T: Clone + 'static>: ListLike<T> + Clone + Sized + 'static {
    /// Creates a view of the items whose value satisfies `predicate`.
    fn create_filtered(&self, predicate: impl Fn(&T) -> bool + 'static) -> FilteredProjection<T> {
        FilteredProjection::new(Rc::new(self.clone()), predicate)
    }

    /// Creates a view of every item ordered by `comparator`, ties in
    /// source order.
    fn create_sorted(
        &self,
        comparator: impl Fn(&T, &T) -> Ordering + 'static,
    ) -> SortedProjection<T> {
        SortedProjection::new(Rc::new(self.clone()), comparator)
    }

    /// Creates a view of every item clustered by group key, groups in key
    /// order.
    fn create_grouped<D: Clone + 'static>(
        &self,
        group_key_of: impl Fn(&T) -> String + 'static,
        group_data_of: impl Fn(&T) -> D + 'static,
    ) -> GroupedProjection<T, D> {
        GroupedProjection::new(Rc::new(self.clone()), group_key_of, group_data_of)
    }

    /// Like [`create_grouped`](Self::create_grouped), ordering groups with
    /// `group_comparator`.
    fn create_grouped_by<D: Clone + 'static>(
        &self,
        group_key_of: impl Fn(&T) -> String + 'static,
        group_data_of: impl Fn(&T) -> D + 'static,
        group_comparator: impl Fn(&str, &str) -> Ordering + 'static,
    ) -> GroupedProjection<T, D> {
        GroupedProjection::with_comparator(
            Rc::new(self.clone()),
            group_key_of,
            group_data_of,
            group_comparator,
        )
    }
}

impl<T: Clone + 'static, L: ListLike<T> + Clone + 'static> ProjectionFactory<T> for L {}
