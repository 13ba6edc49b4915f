//! Live projections over observable lists.
//!
//! Every projection is itself a [`ListLike`](observable_list::ListLike)
//! view that stays consistent with its source by translating the source's
//! change events incrementally:
//! - [`FilteredProjection`] keeps the items satisfying a predicate
//! - [`SortedProjection`] orders items by a comparator, ties in source order
//! - [`GroupedProjection`] clusters items by group key and exposes a
//!   [`GroupsProjection`] of per-group summaries
//! - [`ProjectionFactory`] builds any of them from any view, so projections
//!   chain
//!
//! Projections mutate through to their source and can be detached with
//! `dispose`, after which they are empty and emit `reload`.

pub mod factory;
mod projection;
mod search;
pub mod views;

pub use factory::ProjectionFactory;
pub use views::{
    FilteredProjection, GroupComparator, GroupKeyFn, GroupedProjection, GroupsProjection,
    SortedProjection,
};
