//! Live views derived from a source list.

pub mod filtered;
pub mod grouped;
pub mod groups;
pub mod sorted;

pub use filtered::FilteredProjection;
pub use grouped::{GroupComparator, GroupKeyFn, GroupedProjection};
pub use groups::GroupsProjection;
pub use sorted::SortedProjection;
