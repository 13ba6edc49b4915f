//! Shared types for the observable list engine.
//!
//! - [`Key`]: the permanent identity assigned to a value when it enters a list
//! - [`Item`]: a keyed value as seen through a list or projection

pub mod types;

pub use types::{Item, Key};
