//! Storage layer for observable lists.
//!
//! An [`ItemStore`] owns the authoritative order of a list ([`KeySequence`])
//! and the key→item map. It performs no notification; the list built on top
//! of it decides what to announce.

pub mod sequence;
pub mod store;

pub use common::{Item, Key};
pub use sequence::KeySequence;
pub use store::ItemStore;
