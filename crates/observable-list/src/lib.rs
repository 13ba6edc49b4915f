//! Observable list: a mutable, ordered, keyed collection that announces
//! every change.
//!
//! - [`ObservableList`] is the root collection; every mutator emits
//!   [`ListEvent`]s synchronously before returning
//! - [`ListLike`] is the capability shared by the list and every projection
//!   built on it; [`ListLikeExt`] adds read-only traversal
//! - [`EventHub`] is the listener registry each view owns

pub mod error;
pub mod event;
pub mod list;
pub mod list_like;
pub mod options;

pub use common::{Item, Key};
pub use error::{ListError, Result};
pub use event::{EventHub, EventKind, ListEvent, Listener, ListenerId};
pub use list::ObservableList;
pub use list_like::{ListLike, ListLikeExt};
pub use options::{Binding, ListOptions, ProxyStorage};
