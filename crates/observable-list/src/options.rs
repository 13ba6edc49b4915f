//! Construction options for observable lists.

use std::cell::RefCell;
use std::rc::Rc;

/// Hook applied to every value as it enters a list.
pub type Binding<T> = Rc<dyn Fn(T) -> T>;

/// Caller-owned storage a list can operate on in proxy mode.
///
/// The list writes every change through, so the storage always holds the
/// list's current values in order. A slot holding `None` is a hole; proxy
/// mode refuses storage with holes.
pub type ProxyStorage<T> = Rc<RefCell<Vec<Option<T>>>>;

/// Options for building an [`ObservableList`](crate::ObservableList).
pub struct ListOptions<T> {
    pub(crate) binding: Option<Binding<T>>,
}

impl<T> ListOptions<T> {
    /// Creates options with no binding hook.
    pub fn new() -> Self {
        Self { binding: None }
    }

    /// Creates options that pass every incoming value through `binding`.
    pub fn with_binding(binding: impl Fn(T) -> T + 'static) -> Self {
        Self {
            binding: Some(Rc::new(binding)),
        }
    }
}

impl<T> Default for ListOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ListOptions<T> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ListOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListOptions")
            .field("binding", &self.binding.is_some())
            .finish()
    }
}
