use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    rc::Rc,
};

struct Shared<T> {
    loaded: Cell<bool>,
    value: RefCell<T>,
}

/// Shared-ownership wrapper around a decoded resource.
///
/// Every decode operation in this crate hands its result back through a
/// `ResourceHandle`. Cloning shares the same underlying value, and the value
/// is dropped exactly once, when the last handle referencing it goes away.
/// An [`alias`](Self::alias) participates in the reference count of the
/// canonical instance rather than carrying an unmanaged pointer, so it can
/// never outlive or double-free what it aliases.
///
/// The `loaded` flag is orthogonal to ownership: it is set once the wrapped
/// resource has finished constructing, letting consumers tell a default
/// placeholder apart from a completed decode. Reference counting is not
/// synchronized; handles stay on one thread.
pub struct ResourceHandle<T> {
    shared: Rc<Shared<T>>,
}

impl<T> ResourceHandle<T> {
    /// Create an owning handle over `value`. The handle starts unloaded.
    pub fn new(value: T) -> Self {
        Self {
            shared: Rc::new(Shared {
                loaded: Cell::new(false),
                value: RefCell::new(value),
            }),
        }
    }

    /// Create a handle aliasing the same underlying resource.
    pub fn alias(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }

    /// Mark the wrapped resource as fully constructed. The flag is shared by
    /// every handle referencing the resource.
    pub fn set_loaded(&self) {
        self.shared.loaded.set(true);
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.get()
    }

    /// Number of handles currently sharing the resource.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.shared)
    }

    /// Immutably borrow the wrapped resource.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.shared.value.borrow()
    }

    /// Mutably borrow the wrapped resource, e.g. to tick a skeleton.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.shared.value.borrow_mut()
    }
}

impl<T> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        self.alias()
    }
}

impl<T: Default> Default for ResourceHandle<T> {
    /// A default-constructed, unloaded resource.
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("loaded", &self.is_loaded())
            .field("value", &self.borrow())
            .finish()
    }
}
