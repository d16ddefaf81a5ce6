//! Context handles.

use crate::equality::{self, Equality};
use crate::provider::Provider;
use crate::selector::Selector;
use crate::storage::{with_holder_storage, HolderId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

/// A handle to a piece of shared state that views read through selectors.
///
/// The handle owns a default value, used by selectors created while no
/// provider is mounted. The handle has no way to read the whole value: every
/// read goes through [`select`](Self::select), and readers re-render only for
/// the slice they use.
///
/// Each call to [`create_context`] makes an independent context; handles are
/// `Copy` and can be passed freely to the views that need them.
///
/// ```rust,no_run
/// use gpui_context_selector::prelude::*;
///
/// let context = create_context((0i32, String::from("hello")));
/// let provider = context.provide((0, String::from("hello")));
/// let count = context.select(|(count, _)| *count, || {});
///
/// provider.set((1, String::from("hello")));
/// assert_eq!(count.get(), 1);
/// ```
pub struct SelectorContext<T> {
    id: HolderId,
    _phantom: PhantomData<fn() -> T>,
}

/// Create a new context whose selectors read `default` until a provider mounts.
pub fn create_context<T: 'static>(default: T) -> SelectorContext<T> {
    SelectorContext::new(default)
}

impl<T> Copy for SelectorContext<T> {}

impl<T> Clone for SelectorContext<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for SelectorContext<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SelectorContext<T> {}

impl<T> Hash for SelectorContext<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for SelectorContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorContext")
            .field("id", &self.id)
            .finish()
    }
}

impl<T: 'static> SelectorContext<T> {
    pub fn new(default: T) -> Self {
        let id = with_holder_storage(|storage| storage.insert(default));
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Mount a provider for this context.
    ///
    /// Selectors created while the provider is alive read its value. Providers
    /// nest: the most recently mounted one wins until it is dropped.
    pub fn provide(&self, initial: T) -> Provider<T> {
        Provider::mount(*self, initial)
    }

    /// Subscribe to a projection of the context value.
    ///
    /// `on_change` runs after a commit that changed the projection, compared
    /// with `PartialEq`. The projection gets a shared handle to the committed
    /// value, so it may read other selectors. The equality function runs with
    /// this selector's snapshot borrowed and must not read the same selector.
    pub fn select<S>(
        &self,
        projection: impl Fn(&T) -> S + 'static,
        on_change: impl Fn() + 'static,
    ) -> Selector<S>
    where
        S: PartialEq + 'static,
    {
        self.select_with(projection, equality::structural::<S>, on_change)
    }

    /// Like [`select`](Self::select) with a custom equality function.
    pub fn select_with<S: 'static>(
        &self,
        projection: impl Fn(&T) -> S + 'static,
        equality: impl Fn(&S, &S) -> bool + 'static,
        on_change: impl Fn() + 'static,
    ) -> Selector<S> {
        let equality: Equality<S> = Rc::new(equality);
        Selector::subscribe(*self, projection, equality, on_change)
    }

    /// Whether any provider is currently mounted for this context.
    pub fn has_provider(&self) -> bool {
        with_holder_storage(|storage| storage.nearest(self.id) != self.id)
    }

    /// The holder new selectors read from: innermost provider, else the default.
    pub(crate) fn resolve(&self) -> HolderId {
        with_holder_storage(|storage| storage.nearest(self.id))
    }

    /// Get the context's root holder ID (mainly for debugging).
    pub fn id(&self) -> HolderId {
        self.id
    }
}
