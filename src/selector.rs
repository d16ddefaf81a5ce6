//! Selectors: per-consumer subscriptions to a projection of a context value.

use crate::equality::Equality;
use crate::error::Result;
use crate::handle::SelectorContext;
use crate::storage::{
    try_with_holder_storage, with_holder_storage, HolderId, Listener, ListenerId,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A subscription to a projection of a context value.
///
/// A selector is subscribed from the moment it is created until
/// [`unsubscribe`](Self::unsubscribe) is called or it is dropped, whichever
/// comes first. It never re-subscribes.
///
/// After every commit of the provider it subscribed to, the selector
/// recomputes its projection. If the result differs from the cached snapshot
/// under the selector's equality function, the snapshot is replaced and the
/// `on_change` callback runs. Otherwise nothing happens and the old snapshot
/// is kept.
///
/// Reads recompute too, so a read always reflects the latest committed value
/// even when a notification has not been processed yet.
pub struct Selector<S: 'static> {
    inner: Rc<SelectorInner<S>>,
}

struct SelectorInner<S> {
    holder: HolderId,
    read: Box<dyn Fn() -> Result<S>>,
    equality: Equality<S>,
    snapshot: RefCell<S>,
    listener: Cell<Option<ListenerId>>,
}

impl<S> SelectorInner<S> {
    /// Recompute the projection; `Ok(true)` if the snapshot was replaced.
    fn poll(&self) -> Result<bool> {
        let next = (self.read)()?;
        let mut snapshot = self.snapshot.borrow_mut();
        if (self.equality)(&*snapshot, &next) {
            return Ok(false);
        }
        *snapshot = next;
        Ok(true)
    }
}

impl<S: 'static> Selector<S> {
    pub(crate) fn subscribe<T: 'static>(
        context: SelectorContext<T>,
        projection: impl Fn(&T) -> S + 'static,
        equality: Equality<S>,
        on_change: impl Fn() + 'static,
    ) -> Self {
        let holder = context.resolve();
        let read: Box<dyn Fn() -> Result<S>> = Box::new(move || {
            let value = with_holder_storage(|storage| storage.shared::<T>(holder))?;
            Ok(projection(&value))
        });
        let initial = read().expect("Context holder not found");

        let inner = Rc::new(SelectorInner {
            holder,
            read,
            equality,
            snapshot: RefCell::new(initial),
            listener: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let listener: Listener = Rc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // A commit hands out its listener list up front; skip selectors
            // that unsubscribed while it was being walked.
            if inner.listener.get().is_none() {
                return;
            }
            if inner.poll().unwrap_or(false) {
                on_change();
            }
        });
        let listener_id = with_holder_storage(|storage| storage.add_listener(holder, listener));
        inner.listener.set(listener_id);
        log::trace!("selector subscribed to {holder:?}");

        Self { inner }
    }

    /// Get the current projection.
    ///
    /// Once the provider is gone this keeps returning the last snapshot.
    pub fn get(&self) -> S
    where
        S: Clone,
    {
        self.refresh();
        self.inner.snapshot.borrow().clone()
    }

    /// Get the current projection, or an error if the provider is gone.
    pub fn try_get(&self) -> Result<S>
    where
        S: Clone,
    {
        self.inner.poll()?;
        Ok(self.inner.snapshot.borrow().clone())
    }

    /// Read the current projection with a closure.
    ///
    /// The snapshot stays borrowed while `f` runs, so `f` must not commit to
    /// the provider this selector reads.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.refresh();
        f(&self.inner.snapshot.borrow())
    }

    /// Recompute the projection. Returns true if the snapshot changed.
    pub fn refresh(&self) -> bool {
        self.inner.poll().unwrap_or(false)
    }

    /// Stop listening for commits. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listener) = self.inner.listener.take() {
            let holder = self.inner.holder;
            let removed =
                try_with_holder_storage(|storage| storage.remove_listener(holder, listener));
            drop(removed);
            log::trace!("selector unsubscribed from {holder:?}");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.listener.get().is_some()
    }

    /// Whether the provider this selector reads from is still mounted.
    pub fn is_mounted(&self) -> bool {
        with_holder_storage(|storage| storage.contains(self.inner.holder))
    }
}

impl<S: 'static> Drop for Selector<S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<S: 'static + fmt::Debug> fmt::Debug for Selector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("holder", &self.inner.holder)
            .field("snapshot", &*self.inner.snapshot.borrow())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn counter() -> (Arc<Mutex<usize>>, impl Fn() + 'static) {
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        (count, move || *count_clone.lock() += 1)
    }

    #[test]
    fn test_selector_initial_snapshot() {
        let context = create_context((1, 'a'));
        let _provider = context.provide((2, 'b'));
        let selector = context.select(|(n, _)| *n, || {});
        assert_eq!(selector.get(), 2);
        assert!(selector.is_subscribed());
        assert!(selector.is_mounted());
    }

    #[test]
    fn test_unchanged_projection_is_silent() {
        let context = create_context((0, 0));
        let provider = context.provide((0, 0));
        let (calls, on_change) = counter();
        let selector = context.select(|(a, _)| *a, on_change);

        provider.set((0, 1));
        provider.set((0, 2));
        assert_eq!(*calls.lock(), 0);

        provider.set((5, 2));
        assert_eq!(*calls.lock(), 1);
        assert_eq!(selector.get(), 5);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let context = create_context(0);
        let provider = context.provide(0);
        let (calls, on_change) = counter();
        let selector = context.select(|n| *n, on_change);

        selector.unsubscribe();
        selector.unsubscribe();
        assert!(!selector.is_subscribed());
        assert_eq!(provider.listener_count(), 0);

        provider.set(1);
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let context = create_context(0);
        let provider = context.provide(0);
        let (calls, on_change) = counter();
        drop(context.select(|n| *n, on_change));
        assert_eq!(provider.listener_count(), 0);
        provider.set(1);
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_snapshot_survives_unmount() {
        let context = create_context(0);
        let provider = context.provide(7);
        let selector = context.select(|n| *n, || {});
        drop(provider);

        assert!(!selector.is_mounted());
        assert_eq!(selector.get(), 7);
        assert_eq!(selector.try_get(), Err(Error::ProviderUnmounted));
    }

    #[test]
    fn test_custom_equality() {
        let context = create_context(0i32);
        let provider = context.provide(0);
        let (calls, on_change) = counter();
        // Only changes of sign count.
        let selector = context.select_with(
            |n| *n,
            |last: &i32, next: &i32| last.signum() == next.signum(),
            on_change,
        );

        provider.set(3);
        provider.set(8);
        assert_eq!(*calls.lock(), 1);
        // The cached value is returned while the comparison says equal.
        assert_eq!(selector.get(), 3);

        provider.set(-1);
        assert_eq!(*calls.lock(), 2);
        assert_eq!(selector.get(), -1);
    }

    #[test]
    fn test_identity_equality_for_callbacks() {
        type Callback = std::rc::Rc<dyn Fn() -> i32>;
        let first: Callback = std::rc::Rc::new(|| 1);
        let context = create_context((0, first.clone()));
        let provider = context.provide((0, first.clone()));
        let (calls, on_change) = counter();
        let selector = context.select_with(|(_, f)| f.clone(), equality::identity, on_change);

        provider.set((1, first.clone()));
        assert_eq!(*calls.lock(), 0);

        provider.set((1, std::rc::Rc::new(|| 2)));
        assert_eq!(*calls.lock(), 1);
        assert_eq!((selector.get())(), 2);
    }

    #[test]
    fn test_on_change_may_commit() {
        let source = create_context(0);
        let mirror = create_context(0);
        let source_provider = source.provide(0);
        let mirror_provider = std::rc::Rc::new(mirror.provide(0));

        let watched = std::rc::Rc::new(Mutex::new(None::<Selector<i32>>));
        let mirror_clone = mirror_provider.clone();
        let watched_clone = watched.clone();
        *watched.lock() = Some(source.select(|n| *n, move || {
            if let Some(selector) = watched_clone.lock().as_ref() {
                mirror_clone.set(selector.get() * 10);
            }
        }));

        source_provider.set(4);
        assert_eq!(mirror_provider.with(|n| *n), 40);
        assert_eq!(mirror.select(|n| *n, || {}).get(), 40);
    }

    #[test]
    fn test_unsubscribe_during_commit_skips_later_listener() {
        let context = create_context(0);
        let provider = context.provide(0);
        let later = std::rc::Rc::new(Mutex::new(None::<Selector<i32>>));

        let later_clone = later.clone();
        let _first = context.select(|n| *n, move || {
            if let Some(selector) = later_clone.lock().as_ref() {
                selector.unsubscribe();
            }
        });
        let (calls, on_change) = counter();
        *later.lock() = Some(context.select(|n| *n, on_change));

        provider.set(1);
        assert_eq!(*calls.lock(), 0);
        assert!(later.lock().as_ref().is_some_and(|s| !s.is_subscribed()));

        provider.set(2);
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_projection_may_read_other_selectors() {
        let offset = create_context(100);
        let offset_provider = offset.provide(100);
        let offset_selector = offset.select(|n| *n, || {});

        let context = create_context(0);
        let provider = context.provide(1);
        let (calls, on_change) = counter();
        let selector = context.select(move |n| n + offset_selector.get(), on_change);
        assert_eq!(selector.get(), 101);

        provider.set(2);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(selector.get(), 102);

        // Reads pick up the other context too, but only commits notify.
        offset_provider.set(200);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(selector.get(), 202);
    }

    #[test]
    fn test_shallow_equality_on_shared_items() {
        let item = std::rc::Rc::new(String::from("a"));
        let context = create_context(vec![item.clone()]);
        let provider = context.provide(vec![item.clone()]);
        let (calls, on_change) = counter();
        let selector = context.select_with(|items| items.clone(), equality::shallow, on_change);

        // Same allocation in a new list: unchanged.
        provider.set(vec![item.clone()]);
        assert_eq!(*calls.lock(), 0);

        // Equal contents, different allocation: changed.
        provider.set(vec![std::rc::Rc::new(String::from("a"))]);
        assert_eq!(*calls.lock(), 1);
        assert!(!std::rc::Rc::ptr_eq(&selector.get()[0], &item));
    }
}
