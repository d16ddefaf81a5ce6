//! Providers: the single writer of a context holder.

use crate::handle::SelectorContext;
use crate::storage::{notify_listeners, try_with_holder_storage, with_holder_storage, HolderId};
use std::cell::{Cell, RefCell};
use std::fmt;

/// A mounted provider for a [`SelectorContext`].
///
/// A provider owns its own holder for as long as it lives. Values reach the
/// holder in two steps that mirror a render pass and its commit:
/// [`stage`](Self::stage) records the latest value, and
/// [`commit`](Self::commit) writes it and notifies every subscribed selector
/// in subscription order. Staging twice before a commit drops the first value,
/// so selectors never observe it.
///
/// Dropping the provider unmounts it. Its holder and listener set are
/// destroyed and later selectors on the context fall back to the next outer
/// provider, or to the default value.
pub struct Provider<T: 'static> {
    context: SelectorContext<T>,
    holder: HolderId,
    pending: RefCell<Option<T>>,
    batch_depth: Cell<usize>,
}

impl<T: 'static> Provider<T> {
    pub(crate) fn mount(context: SelectorContext<T>, initial: T) -> Self {
        let holder = with_holder_storage(|storage| {
            let holder = storage.insert(initial);
            storage.push_provider(context.id(), holder);
            holder
        });
        log::debug!("mounted provider {holder:?} for context {:?}", context.id());

        Self {
            context,
            holder,
            pending: RefCell::new(None),
            batch_depth: Cell::new(0),
        }
    }

    /// Record the latest value without publishing it.
    pub fn stage(&self, value: T) {
        *self.pending.borrow_mut() = Some(value);
    }

    /// Publish the staged value, if any.
    ///
    /// The holder is written before any listener runs. Returns `false` when
    /// nothing was staged or when called inside [`batch`](Self::batch), which
    /// commits once on exit instead.
    pub fn commit(&self) -> bool {
        if self.batch_depth.get() > 0 {
            return false;
        }
        let Some(value) = self.pending.borrow_mut().take() else {
            return false;
        };

        let Some(listeners) = with_holder_storage(|storage| storage.commit(self.holder, value))
        else {
            return false;
        };
        log::trace!(
            "provider {:?} committed, notifying {} listener(s)",
            self.holder,
            listeners.len()
        );
        notify_listeners(listeners);
        true
    }

    /// Stage and commit in one step.
    pub fn set(&self, value: T) {
        self.stage(value);
        self.commit();
    }

    /// Update the latest value with a closure and commit the result.
    ///
    /// Starts from the staged value if there is one, otherwise from a clone of
    /// the committed value.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let staged = self.pending.borrow_mut().take();
        let mut value = match staged {
            Some(value) => value,
            None => self.with(T::clone),
        };
        f(&mut value);
        self.set(value);
    }

    /// Run `f` with commits deferred, then commit once.
    ///
    /// Selectors only see the last value staged inside the batch.
    pub fn batch(&self, f: impl FnOnce(&Self)) {
        self.batch_depth.set(self.batch_depth.get() + 1);
        {
            // Restores the depth even if `f` unwinds.
            let _guard = BatchGuard(&self.batch_depth);
            f(self);
        }
        if self.batch_depth.get() == 0 {
            self.commit();
        }
    }

    /// Read the committed value with a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = with_holder_storage(|storage| storage.shared::<T>(self.holder))
            .expect("Provider holder not found");
        f(&value)
    }

    /// Number of commits so far.
    pub fn version(&self) -> u64 {
        with_holder_storage(|storage| storage.version(self.holder).unwrap_or_default())
    }

    /// Number of selectors currently subscribed to this provider.
    pub fn listener_count(&self) -> usize {
        with_holder_storage(|storage| storage.listener_count(self.holder))
    }

    pub fn context(&self) -> SelectorContext<T> {
        self.context
    }
}

struct BatchGuard<'a>(&'a Cell<usize>);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl<T: 'static> Drop for Provider<T> {
    fn drop(&mut self) {
        let root = self.context.id();
        let holder = self.holder;
        let removed = try_with_holder_storage(|storage| {
            storage.remove_provider(root, holder);
            storage.remove(holder)
        });
        drop(removed);
        log::debug!("unmounted provider {holder:?} for context {root:?}");
    }
}

impl<T: 'static + fmt::Debug> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Provider");
        debug.field("holder", &self.holder);
        self.with(|value| {
            debug.field("value", value);
        });
        debug.finish()
    }
}
