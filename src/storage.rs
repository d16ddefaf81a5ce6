//! Generational arena storage for context holders.
//!
//! Every mounted provider, and every context's default value, owns one holder
//! slot. Slot map keys are generational, so a selector that outlives its
//! provider sees a missing holder instead of whatever value reuses the slot.

use crate::error::{Error, Result};
use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

new_key_type! {
    /// Unique identifier for a holder in the storage.
    pub struct HolderId;
}

/// Registration of one listener on one holder.
///
/// Ids are handed out in increasing order, so iterating a holder's listener
/// map visits them in subscription order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Listener callback fired after every commit.
pub(crate) type Listener = Rc<dyn Fn()>;

/// Latest committed value plus the callbacks interested in it.
pub(crate) struct Holder {
    /// The value, shared and type-erased. Readers clone the `Rc` out so
    /// projections run after the storage borrow is released.
    value: Rc<dyn Any>,
    /// Bumped on every commit.
    version: u64,
    listeners: BTreeMap<ListenerId, Listener>,
    /// Provider holders mounted under this one, innermost last.
    /// Only populated on a context's default holder.
    providers: Vec<HolderId>,
}

/// Thread-local storage for all holders.
pub(crate) struct HolderStorage {
    holders: SlotMap<HolderId, Holder>,
    next_listener: u64,
}

impl HolderStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self {
            holders: SlotMap::with_key(),
            next_listener: 0,
        }
    }

    /// Insert a new holder and return its ID.
    pub fn insert<T: 'static>(&mut self, value: T) -> HolderId {
        self.holders.insert(Holder {
            value: Rc::new(value),
            version: 0,
            listeners: BTreeMap::new(),
            providers: Vec::new(),
        })
    }

    /// Detach a holder together with its listener set.
    ///
    /// The holder is returned so the caller can drop it, and with it any
    /// listener closures, after the storage borrow is released.
    pub fn remove(&mut self, id: HolderId) -> Option<Holder> {
        self.holders.remove(id)
    }

    pub fn contains(&self, id: HolderId) -> bool {
        self.holders.contains_key(id)
    }

    /// Take a shared handle to a holder's value.
    ///
    /// The handle stays valid after the storage borrow ends, so callers can
    /// run projections without holding the storage.
    pub fn shared<T: 'static>(&self, id: HolderId) -> Result<Rc<T>> {
        let holder = self.holders.get(id).ok_or(Error::ProviderUnmounted)?;
        holder
            .value
            .clone()
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch(std::any::type_name::<T>()))
    }

    pub fn version(&self, id: HolderId) -> Option<u64> {
        self.holders.get(id).map(|holder| holder.version)
    }

    /// Write a new value into a holder and return the listeners to notify.
    ///
    /// The value and version are updated before the listener list is taken,
    /// so every listener run by the caller reads the new value.
    pub fn commit<T: 'static>(&mut self, id: HolderId, value: T) -> Option<Vec<Listener>> {
        let holder = self.holders.get_mut(id)?;
        holder.value = Rc::new(value);
        holder.version += 1;
        Some(holder.listeners.values().cloned().collect())
    }

    /// Register a listener on a holder.
    pub fn add_listener(&mut self, id: HolderId, listener: Listener) -> Option<ListenerId> {
        let holder = self.holders.get_mut(id)?;
        let listener_id = ListenerId(self.next_listener);
        self.next_listener += 1;
        holder.listeners.insert(listener_id, listener);
        Some(listener_id)
    }

    /// Deregister a listener, handing the callback back to be dropped by
    /// the caller. `None` if either the holder or the listener is gone.
    pub fn remove_listener(&mut self, id: HolderId, listener: ListenerId) -> Option<Listener> {
        self.holders
            .get_mut(id)
            .and_then(|holder| holder.listeners.remove(&listener))
    }

    pub fn listener_count(&self, id: HolderId) -> usize {
        self.holders
            .get(id)
            .map_or(0, |holder| holder.listeners.len())
    }

    /// Record `provider` as the innermost provider of the context `root`.
    pub fn push_provider(&mut self, root: HolderId, provider: HolderId) {
        if let Some(holder) = self.holders.get_mut(root) {
            holder.providers.push(provider);
        }
    }

    /// Forget a provider of `root`, wherever it sits in the stack.
    pub fn remove_provider(&mut self, root: HolderId, provider: HolderId) {
        if let Some(holder) = self.holders.get_mut(root) {
            holder.providers.retain(|id| *id != provider);
        }
    }

    /// The holder a new selector on context `root` should read from.
    pub fn nearest(&self, root: HolderId) -> HolderId {
        self.holders
            .get(root)
            .and_then(|holder| holder.providers.last().copied())
            .unwrap_or(root)
    }
}

thread_local! {
    static STORAGE: RefCell<HolderStorage> = RefCell::new(HolderStorage::new());
}

/// Access the thread-local holder storage.
pub(crate) fn with_holder_storage<R>(f: impl FnOnce(&mut HolderStorage) -> R) -> R {
    STORAGE.with(|storage| f(&mut storage.borrow_mut()))
}

/// Access the storage from `Drop` impls, which may run during thread teardown.
pub(crate) fn try_with_holder_storage<R>(f: impl FnOnce(&mut HolderStorage) -> R) -> Option<R> {
    STORAGE
        .try_with(|storage| storage.try_borrow_mut().ok().map(|mut s| f(&mut s)))
        .ok()
        .flatten()
}

/// Invoke listeners collected by [`HolderStorage::commit`].
///
/// Must be called after the storage borrow is released: listeners read the
/// holder they were fired for.
pub(crate) fn notify_listeners(listeners: Vec<Listener>) {
    for listener in listeners {
        listener();
    }
}
