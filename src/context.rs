//! Integration with GPUI's Context system.
//!
//! This module provides extension methods for GPUI's Context to provide
//! contexts and subscribe views to selectors.

use crate::{Provider, Selector, SelectorContext};
use futures::channel::mpsc;
use futures::StreamExt;
use gpui::{EntityId, Subscription, WeakEntity};
use std::cell::RefCell;
use std::collections::HashMap;

/// Extension trait for GPUI Context to work with selector contexts.
///
/// Selectors created with `use_context_selector()` notify the entity only
/// when their projection changes, so a view re-renders for the slice of
/// shared state it reads and for nothing else.
///
/// # Example
///
/// ```rust,no_run
/// use gpui::*;
/// use gpui_context_selector::prelude::*;
///
/// struct CountLabel {
///     count: Selector<i32>,
/// }
///
/// impl CountLabel {
///     fn new(context: &SelectorContext<(i32, String)>, cx: &mut Context<Self>) -> Self {
///         Self {
///             count: cx.use_context_selector(context, |(count, _)| *count),
///         }
///     }
/// }
///
/// impl Render for CountLabel {
///     fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
///         div().child(format!("Count: {}", self.count.get()))
///     }
/// }
/// ```
pub trait ContextSelectorExt {
    /// Mount a provider owned by this entity.
    ///
    /// Store the provider in the entity; it unmounts when the entity drops it.
    fn provide_context<T: 'static>(&mut self, context: &SelectorContext<T>, initial: T)
        -> Provider<T>;

    /// Subscribe this entity to a projection of the context value.
    ///
    /// The entity is notified whenever the projection changes by `PartialEq`.
    fn use_context_selector<T, S>(
        &mut self,
        context: &SelectorContext<T>,
        projection: impl Fn(&T) -> S + 'static,
    ) -> Selector<S>
    where
        T: 'static,
        S: PartialEq + 'static;

    /// Like `use_context_selector` with a custom equality function.
    fn use_context_selector_with<T, S>(
        &mut self,
        context: &SelectorContext<T>,
        projection: impl Fn(&T) -> S + 'static,
        equality: impl Fn(&S, &S) -> bool + 'static,
    ) -> Selector<S>
    where
        T: 'static,
        S: 'static;
}

// Thread-local storage for tracking subscriptions per entity
thread_local! {
    static ENTITY_SUBSCRIPTIONS: RefCell<HashMap<EntityId, Vec<Subscription>>> = RefCell::new(HashMap::new());
}

impl<V: 'static> ContextSelectorExt for gpui::Context<'_, V> {
    fn provide_context<T: 'static>(
        &mut self,
        context: &SelectorContext<T>,
        initial: T,
    ) -> Provider<T> {
        log::debug!(
            "entity {:?} provides context {:?}",
            self.entity_id(),
            context.id()
        );
        context.provide(initial)
    }

    fn use_context_selector<T, S>(
        &mut self,
        context: &SelectorContext<T>,
        projection: impl Fn(&T) -> S + 'static,
    ) -> Selector<S>
    where
        T: 'static,
        S: PartialEq + 'static,
    {
        self.use_context_selector_with(context, projection, crate::equality::structural::<S>)
    }

    fn use_context_selector_with<T, S>(
        &mut self,
        context: &SelectorContext<T>,
        projection: impl Fn(&T) -> S + 'static,
        equality: impl Fn(&S, &S) -> bool + 'static,
    ) -> Selector<S>
    where
        T: 'static,
        S: 'static,
    {
        let (tx, rx) = mpsc::unbounded::<()>();
        let selector = context.select_with(projection, equality, move || {
            // Ignore errors - if the receiver is dropped, the entity is gone
            let _ = tx.unbounded_send(());
        });

        let subscription = notify_on_change(rx, self);
        track_subscription(self, subscription);
        selector
    }
}

/// Notify an entity every time the selector behind `rx` reports a change.
///
/// Selector callbacks run synchronously inside the provider's commit, which
/// may happen while the entity is being updated. The channel moves the
/// `cx.notify()` onto the foreground executor instead. A burst of changes
/// queued before the task wakes up collapses into one notify, and the view
/// then renders whatever snapshot is current.
fn notify_on_change<V: 'static>(
    mut rx: mpsc::UnboundedReceiver<()>,
    cx: &mut gpui::Context<V>,
) -> Subscription {
    let task = cx.spawn(
        async move |entity: WeakEntity<V>, cx: &mut gpui::AsyncApp| {
            while let Some(()) = rx.next().await {
                while let Ok(Some(())) = rx.try_next() {}

                if let Some(entity) = entity.upgrade() {
                    entity
                        .update(cx, |_, cx| {
                            cx.notify();
                        })
                        .ok();
                } else {
                    break;
                }
            }
        },
    );

    // Dropping the task cancels it.
    Subscription::new(move || drop(task))
}

/// Keep `subscription` alive until the entity is released.
fn track_subscription<V: 'static>(cx: &mut gpui::Context<V>, subscription: Subscription) {
    let entity_id = cx.entity_id();
    let first = ENTITY_SUBSCRIPTIONS.with(|subs| {
        let mut subs = subs.borrow_mut();
        let entry = subs.entry(entity_id).or_default();
        entry.push(subscription);
        entry.len() == 1
    });

    if first {
        cx.on_release(move |_, _| {
            let released = ENTITY_SUBSCRIPTIONS.with(|subs| subs.borrow_mut().remove(&entity_id));
            drop(released);
        })
        .detach();
    }
}
