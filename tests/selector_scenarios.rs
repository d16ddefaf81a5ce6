//! End-to-end behavior of providers and selectors sharing one context.

use gpui_context_selector::prelude::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
struct State {
    count: i32,
    text: String,
}

fn hello(count: i32) -> State {
    State {
        count,
        text: "hello".to_string(),
    }
}

#[test]
fn independent_projections() {
    let context = create_context(hello(0));
    let provider = context.provide(hello(0));

    let a_calls = Arc::new(Mutex::new(0));
    let b_calls = Arc::new(Mutex::new(0));
    let a = context.select(|s| s.count, {
        let a_calls = a_calls.clone();
        move || *a_calls.lock() += 1
    });
    let b = context.select(|s| s.text.clone(), {
        let b_calls = b_calls.clone();
        move || *b_calls.lock() += 1
    });
    assert_eq!(a.get(), 0);
    assert_eq!(b.get(), "hello");

    provider.set(hello(1));

    assert_eq!(*a_calls.lock(), 1);
    assert_eq!(a.get(), 1);
    assert_eq!(*b_calls.lock(), 0);
    assert_eq!(b.get(), "hello");

    provider.set(State {
        count: 1,
        text: "world".to_string(),
    });
    assert_eq!(*a_calls.lock(), 1);
    assert_eq!(*b_calls.lock(), 1);
    assert_eq!(b.get(), "world");
}

#[test]
fn staged_updates_only_publish_the_last_value() {
    let context = create_context(hello(0));
    let provider = context.provide(hello(0));

    let observed = Arc::new(Mutex::new(Vec::new()));
    let reader = context.select(|s| s.count, || {});
    let observed_clone = observed.clone();
    let _watcher = context.select(|s| s.count, move || observed_clone.lock().push(()));

    provider.stage(hello(1));
    provider.stage(hello(2));
    // Nothing committed yet: readers still see the old value.
    assert_eq!(reader.get(), 0);

    provider.commit();
    assert_eq!(observed.lock().len(), 1);
    assert_eq!(reader.get(), 2);
}

#[test]
fn listener_reads_committed_value() {
    let context = create_context(hello(0));
    let provider = context.provide(hello(0));

    let inner = context.select(|s| s.count, || {});
    let seen_in_callback = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen_in_callback.clone();
    let _watch = context.select(|s| s.count, move || {
        seen_clone.lock().push(inner.get());
    });

    provider.set(hello(1));
    provider.set(hello(2));
    assert_eq!(*seen_in_callback.lock(), vec![1, 2]);
    assert_eq!(provider.version(), 2);
}

#[test]
fn unsubscribed_selector_is_not_called() {
    let context = create_context(hello(0));
    let provider = context.provide(hello(0));
    let calls = Arc::new(Mutex::new(0));
    let selector = context.select(|s| s.count, {
        let calls = calls.clone();
        move || *calls.lock() += 1
    });

    selector.unsubscribe();
    provider.set(hello(1));
    assert_eq!(*calls.lock(), 0);
    // Reads still recompute from the holder.
    assert_eq!(selector.get(), 1);
}

#[test]
fn snapshots_follow_random_updates() {
    let mut rng = StdRng::seed_from_u64(7);
    let context = create_context(hello(0));
    let provider = context.provide(hello(0));

    let count = context.select(|s| s.count, || {});
    let parity = context.select(|s| s.count % 2 == 0, || {});
    let text_len = context.select(|s| s.text.len(), || {});

    let mut latest = hello(0);
    for _ in 0..200 {
        latest = State {
            count: rng.gen_range(-50..50),
            text: "x".repeat(rng.gen_range(0..8)),
        };
        if rng.gen_bool(0.3) {
            provider.stage(latest.clone());
            continue;
        }
        provider.set(latest.clone());

        assert_eq!(count.get(), latest.count);
        assert_eq!(parity.get(), latest.count % 2 == 0);
        assert_eq!(text_len.get(), latest.text.len());
    }

    provider.commit();
    assert_eq!(count.get(), latest.count);
    assert_eq!(provider.with(|s| s.clone()), latest);
}

#[test]
fn change_callbacks_run_in_subscription_order() {
    let context = create_context(hello(0));
    let provider = context.provide(hello(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let selectors: Vec<_> = (0..3)
        .map(|n| {
            let order = order.clone();
            context.select(|s| s.count, move || order.lock().push(n))
        })
        .collect();

    provider.set(hello(1));
    assert_eq!(*order.lock(), vec![0, 1, 2]);
    drop(selectors);
    assert_eq!(provider.listener_count(), 0);
}
