//! Equality functions used to decide whether a selector's snapshot changed.
//!
//! A selector calls its equality function as `equal(&last, &next)`. When it
//! returns `true` the selector keeps its cached snapshot and stays quiet.

use std::rc::Rc;

/// Shared equality function for snapshots of type `S`.
pub type Equality<S> = Rc<dyn Fn(&S, &S) -> bool>;

/// Default comparison: the snapshot's own `PartialEq`.
///
/// Rust values have no identity of their own, so nested projections compare
/// by value here and are not treated as always-changed.
pub fn structural<S: PartialEq>(last: &S, next: &S) -> bool {
    last == next
}

/// Compare shared handles by pointer, ignoring their contents.
///
/// Useful for projections that return callbacks or other `Rc` values whose
/// contents have no meaningful equality.
pub fn identity<T: ?Sized>(last: &Rc<T>, next: &Rc<T>) -> bool {
    Rc::ptr_eq(last, next)
}

/// Element-wise pointer comparison of a list of shared handles.
///
/// Takes `&Vec` rather than a slice so it can be passed directly as a
/// selector's equality function for `Vec<Rc<T>>` snapshots.
#[allow(clippy::ptr_arg)]
pub fn shallow<T: ?Sized>(last: &Vec<Rc<T>>, next: &Vec<Rc<T>>) -> bool {
    last.len() == next.len()
        && last
            .iter()
            .zip(next)
            .all(|(a, b)| Rc::ptr_eq(a, b))
}

/// Treat every recomputation as a change.
pub fn never<S>(_last: &S, _next: &S) -> bool {
    false
}
