//! # GPUI Context Selector
//!
//! Selector-based subscriptions to shared state for GPUI views.
//!
//! ## Features
//!
//! - **Copy-able context handles**: create once, hand to every view that needs them
//! - **Fine-grained re-renders**: a view is notified only when its projection changes
//! - **Providers**: one writer per holder, with staged values and batched commits
//! - **Memory safe**: generational arena detects selectors that outlive their provider
//!
//! ## Example
//!
//! ```rust,no_run
//! use gpui::Context;
//! use gpui_context_selector::prelude::*;
//!
//! #[derive(Clone, PartialEq)]
//! struct State {
//!     count: i32,
//!     text: String,
//! }
//!
//! struct CountLabel {
//!     count: Selector<i32>,
//! }
//!
//! impl CountLabel {
//!     fn new(state: &SelectorContext<State>, cx: &mut Context<Self>) -> Self {
//!         Self {
//!             count: cx.use_context_selector(state, |state| state.count),
//!         }
//!     }
//! }
//! ```

mod context;
pub mod equality;
mod error;
mod handle;
mod provider;
mod selector;
mod storage;

pub use context::ContextSelectorExt;
pub use error::{Error, Result};
pub use handle::{create_context, SelectorContext};
pub use provider::Provider;
pub use selector::Selector;
pub use storage::{HolderId, ListenerId};

// Re-export the prelude
pub mod prelude {
    pub use crate::equality;
    pub use crate::{create_context, ContextSelectorExt, Provider, Selector, SelectorContext};
}
