//! Counter and text box views sharing one context.
//!
//! This example shows:
//! - Providing a reducer-driven `(State, Dispatch)` context from a root view
//! - Selecting `count` in two counter views and `text` in two text views
//! - Each view re-rendering only when its own slice changes (watch the
//!   render counters)

use futures::channel::mpsc;
use futures::StreamExt;
use gpui::*;
use gpui_context_selector::{create_context, ContextSelectorExt, Provider, Selector, SelectorContext};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
struct State {
    count: i32,
    text: SharedString,
}

impl State {
    fn initial() -> Self {
        Self {
            count: 0,
            text: "hello".into(),
        }
    }
}

enum Action {
    Increment,
    Decrement,
    SetText(SharedString),
}

fn reducer(state: &State, action: Action) -> State {
    match action {
        Action::Increment => State {
            count: state.count + 1,
            ..state.clone()
        },
        Action::Decrement => State {
            count: state.count - 1,
            ..state.clone()
        },
        Action::SetText(text) => State {
            text,
            ..state.clone()
        },
    }
}

/// Sends actions to the reducer. Equal only to itself.
#[derive(Clone)]
struct Dispatch(Rc<dyn Fn(Action)>);

impl Dispatch {
    fn noop() -> Self {
        Self(Rc::new(|_| {}))
    }

    fn send(&self, action: Action) {
        (self.0)(action)
    }
}

impl PartialEq for Dispatch {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

type Store = (State, Dispatch);

fn button<V: 'static>(
    label: &'static str,
    cx: &mut Context<V>,
    on_click: impl Fn(&mut V, &mut Context<V>) + 'static,
) -> impl IntoElement {
    div()
        .id(label)
        .bg(rgb(0x3a3a3a))
        .border_1()
        .border_color(rgb(0x4f4f4f))
        .rounded_md()
        .px_4()
        .py_2()
        .text_sm()
        .font_weight(FontWeight::BOLD)
        .text_color(rgb(0xffffff))
        .child(label)
        .on_click(cx.listener(move |this, _, _, cx| on_click(this, cx)))
}

fn panel(renders: usize) -> Div {
    div()
        .flex()
        .items_center()
        .gap_4()
        .bg(rgb(0x1d1d1d))
        .p_4()
        .rounded_lg()
        .border_1()
        .border_color(rgb(0x444444))
        .child(
            div()
                .text_xs()
                .text_color(rgb(0x888888))
                .child(format!("renders: {renders}")),
        )
}

struct CounterView {
    count: Selector<i32>,
    dispatch: Selector<Dispatch>,
    renders: usize,
}

impl CounterView {
    fn new(store: &SelectorContext<Store>, cx: &mut Context<Self>) -> Self {
        Self {
            count: cx.use_context_selector(store, |(state, _)| state.count),
            dispatch: cx.use_context_selector(store, |(_, dispatch)| dispatch.clone()),
            renders: 0,
        }
    }
}

impl Render for CounterView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.renders += 1;
        panel(self.renders)
            .child(
                div()
                    .text_lg()
                    .font_weight(FontWeight::BOLD)
                    .text_color(rgb(0x4a9eff))
                    .child(format!("Count: {}", self.count.get())),
            )
            .child(button("+1", cx, |this, _| {
                this.dispatch.get().send(Action::Increment)
            }))
            .child(button("-1", cx, |this, _| {
                this.dispatch.get().send(Action::Decrement)
            }))
    }
}

struct TextBoxView {
    text: Selector<SharedString>,
    dispatch: Selector<Dispatch>,
    renders: usize,
}

impl TextBoxView {
    fn new(store: &SelectorContext<Store>, cx: &mut Context<Self>) -> Self {
        Self {
            text: cx.use_context_selector(store, |(state, _)| state.text.clone()),
            dispatch: cx.use_context_selector(store, |(_, dispatch)| dispatch.clone()),
            renders: 0,
        }
    }
}

impl Render for TextBoxView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.renders += 1;
        panel(self.renders)
            .child(
                div()
                    .text_lg()
                    .font_weight(FontWeight::BOLD)
                    .text_color(rgb(0x50fa7b))
                    .child(format!("Text: {}", self.text.get())),
            )
            .child(button("Append !", cx, |this, _| {
                let text = format!("{}!", this.text.get());
                this.dispatch.get().send(Action::SetText(text.into()))
            }))
            .child(button("Reset", cx, |this, _| {
                this.dispatch
                    .get()
                    .send(Action::SetText(State::initial().text))
            }))
    }
}

struct Root {
    provider: Provider<Store>,
    counters: [Entity<CounterView>; 2],
    text_boxes: [Entity<TextBoxView>; 2],
}

impl Root {
    fn new(cx: &mut Context<Self>) -> Self {
        let store = create_context((State::initial(), Dispatch::noop()));

        let (tx, mut rx) = mpsc::unbounded::<Action>();
        let dispatch = Dispatch(Rc::new(move |action| {
            let _ = tx.unbounded_send(action);
        }));
        let provider = cx.provide_context(&store, (State::initial(), dispatch));

        // Actions are reduced on the foreground executor, outside any view update.
        cx.spawn(async move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
            while let Some(action) = rx.next().await {
                let Some(this) = this.upgrade() else {
                    break;
                };
                this.update(cx, |this, _| {
                    this.provider
                        .update(|(state, _)| *state = reducer(state, action));
                })
                .ok();
            }
        })
        .detach();

        Self {
            provider,
            counters: [
                cx.new(|cx| CounterView::new(&store, cx)),
                cx.new(|cx| CounterView::new(&store, cx)),
            ],
            text_boxes: [
                cx.new(|cx| TextBoxView::new(&store, cx)),
                cx.new(|cx| TextBoxView::new(&store, cx)),
            ],
        }
    }
}

impl Render for Root {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        div()
            .flex()
            .flex_col()
            .gap_4()
            .p_8()
            .bg(rgb(0x2d2d2d))
            .text_color(rgb(0xffffff))
            .size_full()
            .child(div().text_2xl().font_weight(FontWeight::BOLD).child("Counter"))
            .children(self.counters.clone())
            .child(div().text_2xl().font_weight(FontWeight::BOLD).child("TextBox"))
            .children(self.text_boxes.clone())
            .child(
                div()
                    .text_sm()
                    .text_color(rgb(0x888888))
                    .child("Run with: cargo run --example counter"),
            )
    }
}

fn main() {
    Application::new().run(|cx: &mut App| {
        let bounds = Bounds::centered(None, Size::new(px(600.0), px(500.0)), cx);
        cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                ..Default::default()
            },
            |_window, cx| cx.new(Root::new),
        )
        .unwrap();
        cx.activate(true);
    });
}
